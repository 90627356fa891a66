use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use eternium::{cli, config, server};

#[derive(Parser)]
#[command(name = "eternium", version, about = "Homelab operations agency")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API with MCP at /mcp
    Serve,
    /// Start the MCP server (stdio transport)
    Mcp,
    /// Handle one natural-language request
    Ask {
        /// The request, e.g. "list pods in namespace media"
        request: Vec<String>,
        /// Approve mutating operations
        #[arg(long)]
        confirm: bool,
    },
    /// List enabled capabilities and their operations
    Capabilities,
    /// Work with the semantic memory store
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Store a fact
    Add { fact: Vec<String> },
    /// Search stored facts
    Search { query: Vec<String> },
    /// Delete a fact by ID
    Forget { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::EterniumConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve_http(config).await?,
        Command::Mcp => server::serve_stdio(config).await?,
        Command::Ask { request, confirm } => {
            cli::ask::ask(config, &request.join(" "), confirm).await?
        }
        Command::Capabilities => cli::capabilities::capabilities(config)?,
        Command::Memory { action } => match action {
            MemoryAction::Add { fact } => cli::memory::add(&config, &fact.join(" ")).await?,
            MemoryAction::Search { query } => {
                cli::memory::search(&config, &query.join(" ")).await?
            }
            MemoryAction::Forget { id } => cli::memory::forget(&config, &id).await?,
        },
    }

    Ok(())
}
