//! Process surfaces: the HTTP API (with MCP mounted at `/mcp`) and MCP over stdio.
//!
//! Both entry points share [`build_coordinator`], which wires the model runtime,
//! embedding provider and capability registry into one [`Coordinator`].

use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rmcp::ServiceExt;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::EterniumConfig;
use crate::coordinator::{Coordinator, RequestOptions};
use crate::embedding;
use crate::llm;
use crate::registry::{self, BuildContext};
use crate::tool::Invocation;
use crate::tools::{list_capabilities, EterniumTools};

/// Shared setup: model runtime, embedder, capability assembly.
pub fn build_coordinator(config: EterniumConfig) -> Result<Arc<Coordinator>> {
    let config = Arc::new(config);

    let model = llm::create_runtime(&config.llm)?;
    let embedder: Arc<dyn embedding::EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);
    tracing::info!(model = model.model(), embedder = embedder.model(), "runtimes ready");

    let ctx = BuildContext::new(Arc::clone(&config), model, embedder);
    let assembly = registry::assemble(registry::BLUEPRINTS, &ctx, |name| {
        config.capabilities.is_enabled(name)
    });
    tracing::info!(workers = ?assembly.names(), "capabilities assembled");

    Ok(Arc::new(Coordinator::new(assembly, &config.coordinator)))
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub message: String,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub worker: String,
    pub operation: String,
    #[serde(default)]
    pub arguments: Value,
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn capabilities(State(coordinator): State<Arc<Coordinator>>) -> Json<Value> {
    Json(list_capabilities::describe(&coordinator))
}

async fn run(
    State(coordinator): State<Arc<Coordinator>>,
    Json(body): Json<RunRequest>,
) -> Response {
    if body.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "message must not be empty" })),
        )
            .into_response();
    }

    let reply = coordinator
        .handle(
            &body.message,
            RequestOptions {
                confirmed: body.confirm,
            },
        )
        .await;
    Json(reply).into_response()
}

async fn invoke(
    State(coordinator): State<Arc<Coordinator>>,
    Json(body): Json<InvokeRequest>,
) -> Json<Value> {
    let envelope = coordinator
        .invoke(&body.worker, Invocation::new(body.operation, body.arguments))
        .await;
    Json(envelope.to_value())
}

/// The HTTP router: JSON endpoints plus the MCP Streamable HTTP service.
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    let mcp_coordinator = Arc::clone(&coordinator);
    let mcp = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(EterniumTools::new(Arc::clone(&mcp_coordinator))),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    Router::new()
        .route("/healthz", get(healthz))
        .route("/capabilities", get(capabilities))
        .route("/run", post(run))
        .route("/invoke", post(invoke))
        .with_state(coordinator)
        .nest_service("/mcp", mcp)
}

/// Serve the HTTP API until ctrl-c.
pub async fn serve_http(config: EterniumConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let coordinator = build_coordinator(config)?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Eternium listening at http://{bind_addr} (MCP at /mcp)");

    axum::serve(listener, router(coordinator))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}

/// Serve MCP over stdio.
pub async fn serve_stdio(config: EterniumConfig) -> Result<()> {
    tracing::info!("starting Eternium MCP server on stdio");

    let coordinator = build_coordinator(config)?;
    let tools = EterniumTools::new(coordinator);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}
