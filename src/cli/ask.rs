use anyhow::Result;

use crate::config::EterniumConfig;
use crate::coordinator::{ReplyStatus, RequestOptions};

/// Handle one request from the terminal and print the reply.
pub async fn ask(config: EterniumConfig, request: &str, confirm: bool) -> Result<()> {
    anyhow::ensure!(!request.trim().is_empty(), "request must not be empty");

    let coordinator = crate::server::build_coordinator(config)?;
    let reply = coordinator
        .handle(request, RequestOptions { confirmed: confirm })
        .await;

    if let Some(worker) = reply.worker {
        println!("[{worker}]");
    }
    println!("{}", reply.text);

    match reply.status {
        ReplyStatus::AwaitingConfirmation => {
            println!();
            println!("Re-run with --confirm to execute the held operations.");
        }
        ReplyStatus::NoCapableWorker | ReplyStatus::Failed => {
            anyhow::bail!("request not completed ({:?})", reply.status)
        }
        ReplyStatus::Answered | ReplyStatus::PartialFailure => {}
    }
    Ok(())
}
