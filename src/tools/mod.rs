pub mod ask;
pub mod invoke_operation;
pub mod list_capabilities;

use ask::AskParams;
use invoke_operation::InvokeOperationParams;
use list_capabilities::ListCapabilitiesParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;

use crate::coordinator::{Coordinator, RequestOptions};
use crate::tool::Invocation;

/// The Eternium MCP tool handler. Every tool call goes through the shared
/// [`Coordinator`].
#[derive(Clone)]
pub struct EterniumTools {
    tool_router: ToolRouter<Self>,
    coordinator: Arc<Coordinator>,
}

#[tool_router]
impl EterniumTools {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            coordinator,
        }
    }

    /// Route a natural-language request to the best matching worker.
    #[tool(description = "Ask the homelab agency to do something, e.g. 'show the pods in namespace media' or 'back up the wiki database'. Mutating operations may require confirm=true.")]
    async fn ask(&self, Parameters(params): Parameters<AskParams>) -> Result<String, String> {
        if params.request.trim().is_empty() {
            return Err("request must not be empty".into());
        }

        tracing::info!(
            request_len = params.request.len(),
            confirm = params.confirm,
            "ask called"
        );

        let reply = self
            .coordinator
            .handle(
                &params.request,
                RequestOptions {
                    confirmed: params.confirm,
                },
            )
            .await;

        serde_json::to_string(&reply).map_err(|e| format!("serialization failed: {e}"))
    }

    /// List registered workers and their operations.
    #[tool(description = "List the enabled capabilities, their routing hints and their operations with parameter schemas.")]
    async fn list_capabilities(
        &self,
        Parameters(_params): Parameters<ListCapabilitiesParams>,
    ) -> Result<String, String> {
        tracing::info!("list_capabilities called");
        Ok(list_capabilities::describe(&self.coordinator).to_string())
    }

    /// Run one operation directly, without the model.
    #[tool(description = "Run a single operation on a named capability with JSON arguments, bypassing request routing. Returns the result envelope.")]
    async fn invoke_operation(
        &self,
        Parameters(params): Parameters<InvokeOperationParams>,
    ) -> Result<String, String> {
        tracing::info!(
            worker = %params.worker,
            operation = %params.operation,
            "invoke_operation called"
        );

        let envelope = self
            .coordinator
            .invoke(
                &params.worker,
                Invocation::new(params.operation, params.arguments),
            )
            .await;

        if envelope.is_error() {
            return Err(envelope.to_json_string());
        }
        Ok(envelope.to_json_string())
    }
}

#[tool_handler]
impl ServerHandler for EterniumTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Eternium operates a homelab. Use ask for natural-language requests, \
                 list_capabilities to see what is enabled, and invoke_operation to run \
                 a single operation directly."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
