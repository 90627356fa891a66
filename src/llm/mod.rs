//! Boundary to the language-model runtime.
//!
//! The coordinator and workers only see [`ModelRuntime`]: a system prompt,
//! the conversation so far and the available tool definitions go in; either
//! tool calls or final text come out.

pub mod openai;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::LlmConfig;
use crate::tool::ToolDefinition;

/// One function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    User(String),
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    /// Serialised result envelope answering the call with `call_id`.
    Tool { call_id: String, content: String },
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    ToolCalls(Vec<ToolCall>),
    Text(String),
}

#[async_trait]
pub trait ModelRuntime: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Model identifier for logs.
    fn model(&self) -> &str;
}

/// Build the runtime described by `[llm]`. Without a URL and model every
/// completion fails, but boot and direct invocation still work.
pub fn create_runtime(config: &LlmConfig) -> Result<Arc<dyn ModelRuntime>> {
    match (&config.url, &config.model) {
        (Some(url), Some(model)) => Ok(Arc::new(openai::OpenAiRuntime::new(
            url,
            model,
            config.token.as_deref(),
            config.timeout_secs,
        )?)),
        _ => {
            tracing::warn!("no LLM configured (set LLM_URL and LLM_MODEL); natural-language requests will fail");
            Ok(Arc::new(UnconfiguredRuntime))
        }
    }
}

pub struct UnconfiguredRuntime;

#[async_trait]
impl ModelRuntime for UnconfiguredRuntime {
    async fn complete(&self, _request: &CompletionRequest) -> Result<Completion> {
        anyhow::bail!("no language model configured (set llm.url and llm.model)")
    }

    fn model(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_model_yields_unconfigured_runtime() {
        let config = LlmConfig {
            url: Some("http://localhost:11434/v1".into()),
            ..Default::default()
        };
        let runtime = create_runtime(&config).unwrap();
        assert_eq!(runtime.model(), "none");

        let request = CompletionRequest {
            system: String::new(),
            messages: vec![Message::User("hi".into())],
            tools: Vec::new(),
        };
        let err = runtime.complete(&request).await.unwrap_err();
        assert!(err.to_string().contains("no language model configured"));
    }
}
