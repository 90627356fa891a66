//! OpenAI-compatible `/chat/completions` client with function calling.
//!
//! Works against OpenAI itself, Ollama's `/v1` endpoint, vLLM and LiteLLM.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Completion, CompletionRequest, Message, ModelRuntime, ToolCall};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

pub struct OpenAiRuntime {
    client: Client,
    endpoint: String,
    model: String,
    token: Option<String>,
}

impl OpenAiRuntime {
    pub fn new(url: &str, model: &str, token: Option<&str>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", url.trim_end_matches('/')),
            model: model.to_string(),
            token: token.map(str::to_string),
        })
    }

    fn payload(&self, request: &CompletionRequest) -> Value {
        let mut messages = vec![json!({ "role": "system", "content": request.system })];
        messages.extend(request.messages.iter().map(wire_message));

        let mut payload = json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0,
        });

        if !request.tools.is_empty() {
            payload["tools"] = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
        }
        payload
    }
}

fn wire_message(message: &Message) -> Value {
    match message {
        Message::User(text) => json!({ "role": "user", "content": text }),
        Message::Assistant {
            content,
            tool_calls,
        } => {
            let mut out = json!({ "role": "assistant", "content": content });
            if !tool_calls.is_empty() {
                out["tool_calls"] = tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
            }
            out
        }
        Message::Tool { call_id, content } => json!({
            "role": "tool",
            "tool_call_id": call_id,
            "content": content,
        }),
    }
}

/// Arguments arrive as a JSON-encoded string. Unparseable text is passed through
/// as a string so the tool reports the decode failure.
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[async_trait]
impl ModelRuntime for OpenAiRuntime {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let mut builder = self.client.post(&self.endpoint).json(&self.payload(request));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("model request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "model endpoint returned {status}: {}",
                crate::adapters::truncate(body.trim(), 320)
            );
        }

        let body: ChatResponse = response.json().await.context("invalid model response")?;
        let message = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .context("model response contained no choices")?;

        if !message.tool_calls.is_empty() {
            return Ok(Completion::ToolCalls(
                message
                    .tool_calls
                    .into_iter()
                    .map(|call| ToolCall {
                        id: call.id,
                        arguments: parse_arguments(&call.function.arguments),
                        name: call.function.name,
                    })
                    .collect(),
            ));
        }

        Ok(Completion::Text(
            message.content.unwrap_or_default().trim().to_string(),
        ))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
