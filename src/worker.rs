//! A registered worker: one capability's operations plus its routing hint.
//!
//! Workers are built once at boot by the registry and shared read-only.
//! [`Worker::run`] drives the tool loop for one request against the model
//! runtime; [`Worker::invoke`] runs a single operation.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::envelope::{Envelope, EnvelopeStatus};
use crate::llm::{Completion, CompletionRequest, Message, ModelRuntime};
use crate::tool::{Effect, Invocation, Tool, Toolset};

pub struct Worker {
    name: &'static str,
    agent: &'static str,
    routing_hint: &'static str,
    keywords: &'static [&'static str],
    tools: Toolset,
    model: Arc<dyn ModelRuntime>,
}

/// Limits applied to one request's tool loop.
#[derive(Debug, Clone, Copy)]
pub struct RunPolicy {
    pub max_tool_calls: usize,
    /// Answer mutating calls with a confirmation request instead of running them.
    pub hold_mutations: bool,
}

/// One operation executed while serving a request.
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    pub operation: String,
    pub arguments: Value,
    pub status: EnvelopeStatus,
    pub result: Envelope,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Finish {
    Answered(String),
    BudgetExhausted,
    ModelFailed(String),
}

#[derive(Debug, Clone)]
pub struct WorkerRun {
    pub finish: Finish,
    pub calls: Vec<CallRecord>,
}

impl Worker {
    pub fn new(
        name: &'static str,
        agent: &'static str,
        routing_hint: &'static str,
        keywords: &'static [&'static str],
        tools: Toolset,
        model: Arc<dyn ModelRuntime>,
    ) -> Self {
        Self {
            name,
            agent,
            routing_hint,
            keywords,
            tools,
            model,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn agent(&self) -> &'static str {
        self.agent
    }

    pub fn routing_hint(&self) -> &'static str {
        self.routing_hint
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        self.keywords
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn tool(&self, operation: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == operation)
    }

    /// Run one operation on its own task, so a panicking backend becomes an error envelope.
    pub async fn invoke(&self, invocation: Invocation) -> Envelope {
        let Some(tool) = self.tool(&invocation.operation) else {
            return Envelope::error(format!(
                "{} has no operation named {}",
                self.name, invocation.operation
            ));
        };

        tracing::info!(worker = self.name, operation = %invocation.operation, "invoking operation");

        let tool = Arc::clone(tool);
        let arguments = invocation.arguments;
        match tokio::spawn(async move { tool.invoke(arguments).await }).await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(worker = self.name, operation = %invocation.operation, error = %e, "operation task failed");
                Envelope::error(format!("{} aborted: {e}", invocation.operation))
            }
        }
    }

    /// Serve `request` with this worker's tools, bounded by `policy`.
    ///
    /// Tool calls run sequentially in the order the model issued them.
    pub async fn run(&self, request: &str, context: &[String], policy: RunPolicy) -> WorkerRun {
        let mut calls = Vec::new();
        let mut completion_request = CompletionRequest {
            system: self.system_prompt(context),
            messages: vec![Message::User(request.to_string())],
            tools: self.tools.iter().map(|t| t.definition()).collect(),
        };

        loop {
            let completion = match self.model.complete(&completion_request).await {
                Ok(completion) => completion,
                Err(e) => {
                    tracing::warn!(worker = self.name, error = %e, "model completion failed");
                    return WorkerRun {
                        finish: Finish::ModelFailed(format!("{e:#}")),
                        calls,
                    };
                }
            };

            let tool_calls = match completion {
                Completion::Text(text) => {
                    return WorkerRun {
                        finish: Finish::Answered(text),
                        calls,
                    }
                }
                Completion::ToolCalls(tool_calls) if tool_calls.is_empty() => {
                    return WorkerRun {
                        finish: Finish::Answered(String::new()),
                        calls,
                    }
                }
                Completion::ToolCalls(tool_calls) => tool_calls,
            };

            completion_request.messages.push(Message::Assistant {
                content: None,
                tool_calls: tool_calls.clone(),
            });

            for call in tool_calls {
                if calls.len() >= policy.max_tool_calls {
                    tracing::warn!(
                        worker = self.name,
                        limit = policy.max_tool_calls,
                        "tool call budget exhausted"
                    );
                    return WorkerRun {
                        finish: Finish::BudgetExhausted,
                        calls,
                    };
                }

                let result = self.gated_invoke(&call.name, call.arguments.clone(), policy).await;
                completion_request.messages.push(Message::Tool {
                    call_id: call.id,
                    content: result.to_json_string(),
                });
                calls.push(CallRecord {
                    operation: call.name,
                    arguments: call.arguments,
                    status: result.status(),
                    result,
                });
            }
        }
    }

    async fn gated_invoke(&self, operation: &str, arguments: Value, policy: RunPolicy) -> Envelope {
        let mutating = self
            .tool(operation)
            .is_some_and(|t| t.effect() == Effect::Mutating);
        if policy.hold_mutations && mutating {
            tracing::info!(worker = self.name, operation, "mutating operation held for confirmation");
            return Envelope::ConfirmationRequired {
                operation: operation.to_string(),
                arguments,
            };
        }
        self.invoke(Invocation::new(operation, arguments)).await
    }

    fn system_prompt(&self, context: &[String]) -> String {
        let mut prompt = format!(
            "You are {}, a homelab operations worker. Scope: {}\n\
             Use only the tools provided. Report tool errors to the user verbatim; \
             never claim success for a call that returned an error. \
             Empty results mean nothing matched.",
            self.agent, self.routing_hint
        );
        if !context.is_empty() {
            prompt.push_str("\n\nRelevant notes from long-term memory:\n");
            for note in context {
                prompt.push_str("- ");
                prompt.push_str(note);
                prompt.push('\n');
            }
        }
        prompt
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .finish()
    }
}
