//! The single invocation interface every worker operation implements.
//!
//! Operations are written as plain async functions over typed parameters and
//! wrapped with [`operation`] (or [`bind`] for adapter methods). The wrapper
//! decodes JSON arguments, runs the function, and folds any [`AdapterError`]
//! into an error [`Envelope`], so [`Tool::invoke`] itself is infallible.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::adapters::AdapterError;
use crate::envelope::Envelope;

/// Whether an operation can change backend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Read,
    Mutating,
}

/// Static metadata for one operation.
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub effect: Effect,
}

impl OperationSpec {
    pub const fn read(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            effect: Effect::Read,
        }
    }

    pub const fn mutating(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            effect: Effect::Mutating,
        }
    }
}

/// A structured call against one worker operation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Invocation {
    pub operation: String,
    #[serde(default)]
    pub arguments: Value,
}

impl Invocation {
    pub fn new(operation: impl Into<String>, arguments: Value) -> Self {
        Self {
            operation: operation.into(),
            arguments,
        }
    }
}

/// Function-calling definition handed to the model runtime.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The operations a worker exposes, in declaration order.
pub type Toolset = Vec<Arc<dyn Tool>>;

#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> &OperationSpec;

    /// JSON schema of the accepted arguments.
    fn parameters(&self) -> Value;

    /// Run the operation. Never fails: backend errors come back as error envelopes.
    async fn invoke(&self, arguments: Value) -> Envelope;

    fn name(&self) -> &str {
        self.spec().name
    }

    fn effect(&self) -> Effect {
        self.spec().effect
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.spec().name.to_string(),
            description: self.spec().description.to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Parameters for operations that take no arguments.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoParams {}

/// A typed async function exposed as a [`Tool`].
pub struct Operation<P, F, Fut> {
    spec: OperationSpec,
    handler: F,
    _marker: PhantomData<fn(P) -> Fut>,
}

/// Wrap a typed async function as a [`Tool`].
pub fn operation<P, F, Fut>(spec: OperationSpec, handler: F) -> Arc<dyn Tool>
where
    P: DeserializeOwned + JsonSchema + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Envelope, AdapterError>> + Send + 'static,
{
    Arc::new(Operation {
        spec,
        handler,
        _marker: PhantomData,
    })
}

/// Wrap a method of a shared adapter as a [`Tool`].
pub fn bind<A, P, F, Fut>(adapter: &Arc<A>, spec: OperationSpec, handler: F) -> Arc<dyn Tool>
where
    A: Send + Sync + 'static,
    P: DeserializeOwned + JsonSchema + Send + 'static,
    F: Fn(Arc<A>, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Envelope, AdapterError>> + Send + 'static,
{
    let adapter = Arc::clone(adapter);
    operation(spec, move |params: P| handler(Arc::clone(&adapter), params))
}

#[async_trait]
impl<P, F, Fut> Tool for Operation<P, F, Fut>
where
    P: DeserializeOwned + JsonSchema + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Envelope, AdapterError>> + Send + 'static,
{
    fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    fn parameters(&self) -> Value {
        parameters_schema::<P>()
    }

    async fn invoke(&self, arguments: Value) -> Envelope {
        let arguments = if arguments.is_null() {
            json!({})
        } else {
            arguments
        };

        let params: P = match serde_json::from_value(arguments) {
            Ok(params) => params,
            Err(e) => {
                return Envelope::error(format!("invalid arguments for {}: {e}", self.spec.name))
            }
        };

        match (self.handler)(params).await {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(operation = self.spec.name, error = %err, "operation failed");
                Envelope::from_adapter_error(self.spec.name, &err)
            }
        }
    }
}

/// JSON schema for `P`, without the draft/title noise function-calling APIs reject.
pub fn parameters_schema<P: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(P)).unwrap_or_default();
    if let Some(map) = schema.as_object_mut() {
        map.remove("$schema");
        map.remove("title");
        map.entry("properties").or_insert_with(|| json!({}));
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EnvelopeStatus;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoParams {
        /// Text to echo back
        text: String,
    }

    fn echo() -> Arc<dyn Tool> {
        operation(
            OperationSpec::read("echo", "Echo the given text."),
            |p: EchoParams| async move { Ok(Envelope::record(json!({ "text": p.text }))) },
        )
    }

    #[tokio::test]
    async fn decodes_arguments_and_returns_envelope() {
        let env = echo().invoke(json!({"text": "hi", "extra": true})).await;
        assert_eq!(env.status(), EnvelopeStatus::Success);
        assert_eq!(env.to_value()["text"], "hi");
    }

    #[tokio::test]
    async fn bad_arguments_become_error_envelope() {
        let env = echo().invoke(json!({"txt": "hi"})).await;
        assert!(env.is_error());
        assert!(env.error_message().unwrap().contains("invalid arguments for echo"));
    }

    #[tokio::test]
    async fn adapter_error_becomes_error_envelope() {
        let failing = operation(
            OperationSpec::mutating("explode", "Always fails."),
            |_: NoParams| async move {
                Err::<Envelope, _>(AdapterError::NotFound("nothing here".into()))
            },
        );
        let env = failing.invoke(Value::Null).await;
        assert_eq!(env.error_message(), Some("explode failed: nothing here"));
        assert_eq!(failing.effect(), Effect::Mutating);
    }

    #[test]
    fn definition_carries_schema() {
        let def = echo().definition();
        assert_eq!(def.name, "echo");
        assert_eq!(def.parameters["type"], "object");
        assert!(def.parameters["properties"]["text"].is_object());
        assert!(def.parameters.get("$schema").is_none());
    }

    #[tokio::test]
    async fn bind_shares_adapter_state() {
        struct Counter {
            label: String,
        }
        let adapter = Arc::new(Counter {
            label: "lab".into(),
        });
        let tool = bind(
            &adapter,
            OperationSpec::read("label", "Return the label."),
            |c: Arc<Counter>, _: NoParams| async move { Ok(Envelope::success(c.label.clone())) },
        );
        assert_eq!(tool.invoke(json!({})).await.to_value()["message"], "lab");
    }
}
