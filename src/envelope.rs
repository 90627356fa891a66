//! The uniform result shape returned by every worker operation.
//!
//! An [`Envelope`] is either a success mapping, a sequence of records, or one of
//! the non-success outcomes. Backends never leak their own error types past an
//! operation: they are converted to [`Envelope::Error`] at the tool boundary
//! (see [`crate::tool`]).

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::adapters::AdapterError;

/// Coarse outcome of an envelope, used by the coordinator and by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    /// A mapping describing a successful outcome.
    Success,
    /// A non-empty sequence of records.
    Records,
    /// A read that matched nothing. Not an error.
    Empty,
    /// The backend (or the arguments) failed.
    Error,
    /// Candidates existed but none passed the relevance threshold.
    NoneRelevant,
    /// A mutating operation held back pending operator confirmation.
    ConfirmationRequired,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Success mapping. Serialised with `"status": "success"` ahead of the payload.
    Record(Map<String, Value>),
    /// Multi-record result. Empty means "no matching resources".
    Records(Vec<Value>),
    Error {
        message: String,
        details: Option<String>,
    },
    NoneRelevant {
        message: String,
        candidates: usize,
    },
    ConfirmationRequired {
        operation: String,
        arguments: Value,
    },
}

impl Envelope {
    /// Success with a human-readable message only.
    pub fn success(message: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("message".into(), Value::String(message.into()));
        Self::Record(map)
    }

    /// Success carrying a payload. Non-object payloads are stored under `"result"`.
    pub fn record(payload: Value) -> Self {
        match payload {
            Value::Object(map) => Self::Record(map),
            other => {
                let mut map = Map::new();
                map.insert("result".into(), other);
                Self::Record(map)
            }
        }
    }

    pub fn records(items: Vec<Value>) -> Self {
        Self::Records(items)
    }

    pub fn empty() -> Self {
        Self::Records(Vec::new())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            details: None,
        }
    }

    /// Convert a backend failure into an error envelope, prefixing the operation name.
    pub fn from_adapter_error(operation: &str, err: &AdapterError) -> Self {
        Self::Error {
            message: format!("{operation} failed: {err}"),
            details: err.details().map(str::to_string),
        }
    }

    pub fn status(&self) -> EnvelopeStatus {
        match self {
            Self::Record(_) => EnvelopeStatus::Success,
            Self::Records(items) if items.is_empty() => EnvelopeStatus::Empty,
            Self::Records(_) => EnvelopeStatus::Records,
            Self::Error { .. } => EnvelopeStatus::Error,
            Self::NoneRelevant { .. } => EnvelopeStatus::NoneRelevant,
            Self::ConfirmationRequired { .. } => EnvelopeStatus::ConfirmationRequired,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The diagnostic message of an error envelope.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// JSON form handed to the model runtime and returned over HTTP/MCP.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Record(map) => {
                let mut out = Map::with_capacity(map.len() + 1);
                out.insert("status".into(), Value::String("success".into()));
                for (key, value) in map {
                    if key != "status" {
                        out.insert(key.clone(), value.clone());
                    }
                }
                Value::Object(out)
            }
            Self::Records(items) => Value::Array(items.clone()),
            Self::Error { message, details } => {
                let mut out = json!({ "status": "error", "message": message });
                if let Some(details) = details {
                    out["details"] = Value::String(details.clone());
                }
                out
            }
            Self::NoneRelevant {
                message,
                candidates,
            } => json!({
                "status": "none_relevant",
                "message": message,
                "candidates": candidates,
            }),
            Self::ConfirmationRequired {
                operation,
                arguments,
            } => json!({
                "status": "confirmation_required",
                "message": format!("{operation} changes infrastructure state and needs operator confirmation"),
                "operation": operation,
                "arguments": arguments,
            }),
        }
    }

    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_distinguishes_empty_from_error() {
        assert_eq!(Envelope::empty().status(), EnvelopeStatus::Empty);
        assert_eq!(
            Envelope::records(vec![json!("default")]).status(),
            EnvelopeStatus::Records
        );
        assert_eq!(Envelope::error("boom").status(), EnvelopeStatus::Error);
        assert_eq!(Envelope::success("done").status(), EnvelopeStatus::Success);
    }

    #[test]
    fn record_serialises_with_success_discriminator() {
        let env = Envelope::record(json!({"source": "pod/web", "status": "ignored"}));
        let value = env.to_value();
        assert_eq!(value["status"], "success");
        assert_eq!(value["source"], "pod/web");
    }

    #[test]
    fn non_object_payload_is_wrapped() {
        let env = Envelope::record(json!([1, 2]));
        assert_eq!(env.to_value()["result"], json!([1, 2]));
    }

    #[test]
    fn error_serialises_message_and_details() {
        let env = Envelope::Error {
            message: "helm failed".into(),
            details: Some("release not found".into()),
        };
        let value = env.to_value();
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "helm failed");
        assert_eq!(value["details"], "release not found");
        assert_eq!(env.error_message(), Some("helm failed"));
    }

    #[test]
    fn adapter_error_keeps_operation_name() {
        let err = AdapterError::Http {
            status: 503,
            body: "unavailable".into(),
        };
        let env = Envelope::from_adapter_error("get_pods", &err);
        assert!(env.is_error());
        let message = env.error_message().unwrap();
        assert!(message.starts_with("get_pods failed:"));
        assert!(message.contains("503"));
    }

    #[test]
    fn none_relevant_is_neither_error_nor_empty() {
        let env = Envelope::NoneRelevant {
            message: "no match".into(),
            candidates: 2,
        };
        assert!(!env.is_error());
        assert_eq!(env.status(), EnvelopeStatus::NoneRelevant);
        assert_eq!(env.to_value()["candidates"], 2);
    }
}
