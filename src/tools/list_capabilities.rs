use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::coordinator::Coordinator;

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListCapabilitiesParams {}

/// Every registered worker with its routing hint and operations.
pub fn describe(coordinator: &Coordinator) -> Value {
    let workers: Vec<Value> = coordinator
        .workers()
        .iter()
        .map(|worker| {
            let operations: Vec<Value> = worker
                .tools()
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name(),
                        "description": tool.spec().description,
                        "effect": tool.effect(),
                        "parameters": tool.parameters(),
                    })
                })
                .collect();
            json!({
                "name": worker.name(),
                "agent": worker.agent(),
                "routing_hint": worker.routing_hint(),
                "operations": operations,
            })
        })
        .collect();

    let total = workers.len();
    json!({ "workers": workers, "total": total })
}
