use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct InvokeOperationParams {
    #[schemars(description = "Capability name, e.g. 'kubernetes' or 'memory'")]
    pub worker: String,

    #[schemars(description = "Operation name as listed by list_capabilities")]
    pub operation: String,

    #[schemars(description = "Operation arguments as a JSON object")]
    #[serde(default)]
    pub arguments: Value,
}
