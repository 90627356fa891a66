use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AskParams {
    #[schemars(description = "Natural-language request, e.g. 'list the pods in namespace media'")]
    pub request: String,

    #[schemars(description = "Approve mutating operations for this request (default: false)")]
    #[serde(default)]
    pub confirm: bool,
}
