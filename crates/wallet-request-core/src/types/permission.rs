use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// EIP-2255 permission as reported by the permissions collaborator. Passed
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPermissionResponse {
    pub invoker: String,

    #[serde(rename = "parentCapability")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_capability: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caveats: Option<Vec<Map<String, Value>>>,
}
