//! Extension custom resources
//!
//! The resources the provider extension is driven by, all in the
//! `extensions.gardener.cloud/v1alpha1` group:
//! - Infrastructure (namespaced): network and SSH access of a cluster
//! - Worker (namespaced): machine pools of a cluster
//! - Cluster (cluster-scoped): the owning shoot and its cloud profile

pub mod cluster;
pub mod infrastructure;
pub mod worker;

pub use cluster::*;
pub use infrastructure::*;
pub use worker::*;

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// API group of the extension resources
pub const GROUP: &str = "extensions.gardener.cloud";

/// Schema for embedded provider documents (`providerConfig`,
/// `providerStatus`): any object, validated by the codec instead of the
/// API server.
pub(crate) fn raw_extension_schema(_: &mut SchemaGenerator) -> Schema {
    schemars::json_schema!({
        "type": "object",
        "nullable": true,
        "x-kubernetes-preserve-unknown-fields": true
    })
}

/// Kind of the last operation performed on a resource
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum LastOperationType {
    Create,
    Reconcile,
    Delete,
}

/// Outcome of the last operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum LastOperationState {
    Processing,
    Succeeded,
    /// Failed, will be retried
    Error,
    /// Failed, needs a spec change
    Failed,
}

/// Last operation performed on a resource, as reported in its status
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastOperation {
    #[serde(rename = "type")]
    pub operation_type: LastOperationType,
    pub state: LastOperationState,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub progress: i32,
    pub last_update_time: chrono::DateTime<chrono::Utc>,
}

/// An absolute count or a percentage string such as `"25%"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntOrPercent {
    Int(i32),
    Percent(String),
}

impl Default for IntOrPercent {
    fn default() -> Self {
        Self::Int(0)
    }
}

impl IntOrPercent {
    /// Percentage value of a `"<n>%"` string; `None` for integers and
    /// malformed strings.
    pub fn percent(&self) -> Option<u32> {
        match self {
            Self::Int(_) => None,
            Self::Percent(s) => s.strip_suffix('%').and_then(|n| n.parse().ok()),
        }
    }
}

impl JsonSchema for IntOrPercent {
    fn schema_name() -> Cow<'static, str> {
        "IntOrPercent".into()
    }

    fn inline_schema() -> bool {
        true
    }

    fn json_schema(_: &mut SchemaGenerator) -> Schema {
        schemars::json_schema!({
            "x-kubernetes-int-or-string": true
        })
    }
}

impl std::fmt::Display for IntOrPercent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Percent(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_or_percent_deserializes_both_forms() {
        let int: IntOrPercent = serde_json::from_value(serde_json::json!(3)).unwrap();
        let pct: IntOrPercent = serde_json::from_value(serde_json::json!("25%")).unwrap();
        assert_eq!(int, IntOrPercent::Int(3));
        assert_eq!(pct.percent(), Some(25));
        assert_eq!(IntOrPercent::Percent("x%".to_string()).percent(), None);
    }

    #[test]
    fn test_last_operation_wire_shape() {
        let op = LastOperation {
            operation_type: LastOperationType::Reconcile,
            state: LastOperationState::Error,
            description: "boom".to_string(),
            progress: 0,
            last_update_time: chrono::DateTime::from_timestamp(0, 0).unwrap(),
        };
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["type"], "Reconcile");
        assert_eq!(value["state"], "Error");
        assert!(value.get("lastUpdateTime").is_some());
    }
}
