//! Infrastructure CRD
//!
//! Declares the network and SSH access of a cluster. The provider-specific
//! part lives in `providerConfig` (an `InfrastructureConfig` document) and
//! the observed state is reported in `status.providerStatus` (an
//! `InfrastructureStatus` document).

use super::{raw_extension_schema, LastOperation};
use crate::references::SecretReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Infrastructure",
    namespaced,
    status = "InfrastructureResourceStatus",
    shortname = "infra"
)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSpec {
    /// Provider type, always `hcloud` for resources handled here
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Region (hcloud location name, e.g. `fsn1`)
    pub region: String,

    /// Secret holding the hcloud API token
    pub secret_ref: SecretReference,

    /// Provider-specific configuration (`InfrastructureConfig`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,

    /// OpenSSH public key to register for the cluster's machines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureResourceStatus {
    /// Provider-specific status (`InfrastructureStatus`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_status: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
