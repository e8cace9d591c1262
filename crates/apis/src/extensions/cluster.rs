//! Cluster CRD
//!
//! Cluster-scoped bundle named after the shoot's namespace. It carries the
//! parts of the owning shoot and its cloud profile that the extension reads.

use super::raw_extension_schema;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Cluster"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub shoot: ShootInfo,
    pub cloud_profile: CloudProfileInfo,
}

/// The owning shoot
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShootInfo {
    pub name: String,

    pub region: String,

    /// Kubernetes version of the control plane
    #[serde(default)]
    pub kubernetes_version: String,

    #[serde(default)]
    pub networking: ShootNetworking,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShootNetworking {
    /// CIDR of the node network; the worker subnet must lie within it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
}

/// The shoot's cloud profile
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileInfo {
    pub name: String,

    /// Provider-specific profile (`CloudProfileConfig`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,
}
