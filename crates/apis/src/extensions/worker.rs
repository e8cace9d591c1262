//! Worker CRD
//!
//! Declares the machine pools of a cluster. Each pool is fanned out across
//! its zones into machine deployments; the result is summarised in
//! `status.machineDeployments` and the provider-specific state (machine
//! images in use, placement groups) in `status.providerStatus`.

use super::{raw_extension_schema, IntOrPercent, LastOperation};
use crate::references::SecretReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Worker",
    namespaced,
    status = "WorkerResourceStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSpec {
    /// Provider type, always `hcloud` for resources handled here
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Region (hcloud location name)
    pub region: String,

    /// Secret holding the hcloud API token
    pub secret_ref: SecretReference,

    /// `providerStatus` of the cluster's Infrastructure (`InfrastructureStatus`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub infrastructure_provider_status: Option<serde_json::Value>,

    /// OpenSSH public key, used when the infrastructure status carries no fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,

    /// Machine pools, in declaration order
    #[serde(default)]
    pub pools: Vec<WorkerPoolSpec>,
}

/// One machine pool of a Worker
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPoolSpec {
    pub name: String,

    /// hcloud server type (e.g. `cx22`)
    pub machine_type: String,

    pub machine_image: MachineImageRef,

    /// CPU architecture (`amd64` or `arm64`), defaults to `amd64`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,

    pub minimum: i32,

    pub maximum: i32,

    #[serde(default)]
    pub max_surge: IntOrPercent,

    #[serde(default)]
    pub max_unavailable: IntOrPercent,

    /// Zones, in order. The order is significant and may only be appended to.
    pub zones: Vec<String>,

    /// Provider-specific pool configuration (`WorkerConfig`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    #[serde(default)]
    pub taints: Vec<Taint>,

    /// Kubernetes version of the pool, defaults to the cluster's version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_strategy: Option<UpdateStrategy>,
}

/// Machine image requested by a pool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub struct MachineImageRef {
    pub name: String,
    pub version: String,
}

/// How machines of a pool are updated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Replace machines with new ones
    #[default]
    AutoRollingUpdate,
    /// Update machines in place, automatically
    AutoInPlaceUpdate,
    /// Update machines in place once an operator labels them
    ManualInPlaceUpdate,
}

/// Node taint applied to a pool's nodes
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Taint {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub effect: TaintEffect,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum TaintEffect {
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResourceStatus {
    /// Provider-specific status (`WorkerStatus`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_status: Option<serde_json::Value>,

    /// Machine deployments generated for the pools
    #[serde(default)]
    pub machine_deployments: Vec<MachineDeploymentRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Summary of a generated machine deployment
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MachineDeploymentRef {
    pub name: String,
    pub minimum: i32,
    pub maximum: i32,
}
