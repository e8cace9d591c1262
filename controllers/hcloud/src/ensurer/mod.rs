//! Cloud Resource Ensurer
//!
//! Idempotent convergence of the cloud resources a cluster needs before
//! machines can be created:
//! - `network`: the private worker network
//! - `ssh_key`: the SSH key machines are provisioned with
//! - `placement_group`: per-pool spread placement groups
//!
//! Every `ensure_*` looks the resource up, creates it if absent and returns
//! its identifier. Every `ensure_*_deleted` treats an empty identifier and a
//! resource that is already gone as success. API failures abort the attempt;
//! retrying is left to the requeue.

mod network;
mod placement_group;
mod ssh_key;

pub use placement_group::placement_group_name;

use crate::context::ReconcileContext;
use hcloud_client::HcloudClientTrait;
use std::collections::BTreeMap;

/// Label carrying the role of a resource created by the extension
pub const ROLE_LABEL: &str = "hcloud.provider.extensions.gardener.cloud/role";
/// Label carrying the pool a placement group belongs to
pub const POOL_LABEL: &str = "pool";

pub const ROLE_WORKERS_NETWORK: &str = "workers-network-v1";
pub const ROLE_INFRASTRUCTURE_SSH: &str = "infrastructure-ssh-v1";
pub const ROLE_WORKER_PLACEMENT_GROUP: &str = "worker-placement-group-v1";

/// Ensures cloud resources through one client within one reconciliation.
pub struct Ensurer<'a> {
    client: &'a dyn HcloudClientTrait,
    ctx: &'a ReconcileContext,
}

impl std::fmt::Debug for Ensurer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ensurer").field("endpoint", &self.client.endpoint()).finish()
    }
}

impl<'a> Ensurer<'a> {
    pub fn new(client: &'a dyn HcloudClientTrait, ctx: &'a ReconcileContext) -> Self {
        Self { client, ctx }
    }
}

fn role_labels(role: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(ROLE_LABEL.to_string(), role.to_string())])
}

fn parse_id(kind: &'static str, id: &str) -> Result<i64, crate::error::ControllerError> {
    id.parse::<i64>().map_err(|_| {
        crate::error::ControllerError::InvalidConfig(format!("recorded {} id {:?} is not numeric", kind, id))
    })
}
