//! HcloudClient trait for mocking
//!
//! This trait abstracts the hcloud client so the ensurer and planner can be
//! unit tested against an in-memory implementation.

use crate::error::HcloudError;
use crate::models::*;

/// Trait for hcloud API client operations
///
/// Lookups that address a single resource return `Ok(None)` when the
/// resource does not exist. All futures are `Send` so they can run on
/// Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait HcloudClientTrait: Send + Sync {
    /// Get the API endpoint
    fn endpoint(&self) -> &str;

    // Networks
    async fn get_network_by_name(&self, name: &str) -> Result<Option<Network>, HcloudError>;
    async fn get_network(&self, id: i64) -> Result<Option<Network>, HcloudError>;
    async fn create_network(&self, request: CreateNetworkRequest) -> Result<Network, HcloudError>;
    async fn delete_network(&self, id: i64) -> Result<(), HcloudError>;

    // SSH keys
    async fn get_ssh_key_by_fingerprint(&self, fingerprint: &str) -> Result<Option<SshKey>, HcloudError>;
    async fn get_ssh_key(&self, id: i64) -> Result<Option<SshKey>, HcloudError>;
    async fn create_ssh_key(&self, request: CreateSshKeyRequest) -> Result<SshKey, HcloudError>;
    async fn delete_ssh_key(&self, id: i64) -> Result<(), HcloudError>;

    // Placement groups
    async fn get_placement_group_by_name(&self, name: &str) -> Result<Option<PlacementGroup>, HcloudError>;
    async fn get_placement_group(&self, id: i64) -> Result<Option<PlacementGroup>, HcloudError>;
    async fn create_placement_group(&self, request: CreatePlacementGroupRequest) -> Result<PlacementGroup, HcloudError>;
    async fn delete_placement_group(&self, id: i64) -> Result<(), HcloudError>;

    // Catalogue
    async fn list_images(&self, opts: &ImageListOpts) -> Result<Vec<Image>, HcloudError>;
    async fn get_datacenter(&self, name: &str) -> Result<Option<Datacenter>, HcloudError>;
    async fn list_server_types(&self) -> Result<Vec<ServerType>, HcloudError>;
    async fn get_location(&self, name: &str) -> Result<Option<Location>, HcloudError>;
}
