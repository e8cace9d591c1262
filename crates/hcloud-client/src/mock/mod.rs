//! Mock HcloudClient for unit testing
//!
//! Stores resources in memory so the ensurer and planner can be exercised
//! without a live hcloud project. Besides the trait operations it records
//! how often each operation was called, can fail chosen operations and can
//! slow every call down (for cancellation tests).
//!
//! The mock is organized by resource kind:
//! - `network.rs` - networks
//! - `ssh_key.rs` - SSH keys
//! - `placement_group.rs` - placement groups
//! - `catalogue.rs` - images, datacenters, server types, locations

mod catalogue;
mod network;
mod placement_group;
mod ssh_key;

use crate::error::HcloudError;
use crate::hcloud_trait::HcloudClientTrait;
use crate::models::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock HcloudClient for testing
#[derive(Clone, Default)]
pub struct MockHcloudClient {
    pub(crate) networks: Arc<Mutex<HashMap<i64, Network>>>,
    pub(crate) ssh_keys: Arc<Mutex<HashMap<i64, SshKey>>>,
    pub(crate) placement_groups: Arc<Mutex<HashMap<i64, PlacementGroup>>>,
    pub(crate) images: Arc<Mutex<Vec<Image>>>,
    pub(crate) locations: Arc<Mutex<Vec<Location>>>,
    pub(crate) datacenters: Arc<Mutex<Vec<Datacenter>>>,
    pub(crate) server_types: Arc<Mutex<Vec<ServerType>>>,
    // Operation name -> number of calls
    calls: Arc<Mutex<HashMap<&'static str, usize>>>,
    // Operation name -> (error code, message) returned instead of running it
    failures: Arc<Mutex<HashMap<&'static str, (String, String)>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    next_id: Arc<Mutex<i64>>,
}

impl MockHcloudClient {
    /// Create an empty mock client
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(Mutex::new(1)),
            ..Default::default()
        }
    }

    /// Add a network to the mock store (for test setup)
    pub fn add_network(&self, network: Network) {
        self.networks.lock().unwrap().insert(network.id, network);
    }

    /// Add an SSH key to the mock store (for test setup)
    pub fn add_ssh_key(&self, key: SshKey) {
        self.ssh_keys.lock().unwrap().insert(key.id, key);
    }

    /// Add a placement group to the mock store (for test setup)
    pub fn add_placement_group(&self, group: PlacementGroup) {
        self.placement_groups.lock().unwrap().insert(group.id, group);
    }

    /// Add an image to the catalogue (for test setup)
    pub fn add_image(&self, image: Image) {
        self.images.lock().unwrap().push(image);
    }

    /// Add a location (for test setup)
    pub fn add_location(&self, location: Location) {
        self.locations.lock().unwrap().push(location);
    }

    /// Add a datacenter (for test setup)
    pub fn add_datacenter(&self, datacenter: Datacenter) {
        self.datacenters.lock().unwrap().push(datacenter);
    }

    /// Add a server type (for test setup)
    pub fn add_server_type(&self, server_type: ServerType) {
        self.server_types.lock().unwrap().push(server_type);
    }

    /// Make every future call of `operation` fail with an API error
    pub fn fail_operation(&self, operation: &'static str, code: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(operation, (code.to_string(), message.to_string()));
    }

    /// Stop failing `operation`
    pub fn clear_failure(&self, operation: &'static str) {
        self.failures.lock().unwrap().remove(operation);
    }

    /// Delay every call by `delay` before it runs
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Number of times `operation` was called
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
    }

    /// Snapshot of stored networks
    pub fn networks(&self) -> Vec<Network> {
        self.networks.lock().unwrap().values().cloned().collect()
    }

    /// Snapshot of stored SSH keys
    pub fn ssh_keys(&self) -> Vec<SshKey> {
        self.ssh_keys.lock().unwrap().values().cloned().collect()
    }

    /// Snapshot of stored placement groups
    pub fn placement_groups(&self) -> Vec<PlacementGroup> {
        self.placement_groups.lock().unwrap().values().cloned().collect()
    }

    /// Record a call, apply the configured delay and injected failure.
    pub(crate) async fn enter(&self, operation: &'static str) -> Result<(), HcloudError> {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failures.lock().unwrap().get(operation).cloned();
        match failure {
            Some((code, message)) => Err(HcloudError::Api { code, message }),
            None => Ok(()),
        }
    }

    /// Generate next ID
    pub(crate) fn next_id(&self) -> i64 {
        let mut id = self.next_id.lock().unwrap();
        let current = *id;
        *id += 1;
        current
    }
}

#[async_trait::async_trait]
impl HcloudClientTrait for MockHcloudClient {
    fn endpoint(&self) -> &str {
        "mock://hcloud"
    }

    async fn get_network_by_name(&self, name: &str) -> Result<Option<Network>, HcloudError> {
        network::get_network_by_name(self, name).await
    }

    async fn get_network(&self, id: i64) -> Result<Option<Network>, HcloudError> {
        network::get_network(self, id).await
    }

    async fn create_network(&self, request: CreateNetworkRequest) -> Result<Network, HcloudError> {
        network::create_network(self, request).await
    }

    async fn delete_network(&self, id: i64) -> Result<(), HcloudError> {
        network::delete_network(self, id).await
    }

    async fn get_ssh_key_by_fingerprint(&self, fingerprint: &str) -> Result<Option<SshKey>, HcloudError> {
        ssh_key::get_ssh_key_by_fingerprint(self, fingerprint).await
    }

    async fn get_ssh_key(&self, id: i64) -> Result<Option<SshKey>, HcloudError> {
        ssh_key::get_ssh_key(self, id).await
    }

    async fn create_ssh_key(&self, request: CreateSshKeyRequest) -> Result<SshKey, HcloudError> {
        ssh_key::create_ssh_key(self, request).await
    }

    async fn delete_ssh_key(&self, id: i64) -> Result<(), HcloudError> {
        ssh_key::delete_ssh_key(self, id).await
    }

    async fn get_placement_group_by_name(&self, name: &str) -> Result<Option<PlacementGroup>, HcloudError> {
        placement_group::get_placement_group_by_name(self, name).await
    }

    async fn get_placement_group(&self, id: i64) -> Result<Option<PlacementGroup>, HcloudError> {
        placement_group::get_placement_group(self, id).await
    }

    async fn create_placement_group(&self, request: CreatePlacementGroupRequest) -> Result<PlacementGroup, HcloudError> {
        placement_group::create_placement_group(self, request).await
    }

    async fn delete_placement_group(&self, id: i64) -> Result<(), HcloudError> {
        placement_group::delete_placement_group(self, id).await
    }

    async fn list_images(&self, opts: &ImageListOpts) -> Result<Vec<Image>, HcloudError> {
        catalogue::list_images(self, opts).await
    }

    async fn get_datacenter(&self, name: &str) -> Result<Option<Datacenter>, HcloudError> {
        catalogue::get_datacenter(self, name).await
    }

    async fn list_server_types(&self) -> Result<Vec<ServerType>, HcloudError> {
        catalogue::list_server_types(self).await
    }

    async fn get_location(&self, name: &str) -> Result<Option<Location>, HcloudError> {
        catalogue::get_location(self, name).await
    }
}
