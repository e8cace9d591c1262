//! hcloud API client
//!
//! Implements the subset of the hcloud REST API (`/v1`) the provider
//! extension needs: networks, SSH keys, placement groups and the read-only
//! catalogue (images, datacenters, server types, locations).

use crate::common::query::{query_first, query_resources};
use crate::common::HttpClient;
use crate::error::HcloudError;
use crate::hcloud_trait::HcloudClientTrait;
use crate::models::*;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Public hcloud API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.hetzner.cloud/v1";

/// hcloud API client
#[derive(Clone)]
pub struct HcloudClient {
    http: HttpClient,
}

impl HcloudClient {
    /// Create a client for the public endpoint
    ///
    /// # Arguments
    /// * `token` - API token of the hcloud project
    pub fn new(token: String) -> Result<Self, HcloudError> {
        Self::with_endpoint(DEFAULT_ENDPOINT.to_string(), token)
    }

    /// Create a client for a custom endpoint (e.g. a test server)
    pub fn with_endpoint(endpoint: String, token: String) -> Result<Self, HcloudError> {
        if token.is_empty() {
            return Err(HcloudError::InvalidRequest("API token must not be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("hcloud-provider-extension/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http: HttpClient::new(client, endpoint, token),
        })
    }

    /// Validate the API token with a lightweight authenticated request.
    ///
    /// # Returns
    /// * `Ok(())` - Token is valid and the API is reachable
    /// * `Err(HcloudError::Authentication)` - Token was rejected
    pub async fn validate_token(&self) -> Result<(), HcloudError> {
        debug!("Validating hcloud token");
        let _: serde_json::Value = self.http.get("/locations?per_page=1").await?;
        debug!("Token validated successfully");
        Ok(())
    }
}

#[async_trait::async_trait]
impl HcloudClientTrait for HcloudClient {
    fn endpoint(&self) -> &str {
        self.http.base_url()
    }

    async fn get_network_by_name(&self, name: &str) -> Result<Option<Network>, HcloudError> {
        query_first::<Network, NetworkList>(&self.http, "networks", &[("name", name)]).await
    }

    async fn get_network(&self, id: i64) -> Result<Option<Network>, HcloudError> {
        let envelope: Option<NetworkEnvelope> =
            self.http.get_optional(&format!("/networks/{}", id)).await?;
        Ok(envelope.map(|e| e.network))
    }

    async fn create_network(&self, request: CreateNetworkRequest) -> Result<Network, HcloudError> {
        debug!(name = %request.name, ip_range = %request.ip_range, "Creating network");
        let body = serde_json::to_value(&request)?;
        let envelope: NetworkEnvelope = self.http.post("/networks", &body).await?;
        Ok(envelope.network)
    }

    async fn delete_network(&self, id: i64) -> Result<(), HcloudError> {
        debug!(id, "Deleting network");
        self.http.delete(&format!("/networks/{}", id)).await
    }

    async fn get_ssh_key_by_fingerprint(&self, fingerprint: &str) -> Result<Option<SshKey>, HcloudError> {
        query_first::<SshKey, SshKeyList>(&self.http, "ssh_keys", &[("fingerprint", fingerprint)]).await
    }

    async fn get_ssh_key(&self, id: i64) -> Result<Option<SshKey>, HcloudError> {
        let envelope: Option<SshKeyEnvelope> =
            self.http.get_optional(&format!("/ssh_keys/{}", id)).await?;
        Ok(envelope.map(|e| e.ssh_key))
    }

    async fn create_ssh_key(&self, request: CreateSshKeyRequest) -> Result<SshKey, HcloudError> {
        debug!(name = %request.name, "Creating SSH key");
        let body = serde_json::to_value(&request)?;
        let envelope: SshKeyEnvelope = self.http.post("/ssh_keys", &body).await?;
        Ok(envelope.ssh_key)
    }

    async fn delete_ssh_key(&self, id: i64) -> Result<(), HcloudError> {
        debug!(id, "Deleting SSH key");
        self.http.delete(&format!("/ssh_keys/{}", id)).await
    }

    async fn get_placement_group_by_name(&self, name: &str) -> Result<Option<PlacementGroup>, HcloudError> {
        query_first::<PlacementGroup, PlacementGroupList>(&self.http, "placement_groups", &[("name", name)]).await
    }

    async fn get_placement_group(&self, id: i64) -> Result<Option<PlacementGroup>, HcloudError> {
        let envelope: Option<PlacementGroupEnvelope> =
            self.http.get_optional(&format!("/placement_groups/{}", id)).await?;
        Ok(envelope.map(|e| e.placement_group))
    }

    async fn create_placement_group(&self, request: CreatePlacementGroupRequest) -> Result<PlacementGroup, HcloudError> {
        debug!(name = %request.name, "Creating placement group");
        let body = serde_json::to_value(&request)?;
        let envelope: PlacementGroupEnvelope = self.http.post("/placement_groups", &body).await?;
        Ok(envelope.placement_group)
    }

    async fn delete_placement_group(&self, id: i64) -> Result<(), HcloudError> {
        debug!(id, "Deleting placement group");
        self.http.delete(&format!("/placement_groups/{}", id)).await
    }

    async fn list_images(&self, opts: &ImageListOpts) -> Result<Vec<Image>, HcloudError> {
        let mut filters: Vec<(&str, &str)> = Vec::new();
        if let Some(image_type) = opts.image_type {
            filters.push(("type", image_type_name(image_type)));
        }
        if let Some(arch) = opts.architecture {
            filters.push(("architecture", arch.as_str()));
        }
        if opts.include_deprecated {
            filters.push(("include_deprecated", "true"));
        }
        query_resources::<Image, ImageList>(&self.http, "images", &filters).await
    }

    async fn get_datacenter(&self, name: &str) -> Result<Option<Datacenter>, HcloudError> {
        query_first::<Datacenter, DatacenterList>(&self.http, "datacenters", &[("name", name)]).await
    }

    async fn list_server_types(&self) -> Result<Vec<ServerType>, HcloudError> {
        query_resources::<ServerType, ServerTypeList>(&self.http, "server_types", &[]).await
    }

    async fn get_location(&self, name: &str) -> Result<Option<Location>, HcloudError> {
        query_first::<Location, LocationList>(&self.http, "locations", &[("name", name)]).await
    }
}

fn image_type_name(image_type: ImageType) -> &'static str {
    match image_type {
        ImageType::System => "system",
        ImageType::App => "app",
        ImageType::Snapshot => "snapshot",
        ImageType::Backup => "backup",
        ImageType::Temporary => "temporary",
    }
}
