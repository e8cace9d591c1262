//! hcloud API models
//!
//! These models match the JSON documents of the hcloud REST API (`/v1`).
//! Only the fields the provider extension reads or writes are modelled;
//! unknown fields are ignored on deserialization.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pagination block in the `meta` object of list responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    #[serde(default)]
    pub previous_page: Option<u64>,
    #[serde(default)]
    pub next_page: Option<u64>,
    #[serde(default)]
    pub last_page: Option<u64>,
    #[serde(default)]
    pub total_entries: Option<u64>,
}

/// `meta` object of list responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Error document returned by the API on non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Body of an [`ErrorResponse`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

// Networks

/// Network model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: i64,
    pub name: String,
    pub ip_range: String,
    #[serde(default)]
    pub subnets: Vec<NetworkSubnet>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Subnet of a [`Network`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSubnet {
    #[serde(rename = "type")]
    pub subnet_type: NetworkSubnetType,
    pub ip_range: String,
    pub network_zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

/// Subnet type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkSubnetType {
    Cloud,
    Server,
    Vswitch,
}

/// Request body for `POST /networks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNetworkRequest {
    pub name: String,
    pub ip_range: String,
    pub subnets: Vec<NetworkSubnet>,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct NetworkEnvelope {
    pub network: Network,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct NetworkList {
    pub networks: Vec<Network>,
    #[serde(default)]
    pub meta: Meta,
}

// SSH keys

/// SSH key model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKey {
    pub id: i64,
    pub name: String,
    pub fingerprint: String,
    pub public_key: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Request body for `POST /ssh_keys`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSshKeyRequest {
    pub name: String,
    pub public_key: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SshKeyEnvelope {
    pub ssh_key: SshKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SshKeyList {
    pub ssh_keys: Vec<SshKey>,
    #[serde(default)]
    pub meta: Meta,
}

// Placement groups

/// Placement group model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGroup {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: PlacementGroupType,
    #[serde(default)]
    pub servers: Vec<i64>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Placement group type. `spread` is the only type the API offers today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementGroupType {
    Spread,
}

impl PlacementGroupType {
    /// Parse the wire name of a placement group type.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "spread" => Some(Self::Spread),
            _ => None,
        }
    }
}

/// Request body for `POST /placement_groups`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePlacementGroupRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: PlacementGroupType,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PlacementGroupEnvelope {
    pub placement_group: PlacementGroup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PlacementGroupList {
    pub placement_groups: Vec<PlacementGroup>,
    #[serde(default)]
    pub meta: Meta,
}

// Images

/// Image model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    #[serde(rename = "type")]
    pub image_type: ImageType,
    /// Unique name; `null` for snapshots and backups
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub os_flavor: String,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(default)]
    pub deprecated: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Image type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    System,
    App,
    Snapshot,
    Backup,
    Temporary,
}

/// CPU architecture as named by the API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[default]
    X86,
    Arm,
}

impl Architecture {
    /// Map a Kubernetes-style architecture name (`amd64`, `arm64`) to the API name.
    #[must_use]
    pub fn from_kubernetes(arch: &str) -> Option<Self> {
        match arch {
            "amd64" | "x86" | "x86_64" => Some(Self::X86),
            "arm64" | "arm" | "aarch64" => Some(Self::Arm),
            _ => None,
        }
    }

    /// API name of this architecture
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::Arm => "arm",
        }
    }
}

/// Filter options for `GET /images`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageListOpts {
    pub image_type: Option<ImageType>,
    pub architecture: Option<Architecture>,
    pub include_deprecated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ImageList {
    pub images: Vec<Image>,
    #[serde(default)]
    pub meta: Meta,
}

// Locations, datacenters and server types

/// Location model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    pub network_zone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LocationList {
    pub locations: Vec<Location>,
    #[serde(default)]
    pub meta: Meta,
}

/// Datacenter model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datacenter {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: Location,
    #[serde(default)]
    pub server_types: DatacenterServerTypes,
}

/// Server types a [`Datacenter`] supports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatacenterServerTypes {
    #[serde(default)]
    pub supported: Vec<i64>,
    #[serde(default)]
    pub available: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DatacenterList {
    pub datacenters: Vec<Datacenter>,
    #[serde(default)]
    pub meta: Meta,
}

/// Server type model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cores: u32,
    pub memory: f64,
    pub disk: u64,
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(default)]
    pub deprecated: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ServerTypeList {
    pub server_types: Vec<ServerType>,
    #[serde(default)]
    pub meta: Meta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_with_null_name_deserializes() {
        let image: Image = serde_json::from_value(serde_json::json!({
            "id": 42,
            "type": "snapshot",
            "name": null,
            "description": "nightly",
            "os_flavor": "ubuntu",
            "os_version": null,
            "architecture": "arm",
            "deprecated": null,
            "labels": {}
        }))
        .unwrap();
        assert_eq!(image.image_type, ImageType::Snapshot);
        assert!(image.name.is_none());
        assert_eq!(image.architecture, Architecture::Arm);
    }

    #[test]
    fn test_subnet_type_serializes_lowercase() {
        let subnet = NetworkSubnet {
            subnet_type: NetworkSubnetType::Cloud,
            ip_range: "10.250.0.0/16".to_string(),
            network_zone: "eu-central".to_string(),
            gateway: None,
        };
        let value = serde_json::to_value(&subnet).unwrap();
        assert_eq!(value["type"], "cloud");
        assert!(value.get("gateway").is_none());
    }

    #[test]
    fn test_architecture_mapping() {
        assert_eq!(Architecture::from_kubernetes("amd64"), Some(Architecture::X86));
        assert_eq!(Architecture::from_kubernetes("arm64"), Some(Architecture::Arm));
        assert_eq!(Architecture::from_kubernetes("s390x"), None);
    }
}
