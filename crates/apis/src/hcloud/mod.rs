//! Working representation of the hcloud provider documents
//!
//! These types are what the controllers operate on. They carry no version
//! information; see [`crate::v1alpha1`] for the wire form and
//! [`crate::codec`] for converting between the two.

pub mod helper;

use std::collections::BTreeMap;

/// Default CPU architecture of machine images
pub const DEFAULT_ARCHITECTURE: &str = "amd64";

/// Default filesystem of machine volumes
pub const DEFAULT_STORAGE_FS_TYPE: &str = "ext4";

/// Desired infrastructure of a cluster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfrastructureConfig {
    pub networks: Networks,
    pub floating_pool_name: Option<String>,
}

/// Network layout of a cluster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Networks {
    /// CIDR of the worker subnet; empty means no private network
    pub workers: String,
}

/// Observed infrastructure of a cluster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfrastructureStatus {
    pub ssh_fingerprint: String,
    pub network_id: Option<String>,
    pub floating_pool_name: Option<String>,
    /// Placement group ids by role; an absent key means no group
    pub placement_group_ids: BTreeMap<String, String>,
}

/// Provider-specific configuration of one worker pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Placement group type; the pool gets a placement group iff this is set
    pub placement_group_type: Option<String>,
}

/// Observed state of a Worker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStatus {
    /// Machine images in use, so pools stay reconcilable when an image
    /// leaves the cloud profile
    pub machine_images: Vec<MachineImage>,
    /// Placement group ids keyed by `<namespace>-<poolName>`
    pub placement_group_ids: BTreeMap<String, String>,
}

/// A machine image in use by a pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineImage {
    pub name: String,
    pub version: String,
    pub architecture: Option<String>,
    /// Resolved hcloud image name
    pub image: Option<String>,
}

/// Static provider catalogue of a cloud profile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloudProfileConfig {
    pub regions: Vec<Region>,
    pub machine_images: Vec<MachineImages>,
    pub machine_type_options: Vec<MachineTypeOptions>,
    pub default_storage_fs_type: String,
}

/// A region and its zones, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub zones: Vec<String>,
}

/// All versions of one named machine image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineImages {
    pub name: String,
    pub versions: Vec<MachineImageVersion>,
}

/// One version of a machine image and the hcloud image backing it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineImageVersion {
    pub version: String,
    /// Global hcloud image name
    pub image_name: Option<String>,
    pub architecture: String,
    /// Per-region overrides of `image_name`
    pub regions: Vec<RegionImageMapping>,
}

/// Region-specific image override
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionImageMapping {
    pub name: String,
    pub image_name: String,
}

/// Extra machine-class configuration for a server type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachineTypeOptions {
    pub name: String,
    pub extra_config: BTreeMap<String, serde_json::Value>,
}
