//! Test utilities for unit testing the ensurer, planner and reconcilers
//!
//! Typed builders for cloud models, custom resources and provider configs.

#[cfg(test)]
use crate::ensurer::{POOL_LABEL, ROLE_LABEL, ROLE_WORKER_PLACEMENT_GROUP};
#[cfg(test)]
use hcloud_apis::hcloud::{CloudProfileConfig, MachineImageVersion, MachineImages, Region, RegionImageMapping};
#[cfg(test)]
use hcloud_apis::*;
#[cfg(test)]
use hcloud_client::{
    Architecture, Image, ImageType, Location, MockHcloudClient, Network, NetworkSubnet, NetworkSubnetType,
    PlacementGroup, PlacementGroupType,
};
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
#[cfg(test)]
use serde_json::json;
#[cfg(test)]
use std::collections::BTreeMap;

/// OpenSSH ed25519 public key with fingerprint
/// `0f:a2:0a:d7:38:3e:65:45:08:6b:63:84:1c:ff:dc:ba`
#[cfg(test)]
pub const TEST_PUBLIC_KEY: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAABAgMEBQYHCAkKCwwNDg8QERITFBUWFxgZGhscHR4f test@example";

/// Mock client knowing a single location
#[cfg(test)]
pub fn mock_client_with_location(name: &str, network_zone: &str) -> MockHcloudClient {
    let client = MockHcloudClient::new();
    client.add_location(Location {
        id: 1,
        name: name.to_string(),
        description: String::new(),
        country: "DE".to_string(),
        city: String::new(),
        network_zone: network_zone.to_string(),
    });
    client
}

/// Network with one cloud subnet covering its whole range
#[cfg(test)]
pub fn test_network(id: i64, name: &str, cidr: &str) -> Network {
    Network {
        id,
        name: name.to_string(),
        ip_range: cidr.to_string(),
        subnets: vec![NetworkSubnet {
            subnet_type: NetworkSubnetType::Cloud,
            ip_range: cidr.to_string(),
            network_zone: "eu-central".to_string(),
            gateway: None,
        }],
        labels: BTreeMap::new(),
    }
}

/// Spread placement group labelled for `pool`
#[cfg(test)]
pub fn test_placement_group(id: i64, name: &str, pool: &str) -> PlacementGroup {
    PlacementGroup {
        id,
        name: name.to_string(),
        group_type: PlacementGroupType::Spread,
        servers: Vec::new(),
        labels: BTreeMap::from([
            (ROLE_LABEL.to_string(), ROLE_WORKER_PLACEMENT_GROUP.to_string()),
            (POOL_LABEL.to_string(), pool.to_string()),
        ]),
    }
}

/// System image from the provider catalogue
#[cfg(test)]
pub fn test_image(id: i64, name: &str, os_flavor: &str, os_version: &str, architecture: Architecture) -> Image {
    Image {
        id,
        image_type: ImageType::System,
        name: Some(name.to_string()),
        description: name.to_string(),
        os_flavor: os_flavor.to_string(),
        os_version: Some(os_version.to_string()),
        architecture,
        deprecated: None,
        labels: BTreeMap::new(),
    }
}

/// Pool of `cx22` machines running ubuntu 22.4.0
#[cfg(test)]
pub fn test_pool(name: &str, zones: &[&str], minimum: i32, maximum: i32) -> WorkerPoolSpec {
    WorkerPoolSpec {
        name: name.to_string(),
        machine_type: "cx22".to_string(),
        machine_image: MachineImageRef {
            name: "ubuntu".to_string(),
            version: "22.4.0".to_string(),
        },
        minimum,
        maximum,
        max_surge: IntOrPercent::Int(1),
        max_unavailable: IntOrPercent::Int(0),
        zones: zones.iter().map(|z| z.to_string()).collect(),
        ..Default::default()
    }
}

/// Pool requesting a placement group of `group_type`
#[cfg(test)]
pub fn test_pool_with_placement_group(name: &str, zones: &[&str], group_type: &str) -> WorkerPoolSpec {
    let mut pool = test_pool(name, zones, 1, 2);
    pool.provider_config = Some(json!({
        "apiVersion": "hcloud.provider.extensions.gardener.cloud/v1alpha1",
        "kind": "WorkerConfig",
        "placementGroupType": group_type,
    }));
    pool
}

/// Cloud profile offering ubuntu 22.4.0, with an override for `hel1`
#[cfg(test)]
pub fn test_cloud_profile() -> CloudProfileConfig {
    CloudProfileConfig {
        regions: vec![Region {
            name: "hel1".to_string(),
            zones: vec!["hel1-dc2".to_string()],
        }],
        machine_images: vec![MachineImages {
            name: "ubuntu".to_string(),
            versions: vec![MachineImageVersion {
                version: "22.4.0".to_string(),
                image_name: Some("ubuntu-22.04".to_string()),
                architecture: "amd64".to_string(),
                regions: vec![RegionImageMapping {
                    name: "hel1".to_string(),
                    image_name: "ubuntu-22.04-hel1".to_string(),
                }],
            }],
        }],
        machine_type_options: Vec::new(),
        default_storage_fs_type: "ext4".to_string(),
    }
}

/// Wire form of [`test_cloud_profile`]
#[cfg(test)]
pub fn test_cloud_profile_document() -> serde_json::Value {
    json!({
        "apiVersion": "hcloud.provider.extensions.gardener.cloud/v1alpha1",
        "kind": "CloudProfileConfig",
        "regions": [{"name": "hel1", "zones": ["hel1-dc2"]}],
        "machineImages": [{
            "name": "ubuntu",
            "versions": [{
                "version": "22.4.0",
                "imageName": "ubuntu-22.04",
                "regions": [{"name": "hel1", "imageName": "ubuntu-22.04-hel1"}]
            }]
        }]
    })
}

/// `InfrastructureConfig` document with the given worker CIDR
#[cfg(test)]
pub fn infrastructure_config_document(workers: &str) -> serde_json::Value {
    json!({
        "apiVersion": "hcloud.provider.extensions.gardener.cloud/v1alpha1",
        "kind": "InfrastructureConfig",
        "networks": {"workers": workers}
    })
}

#[cfg(test)]
fn object_meta(name: &str, namespace: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        generation: Some(1),
        ..Default::default()
    }
}

/// Infrastructure `name` in `namespace` with the given worker CIDR
#[cfg(test)]
pub fn test_infrastructure(name: &str, namespace: &str, workers: &str) -> Infrastructure {
    Infrastructure {
        metadata: object_meta(name, Some(namespace)),
        spec: InfrastructureSpec {
            provider_type: "hcloud".to_string(),
            region: "hel1".to_string(),
            secret_ref: SecretReference::new("cloudprovider"),
            provider_config: Some(infrastructure_config_document(workers)),
            ssh_public_key: Some(TEST_PUBLIC_KEY.to_string()),
        },
        status: None,
    }
}

/// Worker `name` in `namespace` with `pools`
#[cfg(test)]
pub fn test_worker(name: &str, namespace: &str, pools: Vec<WorkerPoolSpec>) -> Worker {
    Worker {
        metadata: object_meta(name, Some(namespace)),
        spec: WorkerSpec {
            provider_type: "hcloud".to_string(),
            region: "hel1".to_string(),
            secret_ref: SecretReference::new("cloudprovider"),
            infrastructure_provider_status: None,
            ssh_public_key: Some(TEST_PUBLIC_KEY.to_string()),
            pools,
        },
        status: None,
    }
}

/// Cluster named after `namespace` with the given node CIDR
#[cfg(test)]
pub fn test_cluster(namespace: &str, nodes: Option<&str>) -> Cluster {
    Cluster {
        metadata: object_meta(namespace, None),
        spec: ClusterSpec {
            shoot: ShootInfo {
                name: "a".to_string(),
                region: "hel1".to_string(),
                kubernetes_version: "1.30.2".to_string(),
                networking: ShootNetworking {
                    nodes: nodes.map(str::to_string),
                    ..Default::default()
                },
            },
            cloud_profile: CloudProfileInfo {
                name: "hcloud".to_string(),
                provider_config: Some(test_cloud_profile_document()),
            },
        },
    }
}
