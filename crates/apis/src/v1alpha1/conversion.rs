//! Field-by-field conversion between wire and working types

use super::types as wire;
use super::Versioned;
use crate::hcloud;
use crate::hcloud::DEFAULT_ARCHITECTURE;

fn stamped<T: Versioned + Default>() -> T {
    let mut doc = T::default();
    doc.set_type_meta();
    doc
}

impl From<wire::InfrastructureConfig> for hcloud::InfrastructureConfig {
    fn from(w: wire::InfrastructureConfig) -> Self {
        Self {
            networks: hcloud::Networks {
                workers: w.networks.map(|n| n.workers).unwrap_or_default(),
            },
            floating_pool_name: w.floating_pool_name,
        }
    }
}

impl From<&hcloud::InfrastructureConfig> for wire::InfrastructureConfig {
    fn from(c: &hcloud::InfrastructureConfig) -> Self {
        Self {
            networks: (!c.networks.workers.is_empty()).then(|| wire::Networks {
                workers: c.networks.workers.clone(),
            }),
            floating_pool_name: c.floating_pool_name.clone(),
            ..stamped()
        }
    }
}

impl From<wire::InfrastructureStatus> for hcloud::InfrastructureStatus {
    fn from(w: wire::InfrastructureStatus) -> Self {
        Self {
            ssh_fingerprint: w.ssh_fingerprint,
            network_id: w.network_id.filter(|id| !id.is_empty()),
            floating_pool_name: w.floating_pool_name.filter(|n| !n.is_empty()),
            placement_group_ids: w.placement_group_ids,
        }
    }
}

impl From<&hcloud::InfrastructureStatus> for wire::InfrastructureStatus {
    fn from(s: &hcloud::InfrastructureStatus) -> Self {
        Self {
            ssh_fingerprint: s.ssh_fingerprint.clone(),
            network_id: s.network_id.clone(),
            floating_pool_name: s.floating_pool_name.clone(),
            placement_group_ids: s.placement_group_ids.clone(),
            ..stamped()
        }
    }
}

impl From<wire::WorkerConfig> for hcloud::WorkerConfig {
    fn from(w: wire::WorkerConfig) -> Self {
        Self {
            placement_group_type: w.placement_group_type.filter(|t| !t.is_empty()),
        }
    }
}

impl From<&hcloud::WorkerConfig> for wire::WorkerConfig {
    fn from(c: &hcloud::WorkerConfig) -> Self {
        Self {
            placement_group_type: c.placement_group_type.clone(),
            ..stamped()
        }
    }
}

impl From<wire::MachineImage> for hcloud::MachineImage {
    fn from(w: wire::MachineImage) -> Self {
        Self {
            name: w.name,
            version: w.version,
            architecture: w.architecture,
            image: w.image,
        }
    }
}

impl From<&hcloud::MachineImage> for wire::MachineImage {
    fn from(i: &hcloud::MachineImage) -> Self {
        Self {
            name: i.name.clone(),
            version: i.version.clone(),
            architecture: i.architecture.clone(),
            image: i.image.clone(),
        }
    }
}

impl From<wire::WorkerStatus> for hcloud::WorkerStatus {
    fn from(w: wire::WorkerStatus) -> Self {
        Self {
            machine_images: w.machine_images.into_iter().map(Into::into).collect(),
            placement_group_ids: w.placement_group_ids,
        }
    }
}

impl From<&hcloud::WorkerStatus> for wire::WorkerStatus {
    fn from(s: &hcloud::WorkerStatus) -> Self {
        Self {
            machine_images: s.machine_images.iter().map(Into::into).collect(),
            placement_group_ids: s.placement_group_ids.clone(),
            ..stamped()
        }
    }
}

impl From<wire::CloudProfileConfig> for hcloud::CloudProfileConfig {
    fn from(w: wire::CloudProfileConfig) -> Self {
        Self {
            regions: w
                .regions
                .into_iter()
                .map(|r| hcloud::Region {
                    name: r.name,
                    zones: r.zones,
                })
                .collect(),
            machine_images: w
                .machine_images
                .into_iter()
                .map(|i| hcloud::MachineImages {
                    name: i.name,
                    versions: i
                        .versions
                        .into_iter()
                        .map(|v| hcloud::MachineImageVersion {
                            version: v.version,
                            image_name: v.image_name,
                            architecture: v
                                .architecture
                                .unwrap_or_else(|| DEFAULT_ARCHITECTURE.to_string()),
                            regions: v
                                .regions
                                .into_iter()
                                .map(|r| hcloud::RegionImageMapping {
                                    name: r.name,
                                    image_name: r.image_name,
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
            machine_type_options: w
                .machine_type_options
                .into_iter()
                .map(|o| hcloud::MachineTypeOptions {
                    name: o.name,
                    extra_config: o.extra_config,
                })
                .collect(),
            default_storage_fs_type: w.default_storage_fs_type.unwrap_or_default(),
        }
    }
}

impl From<&hcloud::CloudProfileConfig> for wire::CloudProfileConfig {
    fn from(c: &hcloud::CloudProfileConfig) -> Self {
        Self {
            regions: c
                .regions
                .iter()
                .map(|r| wire::Region {
                    name: r.name.clone(),
                    zones: r.zones.clone(),
                })
                .collect(),
            machine_images: c
                .machine_images
                .iter()
                .map(|i| wire::MachineImages {
                    name: i.name.clone(),
                    versions: i
                        .versions
                        .iter()
                        .map(|v| wire::MachineImageVersion {
                            version: v.version.clone(),
                            image_name: v.image_name.clone(),
                            architecture: Some(v.architecture.clone()),
                            regions: v
                                .regions
                                .iter()
                                .map(|r| wire::RegionImageMapping {
                                    name: r.name.clone(),
                                    image_name: r.image_name.clone(),
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
            machine_type_options: c
                .machine_type_options
                .iter()
                .map(|o| wire::MachineTypeOptions {
                    name: o.name.clone(),
                    extra_config: o.extra_config.clone(),
                })
                .collect(),
            default_storage_fs_type: Some(c.default_storage_fs_type.clone())
                .filter(|t| !t.is_empty()),
            ..stamped()
        }
    }
}
