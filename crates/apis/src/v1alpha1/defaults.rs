//! Schema defaulting applied after decoding

use super::types::*;
use crate::hcloud::{DEFAULT_ARCHITECTURE, DEFAULT_STORAGE_FS_TYPE};

/// A wire document with defaults for omitted fields
pub trait Defaulted {
    fn set_defaults(&mut self);
}

impl Defaulted for CloudProfileConfig {
    fn set_defaults(&mut self) {
        if self.default_storage_fs_type.as_deref().is_none_or(str::is_empty) {
            self.default_storage_fs_type = Some(DEFAULT_STORAGE_FS_TYPE.to_string());
        }
        for version in self.machine_images.iter_mut().flat_map(|i| i.versions.iter_mut()) {
            if version.architecture.as_deref().is_none_or(str::is_empty) {
                version.architecture = Some(DEFAULT_ARCHITECTURE.to_string());
            }
        }
    }
}

impl Defaulted for InfrastructureConfig {
    fn set_defaults(&mut self) {}
}

impl Defaulted for InfrastructureStatus {
    fn set_defaults(&mut self) {}
}

impl Defaulted for WorkerConfig {
    fn set_defaults(&mut self) {}
}

impl Defaulted for WorkerStatus {
    fn set_defaults(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_profile_defaults() {
        let mut profile = CloudProfileConfig {
            machine_images: vec![MachineImages {
                name: "ubuntu".to_string(),
                versions: vec![
                    MachineImageVersion {
                        version: "22.04".to_string(),
                        ..Default::default()
                    },
                    MachineImageVersion {
                        version: "22.04".to_string(),
                        architecture: Some("arm64".to_string()),
                        ..Default::default()
                    },
                ],
            }],
            ..Default::default()
        };
        profile.set_defaults();

        assert_eq!(profile.default_storage_fs_type.as_deref(), Some("ext4"));
        let archs: Vec<_> = profile.machine_images[0]
            .versions
            .iter()
            .map(|v| v.architecture.as_deref().unwrap())
            .collect();
        assert_eq!(archs, vec!["amd64", "arm64"]);
    }

    #[test]
    fn test_explicit_fs_type_is_kept() {
        let mut profile = CloudProfileConfig {
            default_storage_fs_type: Some("xfs".to_string()),
            ..Default::default()
        };
        profile.set_defaults();
        assert_eq!(profile.default_storage_fs_type.as_deref(), Some("xfs"));
    }
}
