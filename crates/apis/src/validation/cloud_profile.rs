//! CloudProfileConfig validation

use super::field::{ErrorList, FieldError, FieldPath};
use super::worker::SUPPORTED_ARCHITECTURES;
use crate::hcloud::CloudProfileConfig;
use std::collections::HashSet;

/// Validate the provider section of a cloud profile.
pub fn validate_cloud_profile_config(config: &CloudProfileConfig) -> ErrorList {
    let mut errs = ErrorList::new();

    let images_path = FieldPath::new("machineImages");
    if config.machine_images.is_empty() {
        errs.push(FieldError::required(&images_path, "must provide at least one machine image"));
    }
    for (i, image) in config.machine_images.iter().enumerate() {
        let idx = images_path.index(i);
        if image.name.is_empty() {
            errs.push(FieldError::required(&idx.child("name"), "must provide a name"));
        }
        if image.versions.is_empty() {
            errs.push(FieldError::required(
                &idx.child("versions"),
                format!("must provide at least one version for machine image {:?}", image.name),
            ));
        }
        for (j, version) in image.versions.iter().enumerate() {
            let vdx = idx.child("versions").index(j);
            if version.version.is_empty() {
                errs.push(FieldError::required(&vdx.child("version"), "must provide a version"));
            }
            let has_global = version.image_name.as_deref().is_some_and(|n| !n.is_empty());
            if !has_global && version.regions.is_empty() {
                errs.push(FieldError::required(
                    &vdx.child("imageName"),
                    "must provide an image name or per-region image names",
                ));
            }
            if !SUPPORTED_ARCHITECTURES.contains(&version.architecture.as_str()) {
                errs.push(FieldError::invalid(
                    &vdx.child("architecture"),
                    &version.architecture,
                    r#"supported values: "amd64", "arm64""#,
                ));
            }
            for (k, region) in version.regions.iter().enumerate() {
                let rdx = vdx.child("regions").index(k);
                if region.name.is_empty() {
                    errs.push(FieldError::required(&rdx.child("name"), "must provide a region name"));
                }
                if region.image_name.is_empty() {
                    errs.push(FieldError::required(&rdx.child("imageName"), "must provide an image name"));
                }
            }
        }
    }

    let mut regions = HashSet::new();
    for (i, region) in config.regions.iter().enumerate() {
        let name_path = FieldPath::new("regions").index(i).child("name");
        if region.name.is_empty() {
            errs.push(FieldError::required(&name_path, "must provide a region name"));
        } else if !regions.insert(region.name.as_str()) {
            errs.push(FieldError::duplicate(&name_path, &region.name));
        }
    }

    let mut types = HashSet::new();
    for (i, options) in config.machine_type_options.iter().enumerate() {
        let name_path = FieldPath::new("machineTypeOptions").index(i).child("name");
        if options.name.is_empty() {
            errs.push(FieldError::required(&name_path, "must provide a machine type name"));
        } else if !types.insert(options.name.as_str()) {
            errs.push(FieldError::duplicate(&name_path, &options.name));
        }
    }

    errs
}
