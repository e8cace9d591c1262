//! Machine image resolution
//!
//! A pool's machine image resolves, in order, through the cloud profile,
//! the images recorded in the Worker status and finally the provider's
//! image catalogue. The catalogue is only fetched when a pool is left
//! unresolved by the first two.

use crate::context::ReconcileContext;
use crate::error::ControllerError;
use hcloud_apis::hcloud::helper::{find_image_in_cloud_profile, find_machine_image};
use hcloud_apis::hcloud::{CloudProfileConfig, WorkerStatus, DEFAULT_ARCHITECTURE};
use hcloud_apis::WorkerPoolSpec;
use hcloud_client::{Architecture, HcloudClientTrait, Image, ImageListOpts, ImageType};
use std::collections::BTreeMap;
use tracing::debug;

/// Identity of a requested machine image
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageKey {
    pub name: String,
    pub version: String,
    pub architecture: String,
}

impl ImageKey {
    pub fn of_pool(pool: &WorkerPoolSpec) -> Self {
        Self {
            name: pool.machine_image.name.clone(),
            version: pool.machine_image.version.clone(),
            architecture: pool.architecture.clone().unwrap_or_else(|| DEFAULT_ARCHITECTURE.to_string()),
        }
    }
}

/// Resolved provider image name per requested image
pub type ResolvedImages = BTreeMap<ImageKey, String>;

/// Resolve without the catalogue.
pub fn resolve_from_config(
    key: &ImageKey,
    profile: &CloudProfileConfig,
    status: &WorkerStatus,
    region: &str,
) -> Option<String> {
    find_image_in_cloud_profile(profile, &key.name, &key.version, &key.architecture, region)
        .map(str::to_string)
        .or_else(|| {
            find_machine_image(&status.machine_images, &key.name, &key.version, &key.architecture)
                .and_then(|image| image.image.clone())
        })
}

/// Find a system image whose OS flavor/version and architecture match.
/// Non-deprecated images win over deprecated ones.
pub fn resolve_from_catalogue(key: &ImageKey, catalogue: &[Image]) -> Option<String> {
    let architecture = Architecture::from_kubernetes(&key.architecture)?;
    let mut candidates: Vec<&Image> = catalogue
        .iter()
        .filter(|image| {
            image.image_type == ImageType::System
                && image.os_flavor == key.name
                && image.os_version.as_deref() == Some(key.version.as_str())
                && image.architecture == architecture
                && image.name.is_some()
        })
        .collect();
    candidates.sort_by_key(|image| (image.deprecated.is_some(), image.id));
    candidates.first().and_then(|image| image.name.clone())
}

/// Resolve the images of all pools, fetching the catalogue at most once.
pub async fn resolve_machine_images(
    pools: &[WorkerPoolSpec],
    profile: &CloudProfileConfig,
    status: &WorkerStatus,
    region: &str,
    client: &dyn HcloudClientTrait,
    ctx: &ReconcileContext,
) -> Result<ResolvedImages, ControllerError> {
    let mut resolved = ResolvedImages::new();
    let mut catalogue: Option<Vec<Image>> = None;

    for pool in pools {
        let key = ImageKey::of_pool(pool);
        if resolved.contains_key(&key) {
            continue;
        }

        if let Some(image) = resolve_from_config(&key, profile, status, region) {
            resolved.insert(key, image);
            continue;
        }

        if catalogue.is_none() {
            debug!(image = %key.name, version = %key.version, "image not in cloud profile, listing catalogue");
            let opts = ImageListOpts {
                image_type: Some(ImageType::System),
                architecture: None,
                include_deprecated: true,
            };
            catalogue = Some(ctx.call("image", &key.name, client.list_images(&opts)).await?);
        }

        let image = catalogue
            .as_deref()
            .and_then(|images| resolve_from_catalogue(&key, images))
            .ok_or_else(|| ControllerError::MachineImageNotFound {
                name: key.name.clone(),
                version: key.version.clone(),
            })?;
        resolved.insert(key, image);
    }

    Ok(resolved)
}
