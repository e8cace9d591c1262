//! Lookups over the working types

use super::*;

/// Image name for `name`/`version`/`architecture` in `region`.
///
/// A region override wins over the version's global image name.
pub fn find_image_in_cloud_profile<'a>(
    profile: &'a CloudProfileConfig,
    name: &str,
    version: &str,
    architecture: &str,
    region: &str,
) -> Option<&'a str> {
    let image_version = profile
        .machine_images
        .iter()
        .filter(|images| images.name == name)
        .flat_map(|images| images.versions.iter())
        .find(|v| v.version == version && v.architecture == architecture)?;

    image_version
        .regions
        .iter()
        .find(|r| r.name == region)
        .map(|r| r.image_name.as_str())
        .or(image_version.image_name.as_deref())
}

/// Machine image recorded in a Worker status for `name`/`version`/`architecture`.
///
/// Entries recorded without an architecture match the default one.
pub fn find_machine_image<'a>(
    images: &'a [MachineImage],
    name: &str,
    version: &str,
    architecture: &str,
) -> Option<&'a MachineImage> {
    images.iter().find(|image| {
        image.name == name
            && image.version == version
            && image.architecture.as_deref().unwrap_or(DEFAULT_ARCHITECTURE) == architecture
    })
}

/// Extra configuration for a server type, if the profile declares any
pub fn find_machine_type_options<'a>(
    profile: &'a CloudProfileConfig,
    machine_type: &str,
) -> Option<&'a MachineTypeOptions> {
    profile.machine_type_options.iter().find(|o| o.name == machine_type)
}

/// Zones of `region` as declared in the profile
pub fn zones_of_region<'a>(profile: &'a CloudProfileConfig, region: &str) -> Option<&'a [String]> {
    profile
        .regions
        .iter()
        .find(|r| r.name == region)
        .map(|r| r.zones.as_slice())
}

/// Append `image` unless an entry with the same name, version and
/// architecture is already recorded.
pub fn append_machine_image(images: &mut Vec<MachineImage>, image: MachineImage) {
    let arch = image.architecture.as_deref().unwrap_or(DEFAULT_ARCHITECTURE).to_string();
    match images
        .iter_mut()
        .find(|i| i.name == image.name && i.version == image.version
            && i.architecture.as_deref().unwrap_or(DEFAULT_ARCHITECTURE) == arch)
    {
        Some(existing) => {
            if existing.image.is_none() {
                existing.image = image.image;
            }
        }
        None => images.push(image),
    }
}
