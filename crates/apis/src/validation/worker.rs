//! Worker pool validation

use super::field::{ErrorList, FieldError, FieldPath};
use crate::codec::decode_worker_config;
use crate::extensions::{IntOrPercent, WorkerPoolSpec};
use crate::hcloud::WorkerConfig;
use std::collections::HashSet;

/// CPU architectures machine images may be built for
pub const SUPPORTED_ARCHITECTURES: &[&str] = &["amd64", "arm64"];

const SUPPORTED_PLACEMENT_GROUP_TYPES: &[&str] = &["spread"];

/// Validate the pools of a Worker.
pub fn validate_workers(pools: &[WorkerPoolSpec]) -> ErrorList {
    let mut errs = ErrorList::new();
    let pools_path = FieldPath::new("pools");
    let mut names = HashSet::new();

    for (i, pool) in pools.iter().enumerate() {
        let idx = pools_path.index(i);

        if pool.name.is_empty() {
            errs.push(FieldError::required(&idx.child("name"), "pool name must not be empty"));
        } else if !names.insert(pool.name.as_str()) {
            errs.push(FieldError::duplicate(&idx.child("name"), &pool.name));
        }

        let zones_path = idx.child("zones");
        if pool.zones.is_empty() {
            errs.push(FieldError::required(&zones_path, "at least one zone must be configured"));
        }
        let mut zones = HashSet::new();
        for (j, zone) in pool.zones.iter().enumerate() {
            if !zones.insert(zone.as_str()) {
                errs.push(FieldError::duplicate(&zones_path.index(j), zone));
            }
        }

        if pool.maximum > 0 && pool.minimum < 1 {
            errs.push(FieldError::forbidden(
                &idx.child("minimum"),
                "minimum must be >= 1 if maximum > 0, scale-from-zero is not supported",
            ));
        }
        if pool.minimum > pool.maximum {
            errs.push(FieldError::invalid(
                &idx.child("maximum"),
                pool.maximum,
                "maximum must not be less than minimum",
            ));
        }

        errs.extend(validate_int_or_percent(&idx.child("maxSurge"), &pool.max_surge));
        errs.extend(validate_int_or_percent(&idx.child("maxUnavailable"), &pool.max_unavailable));
        if is_zero(&pool.max_surge) && is_zero(&pool.max_unavailable) {
            errs.push(FieldError::invalid(
                &idx.child("maxUnavailable"),
                &pool.max_unavailable,
                "may not be 0 when maxSurge is 0",
            ));
        }

        if let Some(arch) = &pool.architecture
            && !SUPPORTED_ARCHITECTURES.contains(&arch.as_str())
        {
            errs.push(FieldError::invalid(
                &idx.child("architecture"),
                arch,
                r#"supported values: "amd64", "arm64""#,
            ));
        }

        let config_path = idx.child("providerConfig");
        match decode_worker_config(pool.provider_config.as_ref()) {
            Ok(Some(config)) => errs.extend(validate_worker_config(&config, &config_path)),
            Ok(None) => {}
            Err(e) => errs.push(FieldError::invalid(&config_path, "", e.to_string())),
        }
    }

    errs
}

/// Validate a change of a Worker's pools. Pools are matched by name; the
/// zones of an existing pool may only be appended to.
pub fn validate_workers_update(old_pools: &[WorkerPoolSpec], new_pools: &[WorkerPoolSpec]) -> ErrorList {
    let mut errs = ErrorList::new();
    let pools_path = FieldPath::new("pools");

    for (i, new_pool) in new_pools.iter().enumerate() {
        let Some(old_pool) = old_pools.iter().find(|p| p.name == new_pool.name) else {
            continue;
        };
        if !new_pool.zones.starts_with(&old_pool.zones) {
            errs.push(FieldError::invalid(
                &pools_path.index(i).child("zones"),
                new_pool.zones.join(","),
                "field is immutable",
            ));
        }
    }

    errs
}

/// Validate the provider config of one pool.
pub fn validate_worker_config(config: &WorkerConfig, path: &FieldPath) -> ErrorList {
    let mut errs = ErrorList::new();
    if let Some(group_type) = &config.placement_group_type
        && !SUPPORTED_PLACEMENT_GROUP_TYPES.contains(&group_type.as_str())
    {
        errs.push(FieldError::invalid(
            &path.child("placementGroupType"),
            group_type,
            r#"supported values: "spread""#,
        ));
    }
    errs
}

fn validate_int_or_percent(path: &FieldPath, value: &IntOrPercent) -> ErrorList {
    let mut errs = ErrorList::new();
    match value {
        IntOrPercent::Int(n) if *n < 0 => {
            errs.push(FieldError::invalid(path, n, "must be greater than or equal to 0"));
        }
        IntOrPercent::Percent(s) if value.percent().is_none() => {
            errs.push(FieldError::invalid(path, s, "must be an integer or a percentage (e.g. '5%')"));
        }
        _ => {}
    }
    errs
}

fn is_zero(value: &IntOrPercent) -> bool {
    match value {
        IntOrPercent::Int(n) => *n == 0,
        IntOrPercent::Percent(_) => value.percent() == Some(0),
    }
}
