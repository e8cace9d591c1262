//! InfrastructureConfig validation

use super::cidr::{parse_cidr, validate_cidr_is_canonical, validate_subset};
use super::field::{ErrorList, FieldError, FieldPath};
use crate::hcloud::InfrastructureConfig;

/// Validate an InfrastructureConfig against the cluster's node CIDR, if known.
pub fn validate_infrastructure_config(config: &InfrastructureConfig, nodes_cidr: Option<&str>) -> ErrorList {
    let mut errs = ErrorList::new();
    let workers_path = FieldPath::new("networks").child("workers");
    let workers = config.networks.workers.as_str();

    if workers.is_empty() {
        errs.push(FieldError::required(
            &workers_path,
            "must specify the network range for the worker network",
        ));
        return errs;
    }

    // Unparseable CIDRs skip the canonical and subset checks
    if let Err(e) = parse_cidr(&workers_path, workers) {
        errs.push(e);
        return errs;
    }

    errs.extend(validate_cidr_is_canonical(&workers_path, workers));

    if let Some(nodes) = nodes_cidr.filter(|n| !n.is_empty()) {
        let nodes_path = FieldPath::new("networking").child("nodes");
        match parse_cidr(&nodes_path, nodes) {
            Ok(_) => errs.extend(validate_subset(&workers_path, workers, nodes)),
            Err(e) => errs.push(e),
        }
    }

    errs
}

/// Validate a change of an InfrastructureConfig. The network layout may not
/// change once set.
pub fn validate_infrastructure_config_update(old: &InfrastructureConfig, new: &InfrastructureConfig) -> ErrorList {
    let mut errs = ErrorList::new();
    if !old.networks.workers.is_empty() && old.networks != new.networks {
        errs.push(FieldError::invalid(
            &FieldPath::new("networks"),
            &new.networks.workers,
            "field is immutable",
        ));
    }
    errs
}
