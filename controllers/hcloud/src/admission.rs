//! Admission checks for Infrastructure, Worker and cloud profile documents.
//!
//! These decode the embedded provider documents and run the validation
//! engine over them, including the update rules when the previous object is
//! known. Serving them over HTTP is left to the hosting webhook server.

use crate::error::ControllerError;
use hcloud_apis::codec::{decode_cloud_profile_config, decode_infrastructure_config};
use hcloud_apis::validation::{
    validate_cloud_profile_config, validate_infrastructure_config, validate_infrastructure_config_update,
    validate_workers, validate_workers_update, ErrorList,
};
use hcloud_apis::{Infrastructure, Worker};
use tracing::debug;

/// Validate a created or updated Infrastructure.
///
/// `nodes_cidr` is the shoot's node network, if known. A missing or malformed
/// provider config surfaces as [`ControllerError::Decode`]. An old object
/// whose provider config no longer decodes is treated as a create.
pub fn validate_infrastructure(
    new: &Infrastructure,
    old: Option<&Infrastructure>,
    nodes_cidr: Option<&str>,
) -> Result<(), ControllerError> {
    let config = decode_infrastructure_config(new.spec.provider_config.as_ref())?;

    let mut errs = validate_infrastructure_config(&config, nodes_cidr);
    if let Some(old) = old {
        match decode_infrastructure_config(old.spec.provider_config.as_ref()) {
            Ok(old_config) => errs.extend(validate_infrastructure_config_update(&old_config, &config)),
            Err(e) => debug!(error = %e, "old provider config not decodable, skipping update checks"),
        }
    }
    into_result(errs)
}

/// Validate a created or updated Worker.
pub fn validate_worker(new: &Worker, old: Option<&Worker>) -> Result<(), ControllerError> {
    let mut errs = validate_workers(&new.spec.pools);
    if let Some(old) = old {
        errs.extend(validate_workers_update(&old.spec.pools, &new.spec.pools));
    }
    into_result(errs)
}

/// Validate the provider section of a cloud profile.
pub fn validate_cloud_profile(raw: Option<&serde_json::Value>) -> Result<(), ControllerError> {
    let profile = decode_cloud_profile_config(raw)?;
    into_result(validate_cloud_profile_config(&profile))
}

fn into_result(errs: ErrorList) -> Result<(), ControllerError> {
    errs.into_result().map_err(ControllerError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use hcloud_apis::codec::DecodeError;
    use serde_json::json;

    #[test]
    fn test_infrastructure_create() {
        let infra = test_infrastructure("infra", "shoot--dev--a", "10.250.0.0/16");
        assert!(validate_infrastructure(&infra, None, Some("10.250.0.0/16")).is_ok());

        let infra = test_infrastructure("infra", "shoot--dev--a", "10.250.3.8/24");
        let Err(ControllerError::Validation(errs)) = validate_infrastructure(&infra, None, None) else {
            panic!("expected validation error");
        };
        assert_eq!(errs.len(), 1);
        assert!(errs.to_string().contains("must be valid canonical CIDR"));
    }

    #[test]
    fn test_infrastructure_outside_nodes() {
        let infra = test_infrastructure("infra", "shoot--dev--a", "1.1.1.1/32");
        let err = validate_infrastructure(&infra, None, Some("10.250.0.0/16")).unwrap_err();
        assert!(err.to_string().contains("networks.workers"));
    }

    #[test]
    fn test_infrastructure_network_immutable() {
        let old = test_infrastructure("infra", "shoot--dev--a", "10.250.0.0/16");
        let new = test_infrastructure("infra", "shoot--dev--a", "10.251.0.0/16");
        let err = validate_infrastructure(&new, Some(&old), None).unwrap_err();
        assert!(err.to_string().contains("field is immutable"));

        assert!(validate_infrastructure(&old, Some(&old), None).is_ok());
    }

    #[test]
    fn test_infrastructure_missing_and_malformed_document() {
        let mut infra = test_infrastructure("infra", "shoot--dev--a", "10.250.0.0/16");
        infra.spec.provider_config = None;
        assert!(matches!(
            validate_infrastructure(&infra, None, None),
            Err(ControllerError::Decode(DecodeError::MissingProviderConfig { .. }))
        ));

        infra.spec.provider_config = Some(json!({"apiVersion": "v0", "kind": "InfrastructureConfig"}));
        let err = validate_infrastructure(&infra, None, None).unwrap_err();
        assert!(matches!(err, ControllerError::Decode(ref e) if !matches!(e, DecodeError::MissingProviderConfig { .. })));
        assert!(err.is_terminal());
    }

    #[test]
    fn test_worker_zone_changes() {
        let old = test_worker("worker", "shoot--dev--a", vec![test_pool("pool-a", &["z1", "z2"], 1, 2)]);

        let appended = test_worker("worker", "shoot--dev--a", vec![test_pool("pool-a", &["z1", "z2", "z3"], 1, 2)]);
        assert!(validate_worker(&appended, Some(&old)).is_ok());

        let reordered = test_worker("worker", "shoot--dev--a", vec![test_pool("pool-a", &["z2", "z1"], 1, 2)]);
        assert!(validate_worker(&reordered, Some(&old)).is_err());

        let removed = test_worker("worker", "shoot--dev--a", vec![test_pool("pool-a", &["z1"], 1, 2)]);
        assert!(validate_worker(&removed, Some(&old)).is_err());
    }

    #[test]
    fn test_worker_placement_group_type() {
        let worker = test_worker(
            "worker",
            "shoot--dev--a",
            vec![test_pool_with_placement_group("pool-a", &["z1"], "cluster")],
        );
        let err = validate_worker(&worker, None).unwrap_err();
        assert!(err.to_string().contains("placementGroupType"));
    }

    #[test]
    fn test_cloud_profile() {
        assert!(validate_cloud_profile(Some(&test_cloud_profile_document())).is_ok());
        assert!(matches!(
            validate_cloud_profile(None),
            Err(ControllerError::Decode(DecodeError::MissingProviderConfig { .. }))
        ));
    }
}
