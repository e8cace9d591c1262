//! Unit tests for the machine topology planner

#[cfg(test)]
mod tests {
    use crate::context::ReconcileContext;
    use crate::error::ControllerError;
    use crate::planner::image::*;
    use crate::planner::*;
    use crate::test_utils::*;
    use hcloud_apis::hcloud::{InfrastructureStatus, MachineImage, MachineTypeOptions, WorkerStatus};
    use hcloud_apis::{IntOrPercent, SecretReference, UpdateStrategy};
    use hcloud_client::{Architecture, MockHcloudClient};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    const NAMESPACE: &str = "shoot--dev--a";

    fn infra_status() -> InfrastructureStatus {
        InfrastructureStatus {
            ssh_fingerprint: "aa:bb".to_string(),
            network_id: Some("17".to_string()),
            ..Default::default()
        }
    }

    fn resolved(pools: &[hcloud_apis::WorkerPoolSpec]) -> ResolvedImages {
        pools
            .iter()
            .map(|p| (ImageKey::of_pool(p), "ubuntu-22.04".to_string()))
            .collect()
    }

    fn plan(pools: &[hcloud_apis::WorkerPoolSpec], infra: &InfrastructureStatus) -> Result<WorkerPlan, ControllerError> {
        let profile = test_cloud_profile();
        let placement_groups = BTreeMap::new();
        let secret = SecretReference::new("cloudprovider");
        let input = PlanInput {
            namespace: NAMESPACE,
            pools,
            cloud_profile: &profile,
            infrastructure_status: infra,
            placement_group_ids: &placement_groups,
            ssh_public_key: None,
            secret_ref: &secret,
            kubernetes_version: "1.30.2",
        };
        plan_workers(&input, &resolved(pools))
    }

    #[test]
    fn test_fan_out_over_two_zones() {
        let pools = vec![test_pool("pool-a", &["hel1-dc2", "fsn1-dc14"], 2, 4)];
        let plan = plan(&pools, &infra_status()).unwrap();

        assert_eq!(plan.machine_deployments.len(), 2);
        assert_eq!(plan.machine_classes.len(), 2);

        let min: i32 = plan.machine_deployments.iter().map(|d| d.minimum).sum();
        let max: i32 = plan.machine_deployments.iter().map(|d| d.maximum).sum();
        assert_eq!((min, max), (2, 4));

        let first = &plan.machine_deployments[0];
        assert_eq!(first.name, "shoot--dev--a-pool-a-hel1-dc2");
        assert_eq!(first.zone, "hel1-dc2");
        assert!(first.class_name.starts_with("shoot--dev--a-pool-a-hel1-dc2-"));
        assert_eq!(first.class_name.len(), first.name.len() + 6);
        assert_eq!(first.labels.get(POOL_NAME_LABEL).map(String::as_str), Some("pool-a"));
        assert_eq!(first.strategy, UpdateStrategy::AutoRollingUpdate);
        assert_eq!(plan.machine_deployments[1].zone, "fsn1-dc14");
    }

    #[test]
    fn test_surge_split_and_percent_passthrough() {
        let mut pool = test_pool("pool-a", &["z1", "z2", "z3"], 3, 6);
        pool.max_surge = IntOrPercent::Int(2);
        pool.max_unavailable = IntOrPercent::Percent("10%".to_string());
        let plan = plan(&[pool], &infra_status()).unwrap();

        let surges: Vec<_> = plan.machine_deployments.iter().map(|d| d.max_surge.clone()).collect();
        assert_eq!(surges, vec![IntOrPercent::Int(1), IntOrPercent::Int(1), IntOrPercent::Int(1)]);
        assert!(plan
            .machine_deployments
            .iter()
            .all(|d| d.max_unavailable == IntOrPercent::Percent("10%".to_string())));
    }

    #[test]
    fn test_surge_smaller_than_zone_count() {
        let pool = test_pool("pool-a", &["z1", "z2", "z3"], 3, 6);
        let plan = plan(&[pool], &infra_status()).unwrap();

        // maxSurge 1 / maxUnavailable 0: every zone still needs room to roll
        for deployment in &plan.machine_deployments {
            assert_eq!(deployment.max_surge, IntOrPercent::Int(1), "zone {}", deployment.zone);
            assert_eq!(deployment.max_unavailable, IntOrPercent::Int(0));
        }
        let minimum: i32 = plan.machine_deployments.iter().map(|d| d.minimum).sum();
        let maximum: i32 = plan.machine_deployments.iter().map(|d| d.maximum).sum();
        assert_eq!((minimum, maximum), (3, 6));
    }

    #[test]
    fn test_machine_class_contents() {
        let mut infra = infra_status();
        infra.floating_pool_name = Some("fip".to_string());
        let pools = vec![test_pool("pool-a", &["hel1-dc2"], 1, 1)];
        let plan = plan(&pools, &infra).unwrap();

        let class = &plan.machine_classes[0];
        assert_eq!(class.name, plan.machine_deployments[0].class_name);
        assert_eq!(class.image_name, "ubuntu-22.04");
        assert_eq!(class.ssh_fingerprint, "aa:bb");
        assert_eq!(class.machine_type, "cx22");
        assert_eq!(class.network_name.as_deref(), Some(NAMESPACE));
        assert_eq!(class.floating_pool_name.as_deref(), Some("fip"));
        assert_eq!(class.placement_group_id, None);
        assert_eq!(class.cluster_name, NAMESPACE);
        assert_eq!(class.secret_ref.name, "cloudprovider");
        assert!(class.tags.contains_key("kubernetes.io-cluster-shoot--dev--a"));

        assert_eq!(
            plan.machine_images,
            vec![MachineImage {
                name: "ubuntu".to_string(),
                version: "22.4.0".to_string(),
                architecture: Some("amd64".to_string()),
                image: Some("ubuntu-22.04".to_string()),
            }]
        );
    }

    #[test]
    fn test_placement_group_and_extra_config() {
        let mut profile = test_cloud_profile();
        profile.machine_type_options.push(MachineTypeOptions {
            name: "cx22".to_string(),
            extra_config: BTreeMap::from([("userDataFormat".to_string(), json!("cloud-init"))]),
        });
        let pools = vec![test_pool("pool-a", &["hel1-dc2"], 1, 1)];
        let placement_groups = BTreeMap::from([("shoot--dev--a-pool-a".to_string(), "77".to_string())]);
        let secret = SecretReference::new("cloudprovider");
        let infra = InfrastructureStatus::default();
        let input = PlanInput {
            namespace: NAMESPACE,
            pools: &pools,
            cloud_profile: &profile,
            infrastructure_status: &infra,
            placement_group_ids: &placement_groups,
            ssh_public_key: Some(TEST_PUBLIC_KEY),
            secret_ref: &secret,
            kubernetes_version: "1.30.2",
        };

        let plan = plan_workers(&input, &resolved(&pools)).unwrap();
        let class = &plan.machine_classes[0];
        assert_eq!(class.placement_group_id.as_deref(), Some("77"));
        assert_eq!(class.network_name, None);
        assert_eq!(
            class.extra_config.as_ref().and_then(|c| c.get("userDataFormat")),
            Some(&json!("cloud-init"))
        );
        // Fingerprint derived from the Worker's public key
        assert_eq!(class.ssh_fingerprint, "0f:a2:0a:d7:38:3e:65:45:08:6b:63:84:1c:ff:dc:ba");
    }

    #[test]
    fn test_no_pools() {
        assert!(matches!(plan(&[], &infra_status()), Err(ControllerError::NoWorkerPools)));
    }

    #[test]
    fn test_missing_fingerprint() {
        let pools = vec![test_pool("pool-a", &["z1"], 1, 1)];
        let err = plan(&pools, &InfrastructureStatus::default()).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }

    #[test]
    fn test_unresolved_image_fails_whole_plan() {
        let pools = vec![test_pool("pool-a", &["z1"], 1, 1)];
        let profile = test_cloud_profile();
        let placement_groups = BTreeMap::new();
        let secret = SecretReference::new("cloudprovider");
        let infra = infra_status();
        let input = PlanInput {
            namespace: NAMESPACE,
            pools: &pools,
            cloud_profile: &profile,
            infrastructure_status: &infra,
            placement_group_ids: &placement_groups,
            ssh_public_key: None,
            secret_ref: &secret,
            kubernetes_version: "1.30.2",
        };
        let err = plan_workers(&input, &ResolvedImages::new()).unwrap_err();
        assert!(matches!(err, ControllerError::MachineImageNotFound { .. }));
    }

    #[test]
    fn test_image_from_profile_region_override() {
        let profile = test_cloud_profile();
        let key = ImageKey::of_pool(&test_pool("p", &["z"], 1, 1));
        assert_eq!(
            resolve_from_config(&key, &profile, &WorkerStatus::default(), "fsn1").as_deref(),
            Some("ubuntu-22.04")
        );
        assert_eq!(
            resolve_from_config(&key, &profile, &WorkerStatus::default(), "hel1").as_deref(),
            Some("ubuntu-22.04-hel1")
        );
    }

    #[test]
    fn test_image_from_worker_status() {
        let mut pool = test_pool("p", &["z"], 1, 1);
        pool.machine_image.version = "20.4.0".to_string();
        let status = WorkerStatus {
            machine_images: vec![MachineImage {
                name: "ubuntu".to_string(),
                version: "20.4.0".to_string(),
                architecture: None,
                image: Some("ubuntu-20.04".to_string()),
            }],
            ..Default::default()
        };
        let key = ImageKey::of_pool(&pool);
        assert_eq!(
            resolve_from_config(&key, &test_cloud_profile(), &status, "fsn1").as_deref(),
            Some("ubuntu-20.04")
        );
    }

    #[test]
    fn test_image_from_catalogue_prefers_current() {
        let mut deprecated = test_image(1, "ubuntu-24.04-old", "ubuntu", "24.04", Architecture::X86);
        deprecated.deprecated = Some("2024-01-01T00:00:00Z".to_string());
        let catalogue = vec![
            deprecated,
            test_image(2, "ubuntu-24.04", "ubuntu", "24.04", Architecture::X86),
            test_image(3, "ubuntu-24.04-arm", "ubuntu", "24.04", Architecture::Arm),
        ];
        let key = ImageKey {
            name: "ubuntu".to_string(),
            version: "24.04".to_string(),
            architecture: "amd64".to_string(),
        };
        assert_eq!(resolve_from_catalogue(&key, &catalogue).as_deref(), Some("ubuntu-24.04"));

        let arm = ImageKey {
            architecture: "arm64".to_string(),
            ..key
        };
        assert_eq!(resolve_from_catalogue(&arm, &catalogue).as_deref(), Some("ubuntu-24.04-arm"));
    }

    #[tokio::test]
    async fn test_catalogue_fetched_only_when_needed() {
        let client = MockHcloudClient::new();
        client.add_image(test_image(5, "debian-12", "debian", "12", Architecture::X86));
        let ctx = ReconcileContext::new(&CancellationToken::new(), Duration::from_secs(5));

        let in_profile = vec![test_pool("a", &["z"], 1, 1)];
        resolve_machine_images(&in_profile, &test_cloud_profile(), &WorkerStatus::default(), "fsn1", &client, &ctx)
            .await
            .unwrap();
        assert_eq!(client.call_count("list_images"), 0);

        let mut debian_a = test_pool("a", &["z"], 1, 1);
        debian_a.machine_image.name = "debian".to_string();
        debian_a.machine_image.version = "12".to_string();
        let mut debian_b = debian_a.clone();
        debian_b.name = "b".to_string();
        let mut debian_c = debian_a.clone();
        debian_c.name = "c".to_string();
        debian_c.machine_image.version = "13".to_string();

        let err = resolve_machine_images(
            &[debian_a.clone(), debian_b.clone(), debian_c],
            &test_cloud_profile(),
            &WorkerStatus::default(),
            "fsn1",
            &client,
            &ctx,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ControllerError::MachineImageNotFound { ref name, ref version } if name == "debian" && version == "13"
        ));
        assert_eq!(client.call_count("list_images"), 1);

        let images = resolve_machine_images(
            &[debian_a.clone(), debian_b],
            &test_cloud_profile(),
            &WorkerStatus::default(),
            "fsn1",
            &client,
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(images.get(&ImageKey::of_pool(&debian_a)).map(String::as_str), Some("debian-12"));
    }

    #[tokio::test]
    async fn test_missing_image_everywhere() {
        let client = MockHcloudClient::new();
        let ctx = ReconcileContext::new(&CancellationToken::new(), Duration::from_secs(5));
        let mut pool = test_pool("a", &["z1", "z2"], 2, 4);
        pool.machine_image.name = "test".to_string();
        pool.machine_image.version = "1.0".to_string();

        let err = resolve_machine_images(
            std::slice::from_ref(&pool),
            &test_cloud_profile(),
            &WorkerStatus::default(),
            "fsn1",
            &client,
            &ctx,
        )
        .await
        .unwrap_err();

        match err {
            ControllerError::MachineImageNotFound { name, version } => {
                assert_eq!(name, "test");
                assert_eq!(version, "1.0");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
