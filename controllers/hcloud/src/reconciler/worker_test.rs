//! Unit tests for Worker reconciliation

#[cfg(test)]
mod tests {
    use crate::context::ReconcileContext;
    use crate::error::ControllerError;
    use crate::reconciler::worker::*;
    use crate::status::memory::InMemoryStatusStore;
    use crate::status::RetryConfig;
    use crate::test_utils::*;
    use hcloud_apis::hcloud::{CloudProfileConfig, InfrastructureStatus};
    use hcloud_apis::{SecretReference, WorkerPoolSpec};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    const NAMESPACE: &str = "shoot--dev--a";

    fn context() -> ReconcileContext {
        ReconcileContext::new(&CancellationToken::new(), Duration::from_secs(5))
    }

    fn infra_status() -> InfrastructureStatus {
        InfrastructureStatus {
            ssh_fingerprint: "0f:a2:0a:d7:38:3e:65:45:08:6b:63:84:1c:ff:dc:ba".to_string(),
            network_id: Some("42".to_string()),
            ..Default::default()
        }
    }

    fn request<'a>(
        pools: &'a [WorkerPoolSpec],
        profile: &'a CloudProfileConfig,
        infra: &'a InfrastructureStatus,
        secret_ref: &'a SecretReference,
    ) -> WorkerRequest<'a> {
        WorkerRequest {
            namespace: NAMESPACE,
            region: "hel1",
            pools,
            cloud_profile: profile,
            infrastructure_status: infra,
            ssh_public_key: None,
            secret_ref,
            kubernetes_version: "1.30.2",
        }
    }

    #[test]
    fn test_requested_placement_groups() {
        let pools = vec![
            test_pool("plain", &["hel1-dc2"], 1, 2),
            test_pool_with_placement_group("spread", &["hel1-dc2"], "spread"),
        ];
        let requested = requested_placement_groups(&pools).unwrap();
        assert_eq!(requested, BTreeMap::from([("spread".to_string(), "spread".to_string())]));
    }

    #[tokio::test]
    async fn test_plan_is_recorded_in_status() {
        let client = mock_client_with_location("hel1", "eu-central");
        let ctx = context();
        let store = InMemoryStatusStore::default();
        let pools = vec![test_pool("pool-a", &["hel1-dc2"], 1, 3)];
        let (profile, infra, secret_ref) = (test_cloud_profile(), infra_status(), SecretReference::new("cloudprovider"));

        let plan = reconcile_worker_resources(
            &client,
            &ctx,
            &store,
            &RetryConfig::default(),
            &request(&pools, &profile, &infra, &secret_ref),
        )
        .await
        .unwrap();

        assert_eq!(plan.machine_deployments.len(), 1);
        assert_eq!(plan.machine_classes[0].image_name, "ubuntu-22.04-hel1");

        let status = store.status();
        assert_eq!(
            status["machineDeployments"],
            json!([{"name": "shoot--dev--a-pool-a-hel1-dc2", "minimum": 1, "maximum": 3}])
        );
        let images = &status["providerStatus"]["machineImages"];
        assert_eq!(images[0]["name"], "ubuntu");
        assert_eq!(images[0]["version"], "22.4.0");
        assert_eq!(images[0]["image"], "ubuntu-22.04-hel1");
        // Image came from the cloud profile, the catalogue was never listed
        assert_eq!(client.call_count("list_images"), 0);
    }

    #[tokio::test]
    async fn test_placement_group_follows_pool_config() {
        let client = mock_client_with_location("hel1", "eu-central");
        let ctx = context();
        let store = InMemoryStatusStore::default();
        let (profile, infra, secret_ref) = (test_cloud_profile(), infra_status(), SecretReference::new("cloudprovider"));

        let pools = vec![test_pool_with_placement_group("pool-a", &["hel1-dc2"], "spread")];
        let plan = reconcile_worker_resources(
            &client,
            &ctx,
            &store,
            &RetryConfig::default(),
            &request(&pools, &profile, &infra, &secret_ref),
        )
        .await
        .unwrap();

        let groups = client.placement_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "shoot--dev--a-pool-a");
        let id = groups[0].id.to_string();
        assert_eq!(plan.machine_classes[0].placement_group_id.as_deref(), Some(id.as_str()));
        assert_eq!(
            store.provider_status().unwrap()["placementGroupIds"]["shoot--dev--a-pool-a"],
            json!(id)
        );

        // Pool stops asking for a group: it is deleted and dropped from status
        let pools = vec![test_pool("pool-a", &["hel1-dc2"], 1, 2)];
        let plan = reconcile_worker_resources(
            &client,
            &ctx,
            &store,
            &RetryConfig::default(),
            &request(&pools, &profile, &infra, &secret_ref),
        )
        .await
        .unwrap();

        assert!(client.placement_groups().is_empty());
        assert_eq!(plan.machine_classes[0].placement_group_id, None);
        assert!(store.provider_status().unwrap().get("placementGroupIds").is_none());
    }

    #[tokio::test]
    async fn test_no_pools_is_rejected_without_writes() {
        let client = mock_client_with_location("hel1", "eu-central");
        let ctx = context();
        let store = InMemoryStatusStore::default();
        let (profile, infra, secret_ref) = (test_cloud_profile(), infra_status(), SecretReference::new("cloudprovider"));

        let err = reconcile_worker_resources(
            &client,
            &ctx,
            &store,
            &RetryConfig::default(),
            &request(&[], &profile, &infra, &secret_ref),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ControllerError::NoWorkerPools));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_unknown_image_records_nothing() {
        let client = mock_client_with_location("hel1", "eu-central");
        let ctx = context();
        let store = InMemoryStatusStore::default();
        let (profile, infra, secret_ref) = (test_cloud_profile(), infra_status(), SecretReference::new("cloudprovider"));
        let mut pool = test_pool("pool-a", &["hel1-dc2"], 1, 2);
        pool.machine_image.version = "24.4.0".to_string();
        let pools = vec![pool];

        let err = reconcile_worker_resources(
            &client,
            &ctx,
            &store,
            &RetryConfig::default(),
            &request(&pools, &profile, &infra, &secret_ref),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ControllerError::MachineImageNotFound { ref version, .. } if version == "24.4.0"));
        assert!(err.is_terminal());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_recorded_groups() {
        let client = mock_client_with_location("hel1", "eu-central");
        client.add_placement_group(test_placement_group(7, "shoot--dev--a-pool-a", "pool-a"));
        let ctx = context();
        let store = InMemoryStatusStore::with_provider_status(json!({
            "apiVersion": "hcloud.provider.extensions.gardener.cloud/v1alpha1",
            "kind": "WorkerStatus",
            "placementGroupIds": {"shoot--dev--a-pool-a": "7"}
        }));

        delete_worker_resources(&client, &ctx, &store, &RetryConfig::default(), NAMESPACE)
            .await
            .unwrap();

        assert!(client.placement_groups().is_empty());
        assert!(store.provider_status().unwrap().get("placementGroupIds").is_none());

        // Nothing recorded any more: no further writes
        delete_worker_resources(&client, &ctx, &store, &RetryConfig::default(), NAMESPACE)
            .await
            .unwrap();
        assert_eq!(store.writes(), 1);
    }
}
