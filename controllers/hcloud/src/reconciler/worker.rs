//! Worker reconciliation
//!
//! Converges the placement groups of a Worker's pools, resolves machine
//! images and plans machine deployments. The images in use, the placement
//! groups and the deployment summary are recorded in the Worker status.

use super::{add_finalizer, has_finalizer, is_deleting, operation_type, remove_finalizer, Reconciler};
use crate::admission::{validate_cloud_profile, validate_worker};
use crate::context::ReconcileContext;
use crate::ensurer::Ensurer;
use crate::error::ControllerError;
use crate::planner::image::resolve_machine_images;
use crate::planner::{plan_workers, PlanInput, WorkerPlan};
use crate::status::{update_status, KubeStatusStore, RetryConfig, StatusStore, StatusStoreError};
use hcloud_apis::codec::{
    decode_cloud_profile_config, decode_infrastructure_status, decode_worker_config, decode_worker_status,
    encode_worker_status,
};
use hcloud_apis::hcloud::{CloudProfileConfig, InfrastructureStatus, WorkerStatus};
use hcloud_apis::{MachineDeploymentRef, SecretReference, Worker, WorkerPoolSpec};
use hcloud_client::HcloudClientTrait;
use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use serde_json::{json, Map};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

/// Decoded inputs of one Worker reconciliation
#[derive(Debug, Clone, Copy)]
pub struct WorkerRequest<'a> {
    pub namespace: &'a str,
    pub region: &'a str,
    pub pools: &'a [WorkerPoolSpec],
    pub cloud_profile: &'a CloudProfileConfig,
    pub infrastructure_status: &'a InfrastructureStatus,
    pub ssh_public_key: Option<&'a str>,
    pub secret_ref: &'a SecretReference,
    pub kubernetes_version: &'a str,
}

/// Placement group type per pool, for the pools that request one
pub fn requested_placement_groups(pools: &[WorkerPoolSpec]) -> Result<BTreeMap<String, String>, ControllerError> {
    let mut requested = BTreeMap::new();
    for pool in pools {
        if let Some(config) = decode_worker_config(pool.provider_config.as_ref())?
            && let Some(group_type) = config.placement_group_type
        {
            requested.insert(pool.name.clone(), group_type);
        }
    }
    Ok(requested)
}

async fn current_worker_status(store: &dyn StatusStore) -> Result<WorkerStatus, ControllerError> {
    let snapshot = store
        .read()
        .await
        .map_err(|e: StatusStoreError| ControllerError::StatusUpdate(format!("reading status: {}", e)))?;
    Ok(decode_worker_status(snapshot.provider_status.as_ref())?)
}

/// Converge placement groups, resolve images, plan and record the result.
///
/// Nothing is planned or recorded when a pool's image cannot be resolved;
/// placement groups created before that are adopted by name on the next
/// pass.
pub async fn reconcile_worker_resources(
    client: &dyn HcloudClientTrait,
    ctx: &ReconcileContext,
    store: &dyn StatusStore,
    retry: &RetryConfig,
    request: &WorkerRequest<'_>,
) -> Result<WorkerPlan, ControllerError> {
    if request.pools.is_empty() {
        return Err(ControllerError::NoWorkerPools);
    }

    let current = current_worker_status(store).await?;
    let requested = requested_placement_groups(request.pools)?;
    let placement_group_ids = Ensurer::new(client, ctx)
        .reconcile_placement_groups(request.namespace, &requested, &current.placement_group_ids, false)
        .await?;

    let images = resolve_machine_images(
        request.pools,
        request.cloud_profile,
        &current,
        request.region,
        client,
        ctx,
    )
    .await?;

    let plan = plan_workers(
        &PlanInput {
            namespace: request.namespace,
            pools: request.pools,
            cloud_profile: request.cloud_profile,
            infrastructure_status: request.infrastructure_status,
            placement_group_ids: &placement_group_ids,
            ssh_public_key: request.ssh_public_key,
            secret_ref: request.secret_ref,
            kubernetes_version: request.kubernetes_version,
        },
        &images,
    )?;

    let deployments: Vec<MachineDeploymentRef> = plan
        .machine_deployments
        .iter()
        .map(|d| MachineDeploymentRef {
            name: d.name.clone(),
            minimum: d.minimum,
            maximum: d.maximum,
        })
        .collect();
    let mut extra = Map::new();
    extra.insert("machineDeployments".to_string(), json!(deployments));

    update_status(store, retry, &extra, |current| {
        let mut status = decode_worker_status(current)?;
        status.machine_images.clone_from(&plan.machine_images);
        status.placement_group_ids.clone_from(&placement_group_ids);
        Ok(encode_worker_status(&status)?)
    })
    .await?;

    Ok(plan)
}

/// Delete all placement groups recorded for the Worker.
pub async fn delete_worker_resources(
    client: &dyn HcloudClientTrait,
    ctx: &ReconcileContext,
    store: &dyn StatusStore,
    retry: &RetryConfig,
    namespace: &str,
) -> Result<(), ControllerError> {
    let current = current_worker_status(store).await?;
    if current.placement_group_ids.is_empty() {
        return Ok(());
    }

    Ensurer::new(client, ctx)
        .reconcile_placement_groups(namespace, &BTreeMap::new(), &current.placement_group_ids, true)
        .await?;

    update_status(store, retry, &Map::new(), |current| {
        let mut status = decode_worker_status(current)?;
        status.placement_group_ids.clear();
        Ok(encode_worker_status(&status)?)
    })
    .await?;
    Ok(())
}

impl Reconciler {
    /// Reconcile one Worker.
    pub async fn reconcile_worker(&self, worker: &Worker) -> Result<Action, ControllerError> {
        let started = Instant::now();
        let namespace = worker
            .namespace()
            .ok_or_else(|| ControllerError::InvalidConfig("Worker without namespace".to_string()))?;
        let api: Api<Worker> = Api::namespaced(self.kube_client.clone(), &namespace);

        let deleting = is_deleting(worker);
        let recorded = worker.status.as_ref().is_some_and(|s| s.last_operation.is_some());
        let operation = operation_type(deleting, recorded);

        let result = if deleting {
            self.delete_worker(&api, worker, &namespace).await
        } else {
            self.apply_worker(&api, worker, &namespace).await
        };
        self.finish(&api, worker, operation, started, result).await
    }

    async fn apply_worker(&self, api: &Api<Worker>, worker: &Worker, namespace: &str) -> Result<(), ControllerError> {
        validate_worker(worker, None)?;

        let cluster = self.cluster(namespace).await?;
        validate_cloud_profile(cluster.spec.cloud_profile.provider_config.as_ref())?;
        let cloud_profile = decode_cloud_profile_config(cluster.spec.cloud_profile.provider_config.as_ref())?;
        let infrastructure_status = decode_infrastructure_status(worker.spec.infrastructure_provider_status.as_ref())?;

        add_finalizer(api, worker).await?;

        let client = self.client_for(&worker.spec.secret_ref, namespace).await?;
        let ctx = self.context();
        let store = KubeStatusStore::new(api.clone(), worker.name_any());
        let request = WorkerRequest {
            namespace,
            region: &worker.spec.region,
            pools: &worker.spec.pools,
            cloud_profile: &cloud_profile,
            infrastructure_status: &infrastructure_status,
            ssh_public_key: worker.spec.ssh_public_key.as_deref(),
            secret_ref: &worker.spec.secret_ref,
            kubernetes_version: &cluster.spec.shoot.kubernetes_version,
        };

        let plan = reconcile_worker_resources(client.as_ref(), &ctx, &store, &self.retry, &request).await?;
        for class in &plan.machine_classes {
            debug!(class = %class.name, zone = %class.zone, image = %class.image_name, "planned machine class");
        }
        info!(
            namespace,
            deployments = plan.machine_deployments.len(),
            images = plan.machine_images.len(),
            "worker reconciled"
        );
        Ok(())
    }

    async fn delete_worker(&self, api: &Api<Worker>, worker: &Worker, namespace: &str) -> Result<(), ControllerError> {
        if !has_finalizer(worker) {
            debug!(namespace, "no finalizer, nothing to clean up");
            return Ok(());
        }

        let client = self.client_for(&worker.spec.secret_ref, namespace).await?;
        let ctx = self.context();
        let store = KubeStatusStore::new(api.clone(), worker.name_any());
        delete_worker_resources(client.as_ref(), &ctx, &store, &self.retry, namespace).await?;

        remove_finalizer(api, worker).await?;
        info!(namespace, "worker deleted");
        Ok(())
    }
}
