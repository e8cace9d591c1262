//! Machine Topology Planner
//!
//! Fans each worker pool out over its zones: one machine deployment and one
//! machine class per (pool, zone). Planning is pure and deterministic; the
//! only I/O, the catalogue lookup in [`image::resolve_machine_images`],
//! happens before.

pub mod distribute;
pub mod hash;
pub mod image;
mod planner_test;

use crate::error::ControllerError;
use crate::ensurer::placement_group_name;
use distribute::{distribute_int_or_percent, distribute_over_zones};
use hash::{pool_hash, HashInputs};
use hcloud_apis::hcloud::helper::{append_machine_image, find_machine_type_options};
use hcloud_apis::hcloud::{CloudProfileConfig, InfrastructureStatus, MachineImage};
use hcloud_apis::{IntOrPercent, SecretReference, Taint, UpdateStrategy, WorkerPoolSpec};
use hcloud_client::ssh_key_fingerprint;
use image::{ImageKey, ResolvedImages};
use serde::Serialize;
use std::collections::BTreeMap;

/// Label identifying the pool of a node
pub const POOL_NAME_LABEL: &str = "worker.gardener.cloud/pool";

/// Desired machine deployment of one pool in one zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineDeployment {
    pub name: String,
    pub class_name: String,
    pub pool: String,
    pub zone: String,
    pub minimum: i32,
    pub maximum: i32,
    pub max_surge: IntOrPercent,
    pub max_unavailable: IntOrPercent,
    pub strategy: UpdateStrategy,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub taints: Vec<Taint>,
}

/// Provider-specific machine template of one deployment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineClassSpec {
    pub name: String,
    pub cluster_name: String,
    pub zone: String,
    pub machine_type: String,
    pub image_name: String,
    pub ssh_fingerprint: String,
    pub secret_ref: SecretReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floating_pool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_config: Option<BTreeMap<String, serde_json::Value>>,
    pub tags: BTreeMap<String, String>,
}

/// Everything planned for a Worker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerPlan {
    pub machine_deployments: Vec<MachineDeployment>,
    pub machine_classes: Vec<MachineClassSpec>,
    /// Images in use, for the Worker status
    pub machine_images: Vec<MachineImage>,
}

/// Inputs of [`plan_workers`]
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    /// Namespace of the Worker; doubles as the cluster name
    pub namespace: &'a str,
    pub pools: &'a [WorkerPoolSpec],
    pub cloud_profile: &'a CloudProfileConfig,
    pub infrastructure_status: &'a InfrastructureStatus,
    /// Placement group ids keyed by [`placement_group_name`]
    pub placement_group_ids: &'a BTreeMap<String, String>,
    /// Public key to derive the fingerprint from when the infrastructure
    /// status has none
    pub ssh_public_key: Option<&'a str>,
    pub secret_ref: &'a SecretReference,
    /// Cluster Kubernetes version, for pools that do not pin one
    pub kubernetes_version: &'a str,
}

/// Plan machine deployments and classes for all pools, in pool order and
/// zone order. Fails as a whole: no partial plan is returned.
pub fn plan_workers(input: &PlanInput<'_>, images: &ResolvedImages) -> Result<WorkerPlan, ControllerError> {
    if input.pools.is_empty() {
        return Err(ControllerError::NoWorkerPools);
    }

    let ssh_fingerprint = resolve_fingerprint(input)?;
    let network_name = input
        .infrastructure_status
        .network_id
        .as_ref()
        .map(|_| input.namespace.to_string());
    let tags = BTreeMap::from([
        (format!("kubernetes.io-cluster-{}", input.namespace), "1".to_string()),
        ("kubernetes.io-role-node".to_string(), "1".to_string()),
    ]);

    let mut plan = WorkerPlan::default();
    for pool in input.pools {
        let key = ImageKey::of_pool(pool);
        let image_name = images
            .get(&key)
            .cloned()
            .ok_or_else(|| ControllerError::MachineImageNotFound {
                name: key.name.clone(),
                version: key.version.clone(),
            })?;

        let kubernetes_version = pool.kubernetes_version.as_deref().unwrap_or(input.kubernetes_version);
        let hash = pool_hash(
            pool,
            HashInputs {
                architecture: &key.architecture,
                kubernetes_version,
            },
        );
        let placement_group_id = input
            .placement_group_ids
            .get(&placement_group_name(input.namespace, &pool.name))
            .cloned();
        let extra_config = find_machine_type_options(input.cloud_profile, &pool.machine_type)
            .map(|options| options.extra_config.clone())
            .filter(|config| !config.is_empty());

        let mut labels = pool.labels.clone();
        labels.insert(POOL_NAME_LABEL.to_string(), pool.name.clone());

        let zone_count = pool.zones.len();
        for (index, zone) in pool.zones.iter().enumerate() {
            let name = format!("{}-{}-{}", input.namespace, pool.name, zone);
            let class_name = format!("{}-{}", name, hash);

            plan.machine_classes.push(MachineClassSpec {
                name: class_name.clone(),
                cluster_name: input.namespace.to_string(),
                zone: zone.clone(),
                machine_type: pool.machine_type.clone(),
                image_name: image_name.clone(),
                ssh_fingerprint: ssh_fingerprint.clone(),
                secret_ref: input.secret_ref.clone(),
                network_name: network_name.clone(),
                placement_group_id: placement_group_id.clone(),
                floating_pool_name: input.infrastructure_status.floating_pool_name.clone(),
                extra_config: extra_config.clone(),
                tags: tags.clone(),
            });

            plan.machine_deployments.push(MachineDeployment {
                name,
                class_name,
                pool: pool.name.clone(),
                zone: zone.clone(),
                minimum: distribute_over_zones(pool.minimum, index, zone_count),
                maximum: distribute_over_zones(pool.maximum, index, zone_count),
                max_surge: distribute_int_or_percent(&pool.max_surge, index, zone_count),
                max_unavailable: distribute_int_or_percent(&pool.max_unavailable, index, zone_count),
                strategy: pool.update_strategy.unwrap_or_default(),
                labels: labels.clone(),
                annotations: pool.annotations.clone(),
                taints: pool.taints.clone(),
            });
        }

        append_machine_image(
            &mut plan.machine_images,
            MachineImage {
                name: key.name,
                version: key.version,
                architecture: Some(key.architecture),
                image: Some(image_name),
            },
        );
    }

    Ok(plan)
}

fn resolve_fingerprint(input: &PlanInput<'_>) -> Result<String, ControllerError> {
    let recorded = &input.infrastructure_status.ssh_fingerprint;
    if !recorded.is_empty() {
        return Ok(recorded.clone());
    }
    match input.ssh_public_key {
        Some(key) if !key.trim().is_empty() => ssh_key_fingerprint(key)
            .map_err(|e| ControllerError::InvalidConfig(format!("worker SSH public key: {}", e))),
        _ => Err(ControllerError::InvalidConfig(
            "no SSH fingerprint in the infrastructure status and no SSH public key on the Worker".to_string(),
        )),
    }
}
