//! Infrastructure reconciliation
//!
//! Ensures the worker network and the SSH key of a cluster and records
//! them in the Infrastructure's provider status. Deletion removes both.

use super::{add_finalizer, has_finalizer, is_deleting, operation_type, remove_finalizer, Reconciler};
use crate::admission::validate_infrastructure;
use crate::ensurer::Ensurer;
use crate::error::ControllerError;
use crate::status::{update_status, KubeStatusStore, RetryConfig, StatusStore};
use hcloud_apis::codec::{decode_infrastructure_config, decode_infrastructure_status, encode_infrastructure_status};
use hcloud_apis::hcloud::{InfrastructureConfig, InfrastructureStatus};
use hcloud_apis::Infrastructure;
use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use serde_json::Map;
use std::time::Instant;
use tracing::{debug, info};

/// Decoded inputs of one Infrastructure reconciliation
#[derive(Debug, Clone, Copy)]
pub struct InfrastructureRequest<'a> {
    pub namespace: &'a str,
    pub region: &'a str,
    pub config: &'a InfrastructureConfig,
    pub ssh_public_key: Option<&'a str>,
}

/// Ensure network and SSH key, then record them in the provider status.
///
/// Only the fields owned here are replaced; placement groups recorded by
/// others survive. Returns the written status.
pub async fn reconcile_infrastructure_resources(
    ensurer: &Ensurer<'_>,
    store: &dyn StatusStore,
    retry: &RetryConfig,
    request: &InfrastructureRequest<'_>,
) -> Result<InfrastructureStatus, ControllerError> {
    let workers = request.config.networks.workers.as_str();
    let network_id = if workers.is_empty() {
        None
    } else {
        Some(ensurer.ensure_network(request.namespace, request.region, workers).await?)
    };

    let ssh_fingerprint = match request.ssh_public_key.map(str::trim) {
        Some(key) if !key.is_empty() => Some(ensurer.ensure_ssh_key(request.namespace, key).await?),
        _ => None,
    };

    let written = update_status(store, retry, &Map::new(), |current| {
        let mut status = decode_infrastructure_status(current)?;
        if let Some(fingerprint) = &ssh_fingerprint {
            status.ssh_fingerprint.clone_from(fingerprint);
        }
        status.network_id = network_id.map(|id| id.to_string());
        status.floating_pool_name.clone_from(&request.config.floating_pool_name);
        Ok(encode_infrastructure_status(&status)?)
    })
    .await?;

    Ok(decode_infrastructure_status(Some(&written))?)
}

/// Delete the SSH key and network recorded in `status`.
pub async fn delete_infrastructure_resources(
    ensurer: &Ensurer<'_>,
    status: &InfrastructureStatus,
) -> Result<(), ControllerError> {
    ensurer.ensure_ssh_key_deleted(&status.ssh_fingerprint).await?;
    ensurer
        .ensure_network_deleted(status.network_id.as_deref().unwrap_or_default())
        .await
}

impl Reconciler {
    /// Reconcile one Infrastructure.
    pub async fn reconcile_infrastructure(&self, infra: &Infrastructure) -> Result<Action, ControllerError> {
        let started = Instant::now();
        let namespace = infra
            .namespace()
            .ok_or_else(|| ControllerError::InvalidConfig("Infrastructure without namespace".to_string()))?;
        let api: Api<Infrastructure> = Api::namespaced(self.kube_client.clone(), &namespace);

        let deleting = is_deleting(infra);
        let recorded = infra.status.as_ref().is_some_and(|s| s.last_operation.is_some());
        let operation = operation_type(deleting, recorded);

        let result = if deleting {
            self.delete_infrastructure(&api, infra, &namespace).await
        } else {
            self.apply_infrastructure(&api, infra, &namespace).await
        };
        self.finish(&api, infra, operation, started, result).await
    }

    async fn apply_infrastructure(
        &self,
        api: &Api<Infrastructure>,
        infra: &Infrastructure,
        namespace: &str,
    ) -> Result<(), ControllerError> {
        let cluster = self.cluster(namespace).await?;
        validate_infrastructure(infra, None, cluster.spec.shoot.networking.nodes.as_deref())?;
        let config = decode_infrastructure_config(infra.spec.provider_config.as_ref())?;

        add_finalizer(api, infra).await?;

        let client = self.client_for(&infra.spec.secret_ref, namespace).await?;
        let ctx = self.context();
        let ensurer = Ensurer::new(client.as_ref(), &ctx);
        let store = KubeStatusStore::new(api.clone(), infra.name_any());
        let request = InfrastructureRequest {
            namespace,
            region: &infra.spec.region,
            config: &config,
            ssh_public_key: infra.spec.ssh_public_key.as_deref(),
        };

        let status = reconcile_infrastructure_resources(&ensurer, &store, &self.retry, &request).await?;
        info!(
            namespace,
            network_id = status.network_id.as_deref().unwrap_or("none"),
            ssh_fingerprint = %status.ssh_fingerprint,
            "infrastructure reconciled"
        );
        Ok(())
    }

    async fn delete_infrastructure(
        &self,
        api: &Api<Infrastructure>,
        infra: &Infrastructure,
        namespace: &str,
    ) -> Result<(), ControllerError> {
        if !has_finalizer(infra) {
            debug!(namespace, "no finalizer, nothing to clean up");
            return Ok(());
        }

        let status = decode_infrastructure_status(
            infra.status.as_ref().and_then(|s| s.provider_status.as_ref()),
        )?;
        let client = self.client_for(&infra.spec.secret_ref, namespace).await?;
        let ctx = self.context();
        delete_infrastructure_resources(&Ensurer::new(client.as_ref(), &ctx), &status).await?;

        remove_finalizer(api, infra).await?;
        info!(namespace, "infrastructure deleted");
        Ok(())
    }
}
