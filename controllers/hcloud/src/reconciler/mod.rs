//! Reconciliation logic for the hcloud extension resources.
//!
//! - `infrastructure`: worker network and SSH key of a cluster
//! - `worker`: placement groups, machine images and the machine plan
//!
//! Each module has a core that only talks to the cloud client and a
//! [`StatusStore`](crate::status::StatusStore), and a thin layer on
//! [`Reconciler`] that wires in the Kubernetes API: credentials,
//! the Cluster resource, finalizers and `lastOperation`.

pub mod infrastructure;
pub mod worker;
mod worker_test;

use crate::backoff::FibonacciBackoff;
use crate::config::ControllerConfig;
use crate::context::ReconcileContext;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::status::{last_operation, patch_last_operation, RetryConfig};
use hcloud_apis::{Cluster, LastOperationState, LastOperationType, SecretReference};
use hcloud_client::{ClientRegistry, HcloudClientTrait};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, Resource, ResourceExt};
use kube_runtime::controller::Action;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Finalizer guarding cloud resources of Infrastructure and Worker objects
pub const FINALIZER: &str = "extensions.gardener.cloud/hcloud";

/// Key of the API token in the credentials secret
pub const TOKEN_KEY: &str = "hcloudToken";

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::default(),
            error_count: 0,
        }
    }

    fn increment_error(&mut self) {
        self.error_count += 1;
    }

    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Reconciles Infrastructure and Worker resources.
pub struct Reconciler {
    pub(crate) kube_client: Client,
    pub(crate) registry: ClientRegistry,
    pub(crate) config: ControllerConfig,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) retry: RetryConfig,
    shutdown: CancellationToken,
    /// Error count tracking per resource (namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("cached_clients", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        kube_client: Client,
        registry: ClientRegistry,
        config: ControllerConfig,
        metrics: Arc<Metrics>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            kube_client,
            registry,
            config,
            metrics,
            retry: RetryConfig::default(),
            shutdown,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Scope for one reconciliation: cancelled on shutdown or after the
    /// configured timeout.
    pub(crate) fn context(&self) -> ReconcileContext {
        ReconcileContext::new(&self.shutdown, self.config.reconcile_timeout)
    }

    /// Cloud client for the credentials `secret_ref` points to. A rotated
    /// token replaces the cached client of the previous one.
    pub(crate) async fn client_for(
        &self,
        secret_ref: &SecretReference,
        namespace: &str,
    ) -> Result<Arc<dyn HcloudClientTrait>, ControllerError> {
        let secret_namespace = secret_ref.namespace_or(namespace);
        let secrets: Api<Secret> = Api::namespaced(self.kube_client.clone(), secret_namespace);
        let secret = secrets.get_opt(&secret_ref.name).await?.ok_or_else(|| {
            ControllerError::Credentials(format!("secret {}/{} not found", secret_namespace, secret_ref.name))
        })?;
        let token = token_from_secret(&secret).ok_or_else(|| {
            ControllerError::Credentials(format!(
                "secret {}/{} has no {:?} key",
                secret_namespace, secret_ref.name, TOKEN_KEY
            ))
        })?;

        self.registry
            .get_for_source(&format!("{}/{}", secret_namespace, secret_ref.name), &token)
            .map_err(|e| ControllerError::Credentials(e.to_string()))
    }

    /// The Cluster resource of a shoot namespace.
    pub(crate) async fn cluster(&self, namespace: &str) -> Result<Cluster, ControllerError> {
        let clusters: Api<Cluster> = Api::all(self.kube_client.clone());
        Ok(clusters.get(namespace).await?)
    }

    /// Record the outcome of a reconciliation and turn it into an [`Action`].
    ///
    /// `lastOperation` is written on a best-effort basis; failing to write it
    /// does not fail the reconciliation.
    pub(crate) async fn finish<K>(
        &self,
        api: &Api<K>,
        obj: &K,
        operation: LastOperationType,
        started: Instant,
        result: Result<(), ControllerError>,
    ) -> Result<Action, ControllerError>
    where
        K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
    {
        let kind = K::kind(&());
        let key = resource_key(obj);
        self.metrics
            .observe(&kind, operation_label(operation), started.elapsed(), result.as_ref().err());

        let record = match &result {
            Ok(()) => last_operation(operation, LastOperationState::Succeeded, format!("{} reconciled", kind)),
            Err(e) if e.is_terminal() => last_operation(operation, LastOperationState::Failed, e.to_string()),
            Err(e) => last_operation(operation, LastOperationState::Error, e.to_string()),
        };
        match patch_last_operation(api, &obj.name_any(), &record, obj.meta().generation).await {
            Ok(()) => {}
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(resource = %key, "object gone, lastOperation not recorded");
            }
            Err(e) => warn!(resource = %key, error = %e, "failed to record lastOperation"),
        }

        result?;
        self.reset_error(&key);
        info!(resource = %key, kind = %kind, operation = operation_label(operation), "reconciled");
        Ok(Action::await_change())
    }

    /// Get the Fibonacci backoff for a resource based on its error count
    ///
    /// Returns (backoff, error_count)
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (Duration::from_secs(60), 0)
            }
        }
    }

    /// Increment error count for a resource
    pub fn increment_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states
                .entry(resource_key.to_string())
                .or_insert_with(BackoffState::new)
                .increment_error();
        }
    }

    /// Reset error count for a resource (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock()
            && let Some(state) = states.get_mut(resource_key)
        {
            state.reset();
        }
    }
}

/// `namespace/name` of an object
pub fn resource_key<K: Resource>(obj: &K) -> String {
    match obj.namespace() {
        Some(namespace) => format!("{}/{}", namespace, obj.name_any()),
        None => obj.name_any(),
    }
}

pub(crate) fn is_deleting<K: Resource>(obj: &K) -> bool {
    obj.meta().deletion_timestamp.is_some()
}

pub(crate) fn has_finalizer<K: Resource>(obj: &K) -> bool {
    obj.finalizers().iter().any(|f| f == FINALIZER)
}

/// Operation a reconciliation performs: `Delete` once deletion started,
/// `Create` until an operation was recorded, `Reconcile` afterwards.
pub(crate) fn operation_type(deleting: bool, recorded: bool) -> LastOperationType {
    match (deleting, recorded) {
        (true, _) => LastOperationType::Delete,
        (false, false) => LastOperationType::Create,
        (false, true) => LastOperationType::Reconcile,
    }
}

fn operation_label(operation: LastOperationType) -> &'static str {
    match operation {
        LastOperationType::Create => "create",
        LastOperationType::Reconcile => "reconcile",
        LastOperationType::Delete => "delete",
    }
}

/// Token stored under [`TOKEN_KEY`], trimmed; `None` if absent or empty.
pub(crate) fn token_from_secret(secret: &Secret) -> Option<String> {
    let raw = secret.data.as_ref()?.get(TOKEN_KEY)?;
    let token = String::from_utf8(raw.0.clone()).ok()?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Add [`FINALIZER`] unless present.
pub(crate) async fn add_finalizer<K>(api: &Api<K>, obj: &K) -> Result<(), ControllerError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    if has_finalizer(obj) {
        return Ok(());
    }
    let mut finalizers = obj.finalizers().to_vec();
    finalizers.push(FINALIZER.to_string());
    patch_finalizers(api, obj, finalizers).await
}

/// Remove [`FINALIZER`], releasing the object for deletion.
pub(crate) async fn remove_finalizer<K>(api: &Api<K>, obj: &K) -> Result<(), ControllerError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    if !has_finalizer(obj) {
        return Ok(());
    }
    let finalizers: Vec<String> = obj.finalizers().iter().filter(|f| *f != FINALIZER).cloned().collect();
    patch_finalizers(api, obj, finalizers).await
}

async fn patch_finalizers<K>(api: &Api<K>, obj: &K, finalizers: Vec<String>) -> Result<(), ControllerError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let patch = finalizer_patch(finalizers, obj.resource_version());
    api.patch(&obj.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

/// Merge patch replacing the finalizer list. With a resource version the API
/// server rejects the write with 409 if the list changed since it was read.
fn finalizer_patch(finalizers: Vec<String>, resource_version: Option<String>) -> serde_json::Value {
    let mut metadata = serde_json::json!({ "finalizers": finalizers });
    if let Some(version) = resource_version {
        metadata["resourceVersion"] = serde_json::Value::String(version);
    }
    serde_json::json!({ "metadata": metadata })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_infrastructure;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn secret_with(key: &str, value: &str) -> Secret {
        Secret {
            data: Some(BTreeMap::from([(key.to_string(), ByteString(value.as_bytes().to_vec()))])),
            ..Default::default()
        }
    }

    #[test]
    fn test_token_from_secret() {
        assert_eq!(token_from_secret(&secret_with(TOKEN_KEY, "abc\n")).as_deref(), Some("abc"));
        assert_eq!(token_from_secret(&secret_with(TOKEN_KEY, "  ")), None);
        assert_eq!(token_from_secret(&secret_with("token", "abc")), None);
        assert_eq!(token_from_secret(&Secret::default()), None);
    }

    #[test]
    fn test_resource_key_and_finalizer() {
        let mut infra = test_infrastructure("infra", "shoot--dev--a", "10.250.0.0/16");
        assert_eq!(resource_key(&infra), "shoot--dev--a/infra");
        assert!(!has_finalizer(&infra));
        assert!(!is_deleting(&infra));

        infra.metadata.finalizers = Some(vec!["other".to_string(), FINALIZER.to_string()]);
        assert!(has_finalizer(&infra));
    }

    #[test]
    fn test_finalizer_patch_carries_resource_version() {
        let mut infra = test_infrastructure("infra", "shoot--dev--a", "10.250.0.0/16");
        infra.metadata.resource_version = Some("7".to_string());

        let patch = finalizer_patch(vec![FINALIZER.to_string()], infra.resource_version());
        assert_eq!(
            patch,
            serde_json::json!({"metadata": {"finalizers": [FINALIZER], "resourceVersion": "7"}})
        );

        let patch = finalizer_patch(Vec::new(), None);
        assert_eq!(patch, serde_json::json!({"metadata": {"finalizers": []}}));
    }

    #[test]
    fn test_operation_type() {
        assert_eq!(operation_type(false, false), LastOperationType::Create);
        assert_eq!(operation_type(false, true), LastOperationType::Reconcile);
        assert_eq!(operation_type(true, true), LastOperationType::Delete);
    }
}
