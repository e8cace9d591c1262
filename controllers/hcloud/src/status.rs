//! Status Manager
//!
//! Read-modify-write of a resource's `status.providerStatus` with the
//! resource version as precondition. The caller's merge function sees the
//! current provider status and returns the new one; it should only change
//! the fields its caller owns. Conflicts are retried with jittered
//! exponential backoff.

use crate::error::ControllerError;
use async_trait::async_trait;
use chrono::Utc;
use hcloud_apis::{
    Infrastructure, LastOperation, LastOperationState, LastOperationType, Worker,
};
use kube::api::{Patch, PatchParams};
use kube::{Api, Resource, ResourceExt};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors of a [`StatusStore`]
#[derive(Debug, Error)]
pub enum StatusStoreError {
    /// The resource changed since it was read
    #[error("resource version conflict")]
    Conflict,

    #[error(transparent)]
    Kube(kube::Error),
}

impl From<kube::Error> for StatusStoreError {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(ae) if ae.code == 409 => Self::Conflict,
            other => Self::Kube(other),
        }
    }
}

/// Current provider status and the version it was read at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    pub provider_status: Option<Value>,
    pub resource_version: Option<String>,
}

/// Storage of one resource's status
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn read(&self) -> Result<StatusSnapshot, StatusStoreError>;

    /// Merge-patch `status` into the resource's status, failing with
    /// [`StatusStoreError::Conflict`] unless the resource is still at
    /// `resource_version`.
    async fn write(&self, status: Value, resource_version: Option<&str>) -> Result<(), StatusStoreError>;
}

/// Retry policy for status conflicts
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

/// Update the provider status through `store`.
///
/// `merge` receives the current provider status (`None` before the first
/// write) and returns the new one. `extra` holds further status fields
/// written alongside, replaced as a whole. Returns the written provider
/// status.
pub async fn update_status<S, F>(
    store: &S,
    retry: &RetryConfig,
    extra: &Map<String, Value>,
    mut merge: F,
) -> Result<Value, ControllerError>
where
    S: StatusStore + ?Sized,
    F: FnMut(Option<&Value>) -> Result<Value, ControllerError>,
{
    let mut attempt = 0u32;
    let mut delay = retry.initial_delay;

    loop {
        attempt += 1;

        let snapshot = store
            .read()
            .await
            .map_err(|e| ControllerError::StatusUpdate(format!("reading status: {}", e)))?;
        let desired = merge(snapshot.provider_status.as_ref())?;

        let mut patch = extra.clone();
        patch.insert(
            "providerStatus".to_string(),
            merge_patch_diff(snapshot.provider_status.as_ref(), &desired),
        );

        match store
            .write(Value::Object(patch), snapshot.resource_version.as_deref())
            .await
        {
            Ok(()) => {
                debug!(attempt, "status updated");
                return Ok(desired);
            }
            Err(StatusStoreError::Conflict) if attempt < retry.max_attempts => {
                let jitter = rand::thread_rng().gen_range(0.5..1.5);
                let jittered = Duration::from_secs_f64(delay.as_secs_f64() * jitter);
                warn!(attempt, delay_ms = jittered.as_millis(), "status update conflicted, retrying");
                tokio::time::sleep(jittered).await;
                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * retry.backoff_multiplier).min(retry.max_delay.as_secs_f64()),
                );
            }
            Err(StatusStoreError::Conflict) => {
                return Err(ControllerError::StatusUpdate(format!(
                    "status update still conflicting after {} attempts",
                    attempt
                )));
            }
            Err(e) => return Err(ControllerError::StatusUpdate(e.to_string())),
        }
    }
}

/// JSON merge patch turning `old` into `new`: keys missing from `new` are
/// set to `null`, nested objects are diffed recursively, everything else is
/// replaced.
pub fn merge_patch_diff(old: Option<&Value>, new: &Value) -> Value {
    match (old, new) {
        (Some(Value::Object(old)), Value::Object(new)) => {
            let mut patch = Map::new();
            for key in old.keys() {
                if !new.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            for (key, value) in new {
                if old.get(key) != Some(value) {
                    patch.insert(key.clone(), merge_patch_diff(old.get(key), value));
                }
            }
            Value::Object(patch)
        }
        _ => new.clone(),
    }
}

/// Apply a JSON merge patch to `target`.
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (key, value) in patch {
            if value.is_null() {
                map.remove(key);
            } else {
                apply_merge_patch(map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Resources carrying an embedded provider status
pub trait ProviderStatusHolder {
    fn provider_status(&self) -> Option<&Value>;
}

impl ProviderStatusHolder for Infrastructure {
    fn provider_status(&self) -> Option<&Value> {
        self.status.as_ref().and_then(|s| s.provider_status.as_ref())
    }
}

impl ProviderStatusHolder for Worker {
    fn provider_status(&self) -> Option<&Value> {
        self.status.as_ref().and_then(|s| s.provider_status.as_ref())
    }
}

/// [`StatusStore`] backed by the status subresource of one object
pub struct KubeStatusStore<K> {
    api: Api<K>,
    name: String,
}

impl<K> Debug for KubeStatusStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStatusStore").field("name", &self.name).finish()
    }
}

impl<K> KubeStatusStore<K> {
    pub fn new(api: Api<K>, name: impl Into<String>) -> Self {
        Self { api, name: name.into() }
    }
}

#[async_trait]
impl<K> StatusStore for KubeStatusStore<K>
where
    K: Resource + ProviderStatusHolder + Clone + DeserializeOwned + Debug + Send + Sync,
{
    async fn read(&self) -> Result<StatusSnapshot, StatusStoreError> {
        let object = self.api.get_status(&self.name).await?;
        Ok(StatusSnapshot {
            provider_status: object.provider_status().cloned(),
            resource_version: object.resource_version(),
        })
    }

    async fn write(&self, status: Value, resource_version: Option<&str>) -> Result<(), StatusStoreError> {
        let mut patch = json!({ "status": status });
        if let Some(version) = resource_version {
            patch["metadata"] = json!({ "resourceVersion": version });
        }
        self.api
            .patch_status(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

/// Build a `lastOperation` record stamped with the current time.
pub fn last_operation(
    operation_type: LastOperationType,
    state: LastOperationState,
    description: impl Into<String>,
) -> LastOperation {
    let progress = if matches!(state, LastOperationState::Succeeded) { 100 } else { 0 };
    LastOperation {
        operation_type,
        state,
        description: description.into(),
        progress,
        last_update_time: Utc::now(),
    }
}

/// Record `operation` and the observed generation on the object. Not
/// conditional on the resource version: the last writer wins.
pub async fn patch_last_operation<K>(
    api: &Api<K>,
    name: &str,
    operation: &LastOperation,
    observed_generation: Option<i64>,
) -> Result<(), kube::Error>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let patch = json!({
        "status": {
            "lastOperation": operation,
            "observedGeneration": observed_generation,
        }
    });
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

/// In-memory [`StatusStore`] for tests
#[cfg(test)]
pub mod memory {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct State {
        status: Value,
        version: u64,
        conflicts: u32,
        writes: u32,
    }

    #[derive(Debug, Default)]
    pub struct InMemoryStatusStore {
        state: Mutex<State>,
    }

    impl InMemoryStatusStore {
        pub fn with_provider_status(provider_status: Value) -> Self {
            let store = Self::default();
            store.state.lock().unwrap().status = json!({ "providerStatus": provider_status });
            store
        }

        /// Fail the next `n` writes with a conflict
        pub fn inject_conflicts(&self, n: u32) {
            self.state.lock().unwrap().conflicts = n;
        }

        pub fn status(&self) -> Value {
            self.state.lock().unwrap().status.clone()
        }

        pub fn provider_status(&self) -> Option<Value> {
            self.status().get("providerStatus").cloned()
        }

        pub fn writes(&self) -> u32 {
            self.state.lock().unwrap().writes
        }
    }

    #[async_trait]
    impl StatusStore for InMemoryStatusStore {
        async fn read(&self) -> Result<StatusSnapshot, StatusStoreError> {
            let state = self.state.lock().unwrap();
            Ok(StatusSnapshot {
                provider_status: state.status.get("providerStatus").cloned(),
                resource_version: Some(state.version.to_string()),
            })
        }

        async fn write(&self, status: Value, resource_version: Option<&str>) -> Result<(), StatusStoreError> {
            let mut state = self.state.lock().unwrap();
            if state.conflicts > 0 {
                state.conflicts -= 1;
                state.version += 1;
                return Err(StatusStoreError::Conflict);
            }
            if resource_version.is_some_and(|v| v != state.version.to_string()) {
                return Err(StatusStoreError::Conflict);
            }
            apply_merge_patch(&mut state.status, &status);
            state.version += 1;
            state.writes += 1;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryStatusStore;
    use super::*;

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn test_merge_patch_diff_nulls_removed_keys() {
        let old = json!({"sshFingerprint": "aa", "placementGroupIds": {"a": "1", "b": "2"}});
        let new = json!({"sshFingerprint": "aa", "placementGroupIds": {"b": "2"}});
        assert_eq!(
            merge_patch_diff(Some(&old), &new),
            json!({"placementGroupIds": {"a": null}})
        );
        assert_eq!(merge_patch_diff(None, &new), new);
    }

    #[test]
    fn test_apply_merge_patch_round_trip() {
        let old = json!({"a": {"x": 1, "y": 2}, "b": [1, 2], "c": "keep"});
        let new = json!({"a": {"y": 3}, "b": [3], "c": "keep", "d": true});
        let mut target = old.clone();
        apply_merge_patch(&mut target, &merge_patch_diff(Some(&old), &new));
        assert_eq!(target, new);
    }

    #[tokio::test]
    async fn test_first_write_creates_provider_status() {
        let store = InMemoryStatusStore::default();
        let written = update_status(&store, &fast_retry(3), &Map::new(), |current| {
            assert!(current.is_none());
            Ok(json!({"sshFingerprint": "aa"}))
        })
        .await
        .unwrap();

        assert_eq!(written, json!({"sshFingerprint": "aa"}));
        assert_eq!(store.provider_status(), Some(json!({"sshFingerprint": "aa"})));
    }

    #[tokio::test]
    async fn test_merge_preserves_fields_it_does_not_own() {
        let store = InMemoryStatusStore::with_provider_status(json!({
            "sshFingerprint": "aa",
            "placementGroupIds": {"ns-a": "1"}
        }));
        update_status(&store, &fast_retry(3), &Map::new(), |current| {
            let mut status = current.cloned().unwrap_or_else(|| json!({}));
            status["networkId"] = json!("7");
            Ok(status)
        })
        .await
        .unwrap();

        assert_eq!(
            store.provider_status(),
            Some(json!({"sshFingerprint": "aa", "networkId": "7", "placementGroupIds": {"ns-a": "1"}}))
        );
    }

    #[tokio::test]
    async fn test_extra_fields_written_alongside() {
        let store = InMemoryStatusStore::default();
        let mut extra = Map::new();
        extra.insert("machineDeployments".to_string(), json!([{"name": "d", "minimum": 1, "maximum": 2}]));
        update_status(&store, &fast_retry(3), &extra, |_| Ok(json!({}))).await.unwrap();
        assert_eq!(store.status()["machineDeployments"][0]["name"], "d");
    }

    #[tokio::test]
    async fn test_conflicts_are_retried() {
        let store = InMemoryStatusStore::default();
        store.inject_conflicts(2);
        let mut calls = 0;
        update_status(&store, &fast_retry(5), &Map::new(), |_| {
            calls += 1;
            Ok(json!({"sshFingerprint": "aa"}))
        })
        .await
        .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_conflicts_exhaust_retries() {
        let store = InMemoryStatusStore::default();
        store.inject_conflicts(10);
        let err = update_status(&store, &fast_retry(3), &Map::new(), |_| Ok(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::StatusUpdate(_)));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_merge_error_aborts_without_write() {
        let store = InMemoryStatusStore::default();
        let err = update_status(&store, &fast_retry(3), &Map::new(), |_| Err(ControllerError::NoWorkerPools))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::NoWorkerPools));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_last_operation_progress() {
        let done = last_operation(LastOperationType::Reconcile, LastOperationState::Succeeded, "ok");
        assert_eq!(done.progress, 100);
        let failed = last_operation(LastOperationType::Delete, LastOperationState::Error, "boom");
        assert_eq!(failed.progress, 0);
        assert_eq!(failed.description, "boom");
    }
}
