//! Kubernetes resource watchers.
//!
//! Both watchers run through the generic `watch_resource()` helper, which
//! drives a `kube_runtime::Controller` with reconnection, debounce and a
//! per-object backoff on errors.

use crate::error::ControllerError;
use crate::reconciler::{resource_key, Reconciler};
use futures::StreamExt;
use hcloud_apis::{Infrastructure, Worker};
use kube::Api;
use kube_runtime::controller::{Action, Config as RuntimeConfig};
use kube_runtime::{watcher, Controller};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

/// Wait after the last event before reconciling, to batch bursts of updates
const DEBOUNCE: Duration = Duration::from_secs(5);

/// Requeue decision after a failed reconciliation.
///
/// Terminal errors wait for the object to change; everything else is retried
/// after the object's next Fibonacci backoff step.
pub(crate) fn error_action(reconciler: &Reconciler, key: &str, error: &ControllerError) -> Action {
    if error.is_terminal() {
        warn!(resource = %key, error = %error, "terminal reconciliation error, waiting for a change");
        return Action::await_change();
    }
    reconciler.increment_error(key);
    let (delay, error_count) = reconciler.get_backoff_for_resource(key);
    warn!(
        resource = %key,
        error = %error,
        error_count,
        retry_in_secs = delay.as_secs(),
        "reconciliation failed, requeueing"
    );
    Action::requeue(delay)
}

async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
) -> Result<(), ControllerError>
where
    K: kube::Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        error_action(&ctx, &resource_key(obj.as_ref()), error)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            debug!(resource = %resource_key(obj.as_ref()), "reconciling {}", resource_name);
            reconcile_fn(ctx, obj).await
        }
    };

    let runtime_config = RuntimeConfig::default()
        .debounce(DEBOUNCE)
        .concurrency(reconciler.config.max_concurrent_reconciles);

    Controller::new(api, watcher::Config::default())
        .with_config(runtime_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!(object = %obj.name, "{} reconciliation done", resource_name),
                Err(e) => error!("Controller error for {}: {}", resource_name, e),
            }
        })
        .await;

    Ok(())
}

/// Watches Infrastructure and Worker resources.
#[derive(Debug)]
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    infrastructure_api: Api<Infrastructure>,
    worker_api: Api<Worker>,
}

impl Watcher {
    /// Creates a watcher over `namespace`, or all namespaces when `None`.
    pub fn new(reconciler: Arc<Reconciler>, namespace: Option<&str>) -> Self {
        let client = reconciler.kube_client.clone();
        let (infrastructure_api, worker_api) = match namespace {
            Some(ns) => (Api::namespaced(client.clone(), ns), Api::namespaced(client, ns)),
            None => (Api::all(client.clone()), Api::all(client)),
        };
        Self {
            reconciler,
            infrastructure_api,
            worker_api,
        }
    }

    /// Starts watching Infrastructure resources.
    pub async fn watch_infrastructures(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.infrastructure_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| Box::pin(async move { reconciler.reconcile_infrastructure(&resource).await }),
            "Infrastructure",
        )
        .await
    }

    /// Starts watching Worker resources.
    pub async fn watch_workers(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.worker_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| Box::pin(async move { reconciler.reconcile_worker(&resource).await }),
            "Worker",
        )
        .await
    }
}
