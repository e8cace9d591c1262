//! Main controller implementation.
//!
//! Wires the Kubernetes client, the cloud client registry, metrics and the
//! reconciler together, then runs one watcher per resource kind next to the
//! metrics/probes server until one of them exits or shutdown is requested.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::{self, Metrics};
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use hcloud_client::ClientRegistry;
use kube::Client;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

type Task = JoinHandle<Result<(), ControllerError>>;

/// Main controller for hcloud extension resources.
#[derive(Debug)]
pub struct Controller {
    infrastructure_watcher: Task,
    worker_watcher: Task,
    probes_server: Task,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(config: ControllerConfig, shutdown: CancellationToken) -> Result<Self, ControllerError> {
        info!("Initializing hcloud controller");

        let kube_client = Client::try_default().await?;
        let registry = ClientRegistry::new(config.hcloud_endpoint.clone());
        let metrics = Arc::new(Metrics::new()?);
        let namespace = config.namespace.clone();
        let probes_addr = config.probes_addr;

        let reconciler = Arc::new(Reconciler::new(
            kube_client,
            registry,
            config,
            metrics.clone(),
            shutdown.child_token(),
        ));
        let watcher = Arc::new(Watcher::new(reconciler, namespace.as_deref()));

        let infrastructure_watcher = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.watch_infrastructures().await })
        };
        let worker_watcher = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.watch_workers().await })
        };
        let probes_server = tokio::spawn(metrics::serve(probes_addr, metrics.clone(), shutdown.clone()));

        metrics.set_ready(true);
        info!(
            namespace = namespace.as_deref().unwrap_or("all namespaces"),
            %probes_addr,
            "hcloud controller initialized"
        );

        Ok(Self {
            infrastructure_watcher,
            worker_watcher,
            probes_server,
            metrics,
            shutdown,
        })
    }

    /// Runs until a task exits or shutdown is requested.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("hcloud controller running");

        let result = tokio::select! {
            result = &mut self.infrastructure_watcher => {
                task_result("Infrastructure watcher", result, self.shutdown.is_cancelled())
            }
            result = &mut self.worker_watcher => task_result("Worker watcher", result, self.shutdown.is_cancelled()),
            result = &mut self.probes_server => task_result("probes server", result, self.shutdown.is_cancelled()),
            () = self.shutdown.cancelled() => {
                info!("shutdown requested");
                Ok(())
            }
        };

        self.metrics.set_ready(false);
        self.shutdown.cancel();
        self.infrastructure_watcher.abort();
        self.worker_watcher.abort();
        self.probes_server.abort();

        if let Err(e) = &result {
            error!("hcloud controller stopped: {}", e);
        }
        result
    }
}

/// Outcome of a task that stopped; a clean exit is only expected while
/// shutting down.
fn task_result(
    name: &str,
    joined: Result<Result<(), ControllerError>, tokio::task::JoinError>,
    stopping: bool,
) -> Result<(), ControllerError> {
    match joined {
        Ok(Ok(())) if stopping => Ok(()),
        Ok(Ok(())) => Err(ControllerError::Watch(format!("{} exited", name))),
        Ok(Err(e)) => Err(ControllerError::Watch(format!("{} error: {}", name, e))),
        Err(e) => Err(ControllerError::Watch(format!("{} panicked: {}", name, e))),
    }
}
