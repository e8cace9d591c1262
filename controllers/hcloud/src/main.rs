//! hcloud Controller
//!
//! Provider extension controller for Hetzner Cloud:
//! - Infrastructure: worker network and SSH key of a shoot cluster
//! - Worker: placement groups, machine images and the per-zone machine plan
//!
//! Metrics and health probes are served on `PROBES_ADDR`.

mod admission;
mod backoff;
mod config;
mod context;
mod controller;
mod ensurer;
mod error;
mod metrics;
mod planner;
mod reconciler;
mod status;
mod test_utils;
mod watcher;

use anyhow::Result;
use config::ControllerConfig;
use controller::Controller;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("rustls crypto provider already installed");
    }

    info!("Starting hcloud Controller");

    let config = ControllerConfig::from_env()?;
    info!(
        hcloud_endpoint = %config.hcloud_endpoint,
        namespace = config.namespace.as_deref().unwrap_or("all namespaces"),
        max_concurrent_reconciles = config.max_concurrent_reconciles,
        reconcile_timeout_secs = config.reconcile_timeout.as_secs(),
        probes_addr = %config.probes_addr,
        "Configuration loaded"
    );

    let shutdown = CancellationToken::new();
    let cancel_on_signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping controller");
        cancel_on_signal.cancel();
    });

    let controller = Controller::new(config, shutdown).await?;
    if let Err(e) = controller.run().await {
        error!(error = %e, "hcloud Controller failed");
        return Err(e.into());
    }

    info!("hcloud Controller stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
