//! Prometheus metrics and health probes.
//!
//! Serves `/healthz` (process alive), `/readyz` (watchers started) and
//! `/metrics` (Prometheus text format) on the probes address.

use crate::error::ControllerError;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Reconciliation metrics of the controller
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconciliations: IntCounterVec,
    failures: IntCounterVec,
    duration: HistogramVec,
    ready: Arc<AtomicBool>,
}

impl Metrics {
    pub fn new() -> Result<Self, ControllerError> {
        let registry = Registry::new();

        let reconciliations = IntCounterVec::new(
            Opts::new("hcloud_reconciliations_total", "Reconciliations by resource kind and operation"),
            &["kind", "operation"],
        )
        .map_err(metrics_error)?;
        let failures = IntCounterVec::new(
            Opts::new("hcloud_reconcile_errors_total", "Failed reconciliations by resource kind and error class"),
            &["kind", "class"],
        )
        .map_err(metrics_error)?;
        let duration = HistogramVec::new(
            HistogramOpts::new("hcloud_reconcile_duration_seconds", "Duration of reconciliations")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
            &["kind"],
        )
        .map_err(metrics_error)?;

        registry.register(Box::new(reconciliations.clone())).map_err(metrics_error)?;
        registry.register(Box::new(failures.clone())).map_err(metrics_error)?;
        registry.register(Box::new(duration.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            reconciliations,
            failures,
            duration,
            ready: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Count a finished reconciliation of `kind`.
    pub fn observe(&self, kind: &str, operation: &str, elapsed: Duration, error: Option<&ControllerError>) {
        self.reconciliations.with_label_values(&[kind, operation]).inc();
        self.duration.with_label_values(&[kind]).observe(elapsed.as_secs_f64());
        if let Some(error) = error {
            let class = if error.is_terminal() { "terminal" } else { "retryable" };
            self.failures.with_label_values(&[kind, class]).inc();
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, ControllerError> {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .map_err(metrics_error)
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").field("ready", &self.is_ready()).finish_non_exhaustive()
    }
}

fn metrics_error(e: prometheus::Error) -> ControllerError {
    ControllerError::InvalidConfig(format!("metrics: {}", e))
}

/// Router of the probes server
pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(render_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    if metrics.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn render_metrics(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    match metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Serve the probes until `cancel` fires.
pub async fn serve(addr: SocketAddr, metrics: Arc<Metrics>, cancel: CancellationToken) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ControllerError::InvalidConfig(format!("binding probes address {}: {}", addr, e)))?;

    info!(address = %addr, "probes server listening");

    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| ControllerError::Watch(format!("probes server: {}", e)))
}
