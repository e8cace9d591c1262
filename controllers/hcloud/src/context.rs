//! Per-reconciliation cancellation and deadline.

use crate::error::ControllerError;
use hcloud_client::HcloudError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Scope of one reconciliation: a child of the process-wide shutdown token
/// plus a deadline. Every cloud call made while reconciling races both.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    cancel: CancellationToken,
    deadline: Instant,
}

impl ReconcileContext {
    pub fn new(parent: &CancellationToken, timeout: Duration) -> Self {
        Self {
            cancel: parent.child_token(),
            deadline: Instant::now() + timeout,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Run `fut` unless cancellation or the deadline comes first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ControllerError>
    where
        F: Future<Output = Result<T, ControllerError>>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ControllerError::Cancelled),
            () = tokio::time::sleep_until(self.deadline) => Err(ControllerError::Cancelled),
            result = fut => result,
        }
    }

    /// Run a cloud call, attributing failures to `kind`/`name`.
    pub async fn call<T, F>(&self, kind: &'static str, name: &str, fut: F) -> Result<T, ControllerError>
    where
        F: Future<Output = Result<T, HcloudError>>,
    {
        self.run(async { fut.await.map_err(ControllerError::cloud(kind, name)) })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_passes_result_through() {
        let root = CancellationToken::new();
        let ctx = ReconcileContext::new(&root, Duration::from_secs(5));
        let value = ctx.call("network", "ns", async { Ok::<_, HcloudError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_call_attributes_errors() {
        let root = CancellationToken::new();
        let ctx = ReconcileContext::new(&root, Duration::from_secs(5));
        let err = ctx
            .call::<(), _>("ssh key", "ns", async {
                Err(HcloudError::Authentication("bad token".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Cloud { kind: "ssh key", .. }));
    }

    #[tokio::test]
    async fn test_parent_cancellation_wins() {
        let root = CancellationToken::new();
        let ctx = ReconcileContext::new(&root, Duration::from_secs(5));
        root.cancel();
        assert!(ctx.is_cancelled());
        let result = ctx.run(std::future::pending::<Result<(), ControllerError>>()).await;
        assert!(matches!(result, Err(ControllerError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let root = CancellationToken::new();
        let ctx = ReconcileContext::new(&root, Duration::from_millis(50));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ControllerError::Cancelled)));
        assert!(!root.is_cancelled());
    }
}
