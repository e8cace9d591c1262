//! Controller-specific error types.

use hcloud_apis::codec::DecodeError;
use hcloud_apis::validation::ErrorList;
use hcloud_client::HcloudError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the hcloud controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// hcloud API error on a specific resource
    #[error("hcloud error on {kind} {name:?}: {source}")]
    Cloud {
        kind: &'static str,
        name: String,
        #[source]
        source: HcloudError,
    },

    /// Embedded provider document could not be decoded or encoded
    #[error("Provider document error: {0}")]
    Decode(#[from] DecodeError),

    /// Input failed validation
    #[error("Validation failed: {0}")]
    Validation(ErrorList),

    /// No image backs the requested machine image anywhere
    #[error("Machine image {name}/{version} not found")]
    MachineImageNotFound { name: String, version: String },

    /// Worker without pools
    #[error("Worker has no pools")]
    NoWorkerPools,

    /// Status could not be written
    #[error("Status update failed: {0}")]
    StatusUpdate(String),

    /// Credentials secret missing or incomplete
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Reconciliation was cancelled or ran past its deadline
    #[error("Reconciliation cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Shorthand for mapping an [`HcloudError`] on `kind`/`name`.
    pub fn cloud(kind: &'static str, name: impl Into<String>) -> impl FnOnce(HcloudError) -> Self {
        let name = name.into();
        move |source| Self::Cloud { kind, name, source }
    }

    /// Terminal errors need a spec change to resolve; requeueing them only
    /// burns API quota.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Decode(_)
                | Self::Validation(_)
                | Self::MachineImageNotFound { .. }
                | Self::NoWorkerPools
                | Self::StatusUpdate(_)
                | Self::InvalidConfig(_)
        )
    }
}
