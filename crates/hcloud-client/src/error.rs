//! hcloud client errors

use thiserror::Error;

/// Errors that can occur when interacting with the hcloud API
#[derive(Debug, Error)]
pub enum HcloudError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// hcloud API returned an error document
    #[error("hcloud API error ({code}): {message}")]
    Api {
        /// Machine-readable error code (e.g. `uniqueness_error`)
        code: String,
        /// Human-readable message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid or revoked token)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl HcloudError {
    /// Whether this error means the addressed resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api { code, .. } => code == "not_found",
            _ => false,
        }
    }
}
