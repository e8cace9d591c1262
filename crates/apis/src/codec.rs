//! Decoding and encoding of embedded provider documents
//!
//! Provider documents arrive embedded in the extension resources as raw
//! JSON (`providerConfig`, `providerStatus`, ...). Decoding checks
//! `apiVersion`/`kind`, applies defaults and converts to the working types
//! in [`crate::hcloud`]. Encoding converts back to the wire form and always
//! stamps `apiVersion` and `kind`.
//!
//! Required configs fail with [`DecodeError::MissingProviderConfig`] when
//! absent; statuses decode an absent payload to their zero value.

use crate::hcloud;
use crate::v1alpha1::{self, Defaulted, Versioned, API_VERSION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors decoding or encoding a provider document
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A required document is absent
    #[error("provider config of kind {kind} is missing")]
    MissingProviderConfig { kind: &'static str },

    /// The document is present but malformed
    #[error("could not decode provider document of kind {kind}: {source}")]
    DecodeFailure {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// `apiVersion` or `kind` does not name a supported document
    #[error("unsupported provider document {api_version}/{kind}, expected {}/{expected}", API_VERSION)]
    UnsupportedVersion {
        api_version: String,
        kind: String,
        expected: &'static str,
    },

    /// The document could not be serialized
    #[error("could not encode provider document of kind {kind}: {source}")]
    EncodeFailure {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Whether the error is about a present-but-unusable document
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::DecodeFailure { .. } | Self::UnsupportedVersion { .. })
    }
}

fn is_empty(raw: Option<&serde_json::Value>) -> bool {
    match raw {
        None | Some(serde_json::Value::Null) => true,
        Some(serde_json::Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

fn decode_wire<W>(raw: &serde_json::Value) -> Result<W, DecodeError>
where
    W: Versioned + Defaulted + DeserializeOwned,
{
    let mut doc: W = serde_json::from_value(raw.clone()).map_err(|source| DecodeError::DecodeFailure {
        kind: W::KIND,
        source,
    })?;

    let meta = doc.type_meta();
    if meta.api_version != API_VERSION || meta.kind != W::KIND {
        return Err(DecodeError::UnsupportedVersion {
            api_version: meta.api_version.clone(),
            kind: meta.kind.clone(),
            expected: W::KIND,
        });
    }

    doc.set_defaults();
    Ok(doc)
}

fn decode_required<W, T>(raw: Option<&serde_json::Value>) -> Result<T, DecodeError>
where
    W: Versioned + Defaulted + DeserializeOwned + Into<T>,
{
    match raw {
        Some(value) if !is_empty(Some(value)) => decode_wire::<W>(value).map(Into::into),
        _ => Err(DecodeError::MissingProviderConfig { kind: W::KIND }),
    }
}

fn decode_optional<W, T>(raw: Option<&serde_json::Value>) -> Result<Option<T>, DecodeError>
where
    W: Versioned + Defaulted + DeserializeOwned + Into<T>,
{
    match raw {
        Some(value) if !is_empty(Some(value)) => decode_wire::<W>(value).map(|w| Some(w.into())),
        _ => Ok(None),
    }
}

fn parse_bytes(kind: &'static str, raw: &[u8]) -> Result<Option<serde_json::Value>, DecodeError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(raw)
        .map(Some)
        .map_err(|source| DecodeError::DecodeFailure { kind, source })
}

fn encode<W: Versioned + Serialize>(doc: &W) -> Result<serde_json::Value, DecodeError> {
    serde_json::to_value(doc).map_err(|source| DecodeError::EncodeFailure {
        kind: W::KIND,
        source,
    })
}

/// Decode a required `InfrastructureConfig`
pub fn decode_infrastructure_config(
    raw: Option<&serde_json::Value>,
) -> Result<hcloud::InfrastructureConfig, DecodeError> {
    decode_required::<v1alpha1::InfrastructureConfig, _>(raw)
}

/// Decode a required `InfrastructureConfig` from bytes
pub fn decode_infrastructure_config_bytes(raw: &[u8]) -> Result<hcloud::InfrastructureConfig, DecodeError> {
    let value = parse_bytes(v1alpha1::InfrastructureConfig::KIND, raw)?;
    decode_infrastructure_config(value.as_ref())
}

/// Decode a required `CloudProfileConfig`
pub fn decode_cloud_profile_config(
    raw: Option<&serde_json::Value>,
) -> Result<hcloud::CloudProfileConfig, DecodeError> {
    decode_required::<v1alpha1::CloudProfileConfig, _>(raw)
}

/// Decode a required `CloudProfileConfig` from bytes
pub fn decode_cloud_profile_config_bytes(raw: &[u8]) -> Result<hcloud::CloudProfileConfig, DecodeError> {
    let value = parse_bytes(v1alpha1::CloudProfileConfig::KIND, raw)?;
    decode_cloud_profile_config(value.as_ref())
}

/// Decode an optional per-pool `WorkerConfig`
pub fn decode_worker_config(raw: Option<&serde_json::Value>) -> Result<Option<hcloud::WorkerConfig>, DecodeError> {
    decode_optional::<v1alpha1::WorkerConfig, _>(raw)
}

/// Decode an `InfrastructureStatus`; an absent payload is the zero status
pub fn decode_infrastructure_status(
    raw: Option<&serde_json::Value>,
) -> Result<hcloud::InfrastructureStatus, DecodeError> {
    Ok(decode_optional::<v1alpha1::InfrastructureStatus, _>(raw)?.unwrap_or_default())
}

/// Decode an `InfrastructureStatus` from bytes
pub fn decode_infrastructure_status_bytes(raw: &[u8]) -> Result<hcloud::InfrastructureStatus, DecodeError> {
    let value = parse_bytes(v1alpha1::InfrastructureStatus::KIND, raw)?;
    decode_infrastructure_status(value.as_ref())
}

/// Decode a `WorkerStatus`; an absent payload is the zero status
pub fn decode_worker_status(raw: Option<&serde_json::Value>) -> Result<hcloud::WorkerStatus, DecodeError> {
    Ok(decode_optional::<v1alpha1::WorkerStatus, _>(raw)?.unwrap_or_default())
}

/// Decode a `WorkerStatus` from bytes
pub fn decode_worker_status_bytes(raw: &[u8]) -> Result<hcloud::WorkerStatus, DecodeError> {
    let value = parse_bytes(v1alpha1::WorkerStatus::KIND, raw)?;
    decode_worker_status(value.as_ref())
}

/// Encode an `InfrastructureStatus` as a versioned wire document
pub fn encode_infrastructure_status(status: &hcloud::InfrastructureStatus) -> Result<serde_json::Value, DecodeError> {
    encode(&v1alpha1::InfrastructureStatus::from(status))
}

/// Encode a `WorkerStatus` as a versioned wire document
pub fn encode_worker_status(status: &hcloud::WorkerStatus) -> Result<serde_json::Value, DecodeError> {
    encode(&v1alpha1::WorkerStatus::from(status))
}

/// Encode a `WorkerStatus` as JSON bytes
pub fn encode_worker_status_bytes(status: &hcloud::WorkerStatus) -> Result<Vec<u8>, DecodeError> {
    let doc = v1alpha1::WorkerStatus::from(status);
    serde_json::to_vec(&doc).map_err(|source| DecodeError::EncodeFailure {
        kind: v1alpha1::WorkerStatus::KIND,
        source,
    })
}

/// Encode an `InfrastructureConfig` (used by tests and tooling)
pub fn encode_infrastructure_config(config: &hcloud::InfrastructureConfig) -> Result<serde_json::Value, DecodeError> {
    encode(&v1alpha1::InfrastructureConfig::from(config))
}

/// Encode a `WorkerConfig` (used by tests and tooling)
pub fn encode_worker_config(config: &hcloud::WorkerConfig) -> Result<serde_json::Value, DecodeError> {
    encode(&v1alpha1::WorkerConfig::from(config))
}

/// Encode a `CloudProfileConfig` (used by tests and tooling)
pub fn encode_cloud_profile_config(config: &hcloud::CloudProfileConfig) -> Result<serde_json::Value, DecodeError> {
    encode(&v1alpha1::CloudProfileConfig::from(config))
}
