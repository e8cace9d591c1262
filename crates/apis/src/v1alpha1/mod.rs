//! `hcloud.provider.extensions.gardener.cloud/v1alpha1` wire types
//!
//! The serialized form of the provider documents embedded in the extension
//! resources. Every document carries `apiVersion` and `kind`.

mod conversion;
mod defaults;
mod types;

pub use defaults::Defaulted;
pub use types::*;

/// API version of the documents in this module
pub const API_VERSION: &str = "hcloud.provider.extensions.gardener.cloud/v1alpha1";

/// A top-level wire document with a fixed kind
pub trait Versioned {
    const KIND: &'static str;

    fn type_meta(&self) -> &TypeMeta;

    fn type_meta_mut(&mut self) -> &mut TypeMeta;

    /// Stamp `apiVersion` and `kind` for encoding
    fn set_type_meta(&mut self) {
        let meta = self.type_meta_mut();
        meta.api_version = API_VERSION.to_string();
        meta.kind = Self::KIND.to_string();
    }
}

macro_rules! versioned {
    ($ty:ty, $kind:literal) => {
        impl Versioned for $ty {
            const KIND: &'static str = $kind;

            fn type_meta(&self) -> &TypeMeta {
                &self.type_meta
            }

            fn type_meta_mut(&mut self) -> &mut TypeMeta {
                &mut self.type_meta
            }
        }
    };
}

versioned!(InfrastructureConfig, "InfrastructureConfig");
versioned!(InfrastructureStatus, "InfrastructureStatus");
versioned!(WorkerConfig, "WorkerConfig");
versioned!(WorkerStatus, "WorkerStatus");
versioned!(CloudProfileConfig, "CloudProfileConfig");
