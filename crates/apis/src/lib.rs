//! hcloud provider extension APIs
//!
//! - `extensions`: the Infrastructure, Worker and Cluster custom resources
//!   the extension is driven by
//! - `hcloud`: working (internal) representation of provider configs and
//!   statuses
//! - `v1alpha1`: versioned wire representation with defaulting and
//!   conversion to and from the working types
//! - `codec`: decoding/encoding of embedded provider documents
//! - `validation`: field validation of provider configs and worker pools

pub mod codec;
pub mod extensions;
pub mod hcloud;
pub mod references;
pub mod v1alpha1;
pub mod validation;

pub use extensions::*;
pub use references::SecretReference;
