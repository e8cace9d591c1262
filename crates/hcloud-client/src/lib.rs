//! hcloud REST API Client
//!
//! A Rust client library for the hcloud (Hetzner Cloud) REST API, scoped to
//! what an infrastructure/worker provider extension needs.
//!
//! # Example
//!
//! ```no_run
//! use hcloud_client::{HcloudClient, HcloudClientTrait, ImageListOpts, ImageType};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HcloudClient::new("your-api-token".to_string())?;
//!
//! // Look up a network by name
//! let network = client.get_network_by_name("shoot--dev--local").await?;
//!
//! // List system images
//! let opts = ImageListOpts {
//!     image_type: Some(ImageType::System),
//!     ..Default::default()
//! };
//! let images = client.list_images(&opts).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Networks, SSH keys, placement groups**: get, create, delete
//! - **SSH fingerprints**: the legacy MD5 form the API filters by
//! - **Catalogue**: images, datacenters, server types, locations
//! - **Pagination**: list endpoints follow `meta.pagination.next_page`
//! - **Client registry**: process-wide cache of clients keyed by token digest
//! - **Mocking**: `MockHcloudClient` behind the `test-util` feature

pub mod client;
pub mod common;
pub mod error;
pub mod fingerprint;
pub mod models;
#[path = "trait.rs"]
pub mod hcloud_trait;
pub mod registry;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{HcloudClient, DEFAULT_ENDPOINT};
pub use common::HttpClient;
pub use error::HcloudError;
pub use fingerprint::ssh_key_fingerprint;
pub use hcloud_trait::HcloudClientTrait;
pub use models::*;
pub use registry::{ClientFactory, ClientRegistry};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockHcloudClient;
