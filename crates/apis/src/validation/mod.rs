//! Validation of provider configs and worker pools
//!
//! All validators are pure and return an aggregated [`ErrorList`]; they
//! never stop at the first violation.

mod cidr;
mod cloud_profile;
mod field;
mod infrastructure;
mod worker;

pub use cidr::{parse_cidr, validate_cidr_is_canonical, validate_subset};
pub use cloud_profile::validate_cloud_profile_config;
pub use field::{ErrorList, ErrorType, FieldError, FieldPath};
pub use infrastructure::{validate_infrastructure_config, validate_infrastructure_config_update};
pub use worker::{validate_worker_config, validate_workers, validate_workers_update, SUPPORTED_ARCHITECTURES};
