//! Pool hash
//!
//! Machine class names carry a short digest of everything that requires
//! new machines when it changes. Counts, zones, labels, annotations and
//! taints are applied to running machines and stay out of the digest.

use hcloud_apis::{UpdateStrategy, WorkerPoolSpec};
use serde_json::Value;
use sha2::{Digest, Sha256};

const POOL_HASH_LEN: usize = 5;

/// Inputs of the pool hash besides the pool itself
#[derive(Debug, Clone, Copy)]
pub struct HashInputs<'a> {
    pub architecture: &'a str,
    /// Effective Kubernetes version of the pool
    pub kubernetes_version: &'a str,
}

/// Short, stable digest of the machine-relevant parts of `pool`.
///
/// Pools updated in place keep their machines across Kubernetes and image
/// version changes, so those versions are left out for them.
pub fn pool_hash(pool: &WorkerPoolSpec, inputs: HashInputs<'_>) -> String {
    let in_place = matches!(
        pool.update_strategy,
        Some(UpdateStrategy::AutoInPlaceUpdate | UpdateStrategy::ManualInPlaceUpdate)
    );

    let mut parts = vec![
        ("machineType", pool.machine_type.clone()),
        ("machineImage.name", pool.machine_image.name.clone()),
        ("architecture", inputs.architecture.to_string()),
    ];
    if !in_place {
        parts.push(("machineImage.version", pool.machine_image.version.clone()));
        parts.push(("kubernetesVersion", inputs.kubernetes_version.to_string()));
    }
    if let Some(config) = &pool.provider_config {
        let mut canonical = String::new();
        write_canonical(config, &mut canonical);
        parts.push(("providerConfig", canonical));
    }

    let mut hasher = Sha256::new();
    for (key, value) in parts {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hex::encode(hasher.finalize());
    digest[..POOL_HASH_LEN].to_string()
}

/// JSON with object keys sorted, independent of how the map was built.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
