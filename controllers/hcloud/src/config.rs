//! Process configuration, read once from the environment at startup.

use crate::error::ControllerError;
use hcloud_client::DEFAULT_ENDPOINT;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 5;
const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_PROBES_ADDR: &str = "0.0.0.0:8080";

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Base URL of the hcloud API
    pub hcloud_endpoint: String,
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// Concurrent reconciliations per resource kind
    pub max_concurrent_reconciles: u16,
    /// Deadline of a single reconciliation
    pub reconcile_timeout: Duration,
    /// Listen address of the metrics/probes server
    pub probes_addr: SocketAddr,
}

impl ControllerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_concurrent_reconciles = match non_empty("MAX_CONCURRENT_RECONCILES") {
            Some(v) => v
                .parse::<u16>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid("MAX_CONCURRENT_RECONCILES", &v, "a positive integer"))?,
            None => DEFAULT_MAX_CONCURRENT_RECONCILES,
        };

        let reconcile_timeout_secs = match non_empty("RECONCILE_TIMEOUT_SECS") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid("RECONCILE_TIMEOUT_SECS", &v, "a positive number of seconds"))?,
            None => DEFAULT_RECONCILE_TIMEOUT_SECS,
        };

        let probes_addr = non_empty("PROBES_ADDR").unwrap_or_else(|| DEFAULT_PROBES_ADDR.to_string());
        let probes_addr = probes_addr
            .parse::<SocketAddr>()
            .map_err(|_| invalid("PROBES_ADDR", &probes_addr, "a socket address such as 0.0.0.0:8080"))?;

        Ok(Self {
            hcloud_endpoint: non_empty("HCLOUD_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            namespace: non_empty("WATCH_NAMESPACE"),
            max_concurrent_reconciles,
            reconcile_timeout: Duration::from_secs(reconcile_timeout_secs),
            probes_addr,
        })
    }
}

fn invalid(key: &str, value: &str, expected: &str) -> ControllerError {
    ControllerError::InvalidConfig(format!("{} must be {}, got {:?}", key, expected, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ControllerConfig, ControllerError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ControllerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.hcloud_endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.namespace, None);
        assert_eq!(config.max_concurrent_reconciles, 5);
        assert_eq!(config.reconcile_timeout, Duration::from_secs(300));
        assert_eq!(config.probes_addr.port(), 8080);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HCLOUD_ENDPOINT", "http://localhost:4000/v1"),
            ("WATCH_NAMESPACE", "garden"),
            ("MAX_CONCURRENT_RECONCILES", "12"),
            ("RECONCILE_TIMEOUT_SECS", "30"),
            ("PROBES_ADDR", "127.0.0.1:9090"),
        ])
        .unwrap();
        assert_eq!(config.hcloud_endpoint, "http://localhost:4000/v1");
        assert_eq!(config.namespace.as_deref(), Some("garden"));
        assert_eq!(config.max_concurrent_reconciles, 12);
        assert_eq!(config.reconcile_timeout, Duration::from_secs(30));
        assert_eq!(config.probes_addr.to_string(), "127.0.0.1:9090");
    }

    #[test]
    fn test_empty_namespace_means_all() {
        assert_eq!(load(&[("WATCH_NAMESPACE", "")]).unwrap().namespace, None);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("MAX_CONCURRENT_RECONCILES", "0")]),
            Err(ControllerError::InvalidConfig(_))
        ));
        assert!(matches!(
            load(&[("RECONCILE_TIMEOUT_SECS", "soon")]),
            Err(ControllerError::InvalidConfig(_))
        ));
        assert!(matches!(
            load(&[("PROBES_ADDR", "localhost")]),
            Err(ControllerError::InvalidConfig(_))
        ));
    }
}
