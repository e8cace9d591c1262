//! Process-wide cache of API clients keyed by credential
//!
//! Building a client per reconciliation would throw away connection pools.
//! The registry is created once at startup and injected into every
//! reconciliation; it is safe for concurrent lookup and insert.

use crate::client::HcloudClient;
use crate::error::HcloudError;
use crate::hcloud_trait::HcloudClientTrait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

/// Builds a client for a token
pub type ClientFactory =
    Arc<dyn Fn(&str) -> Result<Arc<dyn HcloudClientTrait>, HcloudError> + Send + Sync>;

/// Registry of hcloud clients keyed by a SHA-256 digest of the API token.
///
/// Tokens themselves are never stored as map keys.
#[derive(Clone)]
pub struct ClientRegistry {
    clients: Arc<DashMap<String, Arc<dyn HcloudClientTrait>>>,
    /// Credential source (e.g. `namespace/secret`) -> digest it last resolved to
    sources: Arc<DashMap<String, String>>,
    factory: ClientFactory,
}

impl ClientRegistry {
    /// Registry producing [`HcloudClient`]s for `endpoint`
    pub fn new(endpoint: String) -> Self {
        Self::with_factory(Arc::new(move |token: &str| {
            let client = HcloudClient::with_endpoint(endpoint.clone(), token.to_string())?;
            Ok(Arc::new(client) as Arc<dyn HcloudClientTrait>)
        }))
    }

    /// Registry with a custom client factory (used by tests to hand out mocks)
    pub fn with_factory(factory: ClientFactory) -> Self {
        Self {
            clients: Arc::new(DashMap::new()),
            sources: Arc::new(DashMap::new()),
            factory,
        }
    }

    /// Get the cached client for `token`, creating it on first use.
    pub fn get_or_create(&self, token: &str) -> Result<Arc<dyn HcloudClientTrait>, HcloudError> {
        let key = token_digest(token);
        match self.clients.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                debug!(key = %&entry.key()[..12], "Creating hcloud client");
                let client = (self.factory)(token)?;
                entry.insert(client.clone());
                Ok(client)
            }
        }
    }

    /// Client for the token currently held by `source`.
    ///
    /// When `source` held a different token before, the client of the old
    /// token is dropped unless another source still resolves to it.
    pub fn get_for_source(&self, source: &str, token: &str) -> Result<Arc<dyn HcloudClientTrait>, HcloudError> {
        let digest = token_digest(token);
        let previous = self.sources.insert(source.to_string(), digest.clone());
        if let Some(previous) = previous.filter(|p| *p != digest)
            && !self.sources.iter().any(|entry| *entry.value() == previous)
            && self.clients.remove(&previous).is_some()
        {
            debug!(source, key = %&previous[..12], "Dropped hcloud client of rotated token");
        }
        self.get_or_create(token)
    }

    /// Number of cached clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHcloudClient;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_registry(created: Arc<AtomicUsize>) -> ClientRegistry {
        ClientRegistry::with_factory(Arc::new(move |_token: &str| {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MockHcloudClient::new()) as Arc<dyn HcloudClientTrait>)
        }))
    }

    #[test]
    fn test_same_token_reuses_client() {
        let created = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(created.clone());

        let a = registry.get_or_create("token-a").unwrap();
        let b = registry.get_or_create("token-a").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_tokens() {
        let created = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(created.clone());

        let a = registry.get_or_create("token-a").unwrap();
        let b = registry.get_or_create("token-b").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_rotated_token_drops_old_client() {
        let created = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(created.clone());

        let old = registry.get_for_source("ns/creds", "token-a").unwrap();
        let same = registry.get_for_source("ns/creds", "token-a").unwrap();
        assert!(Arc::ptr_eq(&old, &same));
        assert_eq!(registry.len(), 1);

        let rotated = registry.get_for_source("ns/creds", "token-b").unwrap();
        assert!(!Arc::ptr_eq(&old, &rotated));
        assert_eq!(registry.len(), 1);

        let again = registry.get_for_source("ns/creds", "token-a").unwrap();
        assert!(!Arc::ptr_eq(&old, &again));
        assert_eq!(created.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_shared_token_kept_while_referenced() {
        let created = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(created.clone());

        let shared = registry.get_for_source("ns-1/creds", "token-a").unwrap();
        registry.get_for_source("ns-2/creds", "token-a").unwrap();
        registry.get_for_source("ns-1/creds", "token-b").unwrap();
        assert_eq!(registry.len(), 2);

        let still = registry.get_for_source("ns-2/creds", "token-a").unwrap();
        assert!(Arc::ptr_eq(&shared, &still));
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_digest_hides_token() {
        let digest = token_digest("secret");
        assert_eq!(digest.len(), 64);
        assert!(!digest.contains("secret"));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_client() {
        let created = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(created.clone());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get_or_create("shared").map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(created.load(Ordering::SeqCst), 1);
    }
}
