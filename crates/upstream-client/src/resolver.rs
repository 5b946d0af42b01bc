//! DNS resolver with a fixed-TTL answer cache
//!
//! Installed on the `reqwest` client so repeated calls to the same upstream
//! host skip the system resolver until the cached answer ages out.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedLookup {
    addrs: Vec<SocketAddr>,
    resolved_at: Instant,
}

/// Caches successful lookups for `ttl`. Failed lookups are not cached.
#[derive(Debug, Clone)]
pub struct CachingResolver {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, CachedLookup>>>,
}

impl CachingResolver {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Cached addresses for `host` if the entry is younger than the TTL at `now`.
    pub fn cached(&self, host: &str, now: Instant) -> Option<Vec<SocketAddr>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(host)
            .filter(|entry| now.saturating_duration_since(entry.resolved_at) < self.ttl)
            .map(|entry| entry.addrs.clone())
    }

    pub fn insert(&self, host: &str, addrs: Vec<SocketAddr>, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            host.to_string(),
            CachedLookup {
                addrs,
                resolved_at: now,
            },
        );
    }

    async fn lookup(
        &self,
        host: String,
    ) -> Result<Vec<SocketAddr>, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(addrs) = self.cached(&host, Instant::now()) {
            debug!(host, "dns cache hit");
            return Ok(addrs);
        }
        // Port 0: the connector substitutes the URL's port.
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0)).await?.collect();
        debug!(host, addrs = addrs.len(), "dns lookup");
        if !addrs.is_empty() {
            self.insert(&host, addrs.clone(), Instant::now());
        }
        Ok(addrs)
    }
}

impl Resolve for CachingResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        let host = name.as_str().to_string();
        Box::pin(async move {
            let addrs = resolver.lookup(host).await?;
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok(addrs)
        })
    }
}
