//! Outbound HTTP resource policy

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::resolver::CachingResolver;

/// Connection caps, DNS cache TTL and timeouts for outbound calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Total request timeout, from connect through reading the body
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Concurrent outbound requests across all hosts
    pub max_connections: usize,
    pub max_connections_per_host: usize,
    pub dns_cache_ttl: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_connections: 10,
            max_connections_per_host: 5,
            dns_cache_ttl: Duration::from_secs(300),
        }
    }
}

impl HttpSettings {
    /// Build a `reqwest::Client` honouring these settings.
    ///
    /// The idle pool per host is capped at `max_connections_per_host`; the
    /// in-flight caps themselves are enforced by `ConnectionLimits`.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        if self.max_connections == 0 || self.max_connections_per_host == 0 {
            return Err(Error::Config("connection caps must be greater than 0".into()));
        }
        debug!(
            timeout_secs = self.timeout.as_secs(),
            connect_timeout_secs = self.connect_timeout.as_secs(),
            max_connections = self.max_connections,
            max_connections_per_host = self.max_connections_per_host,
            dns_cache_ttl_secs = self.dns_cache_ttl.as_secs(),
            "building upstream HTTP client"
        );
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .pool_max_idle_per_host(self.max_connections_per_host)
            .dns_resolver(Arc::new(CachingResolver::new(self.dns_cache_ttl)))
            .build()
            .map_err(|e| Error::Config(format!("building HTTP client: {e}")))
    }
}
