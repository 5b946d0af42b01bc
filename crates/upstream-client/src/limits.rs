//! In-flight connection caps
//!
//! A global semaphore bounds concurrent outbound requests; a per-host
//! semaphore (created on first use) bounds requests to any single host.
//! Permits are held until the response body has been read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

/// Permits for one outbound request. Dropping releases both.
#[derive(Debug)]
pub struct ConnectionPermit {
    _host: OwnedSemaphorePermit,
    _total: OwnedSemaphorePermit,
}

#[derive(Debug)]
pub struct ConnectionLimits {
    total: Arc<Semaphore>,
    per_host_limit: usize,
    per_host: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl ConnectionLimits {
    pub fn new(max_connections: usize, max_connections_per_host: usize) -> Self {
        Self {
            total: Arc::new(Semaphore::new(max_connections)),
            per_host_limit: max_connections_per_host,
            per_host: Mutex::new(HashMap::new()),
        }
    }

    fn host_semaphore(&self, host: &str) -> Arc<Semaphore> {
        let mut per_host = self.per_host.lock().unwrap_or_else(|e| e.into_inner());
        per_host
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_limit)))
            .clone()
    }

    /// Wait for a host slot, then a global slot.
    pub async fn acquire(&self, host: &str) -> Result<ConnectionPermit> {
        let host_permit = self
            .host_semaphore(host)
            .acquire_owned()
            .await
            .map_err(|_| Error::Network("connection limiter closed".into()))?;
        let total_permit = self
            .total
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Network("connection limiter closed".into()))?;
        Ok(ConnectionPermit {
            _host: host_permit,
            _total: total_permit,
        })
    }

    pub fn available_total(&self) -> usize {
        self.total.available_permits()
    }

    pub fn available_for_host(&self, host: &str) -> usize {
        self.host_semaphore(host).available_permits()
    }
}
