//! Shared OAuth client with a single-flight token cache
//!
//! `get_token` holds the cache lock across the token exchange, so concurrent
//! callers that find the cache empty or stale queue behind the first one and
//! then re-check the cache instead of starting exchanges of their own. A
//! failed exchange leaves the cache exactly as it was.

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::cache::TokenCache;
use crate::constants::SAFETY_MARGIN;
use crate::error::Result;
use crate::token::{Credentials, exchange_client_credentials};

/// Token cache state for health reporting. Never includes the token itself.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenStatus {
    pub cached: bool,
    pub valid: bool,
    /// Seconds until a refresh is required (0 once inside the safety margin)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_in_secs: Option<u64>,
}

/// OAuth2 client-credentials client owning the process-wide token cache.
pub struct OAuthClient {
    credentials: Credentials,
    http: reqwest::Client,
    cache: Mutex<TokenCache>,
}

impl OAuthClient {
    pub fn new(credentials: Credentials, http: reqwest::Client) -> Self {
        Self::with_safety_margin(credentials, http, SAFETY_MARGIN)
    }

    pub fn with_safety_margin(
        credentials: Credentials,
        http: reqwest::Client,
        safety_margin: Duration,
    ) -> Self {
        Self {
            credentials,
            http,
            cache: Mutex::new(TokenCache::new(safety_margin)),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Return a valid bearer token, exchanging credentials when needed.
    ///
    /// With `force_refresh = false` a cached token outside the safety margin
    /// is returned without any network I/O. With `force_refresh = true` an
    /// exchange always happens.
    #[instrument(skip(self), fields(client_id = %self.credentials.client_id))]
    pub async fn get_token(&self, force_refresh: bool) -> Result<String> {
        let mut cache = self.cache.lock().await;

        if !force_refresh {
            if let Some(token) = cache.valid_token() {
                debug!("using cached access token");
                return Ok(token.to_string());
            }
        }

        debug!(force_refresh, "requesting access token");
        match exchange_client_credentials(&self.http, &self.credentials).await {
            Ok(issued) => {
                cache.store(issued.access_token.clone(), issued.expires_in);
                metrics::counter!("oauth_token_exchanges_total", "outcome" => "success")
                    .increment(1);
                info!(
                    expires_in_secs = issued.expires_in.as_secs(),
                    "access token acquired"
                );
                Ok(issued.access_token)
            }
            Err(e) => {
                metrics::counter!("oauth_token_exchanges_total", "outcome" => "failure")
                    .increment(1);
                warn!(error = %e, status = ?e.status(), "token exchange failed");
                Err(e)
            }
        }
    }

    /// Drop the cached token; the next `get_token` performs an exchange.
    pub async fn invalidate_cache(&self) {
        self.cache.lock().await.clear();
        info!("token cache cleared");
    }

    pub async fn status(&self) -> TokenStatus {
        let cache = self.cache.lock().await;
        let now = Instant::now();
        match cache.token() {
            Some(token) => TokenStatus {
                cached: true,
                valid: token.is_valid_at(now, cache.safety_margin()),
                refresh_in_secs: Some(token.refresh_in(now, cache.safety_margin()).as_secs()),
            },
            None => TokenStatus {
                cached: false,
                valid: false,
                refresh_in_secs: None,
            },
        }
    }
}
