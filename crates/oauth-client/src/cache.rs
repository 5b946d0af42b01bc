//! In-memory bearer token cache
//!
//! Holds at most one token plus its absolute expiry. Validity is judged
//! against `expires_at - safety_margin` so a token is never handed out when
//! it could expire while the upstream call using it is still in flight.
//!
//! The cache itself is not synchronized; `OAuthClient` wraps it in a tokio
//! `Mutex` and holds that lock across the exchange.

use std::time::{Duration, Instant};

use common::Secret;

use crate::constants::{MAX_EXPIRES_IN, SAFETY_MARGIN};

/// A token issued by the authorization server.
///
/// `expires_at` is absolute, computed at storage time from the endpoint's
/// `expires_in` delta.
#[derive(Debug)]
pub struct CachedToken {
    value: Secret<String>,
    expires_at: Instant,
}

impl CachedToken {
    pub fn new(value: String, expires_at: Instant) -> Self {
        Self {
            value: Secret::new(value),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        self.value.expose()
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Whether the token may still be used at `now` given `margin`.
    pub fn is_valid_at(&self, now: Instant, margin: Duration) -> bool {
        match self.expires_at.checked_sub(margin) {
            Some(deadline) => now < deadline,
            None => false,
        }
    }

    /// Time left before the token must be refreshed, zero once inside the margin.
    pub fn refresh_in(&self, now: Instant, margin: Duration) -> Duration {
        self.expires_at
            .checked_sub(margin)
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or_default()
    }
}

/// Single-slot token cache.
#[derive(Debug)]
pub struct TokenCache {
    token: Option<CachedToken>,
    safety_margin: Duration,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(SAFETY_MARGIN)
    }
}

impl TokenCache {
    pub fn new(safety_margin: Duration) -> Self {
        Self {
            token: None,
            safety_margin,
        }
    }

    pub fn safety_margin(&self) -> Duration {
        self.safety_margin
    }

    /// The cached token if it is still valid now.
    pub fn valid_token(&self) -> Option<&str> {
        self.valid_token_at(Instant::now())
    }

    /// The cached token if it is valid at `now`.
    pub fn valid_token_at(&self, now: Instant) -> Option<&str> {
        self.token
            .as_ref()
            .filter(|t| t.is_valid_at(now, self.safety_margin))
            .map(CachedToken::value)
    }

    /// Replace the cached token with one that expires `expires_in` from now.
    pub fn store(&mut self, value: String, expires_in: Duration) {
        self.store_at(value, Instant::now(), expires_in);
    }

    /// Replace the cached token, measuring `expires_in` from `issued_at`.
    ///
    /// `expires_in` is capped at `MAX_EXPIRES_IN` so the expiry instant
    /// cannot overflow.
    pub fn store_at(&mut self, value: String, issued_at: Instant, expires_in: Duration) {
        let lifetime = expires_in.min(MAX_EXPIRES_IN);
        let expires_at = issued_at.checked_add(lifetime).unwrap_or(issued_at);
        self.token = Some(CachedToken::new(value, expires_at));
    }

    pub fn clear(&mut self) {
        self.token = None;
    }

    pub fn token(&self) -> Option<&CachedToken> {
        self.token.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_none()
    }
}
