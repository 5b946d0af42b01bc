//! OAuth2 client-credentials authentication
//!
//! Acquires bearer tokens from an authorization server using the
//! client-credentials grant and caches the most recent one in memory.
//! The cache is owned by `OAuthClient`; callers share the client behind an
//! `Arc` and never touch the token directly.
//!
//! Token flow:
//! 1. Caller asks `OAuthClient::get_token(false)`
//! 2. Cached token still outside the safety margin → returned, no network I/O
//! 3. Otherwise `token::exchange_client_credentials()` POSTs to the token endpoint
//! 4. A 200 with `access_token` replaces the cached token; anything else is
//!    an error and the cache keeps its previous contents

pub mod cache;
pub mod client;
pub mod constants;
pub mod error;
pub mod token;

pub use cache::{CachedToken, TokenCache};
pub use client::{OAuthClient, TokenStatus};
pub use constants::*;
pub use error::{Error, Result};
pub use token::{Credentials, IssuedToken, TokenResponse, exchange_client_credentials};
