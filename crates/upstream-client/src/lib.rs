//! Authenticated HTTP client for upstream APIs
//!
//! Wraps outbound calls with a bearer token from `oauth_client::OAuthClient`,
//! the standard JSON headers and a bounded resource policy (connection caps,
//! DNS cache, connect + total timeouts). A 401 triggers exactly one forced
//! token refresh and one resend; a second 401 is returned to the caller.

pub mod client;
pub mod error;
pub mod limits;
pub mod resolver;
pub mod settings;

pub use client::{AuthenticatedClient, RequestOptions, UpstreamResponse, parse_method};
pub use error::{Error, Result};
pub use limits::ConnectionLimits;
pub use resolver::CachingResolver;
pub use settings::HttpSettings;
