//! Client-credentials token exchange
//!
//! POSTs `grant_type=client_credentials&scope=<scope>` to the token endpoint
//! with HTTP Basic authentication built from the client id and secret. Only
//! a 200 carrying a non-empty `access_token` counts as success.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::Secret;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EXPIRES_IN, DEFAULT_SCOPE, DEFAULT_TOKEN_ENDPOINT, MAX_EXPIRES_IN};
use crate::error::{Error, Result};

/// Client-credentials configuration, immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub scope: String,
    pub token_endpoint: String,
}

impl Credentials {
    /// Credentials against the default endpoint and scope.
    pub fn new(client_id: impl Into<String>, client_secret: Secret<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            scope: DEFAULT_SCOPE.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = endpoint.into();
        self
    }
}

/// Raw token endpoint response.
///
/// Every field is optional so a 200 without `access_token` is reported as
/// an auth failure rather than a parse error.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
}

/// A token accepted from the endpoint, ready to be cached.
#[derive(Debug)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: Duration,
}

/// `Basic base64(client_id:client_secret)`
pub fn basic_auth_header(client_id: &str, client_secret: &str) -> Result<HeaderValue> {
    let encoded = STANDARD.encode(format!("{client_id}:{client_secret}"));
    let mut value = HeaderValue::from_str(&format!("Basic {encoded}")).map_err(|e| {
        Error::AuthFailure {
            status: None,
            message: format!("client credentials cannot form a header: {e}"),
        }
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Exchange client credentials for an access token.
///
/// Transport failures map to `Network`/`Timeout`; any response other than a
/// 200 with a usable token maps to `AuthFailure` carrying status and body.
pub async fn exchange_client_credentials(
    client: &reqwest::Client,
    credentials: &Credentials,
) -> Result<IssuedToken> {
    let authorization = basic_auth_header(
        &credentials.client_id,
        credentials.client_secret.expose(),
    )?;

    let response = client
        .post(&credentials.token_endpoint)
        .header(AUTHORIZATION, authorization)
        .form(&[
            ("grant_type", "client_credentials"),
            ("scope", credentials.scope.as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::from_transport("token request failed", e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::from_transport("reading token response failed", e))?;

    if status != StatusCode::OK {
        return Err(Error::AuthFailure {
            status: Some(status.as_u16()),
            message: format!("token endpoint returned {status}: {body}"),
        });
    }

    parse_token_response(&body)
}

/// Validate a 200 body and turn it into an `IssuedToken`.
pub fn parse_token_response(body: &str) -> Result<IssuedToken> {
    let parsed: TokenResponse = serde_json::from_str(body).map_err(|e| Error::AuthFailure {
        status: Some(200),
        message: format!("invalid token response: {e}"),
    })?;

    let access_token = parsed
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::AuthFailure {
            status: Some(200),
            message: "token response has no access_token".into(),
        })?;

    let expires_in = parsed
        .expires_in
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_EXPIRES_IN)
        .min(MAX_EXPIRES_IN);

    Ok(IssuedToken {
        access_token,
        expires_in,
    })
}
