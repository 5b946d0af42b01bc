//! Bearer-authenticated request execution with one-shot 401 recovery

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use oauth_client::OAuthClient;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::limits::ConnectionLimits;
use crate::settings::HttpSettings;

/// Map a method name onto the supported set. Matching is case-insensitive.
pub fn parse_method(method: &str) -> Result<Method> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        _ => Err(Error::UnsupportedMethod(method.to_string())),
    }
}

/// Optional parts of an outbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Override the default headers on name collision
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    /// Sent as a JSON body when present
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A fully-read upstream response. Any status, including non-2xx.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP client that authenticates every request with the shared OAuth token.
pub struct AuthenticatedClient {
    oauth: Arc<OAuthClient>,
    http: reqwest::Client,
    limits: ConnectionLimits,
    timeout: Duration,
}

impl AuthenticatedClient {
    pub fn new(oauth: Arc<OAuthClient>, settings: &HttpSettings) -> Result<Self> {
        let http = settings.build_client()?;
        Ok(Self::with_client(oauth, http, settings))
    }

    /// Use a pre-built `reqwest::Client`; caps and total timeout still come
    /// from `settings`.
    pub fn with_client(
        oauth: Arc<OAuthClient>,
        http: reqwest::Client,
        settings: &HttpSettings,
    ) -> Self {
        Self {
            oauth,
            http,
            limits: ConnectionLimits::new(settings.max_connections, settings.max_connections_per_host),
            timeout: settings.timeout,
        }
    }

    pub fn oauth(&self) -> &Arc<OAuthClient> {
        &self.oauth
    }

    pub async fn get(&self, url: &str, query: Vec<(String, String)>) -> Result<UpstreamResponse> {
        self.request("GET", url, RequestOptions::default().with_query(query))
            .await
    }

    /// Send an authenticated request.
    ///
    /// Token acquisition failures are returned before any request is sent.
    /// A 401 response forces one token refresh and one resend; the second
    /// response is returned whatever its status.
    #[instrument(skip_all, fields(method = %method, url = %url))]
    pub async fn request(
        &self,
        method: &str,
        url: &str,
        options: RequestOptions,
    ) -> Result<UpstreamResponse> {
        let method = parse_method(method)?;
        let url = Url::parse(url).map_err(|e| Error::InvalidRequest(format!("{url}: {e}")))?;

        let token = self.oauth.get_token(false).await?;
        let response = self.send(&method, &url, &options, &token).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("upstream returned 401, refreshing token and retrying once");
        metrics::counter!("upstream_auth_retries_total").increment(1);
        let token = self.oauth.get_token(true).await?;
        self.send(&method, &url, &options, &token).await
    }

    fn headers_for(&self, token: &str, overrides: &HeaderMap) -> Result<HeaderMap> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::InvalidRequest(format!("token is not a valid header value: {e}")))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in overrides {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }

    async fn send(
        &self,
        method: &Method,
        url: &Url,
        options: &RequestOptions,
        token: &str,
    ) -> Result<UpstreamResponse> {
        let headers = self.headers_for(token, &options.headers)?;
        let host = host_key(url);

        let attempt = async {
            let _permit = self.limits.acquire(&host).await?;
            let mut builder = self
                .http
                .request(method.clone(), url.clone())
                .headers(headers);
            if !options.query.is_empty() {
                builder = builder.query(&options.query);
            }
            if let Some(body) = &options.body {
                builder = builder.json(body);
            }
            let response = builder
                .send()
                .await
                .map_err(|e| Error::from_transport("upstream request", e))?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::from_transport("reading upstream response", e))?;
            Ok::<_, Error>(UpstreamResponse {
                status,
                headers,
                body,
            })
        };

        let result = match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "no response from {host} within {:?}",
                self.timeout
            ))),
        };

        let status_label = match &result {
            Ok(response) => response.status.as_u16().to_string(),
            Err(_) => "error".to_string(),
        };
        metrics::counter!(
            "upstream_requests_total",
            "method" => method.to_string(),
            "status" => status_label.clone()
        )
        .increment(1);
        debug!(status = %status_label, "upstream request finished");

        result
    }
}

fn host_key(url: &Url) -> String {
    match (url.host_str(), url.port_or_known_default()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}
