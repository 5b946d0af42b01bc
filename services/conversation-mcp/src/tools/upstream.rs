//! Shared request shaping for the conversation-state tools
//!
//! Every tool follows the same steps: check required arguments, copy
//! allow-listed optional arguments into the query, render the path template,
//! GET it through the authenticated client, then reshape the JSON body with
//! per-tool defaults. Every failure comes back as a `ToolFailure`.

use std::sync::Arc;

use mcp_core::{ErrorKind, ToolFailure};
use oauth_client::OAuthClient;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};
use upstream_client::AuthenticatedClient;

/// Everything except RFC 3986 unreserved characters is encoded in a segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Handle to the conversation-state API shared by all tools.
#[derive(Clone)]
pub struct ConversationApi {
    client: Arc<AuthenticatedClient>,
    base_url: String,
}

impl ConversationApi {
    pub fn new(client: Arc<AuthenticatedClient>, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn oauth(&self) -> &Arc<OAuthClient> {
        self.client.oauth()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` with `query` and return the JSON object body of a 200.
    pub async fn fetch(
        &self,
        tool: &str,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<Map<String, Value>, ToolFailure> {
        let url = self.url(path);
        debug!(tool, %url, params = query.len(), "calling conversation API");

        let response = self
            .client
            .get(&url, query)
            .await
            .map_err(|e| classify(tool, e))?;

        if response.status() != 200 {
            let status = response.status();
            let body = response.text();
            warn!(tool, status, "conversation API returned an error");
            return Err(ToolFailure::new(
                ErrorKind::UpstreamError,
                format!("API request failed with status {status}"),
            )
            .with_detail(format!("API request failed with status {status}: {body}")));
        }

        match response.json::<Value>() {
            Ok(Value::Object(body)) => Ok(body),
            Ok(_) => Err(internal(tool, "upstream response is not a JSON object")),
            Err(e) => Err(internal(tool, &format!("invalid JSON from upstream: {e}"))),
        }
    }
}

fn internal(tool: &str, message: &str) -> ToolFailure {
    error!(tool, error = message, "conversation API call failed");
    ToolFailure::internal(format!("Internal error: {message}"))
}

/// Map a client error onto the tool failure taxonomy.
pub fn classify(tool: &str, err: upstream_client::Error) -> ToolFailure {
    match err {
        upstream_client::Error::Network(_) | upstream_client::Error::Timeout(_) => {
            warn!(tool, error = %err, "network error calling conversation API");
            ToolFailure::new(ErrorKind::NetworkError, format!("Network error: {err}"))
        }
        upstream_client::Error::Auth { .. } => {
            warn!(tool, error = %err, "token acquisition failed");
            ToolFailure::new(ErrorKind::AuthFailure, format!("Authentication failed: {err}"))
        }
        other => internal(tool, &other.to_string()),
    }
}

/// A required, non-empty string argument.
pub fn required_str<'a>(arguments: &'a Map<String, Value>, field: &str) -> Result<&'a str, ToolFailure> {
    match arguments.get(field) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value),
        None | Some(Value::Null) => Err(ToolFailure::missing_parameter(field)),
        Some(Value::String(_)) => Err(ToolFailure::missing_parameter(field)),
        Some(_) => Err(ToolFailure::invalid_arguments(format!(
            "Invalid type for parameter {field}: expected string"
        ))),
    }
}

/// Render a query value: strings verbatim, everything else as JSON text.
pub fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Copy the allow-listed arguments that are present and non-null.
pub fn optional_query(arguments: &Map<String, Value>, allowed: &[&str]) -> Vec<(String, String)> {
    allowed
        .iter()
        .filter_map(|name| match arguments.get(*name) {
            None | Some(Value::Null) => None,
            Some(value) => Some((name.to_string(), query_value(value))),
        })
        .collect()
}

/// Substitute `{ucid}` with the percent-encoded identifier.
pub fn render_path(template: &str, ucid: &str) -> String {
    let encoded = utf8_percent_encode(ucid, PATH_SEGMENT).to_string();
    template.replace("{ucid}", &encoded)
}

/// Take `field` from the upstream body, or `default` when the key is absent.
/// An explicit `null` from upstream is passed through.
pub fn field_or(body: &Map<String, Value>, field: &str, default: Value) -> Value {
    body.get(field).cloned().unwrap_or(default)
}
