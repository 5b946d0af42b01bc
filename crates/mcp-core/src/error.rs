//! Uniform failure taxonomy for tool calls

use serde::Serialize;
use serde_json::{Value, json};

/// Classification of a failed tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response obtained: transport failure or timeout
    NetworkError,
    /// Token exchange rejected or malformed
    AuthFailure,
    /// Non-success status from the tool's target API
    UpstreamError,
    InvalidArguments,
    MissingParameter,
    ToolNotFound,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "network_error",
            ErrorKind::AuthFailure => "auth_failure",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::InvalidArguments => "invalid_arguments",
            ErrorKind::MissingParameter => "missing_parameter",
            ErrorKind::ToolNotFound => "tool_not_found",
            ErrorKind::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expected failure returned by `Tool::execute` or raised by dispatch.
///
/// `message` is the short caller-facing summary; `detail` (defaulting to
/// `message`) carries diagnostics such as the upstream body.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ToolFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl ToolFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn missing_parameter(field: &str) -> Self {
        Self::new(
            ErrorKind::MissingParameter,
            format!("Missing required parameter: {field} is required"),
        )
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArguments, message)
    }

    pub fn tool_not_found(name: &str) -> Self {
        Self::new(ErrorKind::ToolNotFound, format!("Unknown tool: {name}"))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    /// Wire envelope: `{status: "error", message, error, kind}`.
    pub fn envelope(&self) -> Value {
        json!({
            "status": "error",
            "message": self.message,
            "error": self.detail.as_deref().unwrap_or(&self.message),
            "kind": self.kind.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_defaults_error_to_message() {
        let failure = ToolFailure::missing_parameter("ucid");
        let envelope = failure.envelope();
        assert_eq!(envelope["status"], "error");
        assert_eq!(envelope["message"], "Missing required parameter: ucid is required");
        assert_eq!(envelope["error"], envelope["message"]);
        assert_eq!(envelope["kind"], "missing_parameter");
    }

    #[test]
    fn envelope_carries_detail() {
        let failure = ToolFailure::new(ErrorKind::UpstreamError, "API request failed with status 503")
            .with_detail("API request failed with status 503: unavailable");
        let envelope = failure.envelope();
        assert_eq!(envelope["message"], "API request failed with status 503");
        assert_eq!(envelope["error"], "API request failed with status 503: unavailable");
    }

    #[test]
    fn unknown_tool_names_the_tool() {
        let envelope = ToolFailure::tool_not_found("does_not_exist").envelope();
        assert!(envelope["error"].as_str().unwrap().contains("does_not_exist"));
        assert_eq!(envelope["kind"], "tool_not_found");
    }

    #[test]
    fn labels_match_serde() {
        for kind in [
            ErrorKind::NetworkError,
            ErrorKind::AuthFailure,
            ErrorKind::UpstreamError,
            ErrorKind::InvalidArguments,
            ErrorKind::MissingParameter,
            ErrorKind::ToolNotFound,
            ErrorKind::InternalError,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }
}
