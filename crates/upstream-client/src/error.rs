//! Error types for authenticated upstream calls

/// Errors from `AuthenticatedClient`.
///
/// Non-2xx responses are not errors here; they are returned as
/// `UpstreamResponse` values for the caller to classify.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("authentication failed: {message}")]
    Auth {
        status: Option<u16>,
        message: String,
    },

    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify a transport-level `reqwest` failure.
    pub fn from_transport(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(format!("{context}: {err}"))
        } else if err.is_builder() {
            Error::InvalidRequest(format!("{context}: {err}"))
        } else {
            Error::Network(format!("{context}: {err}"))
        }
    }

    /// Whether no response was obtained (transport failure or timeout).
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout(_))
    }
}

impl From<oauth_client::Error> for Error {
    fn from(err: oauth_client::Error) -> Self {
        match err {
            oauth_client::Error::Network(msg) => Error::Network(msg),
            oauth_client::Error::Timeout(msg) => Error::Timeout(msg),
            oauth_client::Error::AuthFailure { status, message } => Error::Auth { status, message },
        }
    }
}

/// Result alias for upstream calls.
pub type Result<T> = std::result::Result<T, Error>;
