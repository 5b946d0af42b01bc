//! Error types for token acquisition

/// Errors from the client-credentials exchange.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No response was obtained (DNS, refused connection, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded its connect or total timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The token endpoint answered but did not issue a usable token.
    #[error("token exchange failed: {message}")]
    AuthFailure {
        status: Option<u16>,
        message: String,
    },
}

impl Error {
    /// Classify a transport-level `reqwest` failure.
    pub fn from_transport(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(format!("{context}: {err}"))
        } else {
            Error::Network(format!("{context}: {err}"))
        }
    }

    /// HTTP status returned by the token endpoint, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::AuthFailure { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result alias for token operations.
pub type Result<T> = std::result::Result<T, Error>;
