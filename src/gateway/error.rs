//! Gateway error types

use thiserror::Error;

/// Failure of one follow-up request, with classification for logging
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Timeout, message)
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self::new(
            GatewayErrorKind::HttpStatus(status),
            format!("HTTP {status}: {body}"),
        )
    }

    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::InvalidBody, message)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::timeout(format!("Request timed out: {e}"))
        } else {
            GatewayError::network(format!("Request failed: {e}"))
        }
    }
}

/// Error classification
///
/// Every kind is handled the same way by the session (an error turn); the
/// distinction only feeds logs and the relay's responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Connection refused, DNS, reset
    Network,
    /// No response within the configured timeout
    Timeout,
    /// Non-success HTTP status
    HttpStatus(u16),
    /// Body was not a JSON object
    InvalidBody,
}

impl GatewayErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::HttpStatus(_) => "http_status",
            Self::InvalidBody => "invalid_body",
        }
    }
}
