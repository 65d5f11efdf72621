//! Error types for the Bitbuy partner API client.

use thiserror::Error;

/// Errors returned by [`BitbuyClient`](super::BitbuyClient) operations.
#[derive(Debug, Error)]
pub enum BitbuyError {
    /// The client could not be constructed: unparseable base URL or an HTTP
    /// client that failed to initialize.
    #[error("failed to create client: {0}")]
    Setup(String),

    /// The request could not be prepared for sending (unreadable body,
    /// unusable key, malformed URL).
    #[error("failed to sign request: {0}")]
    Signing(String),

    /// Network-level failure: connection refused, DNS, timeout, or the
    /// response body could not be read.
    #[error("error during request: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with a status other than 200.
    #[error("bitbuy error: {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body text.
        body: String,
    },

    /// The response body is not valid JSON or has an unexpected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The caller cancelled the request before it completed.
    #[error("request cancelled")]
    Cancelled,
}

impl BitbuyError {
    /// HTTP status code if this is an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            BitbuyError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if the server rejected the request signature or key.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

impl From<reqwest::Error> for BitbuyError {
    fn from(err: reqwest::Error) -> Self {
        BitbuyError::Transport(err)
    }
}

impl From<serde_json::Error> for BitbuyError {
    fn from(err: serde_json::Error) -> Self {
        BitbuyError::Decode(err)
    }
}
