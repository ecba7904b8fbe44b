// Error handling module
// Defines the error types surfaced to callers of the API client

use thiserror::Error;

/// Errors that can occur while talking to the task API
#[derive(Error, Debug)]
pub enum ClientError {
    /// Login was rejected or the token endpoint was unreachable
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Non-401 HTTP failure, a repeated 401, or a transport error
    #[error("API request failed: {method} {url}: {message}")]
    Request {
        method: String,
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The caller's cancellation token fired
    #[error("Request cancelled")]
    Cancelled,

    /// Token store could not be opened
    #[error("Token storage error: {0}")]
    Storage(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClientError {
    /// HTTP status of the failed response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Request { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
