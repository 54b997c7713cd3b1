//! Error handling for the bar inventory client
//!
//! Every error here is recoverable: the caller shows [`ClientError::user_message`]
//! and the user can retry.

use thiserror::Error;

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    // Transport errors
    #[error("Cannot reach inventory service at {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    // Backend responses
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Inventory service error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    // Local errors
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Short text suitable for an error banner
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Transport { .. } => {
                "Cannot reach server. Check your API base URL or proxy.".to_string()
            }
            ClientError::Timeout { .. } => "The server took too long to respond.".to_string(),
            ClientError::Unauthorized(_) => "Your session has expired. Please log in again.".to_string(),
            ClientError::Conflict(msg) => format!("Someone else changed this data: {msg}"),
            ClientError::Validation { message, .. } => message.clone(),
            ClientError::Api { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether re-sending the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Transport { .. }
                | ClientError::Timeout { .. }
                | ClientError::Api { status: 500..=599, .. }
        )
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::Configuration(err.to_string())
    }
}
