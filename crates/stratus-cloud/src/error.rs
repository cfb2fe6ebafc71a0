//! Cloud client error types

use thiserror::Error;

/// Errors surfaced by cloud clients and client acquisition
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider call failed ({status} {code}): {message}")]
    Provider {
        status: u16,
        code: String,
        message: String,
    },

    #[error("No API version registered for resource type: {resource_type}")]
    ApiVersionNotFound { resource_type: String },

    #[error("Invalid resource type string: {0}")]
    InvalidResourceType(String),

    #[error("Unsupported client kind: {0}")]
    UnsupportedClientKind(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Shorthand for a provider-side failure without a structured error code.
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        CloudError::Provider {
            status,
            code: String::new(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
