//! Provider error types

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by the GitLab client and the resource handlers
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The remote answered 404, or a paginated scan came up empty.
    /// Read handlers turn this into "drop the local record".
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("GitLab API error: {status} - {message}")]
    Api { status: StatusCode, message: String },

    #[error("Invalid status code returned: {0}")]
    UnexpectedStatus(String),

    #[error("{0}")]
    InvalidId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("{type_name} does not support {operation}")]
    Unsupported {
        type_name: String,
        operation: &'static str,
    },

    #[error("Provider is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Whether this is the normalized "not found" sentinel
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }

    /// HTTP status of an API failure, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ProviderError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            ProviderError::Api { status, .. } => Some(*status),
            ProviderError::Http(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
