//! Typed errors for the tender extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur while producing an extraction record.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Completion service unavailable, failed or timed out
    #[error("completion service error: {0}")]
    Completion(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Completion reply could not be read as a JSON object
    #[error("malformed completion reply: {reason}")]
    MalformedResponse { reason: String },

    /// Completion reply carried no confidence score
    #[error("completion reply has no confidence score")]
    MissingConfidence,

    /// Auxiliary cost-table analysis failed structural validation
    #[error("invalid cost table at position {index}: {reason}")]
    InvalidCostTable { index: usize, reason: String },

    /// Result cache rejected a write
    #[error("cache error: {0}")]
    Cache(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Failure of a computation this request was coalesced onto
    #[error("{0}")]
    Shared(Arc<ExtractionError>),
}

impl ExtractionError {
    /// Create a completion error from any displayable message.
    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion(message.into().into())
    }

    /// Whether the upstream extraction could not be completed.
    ///
    /// These failures are fatal to the request and are never cached.
    pub fn is_upstream_failure(&self) -> bool {
        match self {
            Self::Completion(_)
            | Self::MalformedResponse { .. }
            | Self::MissingConfidence
            | Self::JsonParse(_) => true,
            Self::Shared(inner) => inner.is_upstream_failure(),
            _ => false,
        }
    }

    /// Unwrap a shared failure when this request held the only reference.
    pub(crate) fn from_shared(err: Arc<ExtractionError>) -> Self {
        Arc::try_unwrap(err).unwrap_or_else(Self::Shared)
    }
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;
