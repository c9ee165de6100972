//! Completion service trait.
//!
//! The completion service is a black box: a prompt goes in, semi-structured
//! text comes out. The pipeline calls it twice per uncached document:
//! - Field extraction (must yield a JSON object with a confidence score)
//! - Contextual risk analysis (qualitative narrative, optional)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What a completion request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPurpose {
    /// Propose the provisional field set for a document.
    FieldExtraction,

    /// Narrate operational and cost risks for a validated record.
    ContextualAnalysis,
}

/// A single prompt sent to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub purpose: CompletionPurpose,
    pub system: String,
    pub user: String,
}

impl CompletionRequest {
    pub fn new(
        purpose: CompletionPurpose,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            purpose,
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Text-completion service used by the pipeline.
///
/// Implementations wrap a specific provider and return the raw reply
/// text; parsing and validation stay in the pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send a prompt and return the raw reply text.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Provider name, used in logs.
    fn name(&self) -> &str {
        "completion"
    }
}
