//! Testing utilities including a mock completion service.
//!
//! Useful for exercising the pipeline without making real completion calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{ExtractionError, Result};
use crate::traits::completion::{CompletionPurpose, CompletionRequest, CompletionService};

/// A mock completion service with canned replies per purpose.
///
/// Clones share replies and call history, so a test can keep one handle
/// while the pipeline owns another.
#[derive(Clone, Default)]
pub struct MockCompletion {
    /// Canned reply text by purpose
    replies: Arc<RwLock<HashMap<CompletionPurpose, String>>>,

    /// Purposes that fail, with the error message
    failures: Arc<RwLock<HashMap<CompletionPurpose, String>>>,

    /// Simulated latency per call
    delay: Option<Duration>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<CompletionRequest>>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `text` for every request of `purpose`.
    pub fn with_reply(self, purpose: CompletionPurpose, text: impl Into<String>) -> Self {
        self.set_reply(purpose, text);
        self
    }

    /// Fail every request of `purpose`.
    pub fn with_failure(self, purpose: CompletionPurpose, message: impl Into<String>) -> Self {
        self.set_failure(purpose, message);
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_reply(&self, purpose: CompletionPurpose, text: impl Into<String>) {
        self.replies.write().unwrap().insert(purpose, text.into());
    }

    pub fn set_failure(&self, purpose: CompletionPurpose, message: impl Into<String>) {
        self.failures.write().unwrap().insert(purpose, message.into());
    }

    pub fn clear_failure(&self, purpose: CompletionPurpose) {
        self.failures.write().unwrap().remove(&purpose);
    }

    /// Get all requests made to this mock.
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self, purpose: CompletionPurpose) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.purpose == purpose)
            .count()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let purpose = request.purpose;
        self.calls.write().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.failures.read().unwrap().get(&purpose) {
            return Err(ExtractionError::completion(message.clone()));
        }

        self.replies
            .read()
            .unwrap()
            .get(&purpose)
            .cloned()
            .ok_or_else(|| ExtractionError::completion(format!("no mock reply for {purpose:?}")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replies_and_tracks_calls() {
        let mock = MockCompletion::new()
            .with_reply(CompletionPurpose::FieldExtraction, "{\"guven_skoru\": 0.9}");

        let reply = mock
            .complete(CompletionRequest::new(CompletionPurpose::FieldExtraction, "sys", "doc"))
            .await
            .unwrap();
        assert!(reply.contains("guven_skoru"));

        let err = mock
            .complete(CompletionRequest::new(CompletionPurpose::ContextualAnalysis, "sys", "rec"))
            .await
            .unwrap_err();
        assert!(err.is_upstream_failure());

        assert_eq!(mock.calls().len(), 2);
        assert_eq!(mock.call_count(CompletionPurpose::FieldExtraction), 1);
    }

    #[tokio::test]
    async fn test_failure_overrides_reply() {
        let mock = MockCompletion::new()
            .with_reply(CompletionPurpose::FieldExtraction, "{}")
            .with_failure(CompletionPurpose::FieldExtraction, "service unavailable");

        let request = CompletionRequest::new(CompletionPurpose::FieldExtraction, "", "");
        assert!(mock.complete(request.clone()).await.is_err());

        mock.clear_failure(CompletionPurpose::FieldExtraction);
        assert_eq!(mock.complete(request).await.unwrap(), "{}");
    }
}
