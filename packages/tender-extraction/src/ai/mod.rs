//! Completion service implementations.
//!
//! The pipeline only depends on the `CompletionService` trait; this module
//! provides a reference OpenAI client and a rate-limiting wrapper that
//! works with any implementation.

#[cfg(feature = "openai")]
mod openai;
mod rate_limited;

#[cfg(feature = "openai")]
pub use openai::OpenAI;
pub use rate_limited::RateLimitedCompletion;
