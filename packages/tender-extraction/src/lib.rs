//! Tender Extraction Disambiguation & Validation
//!
//! A deterministic, auditable layer between a probabilistic text-completion
//! service and the stored record of a Turkish food-service tender.
//!
//! # Design Philosophy
//!
//! **"The model proposes, the rules decide"**
//!
//! - The completion service suggests fields; nothing it says is trusted as-is
//! - Every number is classified by the grammar around it (staff vs. people fed)
//! - Corrections are recorded as warnings, never applied silently
//! - Financial figures are derived, never stored on their own
//! - Identical texts are extracted once
//!
//! # Usage
//!
//! ```rust,ignore
//! use tender_extraction::{Pipeline, PipelineInput};
//! use tender_extraction::ai::OpenAI;
//!
//! let pipeline = Pipeline::new(OpenAI::from_env()?);
//!
//! let record = pipeline
//!     .run(PipelineInput::new(text).with_filename("Teknik_Sartname.pdf"))
//!     .await?;
//!
//! for warning in &record.warnings {
//!     println!("{}: {}", warning.field, warning.message);
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Completion service and clock abstractions
//! - [`types`] - Records, warnings, classifications and config
//! - [`pipeline`] - Disambiguation, validation, classification, finance
//! - [`cache`] - Content-hash result cache with request coalescing
//! - [`ai`] - Completion service implementations
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod cache;
pub mod error;
pub mod pipeline;
pub mod testing;
pub mod text;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use cache::{content_hash, CacheStats, ResultCache};
pub use error::{ExtractionError, Result};
pub use pipeline::{Pipeline, PipelineInput};
pub use traits::{
    clock::{Clock, ManualClock, SystemClock},
    completion::{CompletionPurpose, CompletionRequest, CompletionService},
};
pub use types::{
    classification::{DocumentClassification, DocumentType, TypeGuess},
    config::{FinancialConfig, PipelineConfig},
    context::ContextualAnalysis,
    cost_table::{CostItem, CostTable},
    financial::{FinancialAnnotation, RiskLevel, Verdict},
    record::{ExtractionRecord, RawExtraction, RawField},
    warning::{RecordField, Severity, ValidationWarning},
};
