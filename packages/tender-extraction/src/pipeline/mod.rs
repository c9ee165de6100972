//! Extraction pipeline stages and the orchestrator that sequences them.
//!
//! Stages are pure functions over text and field sets, except the
//! orchestrator, which owns the completion service and the cache.

pub mod classify;
pub mod cost_table;
pub mod disambiguate;
pub mod financial;
pub mod orchestrator;
pub mod parse;
pub mod prompts;
pub mod validate;

pub use classify::{classify_content, classify_document, classify_filename, reconcile};
pub use cost_table::merge_cost_tables;
pub use disambiguate::{disambiguate, DisambiguationResult, NumberContext};
pub use financial::{derive, FinancialInputs};
pub use orchestrator::{Pipeline, PipelineInput};
pub use validate::{validate, ValidatedFields, ValidationOutcome};
