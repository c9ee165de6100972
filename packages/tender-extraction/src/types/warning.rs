//! Validation warnings attached to every record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How serious a validation finding is.
///
/// None of these abort the pipeline; `Error` must still be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// The record field a warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    Headcount,
    MealsPerDay,
    Days,
    Budget,
    TotalMeals,
    UnitPrice,
    DocumentType,
    CostTable,
    ContextualAnalysis,
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordField::Headcount => "headcount",
            RecordField::MealsPerDay => "meals_per_day",
            RecordField::Days => "days",
            RecordField::Budget => "budget",
            RecordField::TotalMeals => "total_meals",
            RecordField::UnitPrice => "unit_price",
            RecordField::DocumentType => "document_type",
            RecordField::CostTable => "cost_table",
            RecordField::ContextualAnalysis => "contextual_analysis",
        };
        f.write_str(name)
    }
}

/// A range, consistency or correction finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub field: RecordField,
    pub severity: Severity,
    pub message: String,
    pub original_value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<Value>,
    pub auto_fixed: bool,
}

impl ValidationWarning {
    /// A detected-but-unresolved anomaly.
    pub fn flagged(
        field: RecordField,
        severity: Severity,
        message: impl Into<String>,
        original_value: impl Into<Value>,
    ) -> Self {
        Self {
            field,
            severity,
            message: message.into(),
            original_value: original_value.into(),
            suggested_value: None,
            auto_fixed: false,
        }
    }

    /// A correction that was applied to the record.
    pub fn fixed(
        field: RecordField,
        severity: Severity,
        message: impl Into<String>,
        original_value: impl Into<Value>,
        suggested_value: impl Into<Value>,
    ) -> Self {
        Self {
            field,
            severity,
            message: message.into(),
            original_value: original_value.into(),
            suggested_value: Some(suggested_value.into()),
            auto_fixed: true,
        }
    }
}
