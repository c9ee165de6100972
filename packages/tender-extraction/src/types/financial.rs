//! Financial annotation types.

use serde::{Deserialize, Serialize};

/// Exposure to meat and poultry price volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[serde(alias = "dusuk", alias = "düşük")]
    Low,
    #[serde(alias = "orta")]
    Medium,
    #[serde(alias = "yuksek", alias = "yüksek")]
    High,
}

/// Participation recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Proceed,
    Caution,
    Decline,
}

/// Derived financial view of a validated record.
///
/// Read-only: recomputed from its inputs, never edited on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialAnnotation {
    /// headcount × meals × days, when all three are known and positive.
    pub total_meals: Option<u64>,

    /// budget ÷ total_meals, rounded to two decimals.
    pub unit_price: Option<f64>,

    pub profit_margin_percent: Option<i64>,

    pub protein_dependency_risk: RiskLevel,

    /// headcount × meals × baseline.
    pub daily_cost: Option<f64>,

    /// daily_cost × payment lag.
    pub cash_flow_requirement: Option<f64>,

    /// None when the budget is missing.
    pub verdict: Option<Verdict>,

    pub rationale: String,

    /// Special condition mentioning a low-bid threshold, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_warning: Option<String>,

    pub baseline_meal_cost: f64,
}
