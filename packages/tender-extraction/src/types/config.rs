//! Configuration types for the extraction pipeline.

use serde::{Deserialize, Serialize};

/// Configuration for the extraction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How long a cached record stays valid, in seconds.
    ///
    /// Default: 3600 (one hour).
    pub cache_ttl_secs: u64,

    /// Maximum number of records held by the result cache.
    ///
    /// Least-recently-used entries are evicted beyond this bound.
    /// Default: 100.
    pub cache_capacity: usize,

    /// Reference market cost of a single meal.
    ///
    /// Used for margin, cash-flow and verdict derivation. Default: 17.0.
    pub baseline_meal_cost: f64,

    /// Payment lag assumed for the cash-flow requirement, in days.
    ///
    /// Default: 60.
    pub payment_lag_days: u32,

    /// Per-meal cost used when estimating a missing budget.
    ///
    /// Default: 12.0.
    pub budget_estimate_meal_cost: f64,

    /// Leading characters of the document scanned by the content classifier.
    ///
    /// Default: 5000.
    pub content_scan_chars: usize,

    /// Run the qualitative contextual analysis after validation.
    ///
    /// Default: true.
    pub run_contextual_analysis: bool,

    /// Upper bound on a single completion call, in seconds.
    ///
    /// None leaves timing to the caller. Default: None.
    #[serde(default)]
    pub completion_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            cache_capacity: 100,
            baseline_meal_cost: 17.0,
            payment_lag_days: 60,
            budget_estimate_meal_cost: 12.0,
            content_scan_chars: 5000,
            run_contextual_analysis: true,
            completion_timeout_secs: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cache time-to-live in seconds.
    pub fn with_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    /// Set the cache capacity bound.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the baseline per-meal cost.
    pub fn with_baseline_meal_cost(mut self, cost: f64) -> Self {
        self.baseline_meal_cost = cost;
        self
    }

    /// Enable or disable contextual analysis.
    pub fn with_contextual_analysis(mut self, enabled: bool) -> Self {
        self.run_contextual_analysis = enabled;
        self
    }

    /// Bound each completion call.
    pub fn with_completion_timeout_secs(mut self, secs: u64) -> Self {
        self.completion_timeout_secs = Some(secs);
        self
    }

    /// Financial settings derived from this config.
    pub fn financial(&self) -> FinancialConfig {
        FinancialConfig {
            baseline_meal_cost: self.baseline_meal_cost,
            payment_lag_days: self.payment_lag_days,
        }
    }
}

/// Settings for the financial deriver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinancialConfig {
    pub baseline_meal_cost: f64,
    pub payment_lag_days: u32,
}

impl Default for FinancialConfig {
    fn default() -> Self {
        PipelineConfig::default().financial()
    }
}
