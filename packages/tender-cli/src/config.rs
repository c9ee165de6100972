use anyhow::{Context, Result};
use std::env;
use tender_extraction::PipelineConfig;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub openai_api_key: String,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub requests_per_minute: u32,
    pub pipeline: PipelineConfig,
}

impl CliConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut pipeline = PipelineConfig::default();

        if let Ok(ttl) = env::var("TENDER_CACHE_TTL_SECS") {
            pipeline.cache_ttl_secs = ttl
                .parse()
                .context("TENDER_CACHE_TTL_SECS must be a whole number of seconds")?;
        }
        if let Ok(capacity) = env::var("TENDER_CACHE_CAPACITY") {
            pipeline.cache_capacity = capacity
                .parse()
                .context("TENDER_CACHE_CAPACITY must be a valid number")?;
        }
        if let Ok(cost) = env::var("TENDER_BASELINE_MEAL_COST") {
            pipeline.baseline_meal_cost = cost
                .parse()
                .context("TENDER_BASELINE_MEAL_COST must be a number")?;
        }
        if let Ok(secs) = env::var("TENDER_COMPLETION_TIMEOUT_SECS") {
            pipeline.completion_timeout_secs = Some(
                secs.parse()
                    .context("TENDER_COMPLETION_TIMEOUT_SECS must be a valid number")?,
            );
        }

        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_model: env::var("OPENAI_MODEL").ok(),
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            requests_per_minute: env::var("TENDER_REQUESTS_PER_MINUTE")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("TENDER_REQUESTS_PER_MINUTE must be a valid number")?,
            pipeline,
        })
    }
}
