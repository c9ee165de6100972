//! Qualitative contextual analysis returned by the completion service.

use serde::{Deserialize, Serialize};

use super::financial::RiskLevel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalRisks {
    #[serde(alias = "seviye")]
    pub level: RiskLevel,
    #[serde(default, alias = "faktorler")]
    pub factors: Vec<String>,
    #[serde(default, alias = "oneriler")]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDeviation {
    /// Likelihood of exceeding the estimated cost, in percent.
    #[serde(alias = "oran")]
    pub rate: f64,
    #[serde(default, alias = "sebepler")]
    pub causes: Vec<String>,
    #[serde(default, alias = "onlem_oneriler")]
    pub mitigations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleFit {
    #[serde(alias = "yeterli")]
    Sufficient,
    #[serde(alias = "sıkışık", alias = "sikisik", alias = "sınırda", alias = "sinirda")]
    Tight,
    #[serde(alias = "yetersiz")]
    Insufficient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleAssessment {
    #[serde(alias = "durum")]
    pub status: ScheduleFit,
    #[serde(default, alias = "aciklama")]
    pub explanation: String,
}

/// Narrative risk assessment for a validated record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualAnalysis {
    #[serde(alias = "operasyonel_riskler")]
    pub operational_risks: OperationalRisks,
    #[serde(alias = "maliyet_sapma_olasiligi")]
    pub cost_deviation: CostDeviation,
    #[serde(alias = "zaman_uygunlugu")]
    pub schedule: ScheduleAssessment,
    #[serde(default, alias = "genel_oneri")]
    pub recommendation: String,
    #[serde(default, alias = "belge_tutarliligi", skip_serializing_if = "Option::is_none")]
    pub document_consistency: Option<serde_json::Value>,
}
