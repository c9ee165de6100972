//! Provisional and validated record types.

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    classification::DocumentClassification, context::ContextualAnalysis, cost_table::CostTable,
    financial::FinancialAnnotation, warning::ValidationWarning,
};

lazy_static! {
    static ref NUMBER_TOKEN: Regex = Regex::new(r"\d[\d.,]*").expect("number token pattern");
}

/// Parse a number written the Turkish way.
///
/// Dots group thousands and a comma marks decimals ("1.500.000,50").
/// A single dot followed by anything but three digits is read as a
/// decimal point ("12.5"). Only the first numeric run is used, so
/// trailing units ("TL", "kişi") are ignored.
pub fn parse_turkish_number(raw: &str) -> Option<f64> {
    let token = NUMBER_TOKEN.find(raw)?.as_str();
    parse_number_token(token.trim_end_matches(['.', ',']))
}

fn parse_number_token(token: &str) -> Option<f64> {
    // "1,500,000" written with English grouping
    if token.matches(',').count() > 1 {
        return token.replace(',', "").parse().ok();
    }

    let (int_part, fraction) = match token.rfind(',') {
        Some(i) => (&token[..i], Some(&token[i + 1..])),
        None => (token, None),
    };

    let groups: Vec<&str> = int_part.split('.').collect();
    let thousands = groups.len() > 1 && groups[1..].iter().all(|g| g.len() == 3);
    if groups.len() == 2 && !thousands && fraction.is_none() {
        return format!("{}.{}", groups[0], groups[1]).parse().ok();
    }

    let digits = groups.concat();
    match fraction {
        Some(f) if !f.is_empty() => format!("{digits}.{f}").parse().ok(),
        _ => digits.parse().ok(),
    }
}

/// A provisional value with unknown reliability.
///
/// Only the completion service produces these.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RawField {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    #[default]
    Null,
}

impl From<Value> for RawField {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawField::Null,
            Value::Bool(b) => RawField::Text(b.to_string()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => RawField::Integer(i),
                None => n.as_f64().map(RawField::Decimal).unwrap_or(RawField::Null),
            },
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
                    return RawField::Null;
                }
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d.%m.%Y"))
                    .map(RawField::Date)
                    .unwrap_or_else(|_| RawField::Text(trimmed.to_string()))
            }
            other => RawField::Text(other.to_string()),
        }
    }
}

impl From<RawField> for Value {
    fn from(field: RawField) -> Self {
        match field {
            RawField::Text(s) => Value::String(s),
            RawField::Integer(i) => Value::from(i),
            RawField::Decimal(f) => Value::from(f),
            RawField::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            RawField::Null => Value::Null,
        }
    }
}

impl RawField {
    pub fn is_null(&self) -> bool {
        matches!(self, RawField::Null)
    }

    /// Read as a non-negative whole count ("260.000" → 260000).
    pub fn as_count(&self) -> Option<u32> {
        let value = self.as_amount()?;
        if value < 0.0 || value > u32::MAX as f64 {
            return None;
        }
        Some(value.round() as u32)
    }

    /// Read as a monetary amount ("1.500.000 TL" → 1500000.0).
    pub fn as_amount(&self) -> Option<f64> {
        match self {
            RawField::Integer(i) => Some(*i as f64),
            RawField::Decimal(f) if f.is_finite() => Some(*f),
            RawField::Text(s) => parse_turkish_number(s),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            RawField::Text(s) => Some(s.clone()),
            RawField::Integer(i) => Some(i.to_string()),
            RawField::Decimal(f) => Some(f.to_string()),
            RawField::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            RawField::Null => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RawField::Date(d) => Some(*d),
            _ => None,
        }
    }
}

/// The provisional field set proposed by the completion service.
///
/// Keys follow the Turkish names the extraction prompt asks for.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawExtraction {
    #[serde(default, rename = "kurum")]
    pub institution: RawField,
    #[serde(default, rename = "ihale_turu")]
    pub tender_type: RawField,
    #[serde(default, rename = "kisi_sayisi")]
    pub headcount: RawField,
    #[serde(default, rename = "personel_sayisi")]
    pub staff_count: RawField,
    #[serde(default, rename = "ogun_sayisi")]
    pub meals_per_day: RawField,
    #[serde(default, rename = "gun_sayisi")]
    pub days: RawField,
    #[serde(default, rename = "tahmini_butce")]
    pub budget: RawField,
    #[serde(default, rename = "teslim_suresi")]
    pub delivery_duration: RawField,
    #[serde(default, rename = "ihale_suresi")]
    pub tender_duration: RawField,
    #[serde(default, rename = "ihale_tarihi")]
    pub tender_date: RawField,
    #[serde(default, rename = "teklif_son_tarih")]
    pub bid_deadline: RawField,
    #[serde(default, rename = "belge_turu")]
    pub document_type: Option<String>,
    #[serde(default, rename = "belge_turu_guven")]
    pub document_type_confidence: Option<f64>,
    #[serde(default, rename = "ornek_menu_basliklari")]
    pub sample_menu: Vec<String>,
    #[serde(default, rename = "ozel_sartlar")]
    pub special_conditions: Vec<String>,
    #[serde(default, rename = "riskler")]
    pub risks: Vec<String>,
    #[serde(default, rename = "kanitlar")]
    pub evidence: IndexMap<String, Value>,
    #[serde(default, rename = "guven_skoru")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<Value>,
}

impl RawExtraction {
    /// Evidence quotes flattened to text.
    pub fn evidence_text(&self) -> IndexMap<String, String> {
        self.evidence
            .iter()
            .filter_map(|(field, value)| {
                let text = match value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    Value::Array(items) => items
                        .iter()
                        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                        .collect::<Vec<_>>()
                        .join("; "),
                    other => other.to_string(),
                };
                Some((field.clone(), text))
            })
            .collect()
    }
}

/// The canonical output entity.
///
/// Created once per distinct input text and immutable after validation;
/// reprocessing with different auxiliary inputs yields a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// SHA-256 of the input text (hex).
    pub content_hash: String,

    pub institution: Option<String>,
    pub tender_type: Option<String>,

    /// Number of people served.
    pub headcount: Option<u32>,

    /// Number of staff employed, when stated.
    pub staff_count: Option<u32>,

    pub meals_per_day: Option<u32>,
    pub days: Option<u32>,
    pub budget: Option<f64>,
    pub delivery_duration: Option<String>,
    pub tender_duration: Option<String>,
    pub tender_date: Option<NaiveDate>,
    pub bid_deadline: Option<NaiveDate>,

    #[serde(default)]
    pub sample_menu: Vec<String>,
    #[serde(default)]
    pub special_conditions: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,

    /// Field name → supporting quote.
    #[serde(default)]
    pub evidence: IndexMap<String, String>,

    /// Upstream confidence in [0, 1].
    pub confidence: f64,

    pub document: DocumentClassification,

    #[serde(default)]
    pub warnings: Vec<ValidationWarning>,

    pub financial: Option<FinancialAnnotation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_table: Option<CostTable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contextual_analysis: Option<ContextualAnalysis>,

    pub processed_at: DateTime<Utc>,
}

impl ExtractionRecord {
    /// headcount × meals × days, when all three are present and positive.
    pub fn total_meals(&self) -> Option<u64> {
        crate::pipeline::financial::total_meals(self.headcount, self.meals_per_day, self.days)
    }

    /// Whether any warning carries `Severity::Error`.
    pub fn has_errors(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| w.severity == super::warning::Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_turkish_number() {
        assert_eq!(parse_turkish_number("260.000"), Some(260000.0));
        assert_eq!(parse_turkish_number("1.500.000 TL"), Some(1_500_000.0));
        assert_eq!(parse_turkish_number("1.500.000,50 TL"), Some(1_500_000.5));
        assert_eq!(parse_turkish_number("27,40"), Some(27.4));
        assert_eq!(parse_turkish_number("12.5"), Some(12.5));
        assert_eq!(parse_turkish_number("1,500,000"), Some(1_500_000.0));
        assert_eq!(parse_turkish_number("yaklaşık 500 kişi"), Some(500.0));
        assert_eq!(parse_turkish_number("belirtilmemiş"), None);
    }

    #[test]
    fn test_raw_field_from_json() {
        let raw: RawExtraction = serde_json::from_value(serde_json::json!({
            "kurum": "Ankara Üniversitesi",
            "kisi_sayisi": "1.200",
            "ogun_sayisi": 3,
            "tahmini_butce": 4500000.5,
            "ihale_tarihi": "15.03.2025",
            "teslim_suresi": null,
            "guven_skoru": 0.9
        }))
        .unwrap();

        assert_eq!(raw.institution.as_text().as_deref(), Some("Ankara Üniversitesi"));
        assert_eq!(raw.headcount.as_count(), Some(1200));
        assert_eq!(raw.meals_per_day.as_count(), Some(3));
        assert_eq!(raw.budget.as_amount(), Some(4_500_000.5));
        assert_eq!(
            raw.tender_date.as_date(),
            NaiveDate::from_ymd_opt(2025, 3, 15)
        );
        assert!(raw.delivery_duration.is_null());
        assert!(raw.days.is_null());
    }

    #[test]
    fn test_evidence_text_flattens_arrays() {
        let raw: RawExtraction = serde_json::from_value(serde_json::json!({
            "kanitlar": {
                "kisi_sayisi": "günlük 500 kişiye yemek",
                "riskler": ["et fiyatları", "nakit akışı"],
                "butce": null
            }
        }))
        .unwrap();

        let evidence = raw.evidence_text();
        assert_eq!(evidence["kisi_sayisi"], "günlük 500 kişiye yemek");
        assert_eq!(evidence["riskler"], "et fiyatları; nakit akışı");
        assert!(!evidence.contains_key("butce"));
    }
}
