//! Reading completion replies as JSON.

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ExtractionError, Result};
use crate::types::context::ContextualAnalysis;
use crate::types::record::RawExtraction;

lazy_static! {
    static ref TRAILING_COMMA: Regex = Regex::new(r",\s*([}\]])").expect("trailing comma pattern");
}

/// Extract the JSON object from a reply that may wrap it in a markdown
/// fence or surround it with prose.
fn extract_json_from_response(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + 7..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }
    if let Some(start) = trimmed.find("```") {
        let after_start = start + 3;
        // skip a language tag on the fence line
        let content_start = trimmed[after_start..]
            .find('\n')
            .map(|i| after_start + i + 1)
            .unwrap_or(after_start);
        if let Some(end) = trimmed[content_start..].find("```") {
            return trimmed[content_start..content_start + end].trim();
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Control characters other than whitespace break `serde_json`.
fn strip_control_chars(json: &str) -> String {
    json.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// Parse a reply into a JSON object, repairing trailing commas.
pub fn parse_json_object(response: &str) -> Result<Value> {
    let candidate = strip_control_chars(extract_json_from_response(response));
    if candidate.is_empty() {
        return Err(ExtractionError::MalformedResponse {
            reason: "empty reply".to_string(),
        });
    }

    let value = match serde_json::from_str::<Value>(&candidate) {
        Ok(value) => value,
        Err(first) => {
            let repaired = TRAILING_COMMA.replace_all(&candidate, "$1");
            debug!(error = %first, "retrying reply parse without trailing commas");
            serde_json::from_str(&repaired).map_err(|e| ExtractionError::MalformedResponse {
                reason: e.to_string(),
            })?
        }
    };

    if !value.is_object() {
        return Err(ExtractionError::MalformedResponse {
            reason: "reply is not a JSON object".to_string(),
        });
    }
    Ok(value)
}

fn parse_as<T: DeserializeOwned>(response: &str) -> Result<T> {
    let value = parse_json_object(response)?;
    serde_json::from_value(value).map_err(|e| ExtractionError::MalformedResponse {
        reason: e.to_string(),
    })
}

/// Parse a field-extraction reply.
///
/// A reply without `guven_skoru` is rejected: the pipeline never
/// fabricates a confidence score.
pub fn parse_extraction(response: &str) -> Result<RawExtraction> {
    let raw: RawExtraction = parse_as(response)?;
    match raw.confidence {
        Some(c) if c.is_finite() => Ok(raw),
        _ => Err(ExtractionError::MissingConfidence),
    }
}

/// Parse a contextual-analysis reply.
pub fn parse_contextual_analysis(response: &str) -> Result<ContextualAnalysis> {
    parse_as(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::context::ScheduleFit;
    use crate::types::financial::RiskLevel;

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json_from_response("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json_from_response("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(
            extract_json_from_response("İşte sonuç: {\"a\": {\"b\": 2}} umarım yardımcı olur"),
            "{\"a\": {\"b\": 2}}"
        );
    }

    #[test]
    fn test_trailing_commas_are_repaired() {
        let value = parse_json_object("{\"riskler\": [\"et\", \"nakit\",], \"guven_skoru\": 0.8,}").unwrap();
        assert_eq!(value["guven_skoru"], 0.8);
        assert_eq!(value["riskler"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = parse_json_object("Üzgünüm, bu belgeyi okuyamadım.").unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedResponse { .. }));

        let err = parse_json_object("[1, 2]").unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedResponse { .. }));
    }

    #[test]
    fn test_extraction_requires_confidence() {
        let raw = parse_extraction("```json\n{\"kisi_sayisi\": 500, \"guven_skoru\": 0.85}\n```").unwrap();
        assert_eq!(raw.headcount.as_count(), Some(500));

        let err = parse_extraction("{\"kisi_sayisi\": 500}").unwrap_err();
        assert!(matches!(err, ExtractionError::MissingConfidence));
    }

    #[test]
    fn test_contextual_analysis_turkish_keys() {
        let analysis = parse_contextual_analysis(
            r#"{
                "operasyonel_riskler": {"seviye": "yüksek", "faktorler": ["et fiyatları"], "oneriler": []},
                "maliyet_sapma_olasiligi": {"oran": 25, "sebepler": ["enflasyon"], "onlem_oneriler": []},
                "zaman_uygunlugu": {"durum": "sıkışık", "aciklama": "Teslim süresi kısa"},
                "genel_oneri": "Fiyat farkı maddesi talep edilmeli"
            }"#,
        )
        .unwrap();

        assert_eq!(analysis.operational_risks.level, RiskLevel::High);
        assert_eq!(analysis.cost_deviation.rate, 25.0);
        assert_eq!(analysis.schedule.status, ScheduleFit::Tight);
    }
}
