//! Field validation for provisional extractions.
//!
//! Applied between parsing the completion reply and building the record.
//! Corrects out-of-range or contradicted values where a clear preferred
//! value exists (`auto_fixed = true`) and flags the rest. Data-quality
//! problems never fail the request; only a missing confidence score does.

use chrono::NaiveDate;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{ExtractionError, Result};
use crate::pipeline::disambiguate::{DisambiguationResult, NumberContext};
use crate::pipeline::financial::total_meals;
use crate::types::config::PipelineConfig;
use crate::types::record::RawExtraction;
use crate::types::warning::{RecordField, Severity, ValidationWarning};

lazy_static! {
    static ref MONTHS: Regex = Regex::new(r"(?i)(\d+)\s*ay").expect("month duration pattern");
    static ref DAYS: Regex = Regex::new(r"(?i)(\d+)\s*(?:takvim\s+)?g[üu]n").expect("day duration pattern");
    static ref YEARS: Regex = Regex::new(r"(?i)(\d+)\s*y[ıi]l").expect("year duration pattern");
}

/// Expected headcount range.
const HEADCOUNT_MAX: u32 = 5000;

/// Headcounts above this are almost certainly meal totals.
const HEADCOUNT_ANOMALY: u32 = 10_000;

/// Provisional headcounts this small are usually clause numbers.
const CLAUSE_NUMBER_MAX: u32 = 30;

const MEALS_MAX: u32 = 3;
const DEFAULT_MEALS_PER_DAY: u32 = 3;
const DAYS_PER_YEAR: u32 = 366;
const DEFAULT_DAYS: u32 = 365;
const DAYS_ANOMALY: u32 = 730;

/// Per-meal cost bounds implied by the budget.
const MEAL_COST_IMPOSSIBLE: f64 = 5.0;
const MEAL_COST_EXCESSIVE: f64 = 300.0;

/// Budget-implied total meals may differ from the stated total by this factor.
const IMPLIED_MEALS_TOLERANCE: f64 = 3.0;

const TOTAL_MEALS_IMPOSSIBLE: u64 = 100_000_000;
const TOTAL_MEALS_TINY: u64 = 100;

/// Validated record fields, before financial annotation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedFields {
    pub institution: Option<String>,
    pub tender_type: Option<String>,
    pub headcount: Option<u32>,
    pub staff_count: Option<u32>,
    pub meals_per_day: Option<u32>,
    pub days: Option<u32>,
    pub budget: Option<f64>,
    pub delivery_duration: Option<String>,
    pub tender_duration: Option<String>,
    pub tender_date: Option<NaiveDate>,
    pub bid_deadline: Option<NaiveDate>,
    pub sample_menu: Vec<String>,
    pub special_conditions: Vec<String>,
    pub risks: Vec<String>,
    pub evidence: IndexMap<String, String>,
    pub confidence: f64,
}

impl ValidatedFields {
    fn total_meals(&self) -> Option<u64> {
        total_meals(self.headcount, self.meals_per_day, self.days)
    }
}

/// Validated fields plus every finding produced along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub fields: ValidatedFields,
    pub warnings: Vec<ValidationWarning>,
}

/// Validate a provisional field set against the disambiguated text.
///
/// Fails only when the reply carries no usable confidence score.
pub fn validate(
    raw: &RawExtraction,
    context: &DisambiguationResult,
    config: &PipelineConfig,
) -> Result<ValidationOutcome> {
    let confidence = match raw.confidence {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => return Err(ExtractionError::MissingConfidence),
    };

    let mut fields = ValidatedFields {
        institution: raw.institution.as_text(),
        tender_type: raw.tender_type.as_text(),
        headcount: raw.headcount.as_count(),
        staff_count: raw.staff_count.as_count(),
        meals_per_day: raw.meals_per_day.as_count(),
        days: raw.days.as_count(),
        budget: raw.budget.as_amount(),
        delivery_duration: raw.delivery_duration.as_text(),
        tender_duration: raw.tender_duration.as_text(),
        tender_date: raw.tender_date.as_date(),
        bid_deadline: raw.bid_deadline.as_date(),
        sample_menu: raw.sample_menu.clone(),
        special_conditions: raw.special_conditions.clone(),
        risks: raw.risks.clone(),
        evidence: raw.evidence_text(),
        confidence,
    };
    let mut warnings = Vec::new();

    // 1. Meals and days first: the headcount corrections divide by them.
    validate_meals(&mut fields, context, &mut warnings);
    validate_days(&mut fields, context, &mut warnings);

    // 2. Headcount: meal totals, facility lists, grammatical context, ranges.
    validate_headcount(&mut fields, context, &mut warnings);

    // 3. Staff count from an enumerated roster when upstream left it empty.
    if fields.staff_count.is_none() {
        fields.staff_count = context.staff_roster_total;
    }

    // 4. Budget and cross-field consistency.
    validate_budget(&mut fields, config, &mut warnings);
    check_totals(&fields, config, &mut warnings);

    if !warnings.is_empty() {
        warn!(
            warning_count = warnings.len(),
            error_count = warnings.iter().filter(|w| w.severity == Severity::Error).count(),
            "extraction validation produced warnings"
        );
    }

    Ok(ValidationOutcome { fields, warnings })
}

fn validate_meals(
    fields: &mut ValidatedFields,
    context: &DisambiguationResult,
    warnings: &mut Vec<ValidationWarning>,
) {
    match fields.meals_per_day {
        None => {
            if let Some(hint) = context.meal_plan.meals_per_day {
                warnings.push(ValidationWarning::fixed(
                    RecordField::MealsPerDay,
                    Severity::Info,
                    format!("meals per day missing, taken from text ({hint})"),
                    json!(null),
                    hint,
                ));
                fields.meals_per_day = Some(hint);
            } else {
                warnings.push(ValidationWarning::flagged(
                    RecordField::MealsPerDay,
                    Severity::Info,
                    "meals per day not found",
                    json!(null),
                ));
            }
        }
        Some(0) => {
            warnings.push(ValidationWarning::fixed(
                RecordField::MealsPerDay,
                Severity::Error,
                format!("meals per day cannot be zero, reset to {DEFAULT_MEALS_PER_DAY}"),
                0,
                DEFAULT_MEALS_PER_DAY,
            ));
            fields.meals_per_day = Some(DEFAULT_MEALS_PER_DAY);
        }
        Some(m) if m > MEALS_MAX => {
            warnings.push(ValidationWarning::flagged(
                RecordField::MealsPerDay,
                Severity::Warning,
                format!("{m} meals per day is above the usual 1-{MEALS_MAX}"),
                m,
            ));
        }
        Some(_) => {}
    }
}

/// Days from a duration phrase ("12 ay" → 360, "180 gün" → 180).
fn days_from_duration(phrase: &str) -> Option<u32> {
    if let Some(caps) = MONTHS.captures(phrase) {
        return caps[1].parse::<u32>().ok().map(|m| m.saturating_mul(30));
    }
    DAYS.captures(phrase).and_then(|caps| caps[1].parse().ok())
}

fn is_multi_year(fields: &ValidatedFields) -> bool {
    [&fields.tender_duration, &fields.delivery_duration]
        .into_iter()
        .flatten()
        .any(|phrase| YEARS.is_match(phrase))
}

fn validate_days(
    fields: &mut ValidatedFields,
    context: &DisambiguationResult,
    warnings: &mut Vec<ValidationWarning>,
) {
    let Some(days) = fields.days else {
        let from_duration = [&fields.tender_duration, &fields.delivery_duration]
            .into_iter()
            .flatten()
            .find_map(|phrase| days_from_duration(phrase).map(|d| (d, phrase.clone())));

        let derived = context
            .meal_plan
            .days
            .map(|d| (d, format!("{d} gün")))
            .or(from_duration);

        match derived {
            Some((d, source)) if d > 0 => {
                warnings.push(ValidationWarning::fixed(
                    RecordField::Days,
                    Severity::Info,
                    format!("day count missing, derived from \"{source}\""),
                    json!(null),
                    d,
                ));
                fields.days = Some(d);
            }
            _ => warnings.push(ValidationWarning::flagged(
                RecordField::Days,
                Severity::Info,
                "day count not found",
                json!(null),
            )),
        }
        return;
    };

    if days == 0 {
        warnings.push(ValidationWarning::fixed(
            RecordField::Days,
            Severity::Warning,
            "day count cannot be zero",
            0,
            json!(null),
        ));
        fields.days = None;
    } else if days > DAYS_ANOMALY {
        warnings.push(ValidationWarning::flagged(
            RecordField::Days,
            Severity::Warning,
            format!("{days} days exceeds two years"),
            days,
        ));
    } else if days > DAYS_PER_YEAR && !is_multi_year(fields) {
        warnings.push(ValidationWarning::flagged(
            RecordField::Days,
            Severity::Warning,
            format!("{days} days exceeds one year but the tender is not stated as multi-year"),
            days,
        ));
    }
}

fn validate_headcount(
    fields: &mut ValidatedFields,
    context: &DisambiguationResult,
    warnings: &mut Vec<ValidationWarning>,
) {
    let original = fields.headcount;

    let corrected = correct_total_meals(fields, context, warnings)
        || aggregate_facilities(fields, context, warnings);
    if !corrected {
        apply_context(fields, context, warnings);
    }

    flag_mixed_contexts(original, fields, context, warnings);
    if corrected {
        return;
    }

    let contradictions = context.contradictions();
    if !contradictions.is_empty() {
        warn!(values = ?contradictions, "same number read as staff and as recipients");
    }

    match fields.headcount {
        None if original.is_none() && context.recipient_numbers.is_empty() => {
            warnings.push(ValidationWarning::flagged(
                RecordField::Headcount,
                Severity::Warning,
                "headcount not found",
                json!(null),
            ));
        }
        Some(0) => {
            warnings.push(ValidationWarning::fixed(
                RecordField::Headcount,
                Severity::Warning,
                "headcount cannot be zero",
                0,
                json!(null),
            ));
            fields.headcount = None;
        }
        Some(h) if h <= CLAUSE_NUMBER_MAX && !context.is_recipient(h) => {
            warnings.push(ValidationWarning::fixed(
                RecordField::Headcount,
                Severity::Error,
                format!("headcount {h} is not supported by the text and looks like a clause number"),
                h,
                json!(null),
            ));
            fields.headcount = None;
        }
        Some(h) if h > HEADCOUNT_ANOMALY => {
            warnings.push(ValidationWarning::flagged(
                RecordField::Headcount,
                Severity::Error,
                format!("headcount {h} is implausible, probably a meal total"),
                h,
            ));
        }
        Some(h) if h > HEADCOUNT_MAX => {
            warnings.push(ValidationWarning::flagged(
                RecordField::Headcount,
                Severity::Warning,
                format!("headcount {h} is above the expected 1-{HEADCOUNT_MAX}"),
                h,
            ));
        }
        _ => {}
    }
}

/// Re-derive headcount from a stated meal total ("260.000 öğün").
/// Flags texts that state both staff and recipient numbers, describing
/// what the headcount ended up as.
fn flag_mixed_contexts(
    original: Option<u32>,
    fields: &ValidatedFields,
    context: &DisambiguationResult,
    warnings: &mut Vec<ValidationWarning>,
) {
    if context.personnel_numbers.is_empty() || context.recipient_numbers.is_empty() {
        return;
    }

    let outcome = match fields.headcount {
        None => "headcount left empty".to_string(),
        Some(h) if fields.headcount == original => format!("headcount {h} kept as proposed"),
        Some(h) if context.is_recipient(h) => format!("recipient count {h} was preferred"),
        Some(h) => format!("headcount set to {h}"),
    };

    warnings.push(ValidationWarning::flagged(
        RecordField::Headcount,
        Severity::Warning,
        format!(
            "text states both staff numbers {:?} and recipient numbers {:?}; {outcome}",
            context.personnel_numbers, context.recipient_numbers
        ),
        json!(fields.headcount),
    ));
}

fn correct_total_meals(
    fields: &mut ValidatedFields,
    context: &DisambiguationResult,
    warnings: &mut Vec<ValidationWarning>,
) -> bool {
    let headcount = fields.headcount;
    let total = match (context.meal_plan.total_meals, headcount) {
        (Some(total), None) => total,
        (Some(total), Some(h)) if h == total || h > HEADCOUNT_MAX => total,
        // No meal total in the text, but the proposed headcount is one.
        (None, Some(h)) if h > HEADCOUNT_MAX => h,
        _ => return false,
    };

    let days = fields.days.unwrap_or(DEFAULT_DAYS);
    let meals = fields.meals_per_day.unwrap_or(DEFAULT_MEALS_PER_DAY);
    let derived = (total as f64 / days as f64 / meals as f64).round() as u32;
    if derived < 10 {
        return false;
    }

    let severity = if derived >= HEADCOUNT_ANOMALY {
        Severity::Error
    } else {
        Severity::Warning
    };
    let explanation = format!("{total} ÷ {days} gün ÷ {meals} öğün = {derived} kişi");
    debug!(total, days, meals, derived, "headcount derived from meal total");

    warnings.push(ValidationWarning::fixed(
        RecordField::Headcount,
        severity,
        format!("{total} is a total meal count, not a headcount: {explanation}"),
        json!(headcount),
        derived,
    ));
    fields.evidence.insert("headcount".to_string(), explanation);
    fields.headcount = Some(derived);
    true
}

/// Sum per-facility counts when no overall total is stated.
fn aggregate_facilities(
    fields: &mut ValidatedFields,
    context: &DisambiguationResult,
    warnings: &mut Vec<ValidationWarning>,
) -> bool {
    let Some(sum) = context.facility_total() else {
        return false;
    };
    if context.stated_total.is_some() {
        return false;
    }

    let parts: Vec<String> = context
        .facility_counts
        .iter()
        .map(|f| f.count.to_string())
        .collect();
    let names: Vec<&str> = context
        .facility_counts
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    let explanation = format!("{} = {sum} ({})", parts.join(" + "), names.join(", "));

    match fields.headcount {
        Some(h) if h == sum => {}
        None => {
            warnings.push(ValidationWarning::fixed(
                RecordField::Headcount,
                Severity::Info,
                format!("headcount aggregated from {} facilities", parts.len()),
                json!(null),
                sum,
            ));
        }
        Some(h) if context.facility_counts.iter().any(|f| f.count == h) => {
            warnings.push(ValidationWarning::fixed(
                RecordField::Headcount,
                Severity::Warning,
                format!("headcount {h} covers one facility only; aggregated to {sum}"),
                h,
                sum,
            ));
        }
        Some(h) => {
            warnings.push(ValidationWarning::flagged(
                RecordField::Headcount,
                Severity::Warning,
                format!("headcount {h} differs from the facility sum {sum}"),
                h,
            ));
            return true;
        }
    }

    fields.evidence.insert("headcount_aggregation".to_string(), explanation);
    fields.headcount = Some(sum);
    true
}

/// Replace a headcount the text reads as staff or as ambiguous.
///
/// Recipients take priority: the record answers "how many people are
/// fed", not "how many are employed".
fn apply_context(
    fields: &mut ValidatedFields,
    context: &DisambiguationResult,
    warnings: &mut Vec<ValidationWarning>,
) {
    let first_recipient = context.recipient_numbers.first().copied();

    let Some(h) = fields.headcount else {
        if let Some(r) = first_recipient {
            warnings.push(ValidationWarning::fixed(
                RecordField::Headcount,
                Severity::Info,
                format!("headcount missing, taken from recipient phrase ({r})"),
                json!(null),
                r,
            ));
            record_phrase(fields, context, r, NumberContext::Recipient);
            fields.headcount = Some(r);
        }
        return;
    };

    if context.is_recipient(h) {
        return;
    }

    // a staff reading anywhere in the text beats a bare mention
    let (replacement, reason) = if context.is_personnel(h) {
        (first_recipient, "is a staff count")
    } else if context.is_ambiguous(h) {
        (
            first_recipient.or_else(|| context.personnel_numbers.first().copied()),
            "appears without clarifying context",
        )
    } else {
        return;
    };

    if replacement == Some(h) {
        return;
    }

    warnings.push(ValidationWarning::fixed(
        RecordField::Headcount,
        Severity::Warning,
        match replacement {
            Some(r) => format!("headcount {h} {reason}; replaced with {r}"),
            None => format!("headcount {h} {reason}; no recipient count stated"),
        },
        h,
        json!(replacement),
    ));
    if let Some(r) = replacement {
        let ctx = if context.is_recipient(r) {
            NumberContext::Recipient
        } else {
            NumberContext::Personnel
        };
        record_phrase(fields, context, r, ctx);
    }
    fields.headcount = replacement;
}

fn record_phrase(
    fields: &mut ValidatedFields,
    context: &DisambiguationResult,
    value: u32,
    ctx: NumberContext,
) {
    if let Some(phrase) = context.phrase_for(value, ctx) {
        fields
            .evidence
            .insert("headcount".to_string(), phrase.to_string());
    }
}

fn validate_budget(
    fields: &mut ValidatedFields,
    config: &PipelineConfig,
    warnings: &mut Vec<ValidationWarning>,
) {
    match fields.budget {
        Some(b) if b <= 0.0 => {
            warnings.push(ValidationWarning::fixed(
                RecordField::Budget,
                Severity::Warning,
                "budget must be positive",
                b,
                json!(null),
            ));
            fields.budget = None;
        }
        Some(_) => {}
        None => match fields.total_meals() {
            // Suggested only: the verdict must stay open without a real budget.
            Some(total) => {
                let estimate = (total as f64 * config.budget_estimate_meal_cost).round();
                warnings.push(ValidationWarning {
                    field: RecordField::Budget,
                    severity: Severity::Info,
                    message: format!(
                        "budget not stated; {total} meals at {:.2} each suggests about {estimate:.0}",
                        config.budget_estimate_meal_cost
                    ),
                    original_value: json!(null),
                    suggested_value: Some(json!(estimate)),
                    auto_fixed: false,
                });
            }
            None => warnings.push(ValidationWarning::flagged(
                RecordField::Budget,
                Severity::Info,
                "budget not stated",
                json!(null),
            )),
        },
    }
}

fn check_totals(
    fields: &ValidatedFields,
    config: &PipelineConfig,
    warnings: &mut Vec<ValidationWarning>,
) {
    let Some(total) = fields.total_meals() else {
        if let (Some(h), Some(m), Some(d)) = (fields.headcount, fields.meals_per_day, fields.days) {
            if h > 0 && m > 0 && d > 0 {
                warnings.push(ValidationWarning::flagged(
                    RecordField::TotalMeals,
                    Severity::Error,
                    format!("{h} × {m} × {d} meals is implausible"),
                    json!(null),
                ));
            }
        }
        return;
    };

    if total > TOTAL_MEALS_IMPOSSIBLE {
        warnings.push(ValidationWarning::flagged(
            RecordField::TotalMeals,
            Severity::Error,
            format!("{total} total meals is implausible"),
            total,
        ));
    } else if total < TOTAL_MEALS_TINY {
        warnings.push(ValidationWarning::flagged(
            RecordField::TotalMeals,
            Severity::Info,
            format!("{total} total meals is a very small tender"),
            total,
        ));
    }

    let Some(budget) = fields.budget else {
        return;
    };
    let per_meal = budget / total as f64;

    if per_meal < MEAL_COST_IMPOSSIBLE {
        warnings.push(ValidationWarning::flagged(
            RecordField::UnitPrice,
            Severity::Error,
            format!("budget implies {per_meal:.2} per meal; the budget is probably wrong"),
            per_meal,
        ));
    } else if per_meal > MEAL_COST_EXCESSIVE {
        warnings.push(ValidationWarning::flagged(
            RecordField::UnitPrice,
            Severity::Warning,
            format!("budget implies {per_meal:.2} per meal, unusually high"),
            per_meal,
        ));
    } else {
        let implied = budget / config.baseline_meal_cost;
        let ratio = implied / total as f64;
        if !(1.0 / IMPLIED_MEALS_TOLERANCE..=IMPLIED_MEALS_TOLERANCE).contains(&ratio) {
            warnings.push(ValidationWarning::flagged(
                RecordField::TotalMeals,
                Severity::Warning,
                format!(
                    "budget covers about {implied:.0} meals at market cost, stated total is {total}"
                ),
                total,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::disambiguate::disambiguate;
    use crate::types::record::RawField;

    fn raw(headcount: Option<i64>, meals: Option<i64>, days: Option<i64>) -> RawExtraction {
        let field = |v: Option<i64>| v.map(RawField::Integer).unwrap_or_default();
        RawExtraction {
            headcount: field(headcount),
            meals_per_day: field(meals),
            days: field(days),
            confidence: Some(0.9),
            ..Default::default()
        }
    }

    fn run(raw: &RawExtraction, text: &str) -> ValidationOutcome {
        validate(raw, &disambiguate(text), &PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_missing_confidence_is_fatal() {
        let mut input = raw(Some(500), Some(3), Some(365));
        input.confidence = None;
        let err = validate(&input, &disambiguate(""), &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractionError::MissingConfidence));
    }

    #[test]
    fn test_total_meals_resolve_to_headcount() {
        let text = "260.000 öğün, 365 gün, günde 3 öğün";

        let outcome = run(&raw(Some(260_000), Some(3), Some(365)), text);
        assert_eq!(outcome.fields.headcount, Some(237));
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.field == RecordField::Headcount && w.auto_fixed));

        // upstream left every field empty
        let outcome = run(&raw(None, None, None), text);
        assert_eq!(outcome.fields.headcount, Some(237));
        assert_eq!(outcome.fields.meals_per_day, Some(3));
        assert_eq!(outcome.fields.days, Some(365));
        assert_eq!(
            outcome.fields.evidence["headcount"],
            "260000 ÷ 365 gün ÷ 3 öğün = 237 kişi"
        );
    }

    #[test]
    fn test_staff_count_never_becomes_headcount() {
        let text = "8 personel (1 aşçıbaşı, 3 aşçı, 2 garson) tarafından hizmet verilecek";
        let outcome = run(&raw(Some(8), Some(3), Some(365)), text);

        assert_eq!(outcome.fields.headcount, None);
        assert_eq!(outcome.fields.staff_count, Some(6));
        let fix = outcome
            .warnings
            .iter()
            .find(|w| w.field == RecordField::Headcount && w.auto_fixed)
            .expect("headcount correction");
        assert_eq!(fix.original_value, json!(8));
        assert_eq!(fix.suggested_value, Some(json!(null)));
    }

    #[test]
    fn test_staff_count_replaced_by_recipient() {
        let text = "Polisevinde 250 kişiye yemek verilecek. 8 personel çalıştırılacak.";
        let outcome = run(&raw(Some(8), Some(3), Some(365)), text);

        assert_eq!(outcome.fields.headcount, Some(250));
        assert!(outcome.fields.evidence["headcount"].contains("250 kişiye"));
        // both contexts present: flagged as an inconsistency
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.severity == Severity::Warning && !w.auto_fixed));
    }

    #[test]
    fn test_staff_reading_outranks_bare_mention() {
        let text = "Yemekhanede 40 personel bulunmaktadır. 40 personel çalıştırılacak.";
        let outcome = run(&raw(Some(40), Some(3), Some(365)), text);

        assert_eq!(outcome.fields.headcount, None);
        let fix = outcome
            .warnings
            .iter()
            .find(|w| w.field == RecordField::Headcount && w.auto_fixed)
            .expect("headcount correction");
        assert!(fix.message.contains("staff count"), "{}", fix.message);
    }

    #[test]
    fn test_mixed_contexts_flagged_after_facility_sum() {
        let text = "1. Kısım - Huzurevi: 150 kişi, 2. Kısım - Çocuk Evi: 80 kişi, \
            3. Kısım - Kadın Konukevi: 45 kişi. Mutfakta 8 personel çalıştırılacaktır.";
        let outcome = run(&raw(None, Some(3), Some(365)), text);

        assert_eq!(outcome.fields.headcount, Some(275));
        let flag = outcome
            .warnings
            .iter()
            .find(|w| w.field == RecordField::Headcount && !w.auto_fixed)
            .expect("mixed context warning");
        assert_eq!(flag.severity, Severity::Warning);
        assert!(flag.message.contains("[8]"), "{}", flag.message);
        assert!(flag.message.ends_with("headcount set to 275"), "{}", flag.message);
    }

    #[test]
    fn test_mixed_contexts_message_follows_outcome() {
        let flag = |outcome: &ValidationOutcome| {
            outcome
                .warnings
                .iter()
                .find(|w| w.field == RecordField::Headcount && !w.auto_fixed)
                .map(|w| w.message.clone())
                .expect("mixed context warning")
        };
        let text = "Polisevinde 250 kişiye yemek verilecek. 8 personel çalıştırılacak.";

        let outcome = run(&raw(Some(8), Some(3), Some(365)), text);
        assert!(flag(&outcome).ends_with("recipient count 250 was preferred"));

        let outcome = run(&raw(Some(250), Some(3), Some(365)), text);
        assert!(flag(&outcome).ends_with("headcount 250 kept as proposed"));
    }

    #[test]
    fn test_oversized_fields_do_not_overflow_total() {
        let outcome = run(
            &raw(Some(4_000_000_000), Some(4_000_000_000), Some(4_000_000_000)),
            "",
        );

        assert_eq!(outcome.fields.total_meals(), None);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.field == RecordField::TotalMeals && w.severity == Severity::Error));
    }

    #[test]
    fn test_ambiguous_number_prefers_recipient() {
        let text = "Mutfakta 12 personel bulunur. Günlük 400 kişi için yemek hazırlanır.";
        let outcome = run(&raw(Some(12), Some(2), Some(180)), text);
        assert_eq!(outcome.fields.headcount, Some(400));
    }

    #[test]
    fn test_ambiguous_without_alternative_keeps_null() {
        let text = "Kurumda 45 personel bulunmaktadır.";
        let outcome = run(&raw(Some(45), Some(3), Some(365)), text);
        // ambiguous, and neither recipient nor staff readings exist
        assert_eq!(outcome.fields.headcount, None);
    }

    #[test]
    fn test_facility_counts_are_aggregated() {
        let text = "1. Kısım - Huzurevi: 150 kişi, 2. Kısım - Çocuk Evi: 80 kişi, 3. Kısım - Kadın Konukevi: 45 kişi";

        let outcome = run(&raw(None, Some(3), Some(365)), text);
        assert_eq!(outcome.fields.headcount, Some(275));
        assert!(outcome.fields.evidence["headcount_aggregation"].starts_with("150 + 80 + 45 = 275"));

        let outcome = run(&raw(Some(150), Some(3), Some(365)), text);
        assert_eq!(outcome.fields.headcount, Some(275));
    }

    #[test]
    fn test_clause_number_is_dropped() {
        let outcome = run(&raw(Some(7), Some(3), Some(365)), "Madde 7 uyarınca yemek verilecektir");
        assert_eq!(outcome.fields.headcount, None);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.severity == Severity::Error && w.auto_fixed));
    }

    #[test]
    fn test_meals_and_days_repairs() {
        let mut input = raw(Some(500), Some(0), None);
        input.tender_duration = RawField::Text("12 ay".into());
        let outcome = run(&input, "");

        assert_eq!(outcome.fields.meals_per_day, Some(3));
        assert_eq!(outcome.fields.days, Some(360));
    }

    #[test]
    fn test_days_over_a_year_need_multi_year_tender() {
        let outcome = run(&raw(Some(500), Some(3), Some(700)), "");
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.field == RecordField::Days && w.severity == Severity::Warning));

        let mut input = raw(Some(500), Some(3), Some(700));
        input.tender_duration = RawField::Text("2 yıl".into());
        let outcome = run(&input, "");
        assert!(!outcome.warnings.iter().any(|w| w.field == RecordField::Days));
    }

    #[test]
    fn test_missing_budget_is_suggested_not_applied() {
        let outcome = run(&raw(Some(500), Some(3), Some(365)), "");
        assert_eq!(outcome.fields.budget, None);

        let suggestion = outcome
            .warnings
            .iter()
            .find(|w| w.field == RecordField::Budget)
            .unwrap();
        assert!(!suggestion.auto_fixed);
        assert_eq!(suggestion.suggested_value, Some(json!(6_570_000.0)));
    }

    #[test]
    fn test_budget_consistency() {
        let mut input = raw(Some(500), Some(3), Some(365));
        input.budget = RawField::Integer(1_000_000);
        let outcome = run(&input, "");
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.field == RecordField::UnitPrice && w.severity == Severity::Error));

        input.budget = RawField::Integer(15_000_000);
        let outcome = run(&input, "");
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    }
}
