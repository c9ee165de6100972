//! Closed-form financial derivation for validated records.
//!
//! Pure functions with no I/O. Every figure is recomputed from the record
//! fields it depends on; nothing here is stored independently.

use crate::text::turkish_lowercase;
use crate::types::config::FinancialConfig;
use crate::types::financial::{FinancialAnnotation, RiskLevel, Verdict};

/// Margins at or above this (with a unit price over baseline) proceed.
const PROCEED_MARGIN: i64 = 10;
/// Margins in `[CAUTION_MARGIN, PROCEED_MARGIN)` are marginal.
const CAUTION_MARGIN: i64 = 5;

/// Without a menu, tenders feeding more people than this are assumed meat-heavy.
const LARGE_TENDER_HEADCOUNT: u32 = 300;

const RED_MEAT: &[&str] = &["dana", "kuzu", "köfte", "kıyma", "biftek", "kavurma", "kebap", "pirzola"];
const POULTRY: &[&str] = &["tavuk", "piliç", "hindi"];

/// Fields the deriver reads.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FinancialInputs<'a> {
    pub headcount: Option<u32>,
    pub meals_per_day: Option<u32>,
    pub days: Option<u32>,
    pub budget: Option<f64>,
    pub sample_menu: &'a [String],
    pub special_conditions: &'a [String],
}

fn positive(value: Option<u32>) -> Option<u64> {
    value.filter(|v| *v > 0).map(u64::from)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// headcount × meals × days, or None if any factor is missing or zero
/// or the product does not fit in a `u64`.
pub fn total_meals(headcount: Option<u32>, meals_per_day: Option<u32>, days: Option<u32>) -> Option<u64> {
    positive(headcount)?
        .checked_mul(positive(meals_per_day)?)?
        .checked_mul(positive(days)?)
}

/// Classify a dish name. Red meat outranks poultry.
fn dish_risk(dish: &str) -> RiskLevel {
    let lowered = turkish_lowercase(dish);
    let red_meat = lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == "et" || word.starts_with("etli"))
        || RED_MEAT.iter().any(|k| lowered.contains(k));

    if red_meat {
        RiskLevel::High
    } else if POULTRY.iter().any(|k| lowered.contains(k)) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Exposure to meat and poultry prices, from the menu or the headcount.
pub fn protein_risk(sample_menu: &[String], headcount: Option<u32>) -> RiskLevel {
    let dishes: Vec<&String> = sample_menu.iter().filter(|d| !d.trim().is_empty()).collect();
    if dishes.is_empty() {
        return match headcount {
            Some(h) if h > LARGE_TENDER_HEADCOUNT => RiskLevel::Medium,
            _ => RiskLevel::Low,
        };
    }

    dishes
        .into_iter()
        .map(|d| dish_risk(d))
        .max_by_key(|risk| match risk {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::High => 2,
        })
        .unwrap_or(RiskLevel::Low)
}

/// The first special condition stating a percentage bid threshold.
pub fn threshold_warning(special_conditions: &[String]) -> Option<String> {
    special_conditions
        .iter()
        .find(|condition| {
            let lowered = turkish_lowercase(condition);
            condition.contains('%')
                && ["düşük", "altına", "teklif"]
                    .iter()
                    .any(|k| lowered.contains(k))
        })
        .cloned()
}

fn verdict_for(margin: i64, unit_price: f64, baseline: f64) -> Verdict {
    if margin >= PROCEED_MARGIN && unit_price > baseline {
        Verdict::Proceed
    } else if (CAUTION_MARGIN..PROCEED_MARGIN).contains(&margin) && unit_price >= baseline {
        Verdict::Caution
    } else {
        Verdict::Decline
    }
}

fn rationale_for(
    verdict: Verdict,
    margin: i64,
    unit_price: f64,
    risk: RiskLevel,
    cash_flow: Option<f64>,
    baseline: f64,
) -> String {
    match verdict {
        Verdict::Proceed => format!(
            "Kâr marjı sağlıklı (%{margin}), birim fiyat piyasa maliyetinin üstünde ({unit_price:.2} ₺ > {baseline:.2} ₺)."
        ),
        Verdict::Caution => {
            let meat = if risk == RiskLevel::High {
                "et riski yüksek, "
            } else {
                ""
            };
            match cash_flow {
                Some(cash) => format!(
                    "Kâr marjı düşük (%{margin}), {meat}nakit akışı planlaması kritik ({:.0}K ₺).",
                    cash / 1000.0
                ),
                None => format!("Kâr marjı düşük (%{margin}), {meat}nakit akışı planlaması kritik."),
            }
        }
        Verdict::Decline if unit_price < baseline => format!(
            "Birim fiyat ({unit_price:.2} ₺) piyasa maliyetinin ({baseline:.2} ₺) altında, zarar riski yüksek."
        ),
        Verdict::Decline => format!(
            "Kâr marjı çok düşük (%{margin}). Birim fiyat: {unit_price:.2} ₺, tahmini maliyet: {baseline:.2} ₺."
        ),
    }
}

/// Derive the financial annotation for a set of validated fields.
pub fn derive(inputs: &FinancialInputs<'_>, config: &FinancialConfig) -> FinancialAnnotation {
    let baseline = config.baseline_meal_cost;
    let total = total_meals(inputs.headcount, inputs.meals_per_day, inputs.days);

    let exact_unit_price = match (inputs.budget, total) {
        (Some(budget), Some(total)) if budget > 0.0 => Some(budget / total as f64),
        _ => None,
    };
    let margin = exact_unit_price
        .filter(|u| *u > 0.0)
        .map(|u| (100.0 * (u - baseline) / u).round() as i64);

    let risk = protein_risk(inputs.sample_menu, inputs.headcount);

    let daily_cost = match (positive(inputs.headcount), positive(inputs.meals_per_day)) {
        (Some(h), Some(m)) => Some((h * m) as f64 * baseline),
        _ => None,
    };
    let cash_flow = daily_cost.map(|daily| (daily * config.payment_lag_days as f64).round());

    let (verdict, rationale) = match (exact_unit_price, margin) {
        (Some(unit_price), Some(margin)) => {
            let verdict = verdict_for(margin, unit_price, baseline);
            let rationale = rationale_for(verdict, margin, unit_price, risk, cash_flow, baseline);
            (Some(verdict), rationale)
        }
        _ if inputs.budget.is_none() => (
            None,
            "Bütçe bilgisi eksik, finansal analiz yapılamıyor.".to_string(),
        ),
        _ => (
            None,
            "Kişi, öğün veya gün sayısı eksik, birim fiyat hesaplanamıyor.".to_string(),
        ),
    };

    FinancialAnnotation {
        total_meals: total,
        unit_price: exact_unit_price.map(round2),
        profit_margin_percent: margin,
        protein_dependency_risk: risk,
        daily_cost,
        cash_flow_requirement: cash_flow,
        verdict,
        rationale,
        threshold_warning: threshold_warning(inputs.special_conditions),
        baseline_meal_cost: baseline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn inputs<'a>(h: u32, m: u32, d: u32, budget: Option<f64>) -> FinancialInputs<'a> {
        FinancialInputs {
            headcount: Some(h),
            meals_per_day: Some(m),
            days: Some(d),
            budget,
            ..Default::default()
        }
    }

    #[test]
    fn test_healthy_tender_proceeds() {
        let annotation = derive(&inputs(500, 3, 365, Some(15_000_000.0)), &FinancialConfig::default());

        assert_eq!(annotation.total_meals, Some(547_500));
        assert_eq!(annotation.unit_price, Some(27.40));
        assert_eq!(annotation.profit_margin_percent, Some(38));
        assert_eq!(annotation.verdict, Some(Verdict::Proceed));
        assert_eq!(annotation.daily_cost, Some(25_500.0));
        assert_eq!(annotation.cash_flow_requirement, Some(1_530_000.0));
        assert_eq!(annotation.protein_dependency_risk, RiskLevel::Medium);
    }

    #[test]
    fn test_total_meals_overflow_is_none() {
        let huge = Some(4_000_000_000);
        assert_eq!(total_meals(huge, huge, huge), None);
        assert_eq!(total_meals(huge, Some(3), Some(365)), Some(4_380_000_000_000));

        let annotation = derive(
            &inputs(4_000_000_000, 4_000_000_000, 4_000_000_000, Some(1_000_000.0)),
            &FinancialConfig::default(),
        );
        assert_eq!(annotation.total_meals, None);
        assert_eq!(annotation.verdict, None);
    }

    #[test]
    fn test_verdict_thresholds() {
        let config = FinancialConfig::default();
        let verdict = |per_meal: f64| {
            derive(&inputs(100, 1, 100, Some(per_meal * 10_000.0)), &config).verdict
        };

        // margin 9% → caution; 4% → decline; below baseline → decline
        assert_eq!(verdict(18.7), Some(Verdict::Caution));
        assert_eq!(verdict(17.7), Some(Verdict::Decline));
        assert_eq!(verdict(12.0), Some(Verdict::Decline));
        assert_eq!(verdict(20.0), Some(Verdict::Proceed));
    }

    #[test]
    fn test_missing_budget_leaves_verdict_open() {
        let annotation = derive(&inputs(500, 3, 365, None), &FinancialConfig::default());

        assert_eq!(annotation.unit_price, None);
        assert_eq!(annotation.profit_margin_percent, None);
        assert_eq!(annotation.verdict, None);
        assert!(annotation.rationale.contains("Bütçe"));
        // cost side is still known
        assert_eq!(annotation.cash_flow_requirement, Some(1_530_000.0));
    }

    #[test]
    fn test_zero_factor_has_no_unit_price() {
        let annotation = derive(&inputs(500, 0, 365, Some(1_000_000.0)), &FinancialConfig::default());
        assert_eq!(annotation.total_meals, None);
        assert_eq!(annotation.unit_price, None);
        assert_eq!(annotation.verdict, None);
    }

    #[test]
    fn test_protein_risk_from_menu() {
        let menu = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(protein_risk(&menu(&["Etli Nohut", "Pilav"]), None), RiskLevel::High);
        assert_eq!(protein_risk(&menu(&["Izgara Köfte"]), None), RiskLevel::High);
        assert_eq!(protein_risk(&menu(&["Tavuk Sote", "Bulgur Pilavı"]), None), RiskLevel::Medium);
        assert_eq!(protein_risk(&menu(&["Mercimek Çorbası", "Sebze Türlü"]), None), RiskLevel::Low);
        // "sebzeli" and "etek" are not meat
        assert_eq!(protein_risk(&menu(&["Sebzeli Makarna"]), None), RiskLevel::Low);
    }

    #[test]
    fn test_protein_risk_without_menu() {
        assert_eq!(protein_risk(&[], Some(301)), RiskLevel::Medium);
        assert_eq!(protein_risk(&[], Some(300)), RiskLevel::Low);
        assert_eq!(protein_risk(&[], None), RiskLevel::Low);
    }

    #[test]
    fn test_threshold_warning() {
        let conditions = vec![
            "Yüklenici hijyen belgesine sahip olmalıdır".to_string(),
            "Yaklaşık maliyetin %40 altına düşen teklifler sorgulanır".to_string(),
        ];
        assert_eq!(threshold_warning(&conditions), Some(conditions[1].clone()));
        assert_eq!(threshold_warning(&conditions[..1]), None);
    }

    proptest! {
        #[test]
        fn unit_price_times_meals_recovers_budget(
            h in 1u32..5_000,
            m in 1u32..=3,
            d in 1u32..=365,
            budget in 1_000.0f64..100_000_000.0,
        ) {
            let annotation = derive(&inputs(h, m, d, Some(budget)), &FinancialConfig::default());
            let total = annotation.total_meals.unwrap() as f64;
            let unit_price = annotation.unit_price.unwrap();
            prop_assert!((unit_price * total - budget).abs() <= 0.005 * total + 1e-6);
        }

        #[test]
        fn verdict_requires_a_budget(h in 1u32..5_000, m in 1u32..=3, d in 1u32..=365) {
            let annotation = derive(&inputs(h, m, d, None), &FinancialConfig::default());
            prop_assert!(annotation.verdict.is_none());
        }
    }
}
