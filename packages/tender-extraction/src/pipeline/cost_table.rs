//! Merging auxiliary cost-table analyses into one table.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{ExtractionError, Result};
use crate::types::cost_table::{CategoryTotal, CostItem, CostSummary, CostTable};

/// Items without a category are grouped under this name.
const UNCATEGORIZED: &str = "diğer";

/// Merge parsed cost-table analyses.
///
/// Each analysis must be an object carrying an `items` (or `urunler`)
/// array. Items are concatenated in input order and the summary is
/// recomputed from the merged list. Returns `None` for no analyses.
pub fn merge_cost_tables(analyses: &[Value]) -> Result<Option<CostTable>> {
    if analyses.is_empty() {
        return Ok(None);
    }

    let mut items = Vec::new();
    for (index, analysis) in analyses.iter().enumerate() {
        let raw_items = analysis
            .get("items")
            .or_else(|| analysis.get("urunler"))
            .and_then(Value::as_array)
            .ok_or_else(|| ExtractionError::InvalidCostTable {
                index,
                reason: "missing items array".to_string(),
            })?;

        for raw in raw_items {
            let item: CostItem = serde_json::from_value(raw.clone()).map_err(|e| {
                ExtractionError::InvalidCostTable {
                    index,
                    reason: e.to_string(),
                }
            })?;
            items.push(item);
        }
    }

    let summary = summarize(&items);
    Ok(Some(CostTable {
        items,
        summary,
        sources: analyses.len(),
    }))
}

fn summarize(items: &[CostItem]) -> CostSummary {
    let total_cost: f64 = items.iter().map(|i| i.total_price).sum();
    let average_unit_price = if items.is_empty() {
        0.0
    } else {
        items.iter().map(|i| i.unit_price).sum::<f64>() / items.len() as f64
    };

    let mut categories: IndexMap<&str, CategoryTotal> = IndexMap::new();
    for item in items {
        let name = item
            .category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(UNCATEGORIZED);
        let entry = categories.entry(name).or_insert_with(|| CategoryTotal {
            name: name.to_string(),
            count: 0,
            total_cost: 0.0,
        });
        entry.count += 1;
        entry.total_cost += item.total_price;
    }

    CostSummary {
        total_items: items.len(),
        total_cost,
        average_unit_price,
        categories: categories.into_values().collect(),
    }
}
