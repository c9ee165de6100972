//! Auxiliary cost-table analyses (parsed spreadsheets of priced items).

use serde::{Deserialize, Serialize};

/// One priced line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostItem {
    #[serde(alias = "urun_adi")]
    pub name: String,
    #[serde(default, alias = "miktar")]
    pub quantity: f64,
    #[serde(default, alias = "birim")]
    pub unit: String,
    #[serde(default, alias = "birim_fiyat")]
    pub unit_price: f64,
    #[serde(default, alias = "toplam_fiyat")]
    pub total_price: f64,
    #[serde(default, alias = "kategori")]
    pub category: Option<String>,
}

/// Per-category rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub name: String,
    pub count: usize,
    pub total_cost: f64,
}

/// Rollup over all merged items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_items: usize,
    pub total_cost: f64,
    pub average_unit_price: f64,
    pub categories: Vec<CategoryTotal>,
}

/// Merged view of every auxiliary analysis supplied with a request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostTable {
    pub items: Vec<CostItem>,
    pub summary: CostSummary,

    /// Number of analyses merged.
    pub sources: usize,
}
