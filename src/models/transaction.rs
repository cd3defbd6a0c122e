use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A completed POS transaction as recorded at the till.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub timestamp: DateTime<Utc>,
    pub items: Vec<LineItem>,
}

/// One line of a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub item_name: String,
    pub quantity: u32,
    /// Line total (unit price times quantity, after discounts).
    pub total: Decimal,
}

impl Transaction {
    pub fn new(timestamp: DateTime<Utc>, items: Vec<LineItem>) -> Self {
        Self { timestamp, items }
    }
}

impl LineItem {
    pub fn new(item_name: impl Into<String>, quantity: u32, total: Decimal) -> Self {
        Self {
            item_name: item_name.into(),
            quantity,
            total,
        }
    }
}

/// A menu item as listed in the shop's catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Sales of one item within one hour-of-day bucket, summed over a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlySales {
    pub item_id: String,
    /// 0..=23, UTC.
    pub hour: u32,
    pub quantity: u32,
    pub revenue: Decimal,
}
