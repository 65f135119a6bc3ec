//! Per-warehouse stock levels and consolidated views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Product, StockStatus};

/// Quantity of one product held in one warehouse.
///
/// Unique per (product, warehouse). The quantity never drops below zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockLevel {
    pub id: i64,
    pub product_id: i64,
    pub warehouse_id: i64,
    pub quantity: i64,
    /// Shelf / bin label inside the warehouse
    pub location: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Total stock of a product with its per-warehouse breakdown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsolidatedStock {
    pub product: Product,
    pub total: i64,
    pub by_warehouse: Vec<StockLevel>,
    pub status: StockStatus,
}

impl ConsolidatedStock {
    pub fn new(product: Product, by_warehouse: Vec<StockLevel>) -> Self {
        let total = by_warehouse.iter().map(|level| level.quantity).sum();
        let status = StockStatus::classify(total, product.min_stock);
        Self {
            product,
            total,
            by_warehouse,
            status,
        }
    }
}
