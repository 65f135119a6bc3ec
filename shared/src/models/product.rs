//! Catalog product as seen by the stock engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog product.
///
/// `current_stock` is a cache of the sum of the product's per-warehouse stock
/// levels. Only reconciliation writes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub unit_price: Decimal,
    pub min_stock: i64,
    pub current_stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stock health of a product relative to its minimum threshold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StockStatus {
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "STOCK_BAJO")]
    LowStock,
    #[serde(rename = "SIN_STOCK")]
    OutOfStock,
}

impl StockStatus {
    pub fn classify(total: i64, min_stock: i64) -> Self {
        if total == 0 {
            StockStatus::OutOfStock
        } else if total <= min_stock {
            StockStatus::LowStock
        } else {
            StockStatus::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Normal => "NORMAL",
            StockStatus::LowStock => "STOCK_BAJO",
            StockStatus::OutOfStock => "SIN_STOCK",
        }
    }
}

/// A product at or below its minimum stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LowStockAlert {
    pub product: Product,
    pub current_stock: i64,
    pub min_stock: i64,
    /// `current_stock / min_stock * 100`, zero when no minimum is set
    pub alert_percentage: Decimal,
}

impl LowStockAlert {
    /// Build an alert when the product is at or below its minimum
    pub fn evaluate(product: Product) -> Option<Self> {
        if product.current_stock > product.min_stock {
            return None;
        }
        let alert_percentage = alert_percentage(product.current_stock, product.min_stock);
        Some(Self {
            current_stock: product.current_stock,
            min_stock: product.min_stock,
            alert_percentage,
            product,
        })
    }
}

/// Percentage of the minimum threshold currently in stock, two decimals
pub fn alert_percentage(current_stock: i64, min_stock: i64) -> Decimal {
    if min_stock <= 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(current_stock) * Decimal::ONE_HUNDRED / Decimal::from(min_stock)).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn product(current_stock: i64, min_stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: 1,
            sku: "SKU-001".to_string(),
            name: "Widget".to_string(),
            description: None,
            category_id: None,
            unit_price: Decimal::from(10),
            min_stock,
            current_stock,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_stock_status_classification() {
        assert_eq!(StockStatus::classify(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(0, 0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(5, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(6, 5), StockStatus::Normal);
    }

    #[test]
    fn test_alert_percentage() {
        assert_eq!(alert_percentage(5, 10), Decimal::from(50));
        assert_eq!(alert_percentage(1, 3), Decimal::from_str("33.33").unwrap());
        assert_eq!(alert_percentage(0, 0), Decimal::ZERO);
    }

    #[test]
    fn test_alert_only_at_or_below_minimum() {
        assert!(LowStockAlert::evaluate(product(11, 10)).is_none());

        let alert = LowStockAlert::evaluate(product(10, 10)).unwrap();
        assert_eq!(alert.alert_percentage, Decimal::from(100));

        let alert = LowStockAlert::evaluate(product(0, 0)).unwrap();
        assert_eq!(alert.alert_percentage, Decimal::ZERO);
    }
}
