//! Warehouse (bodega) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A storage location holding per-product stock levels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warehouse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when registering a warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewWarehouse {
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub description: Option<String>,
}

/// Partial update of a warehouse; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarehouseChanges {
    pub name: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

impl Warehouse {
    /// Apply a partial update in place
    pub fn apply_changes(&mut self, changes: &WarehouseChanges, at: DateTime<Utc>) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(address) = &changes.address {
            self.address = Some(address.clone());
        }
        if let Some(description) = &changes.description {
            self.description = Some(description.clone());
        }
        if let Some(active) = changes.active {
            self.active = active;
        }
        self.updated_at = at;
    }
}
