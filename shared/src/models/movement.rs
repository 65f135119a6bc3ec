//! Inventory movement ledger models and stock arithmetic rules

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a pure stock rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockRuleError {
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),

    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("stock quantity overflow")]
    Overflow,

    #[error("unknown {kind} code: {value}")]
    UnknownCode { kind: &'static str, value: String },
}

/// Whether a movement adds to or removes from a stock level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    /// Compute the new quantity of a stock level after moving `quantity` units.
    ///
    /// Outbound moves never take a level below zero.
    pub fn apply(self, current: i64, quantity: i64) -> Result<i64, StockRuleError> {
        if quantity <= 0 {
            return Err(StockRuleError::NonPositiveQuantity(quantity));
        }
        match self {
            Direction::Inbound => current.checked_add(quantity).ok_or(StockRuleError::Overflow),
            Direction::Outbound => {
                if current < quantity {
                    return Err(StockRuleError::InsufficientStock {
                        available: current,
                        requested: quantity,
                    });
                }
                Ok(current - quantity)
            }
        }
    }

    /// Origin / destination warehouse columns for a single-warehouse movement
    pub fn warehouse_roles(self, warehouse_id: i64) -> (Option<i64>, Option<i64>) {
        match self {
            Direction::Inbound => (None, Some(warehouse_id)),
            Direction::Outbound => (Some(warehouse_id), None),
        }
    }
}

/// Movement type (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementType {
    #[serde(rename = "ENTRADA")]
    Entry,
    #[serde(rename = "SALIDA")]
    Exit,
    #[serde(rename = "AJUSTE_POSITIVO")]
    PositiveAdjustment,
    #[serde(rename = "AJUSTE_NEGATIVO")]
    NegativeAdjustment,
    #[serde(rename = "TRANSFERENCIA_ENTRADA")]
    TransferIn,
    #[serde(rename = "TRANSFERENCIA_SALIDA")]
    TransferOut,
    #[serde(rename = "INVENTARIO_INICIAL")]
    InitialStock,
    #[serde(rename = "INVENTARIO_FISICO")]
    PhysicalCount,
}

impl MovementType {
    pub const ALL: [MovementType; 8] = [
        MovementType::Entry,
        MovementType::Exit,
        MovementType::PositiveAdjustment,
        MovementType::NegativeAdjustment,
        MovementType::TransferIn,
        MovementType::TransferOut,
        MovementType::InitialStock,
        MovementType::PhysicalCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "ENTRADA",
            MovementType::Exit => "SALIDA",
            MovementType::PositiveAdjustment => "AJUSTE_POSITIVO",
            MovementType::NegativeAdjustment => "AJUSTE_NEGATIVO",
            MovementType::TransferIn => "TRANSFERENCIA_ENTRADA",
            MovementType::TransferOut => "TRANSFERENCIA_SALIDA",
            MovementType::InitialStock => "INVENTARIO_INICIAL",
            MovementType::PhysicalCount => "INVENTARIO_FISICO",
        }
    }

    /// Fixed direction of the type; `None` for physical counts, whose
    /// direction depends on the counted difference
    pub fn direction(&self) -> Option<Direction> {
        match self {
            MovementType::Entry
            | MovementType::PositiveAdjustment
            | MovementType::TransferIn
            | MovementType::InitialStock => Some(Direction::Inbound),
            MovementType::Exit | MovementType::NegativeAdjustment | MovementType::TransferOut => {
                Some(Direction::Outbound)
            }
            MovementType::PhysicalCount => None,
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, MovementType::TransferIn | MovementType::TransferOut)
    }

    /// Adjustment type and magnitude for a signed delta
    pub fn adjustment_for(delta: i64) -> Result<(MovementType, i64), StockRuleError> {
        match delta {
            0 => Err(StockRuleError::NonPositiveQuantity(0)),
            d if d > 0 => Ok((MovementType::PositiveAdjustment, d)),
            d => d
                .checked_abs()
                .map(|magnitude| (MovementType::NegativeAdjustment, magnitude))
                .ok_or(StockRuleError::Overflow),
        }
    }
}

impl FromStr for MovementType {
    type Err = StockRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| StockRuleError::UnknownCode {
                kind: "movement type",
                value: s.to_string(),
            })
    }
}

/// Reason code attached to every movement (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementReason {
    #[serde(rename = "COMPRA")]
    Purchase,
    #[serde(rename = "VENTA")]
    Sale,
    #[serde(rename = "DEVOLUCION_CLIENTE")]
    CustomerReturn,
    #[serde(rename = "DEVOLUCION_PROVEEDOR")]
    SupplierReturn,
    #[serde(rename = "AJUSTE_STOCK")]
    StockAdjustment,
    #[serde(rename = "CONTEO_FISICO")]
    PhysicalCount,
    #[serde(rename = "PRODUCTO_DANADO")]
    DamagedGood,
    #[serde(rename = "PRODUCTO_VENCIDO")]
    ExpiredGood,
    #[serde(rename = "ERROR_SISTEMA")]
    SystemError,
    #[serde(rename = "ROBO_PERDIDA")]
    TheftLoss,
    #[serde(rename = "TRANSFERENCIA")]
    Transfer,
    #[serde(rename = "OTRO")]
    Other,
}

impl MovementReason {
    pub const ALL: [MovementReason; 12] = [
        MovementReason::Purchase,
        MovementReason::Sale,
        MovementReason::CustomerReturn,
        MovementReason::SupplierReturn,
        MovementReason::StockAdjustment,
        MovementReason::PhysicalCount,
        MovementReason::DamagedGood,
        MovementReason::ExpiredGood,
        MovementReason::SystemError,
        MovementReason::TheftLoss,
        MovementReason::Transfer,
        MovementReason::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Purchase => "COMPRA",
            MovementReason::Sale => "VENTA",
            MovementReason::CustomerReturn => "DEVOLUCION_CLIENTE",
            MovementReason::SupplierReturn => "DEVOLUCION_PROVEEDOR",
            MovementReason::StockAdjustment => "AJUSTE_STOCK",
            MovementReason::PhysicalCount => "CONTEO_FISICO",
            MovementReason::DamagedGood => "PRODUCTO_DANADO",
            MovementReason::ExpiredGood => "PRODUCTO_VENCIDO",
            MovementReason::SystemError => "ERROR_SISTEMA",
            MovementReason::TheftLoss => "ROBO_PERDIDA",
            MovementReason::Transfer => "TRANSFERENCIA",
            MovementReason::Other => "OTRO",
        }
    }
}

impl FromStr for MovementReason {
    type Err = StockRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementReason::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| StockRuleError::UnknownCode {
                kind: "movement reason",
                value: s.to_string(),
            })
    }
}

/// One immutable ledger row.
///
/// `stock_before` / `stock_after` are the quantities of the affected
/// per-warehouse stock level around this movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Movement {
    pub id: i64,
    pub product_id: i64,
    pub origin_warehouse_id: Option<i64>,
    pub destination_warehouse_id: Option<i64>,
    pub movement_type: MovementType,
    pub reason: MovementReason,
    pub quantity: i64,
    pub user_id: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub note: Option<String>,
    pub document_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// Whether the movement touched the given warehouse on either side
    pub fn involves_warehouse(&self, warehouse_id: i64) -> bool {
        self.origin_warehouse_id == Some(warehouse_id)
            || self.destination_warehouse_id == Some(warehouse_id)
    }
}
