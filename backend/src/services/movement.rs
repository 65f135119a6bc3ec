//! Movement engine: single-warehouse stock changes
//!
//! Every operation opens one transaction that locks the affected stock level,
//! writes the new quantity, appends the ledger row and reconciles the product.
//! Nothing is persisted unless all of it succeeds.

use std::sync::Arc;

use serde::Deserialize;
use shared::{Direction, Movement, MovementReason, MovementType, Product, StockLevel, Warehouse};

use super::reconciliation::reconcile;
use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, LedgerTx, NewMovement};

/// Request to apply one typed movement
#[derive(Debug, Clone, Deserialize)]
pub struct MovementRequest {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub movement_type: MovementType,
    pub reason: MovementReason,
    pub quantity: i64,
    pub note: Option<String>,
    pub document_ref: Option<String>,
}

/// Request to apply a signed adjustment
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustmentRequest {
    pub product_id: i64,
    pub warehouse_id: i64,
    /// Positive adds stock, negative removes it
    pub delta: i64,
    pub reason: MovementReason,
    pub note: Option<String>,
}

/// Ledger row to derive from a locked stock level
pub(crate) struct Step {
    pub movement_type: MovementType,
    pub reason: MovementReason,
    pub quantity: i64,
    pub origin_warehouse_id: Option<i64>,
    pub destination_warehouse_id: Option<i64>,
    pub user_id: i64,
    pub note: Option<String>,
    pub document_ref: Option<String>,
}

/// Move stock on a locked level and append the matching ledger row.
///
/// The level's quantity is written before the movement is inserted; a stock
/// rule failure leaves both untouched.
pub(crate) async fn apply_step(
    tx: &mut dyn LedgerTx,
    level: &StockLevel,
    direction: Direction,
    step: Step,
) -> AppResult<(StockLevel, Movement)> {
    let stock_before = level.quantity;
    let stock_after = direction
        .apply(stock_before, step.quantity)
        .map_err(|e| AppError::from_rule(e, level.product_id, level.warehouse_id))?;

    let updated = tx.set_stock_quantity(level, stock_after).await?;
    let movement = tx
        .insert_movement(NewMovement {
            product_id: level.product_id,
            origin_warehouse_id: step.origin_warehouse_id,
            destination_warehouse_id: step.destination_warehouse_id,
            movement_type: step.movement_type,
            reason: step.reason,
            quantity: step.quantity,
            user_id: step.user_id,
            stock_before,
            stock_after,
            note: step.note,
            document_ref: step.document_ref,
        })
        .await?;

    Ok((updated, movement))
}

/// Product lookup inside a transaction
pub(crate) async fn require_product(tx: &mut dyn LedgerTx, product_id: i64) -> AppResult<Product> {
    tx.find_product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Warehouse lookup inside a transaction; inactive warehouses take no stock
pub(crate) async fn require_active_warehouse(
    tx: &mut dyn LedgerTx,
    warehouse_id: i64,
) -> AppResult<Warehouse> {
    let warehouse = tx
        .find_warehouse(warehouse_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

    if !warehouse.active {
        return Err(AppError::InvalidArgument(format!(
            "warehouse {} is inactive",
            warehouse.code
        )));
    }
    Ok(warehouse)
}

pub(crate) fn check_note(note: Option<&str>) -> AppResult<()> {
    if let Some(note) = note {
        shared::validate_note(note)
            .map_err(|e| AppError::validation("note", e, "Observación demasiado larga"))?;
    }
    Ok(())
}

/// Applies entries, exits, adjustments and initial stock
#[derive(Clone)]
pub struct MovementEngine {
    store: Arc<dyn LedgerStore>,
    default_location: String,
}

impl MovementEngine {
    pub fn new(store: Arc<dyn LedgerStore>, default_location: impl Into<String>) -> Self {
        Self {
            store,
            default_location: default_location.into(),
        }
    }

    /// Apply one movement to a single stock level.
    ///
    /// Transfer and physical-count types are rejected; they have their own
    /// entry points.
    pub async fn apply_movement(&self, user_id: i64, request: MovementRequest) -> AppResult<Movement> {
        if request.quantity <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }
        check_note(request.note.as_deref())?;

        let direction = match request.movement_type.direction() {
            Some(direction) if !request.movement_type.is_transfer() => direction,
            _ => {
                return Err(AppError::InvalidArgument(format!(
                    "movement type {} cannot be applied directly",
                    request.movement_type.as_str()
                )))
            }
        };

        let mut tx = self.store.begin().await?;
        let movement = self
            .apply_in_tx(
                tx.as_mut(),
                request.product_id,
                request.warehouse_id,
                direction,
                Step {
                    movement_type: request.movement_type,
                    reason: request.reason,
                    quantity: request.quantity,
                    origin_warehouse_id: None,
                    destination_warehouse_id: None,
                    user_id,
                    note: request.note,
                    document_ref: request.document_ref,
                },
            )
            .await;
        let (movement, product) = match movement {
            Ok(done) => done,
            Err(e) => {
                log_rejected(request.product_id, request.warehouse_id, &e);
                return Err(e);
            }
        };
        tx.commit().await?;

        tracing::info!(
            movement_id = movement.id,
            product_id = movement.product_id,
            warehouse_id = request.warehouse_id,
            movement_type = movement.movement_type.as_str(),
            quantity = movement.quantity,
            stock_before = movement.stock_before,
            stock_after = movement.stock_after,
            product_total = product.current_stock,
            user_id,
            "movement applied"
        );

        Ok(movement)
    }

    /// Apply a signed adjustment; the sign picks the adjustment type
    pub async fn adjust(&self, user_id: i64, request: AdjustmentRequest) -> AppResult<Movement> {
        if request.delta == 0 {
            return Err(AppError::InvalidArgument(
                "adjustment delta cannot be zero".to_string(),
            ));
        }
        let (movement_type, quantity) = MovementType::adjustment_for(request.delta)?;

        self.apply_movement(
            user_id,
            MovementRequest {
                product_id: request.product_id,
                warehouse_id: request.warehouse_id,
                movement_type,
                reason: request.reason,
                quantity,
                note: request.note,
                document_ref: None,
            },
        )
        .await
    }

    /// Record the opening quantity of a product in a warehouse
    pub async fn record_initial_stock(
        &self,
        user_id: i64,
        product_id: i64,
        warehouse_id: i64,
        quantity: i64,
    ) -> AppResult<Movement> {
        self.apply_movement(
            user_id,
            MovementRequest {
                product_id,
                warehouse_id,
                movement_type: MovementType::InitialStock,
                reason: MovementReason::Purchase,
                quantity,
                note: Some("Stock inicial".to_string()),
                document_ref: None,
            },
        )
        .await
    }

    async fn apply_in_tx(
        &self,
        tx: &mut dyn LedgerTx,
        product_id: i64,
        warehouse_id: i64,
        direction: Direction,
        mut step: Step,
    ) -> AppResult<(Movement, Product)> {
        require_product(tx, product_id).await?;
        require_active_warehouse(tx, warehouse_id).await?;

        let level = tx
            .lock_or_create_stock_level(product_id, warehouse_id, &self.default_location)
            .await?;

        let (origin, destination) = direction.warehouse_roles(warehouse_id);
        step.origin_warehouse_id = origin;
        step.destination_warehouse_id = destination;

        let (_, movement) = apply_step(tx, &level, direction, step).await?;
        let product = reconcile(tx, product_id).await?;
        Ok((movement, product))
    }
}

pub(crate) fn log_rejected(product_id: i64, warehouse_id: i64, err: &AppError) {
    match err {
        AppError::InsufficientStock {
            available,
            requested,
            ..
        } => tracing::warn!(
            product_id,
            warehouse_id,
            available,
            requested,
            "stock operation rejected: insufficient stock"
        ),
        other => tracing::warn!(product_id, warehouse_id, error = %other, "stock operation rejected"),
    }
}
