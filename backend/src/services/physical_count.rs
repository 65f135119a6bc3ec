//! Physical count reconciliation
//!
//! Turns counted quantities into corrective adjustments. A batch runs in a
//! single transaction: one bad item rolls back every adjustment of the batch.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::{Movement, MovementReason, MovementType};

use super::movement::{apply_step, check_note, log_rejected, require_active_warehouse, require_product, Step};
use super::reconciliation::reconcile;
use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, LedgerTx};

/// Counted quantity of one product in one warehouse
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountItem {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub counted: i64,
}

#[derive(Clone)]
pub struct PhysicalCountReconciler {
    store: Arc<dyn LedgerStore>,
    default_location: String,
}

impl PhysicalCountReconciler {
    pub fn new(store: Arc<dyn LedgerStore>, default_location: impl Into<String>) -> Self {
        Self {
            store,
            default_location: default_location.into(),
        }
    }

    /// Apply a count batch; returns one adjustment per item whose count
    /// differs from the recorded stock, in item order
    pub async fn apply_physical_count(
        &self,
        user_id: i64,
        items: &[CountItem],
        note: Option<String>,
    ) -> AppResult<Vec<Movement>> {
        validate_items(items)?;
        check_note(note.as_deref())?;

        let mut tx = self.store.begin().await?;
        let movements = match self.count_in_tx(tx.as_mut(), user_id, items, note).await {
            Ok(movements) => movements,
            Err(e) => {
                tracing::warn!(user_id, items = items.len(), error = %e, "physical count rolled back");
                return Err(e);
            }
        };
        tx.commit().await?;

        tracing::info!(
            user_id,
            items = items.len(),
            adjustments = movements.len(),
            "physical count applied"
        );

        Ok(movements)
    }

    async fn count_in_tx(
        &self,
        tx: &mut dyn LedgerTx,
        user_id: i64,
        items: &[CountItem],
        note: Option<String>,
    ) -> AppResult<Vec<Movement>> {
        // Stock levels are locked in (product, warehouse) order whatever the
        // item order, then every touched product is reconciled once.
        let mut order: Vec<usize> = (0..items.len()).collect();
        order.sort_by_key(|&i| (items[i].product_id, items[i].warehouse_id));

        let mut results: Vec<Option<Movement>> = vec![None; items.len()];
        let mut products = BTreeSet::new();

        for i in order {
            let item = items[i];
            require_product(tx, item.product_id).await?;
            require_active_warehouse(tx, item.warehouse_id).await?;

            let level = tx
                .lock_or_create_stock_level(item.product_id, item.warehouse_id, &self.default_location)
                .await?;
            products.insert(item.product_id);

            let delta = item.counted - level.quantity;
            if delta == 0 {
                tracing::debug!(
                    product_id = item.product_id,
                    warehouse_id = item.warehouse_id,
                    counted = item.counted,
                    "count matches recorded stock"
                );
                continue;
            }

            let (movement_type, quantity) = MovementType::adjustment_for(delta)?;
            let direction = movement_type
                .direction()
                .ok_or_else(|| AppError::Internal("adjustment without direction".to_string()))?;
            let (origin, destination) = direction.warehouse_roles(item.warehouse_id);

            let step = Step {
                movement_type,
                reason: MovementReason::PhysicalCount,
                quantity,
                origin_warehouse_id: origin,
                destination_warehouse_id: destination,
                user_id,
                note: note.clone(),
                document_ref: None,
            };
            let (_, movement) = apply_step(tx, &level, direction, step).await.map_err(|e| {
                log_rejected(item.product_id, item.warehouse_id, &e);
                e
            })?;
            results[i] = Some(movement);
        }

        for product_id in products {
            reconcile(tx, product_id).await?;
        }

        Ok(results.into_iter().flatten().collect())
    }
}

fn validate_items(items: &[CountItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::InvalidArgument(
            "physical count needs at least one item".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if item.counted < 0 {
            return Err(AppError::InvalidArgument(format!(
                "counted quantity cannot be negative (product {}, warehouse {})",
                item.product_id, item.warehouse_id
            )));
        }
        if !seen.insert((item.product_id, item.warehouse_id)) {
            return Err(AppError::InvalidArgument(format!(
                "product {} is counted twice in warehouse {}",
                item.product_id, item.warehouse_id
            )));
        }
    }
    Ok(())
}
