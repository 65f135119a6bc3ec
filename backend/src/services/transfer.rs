//! Transfers between two warehouses
//!
//! A transfer is two ledger steps, a debit of the source and a credit of the
//! destination, committed together with one reconciliation of the product.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::{Direction, Movement, MovementReason, MovementType, Product};

use super::movement::{apply_step, check_note, log_rejected, require_active_warehouse, require_product, Step};
use super::reconciliation::reconcile;
use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, LedgerTx};

#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub product_id: i64,
    pub source_warehouse_id: i64,
    pub destination_warehouse_id: i64,
    pub quantity: i64,
    pub note: Option<String>,
}

/// The two ledger rows written by a transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub outbound: Movement,
    pub inbound: Movement,
}

#[derive(Clone)]
pub struct TransferOrchestrator {
    store: Arc<dyn LedgerStore>,
    default_location: String,
}

impl TransferOrchestrator {
    pub fn new(store: Arc<dyn LedgerStore>, default_location: impl Into<String>) -> Self {
        Self {
            store,
            default_location: default_location.into(),
        }
    }

    pub async fn transfer(&self, user_id: i64, request: TransferRequest) -> AppResult<TransferReceipt> {
        if request.source_warehouse_id == request.destination_warehouse_id {
            return Err(AppError::InvalidArgument(
                "source and destination warehouses must differ".to_string(),
            ));
        }
        if request.quantity <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }
        check_note(request.note.as_deref())?;

        let mut tx = self.store.begin().await?;
        let (receipt, product) = match self.transfer_in_tx(tx.as_mut(), user_id, &request).await {
            Ok(done) => done,
            Err(e) => {
                log_rejected(request.product_id, request.source_warehouse_id, &e);
                return Err(e);
            }
        };
        tx.commit().await?;

        tracing::info!(
            product_id = request.product_id,
            source_warehouse_id = request.source_warehouse_id,
            destination_warehouse_id = request.destination_warehouse_id,
            quantity = request.quantity,
            source_after = receipt.outbound.stock_after,
            destination_after = receipt.inbound.stock_after,
            product_total = product.current_stock,
            user_id,
            "transfer applied"
        );

        Ok(receipt)
    }

    async fn transfer_in_tx(
        &self,
        tx: &mut dyn LedgerTx,
        user_id: i64,
        request: &TransferRequest,
    ) -> AppResult<(TransferReceipt, Product)> {
        let product_id = request.product_id;
        let source_id = request.source_warehouse_id;
        let destination_id = request.destination_warehouse_id;

        require_product(tx, product_id).await?;
        require_active_warehouse(tx, source_id).await?;
        require_active_warehouse(tx, destination_id).await?;

        // Lock both levels in ascending warehouse order
        let (source, destination) = if source_id < destination_id {
            let source = tx
                .lock_or_create_stock_level(product_id, source_id, &self.default_location)
                .await?;
            let destination = tx
                .lock_or_create_stock_level(product_id, destination_id, &self.default_location)
                .await?;
            (source, destination)
        } else {
            let destination = tx
                .lock_or_create_stock_level(product_id, destination_id, &self.default_location)
                .await?;
            let source = tx
                .lock_or_create_stock_level(product_id, source_id, &self.default_location)
                .await?;
            (source, destination)
        };

        let step = |movement_type: MovementType| Step {
            movement_type,
            reason: MovementReason::Transfer,
            quantity: request.quantity,
            origin_warehouse_id: Some(source_id),
            destination_warehouse_id: Some(destination_id),
            user_id,
            note: request.note.clone(),
            document_ref: None,
        };

        let (_, outbound) =
            apply_step(tx, &source, Direction::Outbound, step(MovementType::TransferOut)).await?;
        let (_, inbound) =
            apply_step(tx, &destination, Direction::Inbound, step(MovementType::TransferIn)).await?;

        let product = reconcile(tx, product_id).await?;
        Ok((TransferReceipt { outbound, inbound }, product))
    }
}
