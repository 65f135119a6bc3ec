//! Stock reconciliation
//!
//! `Product.current_stock` is a cache. These functions are the only writers
//! of it: they lock the product row, sum its stock levels and store the total,
//! all inside the caller's transaction.

use std::sync::Arc;

use shared::Product;

use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, LedgerTx};

/// Recompute one product's aggregate stock inside an open transaction
pub async fn reconcile(tx: &mut dyn LedgerTx, product_id: i64) -> AppResult<Product> {
    let product = tx
        .lock_product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let total = tx.sum_stock(product_id).await?;
    let updated = tx.set_product_stock(product_id, total).await?;

    if product.current_stock != total {
        tracing::info!(
            product_id,
            cached = product.current_stock,
            total,
            "corrected cached product stock"
        );
    } else {
        tracing::debug!(product_id, total, "product stock reconciled");
    }

    Ok(updated)
}

/// Reconcile every product, in ascending id order
pub async fn reconcile_all(tx: &mut dyn LedgerTx) -> AppResult<Vec<Product>> {
    let ids = tx.list_product_ids().await?;
    let mut products = Vec::with_capacity(ids.len());
    for id in ids {
        products.push(reconcile(tx, id).await?);
    }
    Ok(products)
}

/// Standalone reconciliation entry point
#[derive(Clone)]
pub struct ReconciliationService {
    store: Arc<dyn LedgerStore>,
}

impl ReconciliationService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Recompute and persist the product's total; returns the reconciled product
    pub async fn reconcile_product(&self, product_id: i64) -> AppResult<Product> {
        let mut tx = self.store.begin().await?;
        let product = reconcile(tx.as_mut(), product_id).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// Reconcile every product in one transaction
    pub async fn reconcile_all(&self) -> AppResult<Vec<Product>> {
        let mut tx = self.store.begin().await?;
        let products = reconcile_all(tx.as_mut()).await?;
        tx.commit().await?;
        Ok(products)
    }
}
