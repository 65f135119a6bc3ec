//! Warehouse administration

use std::sync::Arc;

use chrono::Utc;
use shared::{NewWarehouse, Pagination, Warehouse, WarehouseChanges};

use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, LedgerTx};

#[derive(Clone)]
pub struct WarehouseService {
    store: Arc<dyn LedgerStore>,
}

impl WarehouseService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, only_active: bool, page: Pagination) -> AppResult<Vec<Warehouse>> {
        self.store.list_warehouses(only_active, page).await
    }

    pub async fn get(&self, warehouse_id: i64) -> AppResult<Warehouse> {
        self.store
            .find_warehouse(warehouse_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
    }

    /// Register a warehouse; codes are unique
    pub async fn create(&self, input: NewWarehouse) -> AppResult<Warehouse> {
        shared::validate_warehouse_code(&input.code)
            .map_err(|e| AppError::validation("code", e, "Código de bodega inválido"))?;
        shared::validate_name(&input.name)
            .map_err(|e| AppError::validation("name", e, "Nombre inválido"))?;

        let mut tx = self.store.begin().await?;
        let warehouse = tx.insert_warehouse(&input).await?;
        tx.commit().await?;

        tracing::info!(warehouse_id = warehouse.id, code = %warehouse.code, "warehouse created");
        Ok(warehouse)
    }

    /// Partial update; deactivating goes through the same stock check as
    /// [`WarehouseService::deactivate`]
    pub async fn update(&self, warehouse_id: i64, changes: WarehouseChanges) -> AppResult<Warehouse> {
        if let Some(name) = &changes.name {
            shared::validate_name(name)
                .map_err(|e| AppError::validation("name", e, "Nombre inválido"))?;
        }

        let mut tx = self.store.begin().await?;
        let mut warehouse = lock_warehouse(tx.as_mut(), warehouse_id).await?;

        if changes.active == Some(false) && warehouse.active {
            ensure_empty(tx.as_mut(), &warehouse).await?;
        }

        warehouse.apply_changes(&changes, Utc::now());
        let updated = tx.update_warehouse(&warehouse).await?;
        tx.commit().await?;

        tracing::info!(warehouse_id, active = updated.active, "warehouse updated");
        Ok(updated)
    }

    /// Soft delete; refused while the warehouse still holds stock
    pub async fn deactivate(&self, warehouse_id: i64) -> AppResult<Warehouse> {
        self.update(
            warehouse_id,
            WarehouseChanges {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
    }
}

async fn lock_warehouse(tx: &mut dyn LedgerTx, warehouse_id: i64) -> AppResult<Warehouse> {
    tx.lock_warehouse(warehouse_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))
}

async fn ensure_empty(tx: &mut dyn LedgerTx, warehouse: &Warehouse) -> AppResult<()> {
    let stocked = tx.count_stocked_levels(warehouse.id).await?;
    if stocked > 0 {
        tracing::warn!(
            warehouse_id = warehouse.id,
            stocked,
            "warehouse deactivation refused"
        );
        return Err(AppError::InvalidArgument(format!(
            "warehouse {} still holds stock of {} product(s)",
            warehouse.code, stocked
        )));
    }
    Ok(())
}
