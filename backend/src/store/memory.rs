//! In-memory ledger store.
//!
//! Intended for tests and local development. A transaction holds the store's
//! single lock for its whole lifetime and works on a staged copy of the
//! state, which replaces the shared state on commit. Transactions are
//! therefore fully serialized, which is stricter than the row-level locking of
//! the Postgres store but gives the same observable guarantees.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    Movement, NewWarehouse, Pagination, Product, StockLevel, StockRuleError, Warehouse,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LedgerStore, LedgerTx, MovementFilter, NewMovement};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    products: BTreeMap<i64, Product>,
    warehouses: BTreeMap<i64, Warehouse>,
    /// Keyed by (product_id, warehouse_id)
    stock_levels: BTreeMap<(i64, i64), StockLevel>,
    movements: Vec<Movement>,
    next_product_id: i64,
    next_warehouse_id: i64,
    next_stock_level_id: i64,
    next_movement_id: i64,
    /// Last timestamp handed out, so ledger timestamps never go backwards
    clock: Option<DateTime<Utc>>,
}

impl LedgerState {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn now(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = match self.clock {
            Some(last) if last > now => last,
            _ => now,
        };
        self.clock = Some(now);
        now
    }
}

/// Process-local [`LedgerStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a catalog product. Products are owned by the catalog service;
    /// this stands in for it when no database is attached.
    pub async fn seed_product(
        &self,
        sku: &str,
        name: &str,
        unit_price: Decimal,
        min_stock: i64,
    ) -> AppResult<Product> {
        shared::validate_sku(sku).map_err(|e| AppError::validation("sku", e, "SKU inválido"))?;
        shared::validate_min_stock(min_stock)
            .map_err(|e| AppError::validation("min_stock", e, "Stock mínimo inválido"))?;

        let mut state = self.state.lock().await;
        if state.products.values().any(|p| p.sku == sku) {
            return Err(AppError::IntegrityConflict(format!(
                "product with sku {} already exists",
                sku
            )));
        }

        let id = LedgerState::next_id(&mut state.next_product_id);
        let now = state.now();
        let product = Product {
            id,
            sku: sku.to_string(),
            name: name.to_string(),
            description: None,
            category_id: None,
            unit_price,
            min_stock,
            current_stock: 0,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(id, product.clone());
        Ok(product)
    }

    /// Overwrite a product's cached aggregate without touching its stock
    /// levels. Only useful to simulate a stale cache.
    pub async fn corrupt_cached_stock(&self, product_id: i64, current_stock: i64) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        product.current_stock = current_stock;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryLedgerTx { guard, staged }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn find_product(&self, product_id: i64) -> AppResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(&product_id).cloned())
    }

    async fn find_warehouse(&self, warehouse_id: i64) -> AppResult<Option<Warehouse>> {
        Ok(self.state.lock().await.warehouses.get(&warehouse_id).cloned())
    }

    async fn list_warehouses(&self, only_active: bool, page: Pagination) -> AppResult<Vec<Warehouse>> {
        let state = self.state.lock().await;
        Ok(state
            .warehouses
            .values()
            .filter(|w| !only_active || w.active)
            .skip(page.skip as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn stock_levels_by_product(&self, product_id: i64) -> AppResult<Vec<StockLevel>> {
        let state = self.state.lock().await;
        Ok(state
            .stock_levels
            .values()
            .filter(|level| level.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn stock_levels_by_warehouse(&self, warehouse_id: i64) -> AppResult<Vec<StockLevel>> {
        let state = self.state.lock().await;
        let mut levels: Vec<StockLevel> = state
            .stock_levels
            .values()
            .filter(|level| level.warehouse_id == warehouse_id && level.quantity > 0)
            .cloned()
            .collect();
        levels.sort_by_key(|level| level.product_id);
        Ok(levels)
    }

    async fn list_movements(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>> {
        let state = self.state.lock().await;
        let mut movements: Vec<Movement> = state
            .movements
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(match filter.page {
            Some(page) => movements
                .into_iter()
                .skip(page.skip as usize)
                .take(page.limit as usize)
                .collect(),
            None => movements,
        })
    }
}

/// Open transaction over the in-memory state
pub struct MemoryLedgerTx {
    guard: OwnedMutexGuard<LedgerState>,
    staged: LedgerState,
}

impl MemoryLedgerTx {
    fn level_mut(&mut self, level: &StockLevel) -> AppResult<&mut StockLevel> {
        self.staged
            .stock_levels
            .get_mut(&(level.product_id, level.warehouse_id))
            .ok_or_else(|| AppError::NotFound("Stock level".to_string()))
    }
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn find_product(&mut self, product_id: i64) -> AppResult<Option<Product>> {
        Ok(self.staged.products.get(&product_id).cloned())
    }

    async fn lock_product(&mut self, product_id: i64) -> AppResult<Option<Product>> {
        Ok(self.staged.products.get(&product_id).cloned())
    }

    async fn list_product_ids(&mut self) -> AppResult<Vec<i64>> {
        Ok(self.staged.products.keys().copied().collect())
    }

    async fn find_warehouse(&mut self, warehouse_id: i64) -> AppResult<Option<Warehouse>> {
        Ok(self.staged.warehouses.get(&warehouse_id).cloned())
    }

    async fn lock_warehouse(&mut self, warehouse_id: i64) -> AppResult<Option<Warehouse>> {
        Ok(self.staged.warehouses.get(&warehouse_id).cloned())
    }

    async fn insert_warehouse(&mut self, warehouse: &NewWarehouse) -> AppResult<Warehouse> {
        if self
            .staged
            .warehouses
            .values()
            .any(|w| w.code == warehouse.code)
        {
            return Err(AppError::IntegrityConflict(format!(
                "warehouse with code {} already exists",
                warehouse.code
            )));
        }

        let id = LedgerState::next_id(&mut self.staged.next_warehouse_id);
        let now = self.staged.now();
        let created = Warehouse {
            id,
            code: warehouse.code.clone(),
            name: warehouse.name.clone(),
            address: warehouse.address.clone(),
            description: warehouse.description.clone(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.staged.warehouses.insert(id, created.clone());
        Ok(created)
    }

    async fn update_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<Warehouse> {
        let stored = self
            .staged
            .warehouses
            .get_mut(&warehouse.id)
            .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;
        *stored = warehouse.clone();
        Ok(stored.clone())
    }

    async fn count_stocked_levels(&mut self, warehouse_id: i64) -> AppResult<i64> {
        Ok(self
            .staged
            .stock_levels
            .values()
            .filter(|level| level.warehouse_id == warehouse_id && level.quantity != 0)
            .count() as i64)
    }

    async fn lock_or_create_stock_level(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
        location: &str,
    ) -> AppResult<StockLevel> {
        if let Some(level) = self.staged.stock_levels.get(&(product_id, warehouse_id)) {
            return Ok(level.clone());
        }
        if !self.staged.products.contains_key(&product_id) {
            return Err(AppError::NotFound("Product".to_string()));
        }
        if !self.staged.warehouses.contains_key(&warehouse_id) {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        let id = LedgerState::next_id(&mut self.staged.next_stock_level_id);
        let now = self.staged.now();
        let level = StockLevel {
            id,
            product_id,
            warehouse_id,
            quantity: 0,
            location: Some(location.to_string()),
            updated_at: now,
        };
        self.staged
            .stock_levels
            .insert((product_id, warehouse_id), level.clone());
        Ok(level)
    }

    async fn set_stock_quantity(&mut self, level: &StockLevel, quantity: i64) -> AppResult<StockLevel> {
        if quantity < 0 {
            return Err(AppError::InvalidArgument(
                "check constraint violated: stock quantity cannot be negative".to_string(),
            ));
        }
        let now = self.staged.now();
        let stored = self.level_mut(level)?;
        stored.quantity = quantity;
        stored.updated_at = now;
        Ok(stored.clone())
    }

    async fn insert_movement(&mut self, movement: NewMovement) -> AppResult<Movement> {
        if movement.quantity <= 0 {
            return Err(AppError::InvalidArgument(
                "check constraint violated: movement quantity must be positive".to_string(),
            ));
        }
        if movement.origin_warehouse_id.is_none() && movement.destination_warehouse_id.is_none() {
            return Err(AppError::InvalidArgument(
                "check constraint violated: movement needs a warehouse".to_string(),
            ));
        }

        let id = LedgerState::next_id(&mut self.staged.next_movement_id);
        let created_at = self.staged.now();
        let row = Movement {
            id,
            product_id: movement.product_id,
            origin_warehouse_id: movement.origin_warehouse_id,
            destination_warehouse_id: movement.destination_warehouse_id,
            movement_type: movement.movement_type,
            reason: movement.reason,
            quantity: movement.quantity,
            user_id: movement.user_id,
            stock_before: movement.stock_before,
            stock_after: movement.stock_after,
            note: movement.note,
            document_ref: movement.document_ref,
            created_at,
        };
        self.staged.movements.push(row.clone());
        Ok(row)
    }

    async fn sum_stock(&mut self, product_id: i64) -> AppResult<i64> {
        self.staged
            .stock_levels
            .values()
            .filter(|level| level.product_id == product_id)
            .try_fold(0i64, |total, level| total.checked_add(level.quantity))
            .ok_or_else(|| AppError::from(StockRuleError::Overflow))
    }

    async fn set_product_stock(&mut self, product_id: i64, total: i64) -> AppResult<Product> {
        let now = self.staged.now();
        let product = self
            .staged
            .products
            .get_mut(&product_id)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        product.current_stock = total;
        product.updated_at = now;
        Ok(product.clone())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryLedgerTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
