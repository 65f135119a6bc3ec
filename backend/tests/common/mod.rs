//! Shared fixtures for the stock engine tests
#![allow(dead_code)]

use std::sync::Arc;

use inventory_backend::services::{
    MovementEngine, MovementRequest, PhysicalCountReconciler, ReconciliationService,
    ReportingService, TransferOrchestrator, WarehouseService,
};
use inventory_backend::store::{LedgerStore, MemoryLedgerStore, MovementFilter};
use rust_decimal::Decimal;
use shared::{Movement, MovementReason, MovementType, NewWarehouse, Product, Warehouse};

pub const USER: i64 = 42;

/// Engine services wired to one in-memory store
pub struct Fixture {
    pub memory: MemoryLedgerStore,
    pub store: Arc<dyn LedgerStore>,
    pub engine: MovementEngine,
    pub transfers: TransferOrchestrator,
    pub counts: PhysicalCountReconciler,
    pub reconciliation: ReconciliationService,
    pub reporting: ReportingService,
    pub warehouses: WarehouseService,
}

impl Fixture {
    pub fn new() -> Self {
        let memory = MemoryLedgerStore::new();
        let store: Arc<dyn LedgerStore> = Arc::new(memory.clone());
        Self {
            engine: MovementEngine::new(store.clone(), "A1"),
            transfers: TransferOrchestrator::new(store.clone(), "A1"),
            counts: PhysicalCountReconciler::new(store.clone(), "A1"),
            reconciliation: ReconciliationService::new(store.clone()),
            reporting: ReportingService::new(store.clone(), 500),
            warehouses: WarehouseService::new(store.clone()),
            memory,
            store,
        }
    }

    pub async fn product(&self, sku: &str, min_stock: i64) -> Product {
        self.memory
            .seed_product(sku, &format!("Producto {}", sku), Decimal::new(1990, 2), min_stock)
            .await
            .expect("seed product")
    }

    pub async fn warehouse(&self, code: &str) -> Warehouse {
        self.warehouses
            .create(NewWarehouse {
                code: code.to_string(),
                name: format!("Bodega {}", code),
                address: None,
                description: None,
            })
            .await
            .expect("create warehouse")
    }

    pub async fn entry(&self, product_id: i64, warehouse_id: i64, quantity: i64) -> Movement {
        self.movement(product_id, warehouse_id, MovementType::Entry, quantity)
            .await
            .expect("entry")
    }

    pub async fn movement(
        &self,
        product_id: i64,
        warehouse_id: i64,
        movement_type: MovementType,
        quantity: i64,
    ) -> inventory_backend::AppResult<Movement> {
        let reason = match movement_type {
            MovementType::Exit => MovementReason::Sale,
            _ => MovementReason::Purchase,
        };
        self.engine
            .apply_movement(
                USER,
                MovementRequest {
                    product_id,
                    warehouse_id,
                    movement_type,
                    reason,
                    quantity,
                    note: None,
                    document_ref: None,
                },
            )
            .await
    }

    /// Quantity of a stock level, zero when the pair was never stocked
    pub async fn level(&self, product_id: i64, warehouse_id: i64) -> i64 {
        self.store
            .stock_levels_by_product(product_id)
            .await
            .expect("stock levels")
            .into_iter()
            .find(|level| level.warehouse_id == warehouse_id)
            .map_or(0, |level| level.quantity)
    }

    pub async fn cached_stock(&self, product_id: i64) -> i64 {
        self.store
            .find_product(product_id)
            .await
            .expect("find product")
            .expect("product exists")
            .current_stock
    }

    pub async fn movements_of(&self, product_id: i64) -> Vec<Movement> {
        self.store
            .list_movements(&MovementFilter {
                product_id: Some(product_id),
                ..Default::default()
            })
            .await
            .expect("list movements")
    }
}

impl Fixture {
    /// Number of stock level rows of a product, whatever their quantity
    pub async fn store_levels(&self, product_id: i64) -> usize {
        self.store
            .stock_levels_by_product(product_id)
            .await
            .expect("stock levels")
            .len()
    }
}
