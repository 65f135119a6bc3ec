//! Stock ledger store
//!
//! The engine talks to persistence through two traits:
//!
//! - [`LedgerStore`] hands out transactions and answers read-only queries.
//! - [`LedgerTx`] is one open transaction. Every write of a logical operation
//!   goes through the same `LedgerTx`; nothing is visible to other callers
//!   until [`LedgerTx::commit`] succeeds, and dropping an uncommitted
//!   transaction discards all of its writes.
//!
//! Stock levels read through `lock_*` methods stay locked until the
//! transaction ends, which serializes operations on the same
//! (product, warehouse) pair.

use async_trait::async_trait;
use shared::{
    DateRange, Movement, MovementReason, MovementType, NewWarehouse, Pagination, Product,
    StockLevel, Warehouse,
};

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// Ledger row about to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
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
}

/// Movement history filter; all criteria are optional and combined with AND
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub product_id: Option<i64>,
    /// Matches either the origin or the destination warehouse
    pub warehouse_id: Option<i64>,
    pub movement_type: Option<MovementType>,
    pub range: DateRange,
    /// `None` returns every matching row
    pub page: Option<Pagination>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &Movement) -> bool {
        self.product_id.map_or(true, |id| movement.product_id == id)
            && self
                .warehouse_id
                .map_or(true, |id| movement.involves_warehouse(id))
            && self
                .movement_type
                .map_or(true, |t| movement.movement_type == t)
            && self.range.contains(movement.created_at)
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>>;

    /// Cheap liveness probe
    async fn ping(&self) -> AppResult<()>;

    async fn find_product(&self, product_id: i64) -> AppResult<Option<Product>>;

    async fn find_warehouse(&self, warehouse_id: i64) -> AppResult<Option<Warehouse>>;

    async fn list_warehouses(&self, only_active: bool, page: Pagination) -> AppResult<Vec<Warehouse>>;

    /// Every stock level of a product, ordered by warehouse
    async fn stock_levels_by_product(&self, product_id: i64) -> AppResult<Vec<StockLevel>>;

    /// Stock levels of a warehouse holding a positive quantity, ordered by product
    async fn stock_levels_by_warehouse(&self, warehouse_id: i64) -> AppResult<Vec<StockLevel>>;

    /// Matching movements, newest first
    async fn list_movements(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>>;
}

#[async_trait]
pub trait LedgerTx: Send {
    async fn find_product(&mut self, product_id: i64) -> AppResult<Option<Product>>;

    /// Read a product and hold its row lock until the transaction ends
    async fn lock_product(&mut self, product_id: i64) -> AppResult<Option<Product>>;

    /// Ids of every product, ascending
    async fn list_product_ids(&mut self) -> AppResult<Vec<i64>>;

    /// Read a warehouse, blocking concurrent deactivation until the transaction ends
    async fn find_warehouse(&mut self, warehouse_id: i64) -> AppResult<Option<Warehouse>>;

    /// Read a warehouse for modification
    async fn lock_warehouse(&mut self, warehouse_id: i64) -> AppResult<Option<Warehouse>>;

    async fn insert_warehouse(&mut self, warehouse: &NewWarehouse) -> AppResult<Warehouse>;

    async fn update_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<Warehouse>;

    /// Number of stock levels with a nonzero quantity in the warehouse
    async fn count_stocked_levels(&mut self, warehouse_id: i64) -> AppResult<i64>;

    /// Lock the stock level, creating it at zero quantity first if absent
    async fn lock_or_create_stock_level(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
        location: &str,
    ) -> AppResult<StockLevel>;

    /// Overwrite the quantity of a locked stock level
    async fn set_stock_quantity(&mut self, level: &StockLevel, quantity: i64) -> AppResult<StockLevel>;

    /// Append a ledger row
    async fn insert_movement(&mut self, movement: NewMovement) -> AppResult<Movement>;

    /// Sum of the product's stock levels across all warehouses
    async fn sum_stock(&mut self, product_id: i64) -> AppResult<i64>;

    /// Write the cached aggregate and touch the product's timestamp
    async fn set_product_stock(&mut self, product_id: i64, total: i64) -> AppResult<Product>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
