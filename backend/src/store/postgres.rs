//! PostgreSQL ledger store
//!
//! Row locks follow a fixed order to stay deadlock free: stock levels first
//! (ascending warehouse id when a transaction touches several), then the
//! product row during reconciliation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use shared::{
    Movement, NewWarehouse, Pagination, Product, StockLevel, StockRuleError, Warehouse,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::{LedgerStore, LedgerTx, MovementFilter, NewMovement};
use crate::error::{AppError, AppResult};

const PRODUCT_COLUMNS: &str = r#"
    id, sku, nombre AS name, descripcion AS description, categoria_id AS category_id,
    precio_unitario AS unit_price, stock_minimo AS min_stock, stock_actual AS current_stock,
    fecha_creacion AS created_at, fecha_actualizacion AS updated_at
"#;

const WAREHOUSE_COLUMNS: &str = r#"
    id, codigo AS code, nombre AS name, direccion AS address, descripcion AS description,
    activa AS active, fecha_creacion AS created_at, fecha_actualizacion AS updated_at
"#;

const STOCK_LEVEL_COLUMNS: &str = r#"
    id, producto_id AS product_id, bodega_id AS warehouse_id, cantidad AS quantity,
    ubicacion AS location, fecha_actualizacion AS updated_at
"#;

const MOVEMENT_COLUMNS: &str = r#"
    id, producto_id AS product_id, bodega_origen_id AS origin_warehouse_id,
    bodega_destino_id AS destination_warehouse_id, tipo_movimiento AS movement_type,
    motivo AS reason, cantidad AS quantity, usuario_id AS user_id,
    stock_anterior AS stock_before, stock_posterior AS stock_after,
    observaciones AS note, documento_referencia AS document_ref,
    fecha_movimiento AS created_at
"#;

#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    sku: String,
    name: String,
    description: Option<String>,
    category_id: Option<i64>,
    unit_price: Decimal,
    min_stock: i64,
    current_stock: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            description: row.description,
            category_id: row.category_id,
            unit_price: row.unit_price,
            min_stock: row.min_stock,
            current_stock: row.current_stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: i64,
    code: String,
    name: String,
    address: Option<String>,
    description: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: row.id,
            code: row.code,
            name: row.name,
            address: row.address,
            description: row.description,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StockLevelRow {
    id: i64,
    product_id: i64,
    warehouse_id: i64,
    quantity: i64,
    location: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<StockLevelRow> for StockLevel {
    fn from(row: StockLevelRow) -> Self {
        StockLevel {
            id: row.id,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            quantity: row.quantity,
            location: row.location,
            updated_at: row.updated_at,
        }
    }
}

/// Movement row; type and reason codes are stored as text
#[derive(Debug, FromRow)]
struct MovementRow {
    id: i64,
    product_id: i64,
    origin_warehouse_id: Option<i64>,
    destination_warehouse_id: Option<i64>,
    movement_type: String,
    reason: String,
    quantity: i64,
    user_id: i64,
    stock_before: i64,
    stock_after: i64,
    note: Option<String>,
    document_ref: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let movement_type = row
            .movement_type
            .parse()
            .map_err(|e| AppError::Internal(format!("corrupt movement {}: {}", row.id, e)))?;
        let reason = row
            .reason
            .parse()
            .map_err(|e| AppError::Internal(format!("corrupt movement {}: {}", row.id, e)))?;

        Ok(Movement {
            id: row.id,
            product_id: row.product_id,
            origin_warehouse_id: row.origin_warehouse_id,
            destination_warehouse_id: row.destination_warehouse_id,
            movement_type,
            reason,
            quantity: row.quantity,
            user_id: row.user_id,
            stock_before: row.stock_before,
            stock_after: row.stock_after,
            note: row.note,
            document_ref: row.document_ref,
            created_at: row.created_at,
        })
    }
}

/// [`LedgerStore`] backed by a Postgres connection pool
#[derive(Clone)]
pub struct PgLedgerStore {
    db: PgPool,
}

impl PgLedgerStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let tx = self.db.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn find_product(&self, product_id: i64) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM productos WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn find_warehouse(&self, warehouse_id: i64) -> AppResult<Option<Warehouse>> {
        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {} FROM bodegas WHERE id = $1",
            WAREHOUSE_COLUMNS
        ))
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Warehouse::from))
    }

    async fn list_warehouses(&self, only_active: bool, page: Pagination) -> AppResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, WarehouseRow>(&format!(
            r#"
            SELECT {}
            FROM bodegas
            WHERE ($1 = FALSE OR activa = TRUE)
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
            WAREHOUSE_COLUMNS
        ))
        .bind(only_active)
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Warehouse::from).collect())
    }

    async fn stock_levels_by_product(&self, product_id: i64) -> AppResult<Vec<StockLevel>> {
        let rows = sqlx::query_as::<_, StockLevelRow>(&format!(
            "SELECT {} FROM stock_bodega WHERE producto_id = $1 ORDER BY bodega_id",
            STOCK_LEVEL_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockLevel::from).collect())
    }

    async fn stock_levels_by_warehouse(&self, warehouse_id: i64) -> AppResult<Vec<StockLevel>> {
        let rows = sqlx::query_as::<_, StockLevelRow>(&format!(
            r#"
            SELECT {}
            FROM stock_bodega
            WHERE bodega_id = $1 AND cantidad > 0
            ORDER BY producto_id
            "#,
            STOCK_LEVEL_COLUMNS
        ))
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockLevel::from).collect())
    }

    async fn list_movements(&self, filter: &MovementFilter) -> AppResult<Vec<Movement>> {
        // A NULL limit means no limit in Postgres
        let (limit, offset) = match filter.page {
            Some(page) => (Some(page.limit), page.skip),
            None => (None, 0),
        };

        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {}
            FROM movimientos_inventario
            WHERE ($1::BIGINT IS NULL OR producto_id = $1)
              AND ($2::BIGINT IS NULL OR bodega_origen_id = $2 OR bodega_destino_id = $2)
              AND ($3::TEXT IS NULL OR tipo_movimiento = $3)
              AND ($4::TIMESTAMPTZ IS NULL OR fecha_movimiento >= $4)
              AND ($5::TIMESTAMPTZ IS NULL OR fecha_movimiento <= $5)
            ORDER BY fecha_movimiento DESC, id DESC
            LIMIT $6 OFFSET $7
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(filter.product_id)
        .bind(filter.warehouse_id)
        .bind(filter.movement_type.map(|t| t.as_str()))
        .bind(filter.range.from)
        .bind(filter.range.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Movement::try_from).collect()
    }
}

/// Open Postgres transaction
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

impl PgLedgerTx {
    /// Lock an existing stock level; `None` when the pair has never been stocked
    async fn lock_stock_level(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
    ) -> AppResult<Option<StockLevel>> {
        let row = sqlx::query_as::<_, StockLevelRow>(&format!(
            r#"
            SELECT {}
            FROM stock_bodega
            WHERE producto_id = $1 AND bodega_id = $2
            FOR UPDATE
            "#,
            STOCK_LEVEL_COLUMNS
        ))
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(StockLevel::from))
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn find_product(&mut self, product_id: i64) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM productos WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn lock_product(&mut self, product_id: i64) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM productos WHERE id = $1 FOR UPDATE",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn list_product_ids(&mut self) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM productos ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(ids)
    }

    async fn find_warehouse(&mut self, warehouse_id: i64) -> AppResult<Option<Warehouse>> {
        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {} FROM bodegas WHERE id = $1 FOR SHARE",
            WAREHOUSE_COLUMNS
        ))
        .bind(warehouse_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Warehouse::from))
    }

    async fn lock_warehouse(&mut self, warehouse_id: i64) -> AppResult<Option<Warehouse>> {
        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {} FROM bodegas WHERE id = $1 FOR UPDATE",
            WAREHOUSE_COLUMNS
        ))
        .bind(warehouse_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Warehouse::from))
    }

    async fn insert_warehouse(&mut self, warehouse: &NewWarehouse) -> AppResult<Warehouse> {
        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            r#"
            INSERT INTO bodegas (codigo, nombre, direccion, descripcion)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            WAREHOUSE_COLUMNS
        ))
        .bind(&warehouse.code)
        .bind(&warehouse.name)
        .bind(&warehouse.address)
        .bind(&warehouse.description)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn update_warehouse(&mut self, warehouse: &Warehouse) -> AppResult<Warehouse> {
        let row = sqlx::query_as::<_, WarehouseRow>(&format!(
            r#"
            UPDATE bodegas
            SET nombre = $1, direccion = $2, descripcion = $3, activa = $4,
                fecha_actualizacion = $5
            WHERE id = $6
            RETURNING {}
            "#,
            WAREHOUSE_COLUMNS
        ))
        .bind(&warehouse.name)
        .bind(&warehouse.address)
        .bind(&warehouse.description)
        .bind(warehouse.active)
        .bind(warehouse.updated_at)
        .bind(warehouse.id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        Ok(row.into())
    }

    async fn count_stocked_levels(&mut self, warehouse_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stock_bodega WHERE bodega_id = $1 AND cantidad <> 0",
        )
        .bind(warehouse_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn lock_or_create_stock_level(
        &mut self,
        product_id: i64,
        warehouse_id: i64,
        location: &str,
    ) -> AppResult<StockLevel> {
        // Concurrent creators race on the unique (producto_id, bodega_id) key;
        // the loser inserts nothing and then waits on the winner's row lock.
        sqlx::query(
            r#"
            INSERT INTO stock_bodega (producto_id, bodega_id, cantidad, ubicacion)
            VALUES ($1, $2, 0, $3)
            ON CONFLICT (producto_id, bodega_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(location)
        .execute(&mut *self.tx)
        .await?;

        self.lock_stock_level(product_id, warehouse_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock level".to_string()))
    }

    async fn set_stock_quantity(&mut self, level: &StockLevel, quantity: i64) -> AppResult<StockLevel> {
        let row = sqlx::query_as::<_, StockLevelRow>(&format!(
            r#"
            UPDATE stock_bodega
            SET cantidad = $1, fecha_actualizacion = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            STOCK_LEVEL_COLUMNS
        ))
        .bind(quantity)
        .bind(level.id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock level".to_string()))?;

        Ok(row.into())
    }

    async fn insert_movement(&mut self, movement: NewMovement) -> AppResult<Movement> {
        let row = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            INSERT INTO movimientos_inventario (
                producto_id, bodega_origen_id, bodega_destino_id, tipo_movimiento, motivo,
                cantidad, usuario_id, stock_anterior, stock_posterior, observaciones,
                documento_referencia
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(movement.product_id)
        .bind(movement.origin_warehouse_id)
        .bind(movement.destination_warehouse_id)
        .bind(movement.movement_type.as_str())
        .bind(movement.reason.as_str())
        .bind(movement.quantity)
        .bind(movement.user_id)
        .bind(movement.stock_before)
        .bind(movement.stock_after)
        .bind(&movement.note)
        .bind(&movement.document_ref)
        .fetch_one(&mut *self.tx)
        .await?;

        Movement::try_from(row)
    }

    async fn sum_stock(&mut self, product_id: i64) -> AppResult<i64> {
        // SUM(BIGINT) yields NUMERIC, which can exceed the BIGINT range
        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(cantidad), 0) FROM stock_bodega WHERE producto_id = $1",
        )
        .bind(product_id)
        .fetch_one(&mut *self.tx)
        .await?;

        total
            .to_i64()
            .ok_or_else(|| AppError::from(StockRuleError::Overflow))
    }

    async fn set_product_stock(&mut self, product_id: i64, total: i64) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE productos
            SET stock_actual = $1, fecha_actualizacion = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(total)
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(row.into())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
