//! Read-only stock reporting: kardex, alerts, stock views and movement history

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    ConsolidatedStock, DateRange, LowStockAlert, Movement, MovementType, Pagination, Product,
    StockLevel,
};

use super::reconciliation::{reconcile, reconcile_all};
use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, MovementFilter};

/// Chronological movement report for one product
#[derive(Debug, Clone, Serialize)]
pub struct Kardex {
    pub product: Product,
    /// Newest first
    pub movements: Vec<Movement>,
    pub current_stock: i64,
}

/// Kardex filters
#[derive(Debug, Clone, Copy, Default)]
pub struct KardexQuery {
    pub range: DateRange,
    /// Matches either side of a movement
    pub warehouse_id: Option<i64>,
}

/// Movement history filters as received from callers
#[derive(Debug, Clone, Default)]
pub struct MovementQuery {
    pub product_id: Option<i64>,
    pub warehouse_id: Option<i64>,
    pub movement_type: Option<MovementType>,
    pub range: DateRange,
    pub page: Pagination,
}

/// One kardex line as exported to CSV
#[derive(Debug, Serialize)]
struct KardexCsvRow<'a> {
    fecha: DateTime<Utc>,
    tipo_movimiento: &'static str,
    motivo: &'static str,
    bodega_origen_id: Option<i64>,
    bodega_destino_id: Option<i64>,
    cantidad: i64,
    stock_anterior: i64,
    stock_posterior: i64,
    usuario_id: i64,
    documento_referencia: Option<&'a str>,
    observaciones: Option<&'a str>,
}

impl<'a> From<&'a Movement> for KardexCsvRow<'a> {
    fn from(m: &'a Movement) -> Self {
        Self {
            fecha: m.created_at,
            tipo_movimiento: m.movement_type.as_str(),
            motivo: m.reason.as_str(),
            bodega_origen_id: m.origin_warehouse_id,
            bodega_destino_id: m.destination_warehouse_id,
            cantidad: m.quantity,
            stock_anterior: m.stock_before,
            stock_posterior: m.stock_after,
            usuario_id: m.user_id,
            documento_referencia: m.document_ref.as_deref(),
            observaciones: m.note.as_deref(),
        }
    }
}

#[derive(Clone)]
pub struct ReportingService {
    store: Arc<dyn LedgerStore>,
    max_page_size: i64,
}

impl ReportingService {
    pub fn new(store: Arc<dyn LedgerStore>, max_page_size: i64) -> Self {
        Self {
            store,
            max_page_size,
        }
    }

    /// Movement history of one product, newest first
    pub async fn kardex(&self, product_id: i64, query: KardexQuery) -> AppResult<Kardex> {
        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let movements = self
            .store
            .list_movements(&MovementFilter {
                product_id: Some(product_id),
                warehouse_id: query.warehouse_id,
                movement_type: None,
                range: query.range,
                page: None,
            })
            .await?;

        Ok(Kardex {
            current_stock: product.current_stock,
            product,
            movements,
        })
    }

    /// Kardex rendered as CSV with a header row
    pub async fn kardex_csv(&self, product_id: i64, query: KardexQuery) -> AppResult<String> {
        let kardex = self.kardex(product_id, query).await?;
        let rows: Vec<KardexCsvRow<'_>> = kardex.movements.iter().map(KardexCsvRow::from).collect();
        export_to_csv(&rows)
    }

    /// Products at or below their minimum stock, evaluated after reconciling
    /// every product
    pub async fn low_stock_alerts(&self) -> AppResult<Vec<LowStockAlert>> {
        let mut tx = self.store.begin().await?;
        let products = reconcile_all(tx.as_mut()).await?;
        tx.commit().await?;

        let alerts: Vec<LowStockAlert> = products.into_iter().filter_map(LowStockAlert::evaluate).collect();
        tracing::debug!(alerts = alerts.len(), "low stock alerts evaluated");
        Ok(alerts)
    }

    /// Total stock of a product with its per-warehouse breakdown
    pub async fn consolidated_stock(&self, product_id: i64) -> AppResult<ConsolidatedStock> {
        let mut tx = self.store.begin().await?;
        let product = reconcile(tx.as_mut(), product_id).await?;
        tx.commit().await?;

        let levels = self.store.stock_levels_by_product(product_id).await?;
        Ok(ConsolidatedStock::new(product, levels))
    }

    /// Stock levels of a warehouse that hold a positive quantity
    pub async fn warehouse_stock(&self, warehouse_id: i64) -> AppResult<Vec<StockLevel>> {
        self.store
            .find_warehouse(warehouse_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        self.store.stock_levels_by_warehouse(warehouse_id).await
    }

    /// Filtered movement history; the page size is capped by configuration
    pub async fn list_movements(&self, query: MovementQuery) -> AppResult<Vec<Movement>> {
        let filter = MovementFilter {
            product_id: query.product_id,
            warehouse_id: query.warehouse_id,
            movement_type: query.movement_type,
            range: query.range,
            page: Some(query.page.capped(self.max_page_size)),
        };
        self.store.list_movements(&filter).await
    }
}

/// Serialize records as CSV
pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in data {
        wtr.serialize(record)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}
