//! HTTP handlers for stock views, alerts and reconciliation

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{ConsolidatedStock, LowStockAlert, Product, StockLevel};

use crate::error::AppResult;
use crate::middleware::{CurrentUser, Permission};
use crate::services::{ReconciliationService, ReportingService};
use crate::AppState;

fn reporting(state: &AppState) -> ReportingService {
    ReportingService::new(state.store.clone(), state.config.inventory.max_page_size)
}

/// Consolidated stock of a product across warehouses
pub async fn get_product_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<ConsolidatedStock>> {
    current_user.0.require(Permission::Read)?;
    Ok(Json(reporting(&state).consolidated_stock(product_id).await?))
}

/// Stocked products of a warehouse
pub async fn get_warehouse_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<i64>,
) -> AppResult<Json<Vec<StockLevel>>> {
    current_user.0.require(Permission::Read)?;
    Ok(Json(reporting(&state).warehouse_stock(warehouse_id).await?))
}

/// Products at or below their minimum stock
pub async fn get_stock_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<LowStockAlert>>> {
    current_user.0.require(Permission::Read)?;
    Ok(Json(reporting(&state).low_stock_alerts().await?))
}

/// Recompute a product's aggregate stock
pub async fn reconcile_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<Product>> {
    current_user.0.require(Permission::Admin)?;

    let service = ReconciliationService::new(state.store);
    Ok(Json(service.reconcile_product(product_id).await?))
}
