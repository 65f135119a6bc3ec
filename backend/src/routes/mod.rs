//! Route definitions for the inventory API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - stock engine
        .nest("/inventario", inventory_routes(state))
}

/// Inventory routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Warehouses
        .route(
            "/bodegas",
            get(handlers::list_warehouses).post(handlers::create_warehouse),
        )
        .route(
            "/bodegas/:warehouse_id",
            get(handlers::get_warehouse)
                .put(handlers::update_warehouse)
                .delete(handlers::delete_warehouse),
        )
        // Stock views
        .route("/stock/producto/:product_id", get(handlers::get_product_stock))
        .route("/stock/bodega/:warehouse_id", get(handlers::get_warehouse_stock))
        .route("/stock/alertas", get(handlers::get_stock_alerts))
        .route(
            "/stock/producto/:product_id/reconciliar",
            post(handlers::reconcile_product),
        )
        // Movements
        .route(
            "/movimientos",
            get(handlers::list_movements).post(handlers::create_movement),
        )
        .route("/ajuste", post(handlers::adjust_stock))
        .route("/transferencia", post(handlers::transfer_stock))
        .route("/inventario-fisico", post(handlers::physical_count))
        // Kardex
        .route("/kardex/:product_id", get(handlers::get_kardex))
        .route("/kardex/:product_id/csv", get(handlers::export_kardex_csv))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
