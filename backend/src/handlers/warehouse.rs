//! HTTP handlers for warehouse (bodega) administration

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{NewWarehouse, Pagination, Warehouse, WarehouseChanges};
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{CurrentUser, Permission};
use crate::services::WarehouseService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListWarehousesQuery {
    pub only_active: Option<bool>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWarehouseInput {
    #[validate(length(min = 2, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub address: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWarehouseInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

/// List warehouses, active ones only by default
pub async fn list_warehouses(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListWarehousesQuery>,
) -> AppResult<Json<Vec<Warehouse>>> {
    current_user.0.require(Permission::Read)?;

    let page = Pagination::new(query.skip, query.limit).capped(state.config.inventory.max_page_size);
    let service = WarehouseService::new(state.store);
    let warehouses = service.list(query.only_active.unwrap_or(true), page).await?;
    Ok(Json(warehouses))
}

/// Get a warehouse by id
pub async fn get_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<i64>,
) -> AppResult<Json<Warehouse>> {
    current_user.0.require(Permission::Read)?;

    let service = WarehouseService::new(state.store);
    Ok(Json(service.get(warehouse_id).await?))
}

/// Register a warehouse
pub async fn create_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    current_user.0.require(Permission::Admin)?;
    input.validate()?;

    let service = WarehouseService::new(state.store);
    let warehouse = service
        .create(NewWarehouse {
            code: input.code,
            name: input.name,
            address: input.address,
            description: input.description,
        })
        .await?;
    Ok(Json(warehouse))
}

/// Update a warehouse
pub async fn update_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<i64>,
    Json(input): Json<UpdateWarehouseInput>,
) -> AppResult<Json<Warehouse>> {
    current_user.0.require(Permission::Admin)?;
    input.validate()?;

    let service = WarehouseService::new(state.store);
    let warehouse = service
        .update(
            warehouse_id,
            WarehouseChanges {
                name: input.name,
                address: input.address,
                description: input.description,
                active: input.active,
            },
        )
        .await?;
    Ok(Json(warehouse))
}

/// Deactivate (soft delete) a warehouse
pub async fn delete_warehouse(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warehouse_id): Path<i64>,
) -> AppResult<Json<Warehouse>> {
    current_user.0.require(Permission::Admin)?;

    let service = WarehouseService::new(state.store);
    Ok(Json(service.deactivate(warehouse_id).await?))
}
