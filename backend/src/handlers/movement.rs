//! HTTP handlers for stock movements, adjustments, transfers and counts

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{DateRange, Movement, MovementReason, MovementType, Pagination};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{CurrentUser, Permission};
use crate::services::{
    AdjustmentRequest, CountItem, MovementEngine, MovementQuery, MovementRequest,
    PhysicalCountReconciler, ReportingService, TransferOrchestrator, TransferReceipt,
    TransferRequest,
};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMovementInput {
    pub product_id: i64,
    pub warehouse_id: i64,
    pub movement_type: MovementType,
    pub reason: MovementReason,
    #[validate(range(min = 1))]
    pub quantity: i64,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    #[validate(length(max = 100))]
    pub document_ref: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdjustmentInput {
    pub product_id: i64,
    pub warehouse_id: i64,
    /// Signed; zero is rejected by the engine
    pub delta: i64,
    pub reason: MovementReason,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransferInput {
    pub product_id: i64,
    pub source_warehouse_id: i64,
    pub destination_warehouse_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i64,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PhysicalCountInput {
    #[validate(length(min = 1))]
    pub items: Vec<CountItem>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListMovementsQuery {
    pub product_id: Option<i64>,
    pub warehouse_id: Option<i64>,
    pub movement_type: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

fn engine(state: &AppState) -> MovementEngine {
    MovementEngine::new(state.store.clone(), state.config.inventory.default_location.clone())
}

/// Apply a single movement
pub async fn create_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMovementInput>,
) -> AppResult<(StatusCode, Json<Movement>)> {
    current_user.0.require(Permission::Write)?;
    input.validate()?;

    let movement = engine(&state)
        .apply_movement(
            current_user.0.user_id,
            MovementRequest {
                product_id: input.product_id,
                warehouse_id: input.warehouse_id,
                movement_type: input.movement_type,
                reason: input.reason,
                quantity: input.quantity,
                note: input.note,
                document_ref: input.document_ref,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Apply a signed stock adjustment
pub async fn adjust_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<(StatusCode, Json<Movement>)> {
    current_user.0.require(Permission::Write)?;
    input.validate()?;

    let movement = engine(&state)
        .adjust(
            current_user.0.user_id,
            AdjustmentRequest {
                product_id: input.product_id,
                warehouse_id: input.warehouse_id,
                delta: input.delta,
                reason: input.reason,
                note: input.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Move stock between two warehouses
pub async fn transfer_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<TransferInput>,
) -> AppResult<(StatusCode, Json<TransferReceipt>)> {
    current_user.0.require(Permission::Write)?;
    input.validate()?;

    let orchestrator = TransferOrchestrator::new(
        state.store.clone(),
        state.config.inventory.default_location.clone(),
    );
    let receipt = orchestrator
        .transfer(
            current_user.0.user_id,
            TransferRequest {
                product_id: input.product_id,
                source_warehouse_id: input.source_warehouse_id,
                destination_warehouse_id: input.destination_warehouse_id,
                quantity: input.quantity,
                note: input.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Apply a physical count batch
pub async fn physical_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<PhysicalCountInput>,
) -> AppResult<Json<Vec<Movement>>> {
    current_user.0.require(Permission::PhysicalCount)?;
    input.validate()?;

    let reconciler = PhysicalCountReconciler::new(
        state.store.clone(),
        state.config.inventory.default_location.clone(),
    );
    let movements = reconciler
        .apply_physical_count(current_user.0.user_id, &input.items, input.note)
        .await?;
    Ok(Json(movements))
}

/// Filtered movement history, newest first
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListMovementsQuery>,
) -> AppResult<Json<Vec<Movement>>> {
    current_user.0.require(Permission::Read)?;

    let movement_type = query
        .movement_type
        .as_deref()
        .map(str::parse::<MovementType>)
        .transpose()
        .map_err(AppError::from)?;

    let service = ReportingService::new(state.store, state.config.inventory.max_page_size);
    let movements = service
        .list_movements(MovementQuery {
            product_id: query.product_id,
            warehouse_id: query.warehouse_id,
            movement_type,
            range: DateRange::new(query.date_from, query.date_to),
            page: Pagination::new(query.skip, query.limit),
        })
        .await?;
    Ok(Json(movements))
}
