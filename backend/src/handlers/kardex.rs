//! Kardex report handlers

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::DateRange;

use crate::error::AppResult;
use crate::middleware::{CurrentUser, Permission};
use crate::services::{Kardex, KardexQuery, ReportingService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct KardexParams {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub warehouse_id: Option<i64>,
}

impl From<KardexParams> for KardexQuery {
    fn from(params: KardexParams) -> Self {
        KardexQuery {
            range: DateRange::new(params.date_from, params.date_to),
            warehouse_id: params.warehouse_id,
        }
    }
}

/// Movement history of a product
pub async fn get_kardex(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
    Query(params): Query<KardexParams>,
) -> AppResult<Json<Kardex>> {
    current_user.0.require(Permission::Read)?;

    let service = ReportingService::new(state.store, state.config.inventory.max_page_size);
    Ok(Json(service.kardex(product_id, params.into()).await?))
}

/// Kardex exported as CSV
pub async fn export_kardex_csv(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
    Query(params): Query<KardexParams>,
) -> AppResult<impl IntoResponse> {
    current_user.0.require(Permission::Read)?;

    let service = ReportingService::new(state.store, state.config.inventory.max_page_size);
    let csv = service.kardex_csv(product_id, params.into()).await?;
    let disposition = format!("attachment; filename=\"kardex_{}.csv\"", product_id);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
