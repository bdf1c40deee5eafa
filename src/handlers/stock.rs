use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::stock_event;
use crate::errors::ServiceError;
use crate::services::stock_ledger::{RecordStockEventInput, StockEventPatch};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct StockLevelResponse {
    pub product_id: Uuid,
    pub date: NaiveDate,
    pub stock: i64,
}

/// Record a stock movement
pub async fn record_stock_event(
    State(state): State<AppState>,
    Json(payload): Json<RecordStockEventInput>,
) -> Result<Json<ApiResponse<stock_event::Model>>, ServiceError> {
    let recorded = state.services.stock_ledger.record_event(payload).await?;
    Ok(Json(ApiResponse::success(recorded)))
}

/// Get a single ledger entry
pub async fn get_stock_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<stock_event::Model>>, ServiceError> {
    let found = state.services.stock_ledger.get_event(id).await?;
    Ok(Json(ApiResponse::success(found)))
}

/// Patch a ledger entry (inventory correction)
pub async fn update_stock_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockEventPatch>,
) -> Result<Json<ApiResponse<stock_event::Model>>, ServiceError> {
    let updated = state
        .services
        .stock_ledger
        .update_event(id, payload)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// Hard-delete a ledger entry (inventory correction)
pub async fn delete_stock_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.stock_ledger.delete_event(id).await?;
    Ok(Json(ApiResponse::success(())))
}

/// List all ledger entries for a product
pub async fn list_stock_events(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<stock_event::Model>>>, ServiceError> {
    let events = state.services.stock_ledger.list_events(product_id).await?;
    Ok(Json(ApiResponse::success(events)))
}

/// Stock level for a product as of a date (inclusive)
pub async fn get_stock_as_of(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<StockQuery>,
) -> Result<Json<ApiResponse<StockLevelResponse>>, ServiceError> {
    let stock = state
        .services
        .stock_ledger
        .stock_as_of(product_id, query.date)
        .await?;
    Ok(Json(ApiResponse::success(StockLevelResponse {
        product_id,
        date: query.date,
        stock,
    })))
}
