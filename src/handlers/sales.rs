use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::entities::{booking, stock_event};
use crate::errors::ServiceError;
use crate::services::sales::SaleLineInput;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub dispatched_on: NaiveDate,
}

/// Register the reservation for a committed sale line
pub async fn confirm_sale_line(
    State(state): State<AppState>,
    Json(payload): Json<SaleLineInput>,
) -> Result<Json<ApiResponse<booking::Model>>, ServiceError> {
    let booking = state.services.sales.confirm_sale_line(payload).await?;
    Ok(Json(ApiResponse::success(booking)))
}

/// Record the stock-out for a shipped booking and retire it
pub async fn dispatch_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<i64>,
    Json(payload): Json<DispatchRequest>,
) -> Result<Json<ApiResponse<stock_event::Model>>, ServiceError> {
    let out_event = state
        .services
        .sales
        .dispatch_booking(booking_id, payload.dispatched_on)
        .await?;
    Ok(Json(ApiResponse::success(out_event)))
}
