use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::booking;
use crate::errors::ServiceError;
use crate::services::allocation::AllocationReport;
use crate::services::bookings::CreateBookingInput;
use crate::services::projection::StockProjection;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct SelectedDateQuery {
    pub date: NaiveDate,
}

/// Create a booking directly (bookings normally arrive via /sales/confirm)
pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingInput>,
) -> Result<Json<ApiResponse<booking::Model>>, ServiceError> {
    let created = state.services.bookings.create_booking(payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

/// Get a booking. Status fields are "as of last computation"; use the
/// allocation endpoint for an authoritative answer.
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<booking::Model>>, ServiceError> {
    let found = state.services.bookings.get_booking(id).await?;
    Ok(Json(ApiResponse::success(found)))
}

/// Remove a booking (sale cancellation)
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.bookings.delete_booking(id).await?;
    Ok(Json(ApiResponse::success(())))
}

/// All bookings for a product in allocation priority order
pub async fn list_bookings(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<booking::Model>>>, ServiceError> {
    let bookings = state.services.bookings.list_for_product(product_id).await?;
    Ok(Json(ApiResponse::success(bookings)))
}

/// Latest booking tied to an originating order line
pub async fn find_by_reference(
    State(state): State<AppState>,
    Path(reference_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Option<booking::Model>>>, ServiceError> {
    let found = state
        .services
        .bookings
        .find_latest_by_reference(reference_id)
        .await?;
    Ok(Json(ApiResponse::success(found)))
}

/// Fresh allocation for a product as of a date. Pure query, safe to repeat.
pub async fn get_allocation(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<SelectedDateQuery>,
) -> Result<Json<ApiResponse<AllocationReport>>, ServiceError> {
    let report = state
        .services
        .allocation
        .allocate(product_id, query.date)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Recompute the allocation and persist the advisory status caches
pub async fn refresh_allocation(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<SelectedDateQuery>,
) -> Result<Json<ApiResponse<AllocationReport>>, ServiceError> {
    let report = state
        .services
        .allocation
        .refresh_booking_status(product_id, query.date)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Forward-looking stock projection for order-entry screens
pub async fn get_projection(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<SelectedDateQuery>,
) -> Result<Json<ApiResponse<StockProjection>>, ServiceError> {
    let projection = state
        .services
        .projection
        .project(product_id, query.date)
        .await?;
    Ok(Json(ApiResponse::success(projection)))
}
