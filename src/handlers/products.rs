use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::entities::product;
use crate::errors::ServiceError;
use crate::services::products::CreateProductInput;
use crate::{ApiResponse, AppState};

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let created = state.services.products.create_product(payload).await?;
    Ok(Json(ApiResponse::success(created)))
}

/// Get a product, including its cached current stock
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let found = state.services.products.get_product(id).await?;
    Ok(Json(ApiResponse::success(found)))
}
