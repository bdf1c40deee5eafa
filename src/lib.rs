//! Stockbook API Library
//!
//! This crate provides the core functionality for the Stockbook API:
//! an event-sourced stock ledger, a booking registry, the
//! chronological-priority allocation engine and forward-looking stock
//! projections.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Liveness/readiness endpoint; checks the database connection.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_ok = db::check_connection(&state.db).await.is_ok();
    Json(json!({
        "status": if db_ok { "up" } else { "degraded" },
        "database": if db_ok { "connected" } else { "unreachable" },
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// All v1 API routes. Nested under `/api/v1` by the binary.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Status and health endpoints
        .route("/health", get(health_check))
        // Product master
        .route("/products", post(handlers::products::create_product))
        .route("/products/:id", get(handlers::products::get_product))
        // Stock ledger
        .route("/stock/events", post(handlers::stock::record_stock_event))
        .route(
            "/stock/events/:id",
            get(handlers::stock::get_stock_event)
                .put(handlers::stock::update_stock_event)
                .delete(handlers::stock::delete_stock_event),
        )
        .route(
            "/products/:id/stock/events",
            get(handlers::stock::list_stock_events),
        )
        .route("/products/:id/stock", get(handlers::stock::get_stock_as_of))
        // Booking registry
        .route("/bookings", post(handlers::bookings::create_booking))
        .route(
            "/bookings/:id",
            get(handlers::bookings::get_booking).delete(handlers::bookings::delete_booking),
        )
        .route(
            "/bookings/by-reference/:reference_id",
            get(handlers::bookings::find_by_reference),
        )
        .route(
            "/products/:id/bookings",
            get(handlers::bookings::list_bookings),
        )
        // Allocation engine + projections
        .route(
            "/products/:id/allocation",
            get(handlers::bookings::get_allocation),
        )
        .route(
            "/products/:id/allocation/refresh",
            post(handlers::bookings::refresh_allocation),
        )
        .route(
            "/products/:id/projection",
            get(handlers::bookings::get_projection),
        )
        // Sale intake
        .route("/sales/confirm", post(handlers::sales::confirm_sale_line))
        .route(
            "/bookings/:id/dispatch",
            post(handlers::sales::dispatch_booking),
        )
}
