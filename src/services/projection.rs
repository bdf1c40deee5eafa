//! Stock Projection Service
//!
//! Answers forward-looking "what will stock look like on date X after
//! pending allocations" questions for order-entry UIs, before anything is
//! committed. Strictly read-only: composes the ledger and the allocation
//! engine and never touches a row.

use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::product::Entity as ProductEntity;
use crate::errors::ServiceError;
use crate::services::allocation::AllocationService;
use crate::services::stock_ledger::StockLedgerService;

/// Forward-looking stock picture for one product and date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockProjection {
    pub product_id: Uuid,
    pub selected_date: NaiveDate,
    /// Cumulative ledger stock as of the selected date.
    pub current_stock: i64,
    /// Stock left over once every booking due by the date has been served
    /// in priority order.
    pub after_allocation_stock: i64,
    pub total_confirmed_quantity: i64,
    pub total_waiting_quantity: i64,
    /// Next arrival strictly after the selected date, for display
    /// ("N units arriving on date X").
    pub next_replenishment_date: Option<NaiveDate>,
    pub next_replenishment_quantity: Option<i64>,
}

#[derive(Clone)]
pub struct StockProjectionService {
    db_pool: Arc<DatabaseConnection>,
    ledger: Arc<StockLedgerService>,
    allocation: Arc<AllocationService>,
}

impl StockProjectionService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        ledger: Arc<StockLedgerService>,
        allocation: Arc<AllocationService>,
    ) -> Self {
        Self {
            db_pool,
            ledger,
            allocation,
        }
    }

    /// Projects stock for a product on the selected date.
    #[instrument(skip(self))]
    pub async fn project(
        &self,
        product_id: Uuid,
        selected_date: NaiveDate,
    ) -> Result<StockProjection, ServiceError> {
        let db = self.db_pool.as_ref();
        ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let report = self.allocation.allocate(product_id, selected_date).await?;
        let after_allocation_stock =
            report.stock_on_selected_date - report.total_confirmed_quantity;

        let next_arrival = self
            .ledger
            .next_inbound_after(product_id, selected_date)
            .await?;

        Ok(StockProjection {
            product_id,
            selected_date,
            current_stock: report.stock_on_selected_date,
            after_allocation_stock,
            total_confirmed_quantity: report.total_confirmed_quantity,
            total_waiting_quantity: report.total_waiting_quantity,
            next_replenishment_date: next_arrival.map(|a| a.date),
            next_replenishment_quantity: next_arrival.map(|a| a.quantity),
        })
    }
}
