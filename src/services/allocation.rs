//! Allocation Engine
//!
//! Converts (ledger stock level, ordered booking queue) into per-booking
//! confirmation status. The core is a pure function over immutable inputs:
//! nothing here holds hidden state, results are fully re-derivable, and the
//! same inputs always produce the same report.
//!
//! The policy is a single-pass greedy scan: a FIFO queue draining one shared
//! stock pool. No booking jumps the queue regardless of quantity, no
//! bin-packing, no splitting across future replenishments. Chronological
//! fairness wins over stock utilization.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::product::Entity as ProductEntity;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::bookings::BookingService;
use crate::services::stock_ledger::StockLedgerService;

/// Allocation verdict for a single booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingAllocation {
    pub booking_id: i64,
    pub required_quantity: i64,
    pub dispatch_date: NaiveDate,
    pub booked_on: DateTime<Utc>,
    pub customer_name: String,
    pub gym_name: Option<String>,
    pub city: Option<String>,
    /// Stock visible to this booking the moment it was evaluated, before it
    /// consumed anything.
    pub available_stock_at_booking: i64,
    pub status: BookingStatus,
    /// Units actually covered by stock (equals `required_quantity` when
    /// confirmed, the partial remainder when waitlisted with stock left).
    pub confirmed_quantity: i64,
    pub waiting_quantity: i64,
}

/// Full allocation result for one product and selected date. Ephemeral:
/// computed fresh on every call and never persisted as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationReport {
    pub product_id: Uuid,
    pub selected_date: NaiveDate,
    pub stock_on_selected_date: i64,
    pub total_confirmed_quantity: i64,
    pub total_waiting_quantity: i64,
    pub allocations: Vec<BookingAllocation>,
}

/// Runs the allocation scan over bookings already sorted in priority order
/// `(dispatch_date, booked_on, id)`. Pure: no clock, no I/O, no reordering.
pub fn run_allocation(
    product_id: Uuid,
    selected_date: NaiveDate,
    stock_on_selected_date: i64,
    bookings: &[booking::Model],
) -> AllocationReport {
    let mut available_stock = stock_on_selected_date;
    let mut total_confirmed_quantity = 0i64;
    let mut total_waiting_quantity = 0i64;
    let mut allocations = Vec::with_capacity(bookings.len());

    for b in bookings {
        let available_stock_at_booking = available_stock;

        let (status, confirmed_quantity, waiting_quantity) =
            if available_stock >= b.required_quantity {
                available_stock -= b.required_quantity;
                (BookingStatus::Confirmed, b.required_quantity, 0)
            } else if available_stock > 0 {
                let confirmed = available_stock;
                available_stock = 0;
                (
                    BookingStatus::WaitingList,
                    confirmed,
                    b.required_quantity - confirmed,
                )
            } else {
                (BookingStatus::WaitingList, 0, b.required_quantity)
            };

        total_confirmed_quantity += confirmed_quantity;
        total_waiting_quantity += waiting_quantity;

        allocations.push(BookingAllocation {
            booking_id: b.id,
            required_quantity: b.required_quantity,
            dispatch_date: b.dispatch_date,
            booked_on: b.booked_on,
            customer_name: b.customer_name.clone(),
            gym_name: b.gym_name.clone(),
            city: b.city.clone(),
            available_stock_at_booking,
            status,
            confirmed_quantity,
            waiting_quantity,
        });
    }

    AllocationReport {
        product_id,
        selected_date,
        stock_on_selected_date,
        total_confirmed_quantity,
        total_waiting_quantity,
        allocations,
    }
}

/// Service wrapper that loads the engine's two inputs and, on request,
/// writes the recomputed advisory caches back to the booking rows.
#[derive(Clone)]
pub struct AllocationService {
    db_pool: Arc<DatabaseConnection>,
    ledger: Arc<StockLedgerService>,
    bookings: Arc<BookingService>,
    event_sender: Arc<EventSender>,
}

impl AllocationService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        ledger: Arc<StockLedgerService>,
        bookings: Arc<BookingService>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db_pool,
            ledger,
            bookings,
            event_sender,
        }
    }

    /// Computes the allocation for a product as of `selected_date`.
    ///
    /// Read-only and idempotent: two calls without an intervening ledger or
    /// booking mutation return identical reports. Cached booking statuses
    /// are ignored, never trusted.
    #[instrument(skip(self))]
    pub async fn allocate(
        &self,
        product_id: Uuid,
        selected_date: NaiveDate,
    ) -> Result<AllocationReport, ServiceError> {
        let db = self.db_pool.as_ref();
        ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let stock_on_selected_date = self.ledger.stock_as_of(product_id, selected_date).await?;
        let queue = self
            .bookings
            .list_for_dispatch(product_id, selected_date)
            .await?;

        Ok(run_allocation(
            product_id,
            selected_date,
            stock_on_selected_date,
            &queue,
        ))
    }

    /// Recomputes the allocation and persists the advisory
    /// `status`/`waiting_quantity` caches for every scanned booking.
    ///
    /// This is the only code path that writes those columns. Staleness
    /// elsewhere is expected and harmless; precision-sensitive readers call
    /// `allocate` instead of trusting the cache.
    #[instrument(skip(self))]
    pub async fn refresh_booking_status(
        &self,
        product_id: Uuid,
        selected_date: NaiveDate,
    ) -> Result<AllocationReport, ServiceError> {
        let report = self.allocate(product_id, selected_date).await?;

        let allocations = report.allocations.clone();
        let db = self.db_pool.as_ref();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                for allocation in allocations {
                    let Some(existing) =
                        booking::Entity::find_by_id(allocation.booking_id)
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?
                    else {
                        // Removed concurrently; next read re-derives without it.
                        continue;
                    };

                    let status_str = allocation.status.as_str();
                    if existing.status == status_str
                        && existing.waiting_quantity == allocation.waiting_quantity
                    {
                        continue;
                    }

                    let mut active: booking::ActiveModel = existing.into();
                    active.status = Set(status_str.to_string());
                    active.waiting_quantity = Set(allocation.waiting_quantity);
                    active.updated_at = Set(Some(Utc::now()));
                    active.update(txn).await.map_err(ServiceError::db_error)?;
                }
                Ok(())
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })?;

        info!(
            product_id = %product_id,
            selected_date = %selected_date,
            total_confirmed_quantity = report.total_confirmed_quantity,
            total_waiting_quantity = report.total_waiting_quantity,
            "Refreshed booking status caches"
        );

        self.event_sender
            .send(Event::AllocationRefreshed {
                product_id,
                selected_date,
                total_confirmed_quantity: report.total_confirmed_quantity,
                total_waiting_quantity: report.total_waiting_quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(report)
    }
}
