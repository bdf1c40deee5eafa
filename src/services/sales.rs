//! Sale intake service
//!
//! The composition the upstream "sale confirmed" event lands on. Owns the
//! two halves of a sale line's stock lifecycle:
//!
//! 1. `confirm_sale_line`: at commit time, pre-checks sufficiency (the
//!    ledger itself never does) and creates the reservation booking.
//! 2. `dispatch_booking`: when goods actually leave, records the stock-out
//!    ledger event and retires the booking in the same transaction, so a
//!    sale line's demand is counted exactly once, first as queued demand,
//!    then as consumed stock, never both.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::entities::booking::{self, Entity as BookingEntity};
use crate::entities::product::Entity as ProductEntity;
use crate::entities::stock_event::{self, StockEventType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::bookings::{BookingService, CreateBookingInput};
use crate::services::stock_ledger::{resync_product_stock, StockLedgerService};

/// One committed sale line, as delivered by the upstream sales flow.
/// `customer_name`/`gym_name`/`city` are denormalized for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineInput {
    pub product_id: Uuid,
    pub quantity: i64,
    pub dispatch_date: NaiveDate,
    /// Explicit booking timestamp for deterministic ordering in tests;
    /// wall clock when absent.
    pub booked_on: Option<DateTime<Utc>>,
    /// Originating order line.
    pub reference_id: Uuid,
    pub customer_name: String,
    pub gym_name: Option<String>,
    pub city: Option<String>,
    /// Administrative/backdated entry: skip the live sufficiency check and
    /// accept that the ledger may go negative.
    #[serde(default)]
    pub allow_oversell: bool,
}

#[derive(Clone)]
pub struct SaleIntakeService {
    db_pool: Arc<DatabaseConnection>,
    ledger: Arc<StockLedgerService>,
    bookings: Arc<BookingService>,
    event_sender: Arc<EventSender>,
}

impl SaleIntakeService {
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

    /// Registers the reservation for a committed sale line, exactly once
    /// per line.
    ///
    /// Live sales are pre-checked against `stock_as_of(dispatch_date)`;
    /// `InsufficientStock` aborts before anything is written. The check is
    /// advisory, not a guarantee: a racing confirmation may still win the
    /// same units, and the next allocation run is what settles who is
    /// confirmed.
    #[instrument(skip(self, input), fields(product_id = %input.product_id, reference_id = %input.reference_id))]
    pub async fn confirm_sale_line(
        &self,
        input: SaleLineInput,
    ) -> Result<booking::Model, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Sale line quantity must be positive".to_string(),
            ));
        }

        let db = self.db_pool.as_ref();
        ProductEntity::find_by_id(input.product_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        if !input.allow_oversell {
            let available = self
                .ledger
                .stock_as_of(input.product_id, input.dispatch_date)
                .await?;
            if available < input.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "product {}: requested {}, available {} on {}",
                    input.product_id, input.quantity, available, input.dispatch_date
                )));
            }
        } else {
            warn!(
                product_id = %input.product_id,
                quantity = input.quantity,
                "Oversell allowed for sale line, skipping sufficiency check"
            );
        }

        let booking = self
            .bookings
            .create_booking(CreateBookingInput {
                product_id: input.product_id,
                required_quantity: input.quantity,
                dispatch_date: input.dispatch_date,
                booked_on: input.booked_on,
                reference_type: "sale_line".to_string(),
                reference_id: input.reference_id,
                customer_name: input.customer_name,
                gym_name: input.gym_name,
                city: input.city,
            })
            .await?;

        Ok(booking)
    }

    /// Retires a booking whose goods have shipped: records the stock-out
    /// ledger event (dated the actual dispatch day), resyncs the product
    /// stock cache and removes the booking, all in one transaction.
    #[instrument(skip(self))]
    pub async fn dispatch_booking(
        &self,
        booking_id: i64,
        dispatched_on: NaiveDate,
    ) -> Result<stock_event::Model, ServiceError> {
        let db = self.db_pool.as_ref();

        let out_event = db
            .transaction::<_, stock_event::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let booking = BookingEntity::find_by_id(booking_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Booking {} not found", booking_id))
                        })?;

                    let out_event = stock_event::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(booking.product_id),
                        quantity: Set(-booking.required_quantity),
                        event_type: Set(StockEventType::SaleReserved.as_str().to_string()),
                        effective_date: Set(dispatched_on),
                        reference_type: Set(Some(booking.reference_type.clone())),
                        reference_id: Set(Some(booking.reference_id)),
                        notes: Set(Some(format!("Dispatch of booking {}", booking.id))),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let product_id = booking.product_id;
                    booking
                        .delete(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    resync_product_stock(txn, product_id).await?;

                    Ok(out_event)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            booking_id = booking_id,
            stock_event_id = %out_event.id,
            product_id = %out_event.product_id,
            quantity = out_event.quantity,
            "Dispatched booking"
        );

        self.event_sender
            .send(Event::BookingDispatched {
                booking_id,
                product_id: out_event.product_id,
                stock_event_id: out_event.id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(out_event)
    }
}
