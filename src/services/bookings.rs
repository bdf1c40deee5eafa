//! Booking Registry Service
//!
//! Stores and retrieves reservation requests. No allocation logic lives
//! here: the persisted `status`/`waiting_quantity` columns are advisory
//! caches owned by the allocation engine, and this service never exposes a
//! way to set them directly.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, Entity as BookingEntity};
use crate::entities::product::Entity as ProductEntity;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Input for creating a booking when a sale line commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingInput {
    pub product_id: Uuid,
    pub required_quantity: i64,
    pub dispatch_date: NaiveDate,
    /// Explicit creation timestamp; tests inject this to keep priority
    /// ordering deterministic. Falls back to the wall clock when absent.
    pub booked_on: Option<DateTime<Utc>>,
    pub reference_type: String,
    pub reference_id: Uuid,
    pub customer_name: String,
    pub gym_name: Option<String>,
    pub city: Option<String>,
}

/// Service owning the booking registry.
#[derive(Clone)]
pub struct BookingService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl BookingService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a booking.
    ///
    /// The row starts as WAITING_LIST with the full quantity waiting; that
    /// is a placeholder, not a verdict. The true status is only known once
    /// the allocation engine runs against the ledger.
    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn create_booking(
        &self,
        input: CreateBookingInput,
    ) -> Result<booking::Model, ServiceError> {
        if input.required_quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Booking required_quantity must be positive".to_string(),
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

        let booked_on = input.booked_on.unwrap_or_else(Utc::now);

        let model = booking::ActiveModel {
            product_id: Set(input.product_id),
            required_quantity: Set(input.required_quantity),
            dispatch_date: Set(input.dispatch_date),
            booked_on: Set(booked_on),
            reference_type: Set(input.reference_type.clone()),
            reference_id: Set(input.reference_id),
            customer_name: Set(input.customer_name.clone()),
            gym_name: Set(input.gym_name.clone()),
            city: Set(input.city.clone()),
            status: Set(BookingStatus::WaitingList.as_str().to_string()),
            waiting_quantity: Set(input.required_quantity),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(
            booking_id = model.id,
            product_id = %model.product_id,
            required_quantity = model.required_quantity,
            dispatch_date = %model.dispatch_date,
            "Created booking"
        );

        self.event_sender
            .send(Event::BookingCreated {
                booking_id: model.id,
                product_id: model.product_id,
                required_quantity: model.required_quantity,
                dispatch_date: model.dispatch_date,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(model)
    }

    /// Gets a booking by id.
    #[instrument(skip(self))]
    pub async fn get_booking(&self, booking_id: i64) -> Result<booking::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        BookingEntity::find_by_id(booking_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))
    }

    /// All bookings for a product with `dispatch_date <= on_or_before`,
    /// in allocation priority order.
    ///
    /// The ordering is the fairness contract of the whole system: earlier
    /// dispatch dates are served first, ties go to the earlier `booked_on`,
    /// and the insertion id resolves exact timestamp collisions so the scan
    /// is a total order on every backend.
    #[instrument(skip(self))]
    pub async fn list_for_dispatch(
        &self,
        product_id: Uuid,
        on_or_before: NaiveDate,
    ) -> Result<Vec<booking::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        BookingEntity::find()
            .filter(booking::Column::ProductId.eq(product_id))
            .filter(booking::Column::DispatchDate.lte(on_or_before))
            .order_by_asc(booking::Column::DispatchDate)
            .order_by_asc(booking::Column::BookedOn)
            .order_by_asc(booking::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// All bookings for a product regardless of dispatch date, priority order.
    #[instrument(skip(self))]
    pub async fn list_for_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<booking::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        BookingEntity::find()
            .filter(booking::Column::ProductId.eq(product_id))
            .order_by_asc(booking::Column::DispatchDate)
            .order_by_asc(booking::Column::BookedOn)
            .order_by_asc(booking::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// The most recent booking tied to an originating order line, if any.
    #[instrument(skip(self))]
    pub async fn find_latest_by_reference(
        &self,
        reference_id: Uuid,
    ) -> Result<Option<booking::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        BookingEntity::find()
            .filter(booking::Column::ReferenceId.eq(reference_id))
            .order_by_desc(booking::Column::BookedOn)
            .order_by_desc(booking::Column::Id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Removes a booking (sale cancellation path). Allocation for the
    /// product is re-derived on the next read; nothing else to clean up.
    #[instrument(skip(self))]
    pub async fn delete_booking(&self, booking_id: i64) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = BookingEntity::find_by_id(booking_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))?;

        let product_id = existing.product_id;
        existing.delete(db).await.map_err(ServiceError::db_error)?;

        info!(booking_id = booking_id, product_id = %product_id, "Deleted booking");

        self.event_sender
            .send(Event::BookingRemoved {
                booking_id,
                product_id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }
}
