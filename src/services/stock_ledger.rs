//! Stock Ledger Service
//!
//! Maintains the append-only signed-quantity event log per product and
//! answers "stock level as of date D". Every mutation resynchronizes the
//! product's cached `current_stock` inside the same transaction; the event
//! log stays the single source of truth.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::product::{self, Entity as ProductEntity};
use crate::entities::stock_event::{self, Entity as StockEventEntity, StockEventType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Input for recording a new ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordStockEventInput {
    pub product_id: Uuid,
    /// Signed quantity; positive = stock in, negative = stock out. Zero is rejected.
    pub quantity: i64,
    pub event_type: StockEventType,
    /// The date the movement applies to. May lie in the past (backdated correction).
    pub effective_date: NaiveDate,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Patch for an existing ledger entry. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockEventPatch {
    pub quantity: Option<i64>,
    pub event_type: Option<StockEventType>,
    pub effective_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// An upcoming stock arrival, as seen from a projection date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundArrival {
    pub date: NaiveDate,
    pub quantity: i64,
}

/// Re-sums the full event log for a product and stores the result in the
/// product's `current_stock` cache. Must run on the same connection (or
/// transaction) as the mutation that made the cache stale.
pub(crate) async fn resync_product_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<i64, ServiceError> {
    let product = ProductEntity::find_by_id(product_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

    let events = StockEventEntity::find()
        .filter(stock_event::Column::ProductId.eq(product_id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let current_stock: i64 = events.iter().map(|e| e.quantity).sum();

    let mut active: product::ActiveModel = product.into();
    active.current_stock = Set(current_stock);
    active.updated_at = Set(Some(Utc::now()));
    active.update(conn).await.map_err(ServiceError::db_error)?;

    Ok(current_stock)
}

/// Service owning the append-only stock event log.
#[derive(Clone)]
pub struct StockLedgerService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl StockLedgerService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a stock movement and resyncs the product stock cache in one
    /// transaction.
    ///
    /// The ledger itself never blocks negative cumulative stock: a backdated
    /// correction may legitimately drive a balance below zero. Callers doing
    /// live dispatch are expected to pre-check `stock_as_of` (see the sale
    /// intake service).
    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn record_event(
        &self,
        input: RecordStockEventInput,
    ) -> Result<stock_event::Model, ServiceError> {
        if input.quantity == 0 {
            return Err(ServiceError::ValidationError(
                "Stock event quantity must be non-zero".to_string(),
            ));
        }

        let db = self.db_pool.as_ref();
        let event = db
            .transaction::<_, stock_event::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    ProductEntity::find_by_id(input.product_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Product {} not found",
                                input.product_id
                            ))
                        })?;

                    let model = stock_event::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(input.product_id),
                        quantity: Set(input.quantity),
                        event_type: Set(input.event_type.as_str().to_string()),
                        effective_date: Set(input.effective_date),
                        reference_type: Set(input.reference_type.clone()),
                        reference_id: Set(input.reference_id),
                        notes: Set(input.notes.clone()),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    resync_product_stock(txn, input.product_id).await?;

                    Ok(model)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(
            stock_event_id = %event.id,
            product_id = %event.product_id,
            quantity = event.quantity,
            effective_date = %event.effective_date,
            "Recorded stock event"
        );

        self.event_sender
            .send(Event::StockEventRecorded {
                stock_event_id: event.id,
                product_id: event.product_id,
                quantity: event.quantity,
                event_type: event.event_type.clone(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(event)
    }

    /// Applies a patch to an existing ledger entry and resyncs the cache.
    ///
    /// Bookings are not recomputed here: allocation is re-derived from
    /// scratch on the next read, so a ledger edit invalidates nothing
    /// eagerly.
    #[instrument(skip(self, patch))]
    pub async fn update_event(
        &self,
        event_id: Uuid,
        patch: StockEventPatch,
    ) -> Result<stock_event::Model, ServiceError> {
        if patch.quantity == Some(0) {
            return Err(ServiceError::ValidationError(
                "Stock event quantity must be non-zero".to_string(),
            ));
        }

        let db = self.db_pool.as_ref();
        let updated = db
            .transaction::<_, stock_event::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = StockEventEntity::find_by_id(event_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Stock event {} not found", event_id))
                        })?;

                    let product_id = existing.product_id;
                    let mut active: stock_event::ActiveModel = existing.into();
                    if let Some(quantity) = patch.quantity {
                        active.quantity = Set(quantity);
                    }
                    if let Some(event_type) = patch.event_type {
                        active.event_type = Set(event_type.as_str().to_string());
                    }
                    if let Some(effective_date) = patch.effective_date {
                        active.effective_date = Set(effective_date);
                    }
                    if let Some(notes) = patch.notes.clone() {
                        active.notes = Set(Some(notes));
                    }

                    let updated = active.update(txn).await.map_err(ServiceError::db_error)?;

                    resync_product_stock(txn, product_id).await?;

                    Ok(updated)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(stock_event_id = %event_id, "Updated stock event");

        self.event_sender
            .send(Event::StockEventUpdated {
                stock_event_id: updated.id,
                product_id: updated.product_id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(updated)
    }

    /// Hard-deletes a ledger entry and resyncs the cache. Ledger entries are
    /// never soft-deleted.
    #[instrument(skip(self))]
    pub async fn delete_event(&self, event_id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        let product_id = db
            .transaction::<_, Uuid, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = StockEventEntity::find_by_id(event_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Stock event {} not found", event_id))
                        })?;

                    let product_id = existing.product_id;
                    existing
                        .delete(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    resync_product_stock(txn, product_id).await?;

                    Ok(product_id)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(stock_event_id = %event_id, product_id = %product_id, "Deleted stock event");

        self.event_sender
            .send(Event::StockEventDeleted {
                stock_event_id: event_id,
                product_id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }

    /// Gets a single ledger entry by id.
    #[instrument(skip(self))]
    pub async fn get_event(&self, event_id: Uuid) -> Result<stock_event::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        StockEventEntity::find_by_id(event_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock event {} not found", event_id)))
    }

    /// Lists all ledger entries for a product, newest effective date first.
    #[instrument(skip(self))]
    pub async fn list_events(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<stock_event::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        StockEventEntity::find()
            .filter(stock_event::Column::ProductId.eq(product_id))
            .order_by_desc(stock_event::Column::EffectiveDate)
            .order_by_desc(stock_event::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Stock level for a product as of the given date (inclusive): the exact
    /// sum of all event quantities with `effective_date <= date`.
    #[instrument(skip(self))]
    pub async fn stock_as_of(
        &self,
        product_id: Uuid,
        date: NaiveDate,
    ) -> Result<i64, ServiceError> {
        let db = self.db_pool.as_ref();
        let events = StockEventEntity::find()
            .filter(stock_event::Column::ProductId.eq(product_id))
            .filter(stock_event::Column::EffectiveDate.lte(date))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(events.iter().map(|e| e.quantity).sum())
    }

    /// The earliest strictly-future stock arrival after `date`, with the
    /// total positive quantity arriving on that day. Used by the projection
    /// service for "N units arriving on date X" displays.
    #[instrument(skip(self))]
    pub async fn next_inbound_after(
        &self,
        product_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<InboundArrival>, ServiceError> {
        let db = self.db_pool.as_ref();
        let upcoming = StockEventEntity::find()
            .filter(stock_event::Column::ProductId.eq(product_id))
            .filter(stock_event::Column::Quantity.gt(0))
            .filter(stock_event::Column::EffectiveDate.gt(date))
            .order_by_asc(stock_event::Column::EffectiveDate)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let Some(first) = upcoming.first() else {
            return Ok(None);
        };

        let arrival_date = first.effective_date;
        let quantity = upcoming
            .iter()
            .take_while(|e| e.effective_date == arrival_date)
            .map(|e| e.quantity)
            .sum();

        Ok(Some(InboundArrival {
            date: arrival_date,
            quantity,
        }))
    }
}
