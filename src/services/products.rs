//! Minimal product master needed to anchor the ledger and booking registry.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::product::{self, Entity as ProductEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a product with an empty ledger and zero cached stock.
    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let sku = input.sku.trim().to_string();
        let name = input.name.trim().to_string();
        if sku.is_empty() || name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Product sku and name must be non-empty".to_string(),
            ));
        }

        let db = self.db_pool.as_ref();

        let existing = ProductEntity::find()
            .filter(product::Column::Sku.eq(sku.clone()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product with SKU '{}' already exists",
                sku
            )));
        }

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku),
            name: Set(name),
            current_stock: Set(0),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(product_id = %model.id, sku = %model.sku, "Created product");

        self.event_sender
            .send(Event::ProductCreated(model.id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(model)
    }

    /// Gets a product by id.
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }
}
