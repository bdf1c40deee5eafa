use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Allocation status of a booking.
///
/// Persisted on the row only as an advisory cache of the last allocation
/// run; the authoritative status is whatever a fresh allocation computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    WaitingList,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::WaitingList => "waiting_list",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(BookingStatus::Confirmed),
            "waiting_list" => Some(BookingStatus::WaitingList),
            _ => None,
        }
    }
}

/// Reservation of product quantity against future stock, created when a
/// sale line commits.
///
/// The primary key is an auto-increment bigint: besides identity it serves
/// as the deterministic insertion-order tiebreaker when two bookings share
/// the same `(dispatch_date, booked_on)` pair, so the allocation scan is a
/// total order on every backend. `customer_name`, `gym_name` and `city`
/// are denormalized display fields and play no part in allocation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub product_id: Uuid,
    pub required_quantity: i64,
    pub dispatch_date: NaiveDate,
    pub booked_on: DateTime<Utc>,
    pub reference_type: String,
    pub reference_id: Uuid,
    pub customer_name: String,
    pub gym_name: Option<String>,
    pub city: Option<String>,
    pub status: String, // advisory cache, see BookingStatus
    pub waiting_quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
