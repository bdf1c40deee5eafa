use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification tag for ledger entries. Informational only: the stock
/// arithmetic looks at the signed quantity, never at the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockEventType {
    In,
    Out,
    SaleReserved,
    Adjustment,
}

impl StockEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockEventType::In => "in",
            StockEventType::Out => "out",
            StockEventType::SaleReserved => "sale_reserved",
            StockEventType::Adjustment => "adjustment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(StockEventType::In),
            "out" => Some(StockEventType::Out),
            "sale_reserved" => Some(StockEventType::SaleReserved),
            "adjustment" => Some(StockEventType::Adjustment),
            _ => None,
        }
    }
}

/// Append-only stock ledger entry. Positive quantity = stock received,
/// negative = stock consumed/dispatched. `effective_date` is the date the
/// movement applies to, not the row creation time (backdating is allowed).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub event_type: String, // stored as string, converted via StockEventType
    pub effective_date: NaiveDate,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
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
