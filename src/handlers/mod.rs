pub mod bookings;
pub mod products;
pub mod sales;
pub mod stock;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<crate::services::products::ProductService>,
    pub stock_ledger: Arc<crate::services::stock_ledger::StockLedgerService>,
    pub bookings: Arc<crate::services::bookings::BookingService>,
    pub allocation: Arc<crate::services::allocation::AllocationService>,
    pub projection: Arc<crate::services::projection::StockProjectionService>,
    pub sales: Arc<crate::services::sales::SaleIntakeService>,
}

impl AppServices {
    /// Wire the full service graph over one pool and event channel.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let products = Arc::new(crate::services::products::ProductService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let stock_ledger = Arc::new(crate::services::stock_ledger::StockLedgerService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let bookings = Arc::new(crate::services::bookings::BookingService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let allocation = Arc::new(crate::services::allocation::AllocationService::new(
            db_pool.clone(),
            stock_ledger.clone(),
            bookings.clone(),
            event_sender.clone(),
        ));
        let projection = Arc::new(
            crate::services::projection::StockProjectionService::new(
                db_pool.clone(),
                stock_ledger.clone(),
                allocation.clone(),
            ),
        );
        let sales = Arc::new(crate::services::sales::SaleIntakeService::new(
            db_pool,
            stock_ledger.clone(),
            bookings.clone(),
            event_sender,
        ));

        Self {
            products,
            stock_ledger,
            bookings,
            allocation,
            projection,
            sales,
        }
    }
}
