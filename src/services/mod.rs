// Core services
pub mod allocation;
pub mod bookings;
pub mod products;
pub mod projection;
pub mod sales;
pub mod stock_ledger;
