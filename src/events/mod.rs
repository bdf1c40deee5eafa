use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Product events
    ProductCreated(Uuid),

    // Stock ledger events
    StockEventRecorded {
        stock_event_id: Uuid,
        product_id: Uuid,
        quantity: i64,
        event_type: String,
    },
    StockEventUpdated {
        stock_event_id: Uuid,
        product_id: Uuid,
    },
    StockEventDeleted {
        stock_event_id: Uuid,
        product_id: Uuid,
    },

    // Booking events
    BookingCreated {
        booking_id: i64,
        product_id: Uuid,
        required_quantity: i64,
        dispatch_date: NaiveDate,
    },
    BookingRemoved {
        booking_id: i64,
        product_id: Uuid,
    },
    BookingDispatched {
        booking_id: i64,
        product_id: Uuid,
        stock_event_id: Uuid,
    },

    // Allocation events
    AllocationRefreshed {
        product_id: Uuid,
        selected_date: NaiveDate,
        total_confirmed_quantity: i64,
        total_waiting_quantity: i64,
    },
}

// Function to process incoming events. With no outbound integrations
// configured this loop is the audit trail: every state change lands in the
// structured log exactly once.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockEventRecorded {
                stock_event_id,
                product_id,
                quantity,
                event_type,
            } => {
                info!(
                    stock_event_id = %stock_event_id,
                    product_id = %product_id,
                    quantity = quantity,
                    event_type = %event_type,
                    "Stock event recorded"
                );
            }
            Event::BookingCreated {
                booking_id,
                product_id,
                required_quantity,
                dispatch_date,
            } => {
                info!(
                    booking_id = booking_id,
                    product_id = %product_id,
                    required_quantity = required_quantity,
                    dispatch_date = %dispatch_date,
                    "Booking created"
                );
            }
            Event::AllocationRefreshed {
                product_id,
                selected_date,
                total_confirmed_quantity,
                total_waiting_quantity,
            } => {
                if *total_waiting_quantity > 0 {
                    warn!(
                        product_id = %product_id,
                        selected_date = %selected_date,
                        total_confirmed_quantity = total_confirmed_quantity,
                        total_waiting_quantity = total_waiting_quantity,
                        "Allocation refreshed with waitlisted quantity"
                    );
                } else {
                    info!(
                        product_id = %product_id,
                        selected_date = %selected_date,
                        total_confirmed_quantity = total_confirmed_quantity,
                        "Allocation refreshed, all bookings confirmed"
                    );
                }
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event processing loop stopped");
}
