//! End-to-end allocation behavior against a real (SQLite) database:
//! ledger replay, booking priority, cache resync and the sale intake path.

mod common;

use assert_matches::assert_matches;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use common::TestApp;
use stockbook_api::entities::booking::BookingStatus;
use stockbook_api::entities::stock_event::StockEventType;
use stockbook_api::errors::ServiceError;
use stockbook_api::services::bookings::CreateBookingInput;
use stockbook_api::services::sales::SaleLineInput;
use stockbook_api::services::stock_ledger::{RecordStockEventInput, StockEventPatch};
use uuid::Uuid;

fn d(s: &str) -> NaiveDate {
    s.parse().expect("valid date literal")
}

fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
}

async fn seed_product(app: &TestApp) -> Uuid {
    let product = app
        .state
        .services
        .products
        .create_product(stockbook_api::services::products::CreateProductInput {
            sku: format!("SKU-{}", Uuid::new_v4()),
            name: "Treadmill T-800".to_string(),
        })
        .await
        .expect("seed product");
    product.id
}

fn booking_input(product_id: Uuid, quantity: i64, dispatch: &str, booked_on: DateTime<Utc>) -> CreateBookingInput {
    CreateBookingInput {
        product_id,
        required_quantity: quantity,
        dispatch_date: d(dispatch),
        booked_on: Some(booked_on),
        reference_type: "sale_line".to_string(),
        reference_id: Uuid::new_v4(),
        customer_name: "Acme Fitness".to_string(),
        gym_name: Some("Acme Gym".to_string()),
        city: Some("Pune".to_string()),
    }
}

fn stock_in(product_id: Uuid, quantity: i64, date: &str) -> RecordStockEventInput {
    RecordStockEventInput {
        product_id,
        quantity,
        event_type: if quantity >= 0 {
            StockEventType::In
        } else {
            StockEventType::Out
        },
        effective_date: d(date),
        reference_type: None,
        reference_id: None,
        notes: None,
    }
}

#[tokio::test]
async fn booking_without_stock_is_waitlisted_in_full() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.bookings
        .create_booking(booking_input(product_id, 5, "2024-01-10", ts(0, 0)))
        .await
        .expect("create booking");

    let report = svc
        .allocation
        .allocate(product_id, d("2024-01-10"))
        .await
        .expect("allocate");

    assert_eq!(report.stock_on_selected_date, 0);
    assert_eq!(report.allocations.len(), 1);
    assert_eq!(report.allocations[0].status, BookingStatus::WaitingList);
    assert_eq!(report.allocations[0].waiting_quantity, 5);
    assert_eq!(report.total_confirmed_quantity, 0);
    assert_eq!(report.total_waiting_quantity, 5);
}

#[tokio::test]
async fn replenishment_before_dispatch_confirms_booking() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.bookings
        .create_booking(booking_input(product_id, 5, "2024-01-10", ts(0, 0)))
        .await
        .expect("create booking");
    svc.stock_ledger
        .record_event(stock_in(product_id, 10, "2024-01-05"))
        .await
        .expect("record stock");

    let report = svc
        .allocation
        .allocate(product_id, d("2024-01-10"))
        .await
        .expect("allocate");

    assert_eq!(report.stock_on_selected_date, 10);
    assert_eq!(report.allocations[0].status, BookingStatus::Confirmed);
    assert_eq!(report.allocations[0].waiting_quantity, 0);
    assert_eq!(report.total_confirmed_quantity, 5);
    assert_eq!(report.total_waiting_quantity, 0);
}

#[tokio::test]
async fn same_day_bookings_drain_pool_first_come_first_served() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.stock_ledger
        .record_event(stock_in(product_id, 7, "2024-01-02"))
        .await
        .expect("record stock");
    svc.bookings
        .create_booking(booking_input(product_id, 5, "2024-01-10", ts(9, 0)))
        .await
        .expect("first booking");
    svc.bookings
        .create_booking(booking_input(product_id, 5, "2024-01-10", ts(10, 0)))
        .await
        .expect("second booking");

    let report = svc
        .allocation
        .allocate(product_id, d("2024-01-10"))
        .await
        .expect("allocate");

    let first = &report.allocations[0];
    assert_eq!(first.booked_on, ts(9, 0));
    assert_eq!(first.status, BookingStatus::Confirmed);
    assert_eq!(first.available_stock_at_booking, 7);

    let second = &report.allocations[1];
    assert_eq!(second.booked_on, ts(10, 0));
    assert_eq!(second.status, BookingStatus::WaitingList);
    assert_eq!(second.available_stock_at_booking, 2);
    assert_eq!(second.confirmed_quantity, 2);
    assert_eq!(second.waiting_quantity, 3);

    assert_eq!(report.total_confirmed_quantity, 7);
    assert_eq!(report.total_waiting_quantity, 3);
}

#[tokio::test]
async fn deleting_stock_event_reverts_allocation() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.bookings
        .create_booking(booking_input(product_id, 5, "2024-01-10", ts(0, 0)))
        .await
        .expect("create booking");
    let event = svc
        .stock_ledger
        .record_event(stock_in(product_id, 10, "2024-01-05"))
        .await
        .expect("record stock");

    let before = svc
        .allocation
        .allocate(product_id, d("2024-01-10"))
        .await
        .expect("allocate");
    assert_eq!(before.allocations[0].status, BookingStatus::Confirmed);

    svc.stock_ledger
        .delete_event(event.id)
        .await
        .expect("delete stock event");

    // No cached status is trusted: the same query now waitlists the booking.
    let after = svc
        .allocation
        .allocate(product_id, d("2024-01-10"))
        .await
        .expect("allocate after delete");
    assert_eq!(after.stock_on_selected_date, 0);
    assert_eq!(after.allocations[0].status, BookingStatus::WaitingList);
    assert_eq!(after.allocations[0].waiting_quantity, 5);
}

#[tokio::test]
async fn future_stock_is_invisible_to_earlier_dates() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.bookings
        .create_booking(booking_input(product_id, 4, "2024-01-10", ts(0, 0)))
        .await
        .expect("create booking");
    svc.stock_ledger
        .record_event(stock_in(product_id, 20, "2024-02-01"))
        .await
        .expect("future stock");

    // The arrival in February is not part of the January 10 snapshot; no
    // forward simulation happens.
    let report = svc
        .allocation
        .allocate(product_id, d("2024-01-10"))
        .await
        .expect("allocate");
    assert_eq!(report.stock_on_selected_date, 0);
    assert_eq!(report.allocations[0].status, BookingStatus::WaitingList);
}

#[tokio::test]
async fn earlier_dispatch_date_is_served_first_regardless_of_booked_on() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.stock_ledger
        .record_event(stock_in(product_id, 5, "2024-01-02"))
        .await
        .expect("record stock");

    // Booked later but dispatching earlier: still first in line.
    svc.bookings
        .create_booking(booking_input(product_id, 5, "2024-01-08", ts(15, 0)))
        .await
        .expect("early dispatch");
    svc.bookings
        .create_booking(booking_input(product_id, 5, "2024-01-12", ts(9, 0)))
        .await
        .expect("late dispatch");

    let report = svc
        .allocation
        .allocate(product_id, d("2024-01-15"))
        .await
        .expect("allocate");

    assert_eq!(report.allocations[0].dispatch_date, d("2024-01-08"));
    assert_eq!(report.allocations[0].status, BookingStatus::Confirmed);
    assert_eq!(report.allocations[1].dispatch_date, d("2024-01-12"));
    assert_eq!(report.allocations[1].status, BookingStatus::WaitingList);
}

#[tokio::test]
async fn identical_timestamps_fall_back_to_insertion_order() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.stock_ledger
        .record_event(stock_in(product_id, 3, "2024-01-02"))
        .await
        .expect("record stock");

    let first = svc
        .bookings
        .create_booking(booking_input(product_id, 3, "2024-01-10", ts(9, 0)))
        .await
        .expect("first");
    let second = svc
        .bookings
        .create_booking(booking_input(product_id, 3, "2024-01-10", ts(9, 0)))
        .await
        .expect("second");
    assert!(second.id > first.id);

    let report = svc
        .allocation
        .allocate(product_id, d("2024-01-10"))
        .await
        .expect("allocate");

    assert_eq!(report.allocations[0].booking_id, first.id);
    assert_eq!(report.allocations[0].status, BookingStatus::Confirmed);
    assert_eq!(report.allocations[1].booking_id, second.id);
    assert_eq!(report.allocations[1].status, BookingStatus::WaitingList);
}

#[tokio::test]
async fn refresh_persists_advisory_status_caches() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.stock_ledger
        .record_event(stock_in(product_id, 7, "2024-01-02"))
        .await
        .expect("record stock");
    let b1 = svc
        .bookings
        .create_booking(booking_input(product_id, 5, "2024-01-10", ts(9, 0)))
        .await
        .expect("first booking");
    let b2 = svc
        .bookings
        .create_booking(booking_input(product_id, 5, "2024-01-10", ts(10, 0)))
        .await
        .expect("second booking");

    // Placeholder caches before any allocation run.
    assert_eq!(b1.status, BookingStatus::WaitingList.as_str());
    assert_eq!(b1.waiting_quantity, 5);

    svc.allocation
        .refresh_booking_status(product_id, d("2024-01-10"))
        .await
        .expect("refresh");

    let b1 = svc.bookings.get_booking(b1.id).await.expect("reload b1");
    let b2 = svc.bookings.get_booking(b2.id).await.expect("reload b2");
    assert_eq!(b1.status, BookingStatus::Confirmed.as_str());
    assert_eq!(b1.waiting_quantity, 0);
    assert_eq!(b2.status, BookingStatus::WaitingList.as_str());
    assert_eq!(b2.waiting_quantity, 3);
}

#[tokio::test]
async fn ledger_mutations_keep_product_stock_cache_in_sync() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    let received = svc
        .stock_ledger
        .record_event(stock_in(product_id, 10, "2024-01-05"))
        .await
        .expect("record in");
    svc.stock_ledger
        .record_event(stock_in(product_id, -4, "2024-01-06"))
        .await
        .expect("record out");

    let product = svc.products.get_product(product_id).await.expect("reload");
    assert_eq!(product.current_stock, 6);

    svc.stock_ledger
        .update_event(
            received.id,
            StockEventPatch {
                quantity: Some(12),
                ..Default::default()
            },
        )
        .await
        .expect("update event");
    let product = svc.products.get_product(product_id).await.expect("reload");
    assert_eq!(product.current_stock, 8);

    svc.stock_ledger
        .delete_event(received.id)
        .await
        .expect("delete event");
    let product = svc.products.get_product(product_id).await.expect("reload");
    assert_eq!(product.current_stock, -4);
}

#[tokio::test]
async fn zero_quantities_are_rejected_before_any_write() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    let err = svc
        .stock_ledger
        .record_event(stock_in(product_id, 0, "2024-01-05"))
        .await
        .expect_err("zero stock event must fail");
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = svc
        .bookings
        .create_booking(booking_input(product_id, 0, "2024-01-10", ts(0, 0)))
        .await
        .expect_err("zero booking must fail");
    assert_matches!(err, ServiceError::ValidationError(_));

    assert!(svc
        .stock_ledger
        .list_events(product_id)
        .await
        .expect("list")
        .is_empty());
    assert!(svc
        .bookings
        .list_for_product(product_id)
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let svc = &app.state.services;

    let missing = Uuid::new_v4();
    let err = svc
        .allocation
        .allocate(missing, d("2024-01-10"))
        .await
        .expect_err("missing product");
    assert_matches!(err, ServiceError::NotFound(_));

    let err = svc
        .stock_ledger
        .record_event(stock_in(missing, 5, "2024-01-05"))
        .await
        .expect_err("missing product");
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn allocate_is_idempotent_between_mutations() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.stock_ledger
        .record_event(stock_in(product_id, 6, "2024-01-03"))
        .await
        .expect("record stock");
    svc.bookings
        .create_booking(booking_input(product_id, 4, "2024-01-10", ts(9, 0)))
        .await
        .expect("booking");
    svc.bookings
        .create_booking(booking_input(product_id, 4, "2024-01-11", ts(9, 0)))
        .await
        .expect("booking");

    let first = svc
        .allocation
        .allocate(product_id, d("2024-01-12"))
        .await
        .expect("first run");
    let second = svc
        .allocation
        .allocate(product_id, d("2024-01-12"))
        .await
        .expect("second run");
    assert_eq!(first, second);
}

#[tokio::test]
async fn sale_intake_rejects_short_stock_without_writing() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.stock_ledger
        .record_event(stock_in(product_id, 3, "2024-01-02"))
        .await
        .expect("record stock");

    let err = svc
        .sales
        .confirm_sale_line(SaleLineInput {
            product_id,
            quantity: 5,
            dispatch_date: d("2024-01-10"),
            booked_on: Some(ts(9, 0)),
            reference_id: Uuid::new_v4(),
            customer_name: "Acme Fitness".to_string(),
            gym_name: None,
            city: None,
            allow_oversell: false,
        })
        .await
        .expect_err("insufficient stock");
    assert_matches!(err, ServiceError::InsufficientStock(_));

    assert!(svc
        .bookings
        .list_for_product(product_id)
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn sale_intake_books_and_oversell_bypasses_the_guard() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.stock_ledger
        .record_event(stock_in(product_id, 10, "2024-01-02"))
        .await
        .expect("record stock");

    let reference_id = Uuid::new_v4();
    let booking = svc
        .sales
        .confirm_sale_line(SaleLineInput {
            product_id,
            quantity: 6,
            dispatch_date: d("2024-01-10"),
            booked_on: Some(ts(9, 0)),
            reference_id,
            customer_name: "Acme Fitness".to_string(),
            gym_name: Some("Acme Gym".to_string()),
            city: Some("Pune".to_string()),
            allow_oversell: false,
        })
        .await
        .expect("confirm sale line");
    assert_eq!(booking.required_quantity, 6);

    let found = svc
        .bookings
        .find_latest_by_reference(reference_id)
        .await
        .expect("lookup")
        .expect("booking exists for reference");
    assert_eq!(found.id, booking.id);

    // Administrative path: stock guard skipped even though 50 > 10.
    let oversold = svc
        .sales
        .confirm_sale_line(SaleLineInput {
            product_id,
            quantity: 50,
            dispatch_date: d("2024-01-10"),
            booked_on: Some(ts(10, 0)),
            reference_id: Uuid::new_v4(),
            customer_name: "Bulk Buyer".to_string(),
            gym_name: None,
            city: None,
            allow_oversell: true,
        })
        .await
        .expect("oversell allowed");
    assert_eq!(oversold.required_quantity, 50);
}

#[tokio::test]
async fn dispatching_a_booking_moves_demand_into_the_ledger() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.stock_ledger
        .record_event(stock_in(product_id, 10, "2024-01-02"))
        .await
        .expect("record stock");
    let booking = svc
        .sales
        .confirm_sale_line(SaleLineInput {
            product_id,
            quantity: 6,
            dispatch_date: d("2024-01-10"),
            booked_on: Some(ts(9, 0)),
            reference_id: Uuid::new_v4(),
            customer_name: "Acme Fitness".to_string(),
            gym_name: None,
            city: None,
            allow_oversell: false,
        })
        .await
        .expect("confirm sale line");

    let out_event = svc
        .sales
        .dispatch_booking(booking.id, d("2024-01-10"))
        .await
        .expect("dispatch booking");
    assert_eq!(out_event.quantity, -6);

    // The booking left the queue; the ledger and cache absorbed the units.
    let err = svc
        .bookings
        .get_booking(booking.id)
        .await
        .expect_err("booking retired");
    assert_matches!(err, ServiceError::NotFound(_));

    let product = svc.products.get_product(product_id).await.expect("reload");
    assert_eq!(product.current_stock, 4);

    let report = svc
        .allocation
        .allocate(product_id, d("2024-01-10"))
        .await
        .expect("allocate");
    assert_eq!(report.stock_on_selected_date, 4);
    assert!(report.allocations.is_empty());
}

#[tokio::test]
async fn projection_reports_leftover_stock_and_next_arrival() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app).await;
    let svc = &app.state.services;

    svc.stock_ledger
        .record_event(stock_in(product_id, 7, "2024-01-02"))
        .await
        .expect("record stock");
    svc.stock_ledger
        .record_event(stock_in(product_id, 15, "2024-01-20"))
        .await
        .expect("future arrival");
    svc.stock_ledger
        .record_event(stock_in(product_id, 5, "2024-01-25"))
        .await
        .expect("later arrival");
    svc.bookings
        .create_booking(booking_input(product_id, 5, "2024-01-10", ts(9, 0)))
        .await
        .expect("booking");

    let projection = svc
        .projection
        .project(product_id, d("2024-01-10"))
        .await
        .expect("project");

    assert_eq!(projection.current_stock, 7);
    assert_eq!(projection.total_confirmed_quantity, 5);
    assert_eq!(projection.after_allocation_stock, 2);
    assert_eq!(projection.next_replenishment_date, Some(d("2024-01-20")));
    assert_eq!(projection.next_replenishment_quantity, Some(15));
}
