mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, SqlErr};
use uuid::Uuid;

use common::{actor, date, draft_order, posted_order, seed_supplier, setup};
use mobility_api::{
    entities::{audit_trail, purchase_order},
    errors::ServiceError,
    lifecycle::{DocumentStatus, PaymentTerms},
    services::{
        purchase_orders::CreatePurchaseOrder, receiving_reports::CreateReceivingReport,
        service_invoices::CreateServiceInvoice,
    },
};

fn qty(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

fn rr_input(purchase_order_id: uuid::Uuid, delivered: i64, received: i64) -> CreateReceivingReport {
    CreateReceivingReport {
        purchase_order_id,
        report_date: date(2024, 5, 10),
        quantity_delivered: qty(delivered),
        quantity_received: qty(received),
        supplier_invoice_no: Some("SI-481".to_string()),
        supplier_invoice_date: Some(date(2024, 5, 9)),
        remarks: None,
    }
}

fn sv_input(period: Option<chrono::NaiveDate>) -> CreateServiceInvoice {
    CreateServiceInvoice {
        customer_name: "Harbour Logistics".to_string(),
        service_description: "Vehicle wash bay rental".to_string(),
        document_date: date(2024, 5, 20),
        period,
        amount: Decimal::new(150000, 2),
        remarks: None,
    }
}

#[tokio::test]
async fn numbers_are_zero_padded_and_scoped_per_station() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let bob = actor("bob", "ST02");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;

    let first = draft_order(&ctx, &alice, supplier.id, qty(100)).await;
    let second = draft_order(&ctx, &alice, supplier.id, qty(50)).await;
    assert_eq!(first.po_number, "PO0000000001");
    assert_eq!(second.po_number, "PO0000000002");

    // A different station starts its own sequence from one.
    let other = draft_order(&ctx, &bob, supplier.id, qty(10)).await;
    assert_eq!(other.po_number, "PO0000000001");
    assert_eq!(other.station_code, "ST02");
}

#[tokio::test]
async fn posting_twice_is_refused() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;
    let order = posted_order(&ctx, &alice, supplier.id, qty(100)).await;

    assert_eq!(order.status, DocumentStatus::Posted);
    assert_eq!(order.posted_by.as_deref(), Some("alice"));

    let err = ctx
        .services
        .purchase_orders
        .post(&alice, order.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn documents_are_invisible_to_other_stations() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let bob = actor("bob", "ST02");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;
    let order = draft_order(&ctx, &alice, supplier.id, qty(100)).await;

    let err = ctx
        .services
        .purchase_orders
        .get(&bob, order.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn posting_a_report_moves_the_order_counter_and_derives_due_date() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;
    let order = posted_order(&ctx, &alice, supplier.id, qty(100)).await;

    let report = ctx
        .services
        .receiving_reports
        .create(&alice, rr_input(order.id, 60, 60))
        .await
        .expect("report created");
    assert_eq!(report.rr_number, "RR0000000001");
    assert_eq!(report.amount, Decimal::new(60000, 2));

    let report = ctx
        .services
        .receiving_reports
        .post(&alice, report.id)
        .await
        .expect("report posted");
    // Supplier default terms are 30D, counted from the report date.
    assert_eq!(report.due_date, Some(date(2024, 6, 9)));

    let order = ctx
        .services
        .purchase_orders
        .get(&alice, order.id)
        .await
        .unwrap();
    assert_eq!(order.quantity_received, qty(60));
}

#[tokio::test]
async fn report_without_supplier_invoice_date_cannot_post() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;
    let order = posted_order(&ctx, &alice, supplier.id, qty(100)).await;

    let mut input = rr_input(order.id, 40, 40);
    input.supplier_invoice_date = None;
    let report = ctx
        .services
        .receiving_reports
        .create(&alice, input)
        .await
        .unwrap();

    let err = ctx
        .services
        .receiving_reports
        .post(&alice, report.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn over_receipt_is_rejected_at_create_and_post() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;
    let order = posted_order(&ctx, &alice, supplier.id, qty(100)).await;

    let first = ctx
        .services
        .receiving_reports
        .create(&alice, rr_input(order.id, 80, 80))
        .await
        .unwrap();
    ctx.services
        .receiving_reports
        .post(&alice, first.id)
        .await
        .unwrap();

    // 25 would take the counter past the ordered 100.
    let err = ctx
        .services
        .receiving_reports
        .create(&alice, rr_input(order.id, 25, 25))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientQuantity(_));

    // Exactly the remaining balance is fine.
    let second = ctx
        .services
        .receiving_reports
        .create(&alice, rr_input(order.id, 20, 20))
        .await
        .unwrap();
    ctx.services
        .receiving_reports
        .post(&alice, second.id)
        .await
        .unwrap();

    let order = ctx
        .services
        .purchase_orders
        .get(&alice, order.id)
        .await
        .unwrap();
    assert_eq!(order.quantity_received, qty(100));
}

#[tokio::test]
async fn voiding_a_posted_report_returns_its_quantity() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;
    let order = posted_order(&ctx, &alice, supplier.id, qty(100)).await;

    let report = ctx
        .services
        .receiving_reports
        .create(&alice, rr_input(order.id, 60, 60))
        .await
        .unwrap();
    let report = ctx
        .services
        .receiving_reports
        .post(&alice, report.id)
        .await
        .unwrap();

    let report = ctx
        .services
        .receiving_reports
        .void(&alice, report.id)
        .await
        .expect("report voided");
    assert_eq!(report.status, DocumentStatus::Voided);
    assert_eq!(report.quantity_received, Decimal::ZERO);
    assert_eq!(report.due_date, None);

    let order = ctx
        .services
        .purchase_orders
        .get(&alice, order.id)
        .await
        .unwrap();
    assert_eq!(order.quantity_received, Decimal::ZERO);
}

#[tokio::test]
async fn order_void_is_blocked_while_reports_reference_it() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;
    let order = posted_order(&ctx, &alice, supplier.id, qty(100)).await;

    let report = ctx
        .services
        .receiving_reports
        .create(&alice, rr_input(order.id, 30, 30))
        .await
        .unwrap();

    // Even an unposted draft report blocks the void.
    let err = ctx
        .services
        .purchase_orders
        .void(&alice, order.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    ctx.services
        .receiving_reports
        .void(&alice, report.id)
        .await
        .unwrap();

    let order = ctx
        .services
        .purchase_orders
        .void(&alice, order.id)
        .await
        .expect("order voided once reports are gone");
    assert_eq!(order.status, DocumentStatus::Voided);
    assert_eq!(order.voided_by.as_deref(), Some("alice"));
}

#[tokio::test]
async fn order_cancellation_requires_a_remark() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;
    let order = draft_order(&ctx, &alice, supplier.id, qty(100)).await;

    let err = ctx
        .services
        .purchase_orders
        .cancel(&alice, order.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // A blank remark does not count either.
    let err = ctx
        .services
        .purchase_orders
        .cancel(&alice, order.id, Some("   ".to_string()))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let order = ctx
        .services
        .purchase_orders
        .cancel(&alice, order.id, Some("duplicate encoding".to_string()))
        .await
        .expect("order canceled");
    assert_eq!(order.status, DocumentStatus::Canceled);
    assert_eq!(
        order.cancellation_remark.as_deref(),
        Some("duplicate encoding")
    );
    assert_eq!(order.quantity_received, Decimal::ZERO);
}

#[tokio::test]
async fn canceling_a_report_records_the_canceled_quantity() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;
    let order = posted_order(&ctx, &alice, supplier.id, qty(100)).await;

    let report = ctx
        .services
        .receiving_reports
        .create(&alice, rr_input(order.id, 50, 40))
        .await
        .unwrap();

    let report = ctx
        .services
        .receiving_reports
        .cancel(&alice, report.id, Some("wrong delivery".to_string()))
        .await
        .expect("report canceled");
    assert_eq!(report.status, DocumentStatus::Canceled);
    assert_eq!(report.canceled_quantity, qty(40));
    assert_eq!(report.quantity_delivered, Decimal::ZERO);
    assert_eq!(report.quantity_received, Decimal::ZERO);
}

#[tokio::test]
async fn invoice_post_splits_unearned_from_current_revenue() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");

    // Billed in May for June service: the whole amount is unearned.
    let invoice = ctx
        .services
        .service_invoices
        .create(&alice, sv_input(Some(date(2024, 6, 1))))
        .await
        .unwrap();
    assert_eq!(invoice.sv_number, "SV0000000001");

    let invoice = ctx
        .services
        .service_invoices
        .post(&alice, invoice.id)
        .await
        .expect("invoice posted");
    assert_eq!(invoice.unearned_amount, Decimal::new(150000, 2));
    assert_eq!(invoice.current_and_previous_amount, Decimal::ZERO);

    // Voiding reverses the split.
    let invoice = ctx
        .services
        .service_invoices
        .void(&alice, invoice.id)
        .await
        .unwrap();
    assert_eq!(invoice.status, DocumentStatus::Voided);
    assert_eq!(invoice.unearned_amount, Decimal::ZERO);
    assert_eq!(invoice.current_and_previous_amount, Decimal::ZERO);
}

#[tokio::test]
async fn invoice_without_period_cannot_post_but_cancels_without_remark() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");

    let invoice = ctx
        .services
        .service_invoices
        .create(&alice, sv_input(None))
        .await
        .unwrap();

    let err = ctx
        .services
        .service_invoices
        .post(&alice, invoice.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Unlike orders and reports, invoices do not mandate a remark.
    let invoice = ctx
        .services
        .service_invoices
        .cancel(&alice, invoice.id, None)
        .await
        .expect("invoice canceled");
    assert_eq!(invoice.status, DocumentStatus::Canceled);
    assert_eq!(invoice.cancellation_remark, None);
}

#[tokio::test]
async fn oversized_amounts_are_rejected_as_invalid_input() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;

    // quantity * unit_price does not fit a Decimal; the create must refuse,
    // not abort the request.
    let err = ctx
        .services
        .purchase_orders
        .create(
            &alice,
            CreatePurchaseOrder {
                supplier_id: supplier.id,
                product_code: "DIESEL".to_string(),
                quantity: Decimal::MAX,
                unit_price: Decimal::new(2, 0),
                order_date: date(2024, 5, 2),
                terms: None,
                remarks: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInput(_));

    // Same guard on the receiving side, where the price comes off the order.
    // The reprice must survive SQLite's f64 round-trip (Decimal::MAX does
    // not) while still overflowing when multiplied by the report quantity.
    let order = posted_order(&ctx, &alice, supplier.id, qty(100)).await;
    let order_id = order.id;
    let mut active: purchase_order::ActiveModel = order.into();
    active.unit_price = Set(Decimal::from_scientific("4e28").unwrap());
    active.update(&*ctx.db).await.unwrap();

    let err = ctx
        .services
        .receiving_reports
        .create(&alice, rr_input(order_id, 2, 2))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInput(_));
}

#[tokio::test]
async fn duplicate_numbers_hit_the_unique_index_and_creation_moves_past_them() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;
    let first = draft_order(&ctx, &alice, supplier.id, qty(10)).await;

    // A second row with the same station and number must be refused by the
    // composite index, and refused in the shape the creation retry loop
    // matches on.
    let now = Utc::now();
    let duplicate = purchase_order::ActiveModel {
        id: Set(Uuid::new_v4()),
        po_number: Set(first.po_number.clone()),
        station_code: Set(first.station_code.clone()),
        supplier_id: Set(supplier.id),
        product_code: Set("DIESEL".to_string()),
        quantity: Set(qty(10)),
        unit_price: Set(Decimal::new(1000, 2)),
        amount: Set(qty(100)),
        terms: Set(PaymentTerms::Net30),
        order_date: Set(date(2024, 5, 2)),
        quantity_received: Set(Decimal::ZERO),
        remarks: Set(None),
        status: Set(DocumentStatus::Draft),
        created_by: Set("alice".to_string()),
        posted_by: Set(None),
        posted_at: Set(None),
        voided_by: Set(None),
        voided_at: Set(None),
        canceled_by: Set(None),
        canceled_at: Set(None),
        cancellation_remark: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let err = duplicate.insert(&*ctx.db).await.unwrap_err();
    assert_matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)));

    // Creation re-reads the station maximum, so it allocates past any row
    // that landed since, rather than colliding again.
    let second = draft_order(&ctx, &alice, supplier.id, qty(10)).await;
    assert_eq!(second.po_number, "PO0000000002");
}

#[tokio::test]
async fn void_clamps_the_order_counter_at_zero() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;
    let order = posted_order(&ctx, &alice, supplier.id, qty(100)).await;
    let order_id = order.id;

    let report = ctx
        .services
        .receiving_reports
        .create(&alice, rr_input(order_id, 60, 60))
        .await
        .unwrap();
    let report = ctx
        .services
        .receiving_reports
        .post(&alice, report.id)
        .await
        .unwrap();

    // Out-of-band data repair left the counter below the report's quantity.
    let order = ctx
        .services
        .purchase_orders
        .get(&alice, order_id)
        .await
        .unwrap();
    let mut active: purchase_order::ActiveModel = order.into();
    active.quantity_received = Set(qty(10));
    active.update(&*ctx.db).await.unwrap();

    // The void still succeeds and the counter lands at zero, not negative.
    let report = ctx
        .services
        .receiving_reports
        .void(&alice, report.id)
        .await
        .expect("void succeeds despite the low counter");
    assert_eq!(report.status, DocumentStatus::Voided);

    let order = ctx
        .services
        .purchase_orders
        .get(&alice, order_id)
        .await
        .unwrap();
    assert_eq!(order.quantity_received, Decimal::ZERO);
}

#[tokio::test]
async fn every_transition_leaves_an_audit_entry() {
    let ctx = setup().await;
    let alice = actor("alice", "ST01");
    let supplier = seed_supplier(&ctx, &alice, "Petron Depot").await;
    let order = posted_order(&ctx, &alice, supplier.id, qty(100)).await;
    ctx.services
        .purchase_orders
        .void(&alice, order.id)
        .await
        .unwrap();

    let entries = audit_trail::Entity::find()
        .all(&*ctx.db)
        .await
        .expect("audit rows load");
    let activities: Vec<&str> = entries.iter().map(|e| e.activity.as_str()).collect();
    // Supplier creation, order creation, post, void.
    assert!(activities.contains(&"Created Supplier Petron Depot"));
    assert!(activities.contains(&"Created PO# PO0000000001"));
    assert!(activities.contains(&"Posted PO# PO0000000001"));
    assert!(activities.contains(&"Voided PO# PO0000000001"));
    assert!(entries.iter().all(|e| e.username == "alice"));
    assert!(entries.iter().all(|e| e.station_code == "ST01"));
}
