use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database};
use tokio::sync::mpsc;

use mobility_api::{
    db::{self, DbPool},
    entities::{purchase_order, supplier},
    events::{Event, EventSender},
    lifecycle::{Actor, PaymentTerms},
    services::AppServices,
};

/// Everything a test needs: a fresh in-memory database with the schema
/// applied, the service layer, and the event channel's receiving end (held
/// so emitted events are not dropped as send errors).
pub struct TestContext {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    _events: mpsc::Receiver<Event>,
}

pub async fn setup() -> TestContext {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    // One connection, or every pooled connection would see its own empty db.
    opt.max_connections(1).sqlx_logging(false);
    let pool = Database::connect(opt).await.expect("sqlite connects");
    db::init_schema(&pool).await.expect("schema initializes");

    let pool = Arc::new(pool);
    let (tx, rx) = mpsc::channel(256);
    let services = AppServices::new(pool.clone(), EventSender::new(tx));
    TestContext {
        db: pool,
        services,
        _events: rx,
    }
}

pub fn actor(name: &str, station: &str) -> Actor {
    Actor {
        display_name: name.to_string(),
        station_code: station.to_string(),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub async fn seed_supplier(ctx: &TestContext, actor: &Actor, name: &str) -> supplier::Model {
    ctx.services
        .suppliers
        .create(
            actor,
            mobility_api::services::suppliers::CreateSupplier {
                name: name.to_string(),
                address: "123 Depot Road".to_string(),
                tin: "000-111-222".to_string(),
                default_terms: PaymentTerms::Net30,
            },
        )
        .await
        .expect("supplier created")
}

/// Creates a draft purchase order for `quantity` units at 10.00 each.
pub async fn draft_order(
    ctx: &TestContext,
    actor: &Actor,
    supplier_id: uuid::Uuid,
    quantity: Decimal,
) -> purchase_order::Model {
    ctx.services
        .purchase_orders
        .create(
            actor,
            mobility_api::services::purchase_orders::CreatePurchaseOrder {
                supplier_id,
                product_code: "DIESEL".to_string(),
                quantity,
                unit_price: Decimal::new(1000, 2),
                order_date: date(2024, 5, 2),
                terms: None,
                remarks: None,
            },
        )
        .await
        .expect("purchase order created")
}

pub async fn posted_order(
    ctx: &TestContext,
    actor: &Actor,
    supplier_id: uuid::Uuid,
    quantity: Decimal,
) -> purchase_order::Model {
    let order = draft_order(ctx, actor, supplier_id, quantity).await;
    ctx.services
        .purchase_orders
        .post(actor, order.id)
        .await
        .expect("purchase order posted")
}
