use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::{DocumentStatus, PaymentTerms};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Unique within the station; see the composite index in `db.rs`.
    pub po_number: String,
    pub station_code: String,
    pub supplier_id: Uuid,
    pub product_code: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
    pub terms: PaymentTerms,
    pub order_date: NaiveDate,
    /// Rollup counter advanced by posted receiving reports.
    pub quantity_received: Decimal,
    pub remarks: Option<String>,
    pub status: DocumentStatus,
    pub created_by: String,
    pub posted_by: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub voided_by: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    pub canceled_by: Option<String>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub cancellation_remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
    #[sea_orm(has_many = "super::receiving_report::Entity")]
    ReceivingReports,
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::receiving_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReceivingReports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Model> for crate::lifecycle::LifecycleColumns {
    fn from(model: &Model) -> Self {
        Self {
            status: model.status,
            posted_by: model.posted_by.clone(),
            posted_at: model.posted_at,
            voided_by: model.voided_by.clone(),
            voided_at: model.voided_at,
            canceled_by: model.canceled_by.clone(),
            canceled_at: model.canceled_at,
            cancellation_remark: model.cancellation_remark.clone(),
        }
    }
}
