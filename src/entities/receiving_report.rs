use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::DocumentStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receiving_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub rr_number: String,
    pub station_code: String,
    pub purchase_order_id: Uuid,
    pub report_date: NaiveDate,
    pub supplier_invoice_no: Option<String>,
    /// Must be present before the report can be posted.
    pub supplier_invoice_date: Option<NaiveDate>,
    pub quantity_delivered: Decimal,
    pub quantity_received: Decimal,
    /// min(delivered, received) at cancellation time, kept for audit.
    pub canceled_quantity: Decimal,
    pub amount: Decimal,
    /// Derived at posting from the parent order's terms and the report date.
    pub due_date: Option<NaiveDate>,
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
        belongs_to = "super::purchase_order::Entity",
        from = "Column::PurchaseOrderId",
        to = "super::purchase_order::Column::Id"
    )]
    PurchaseOrder,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
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
