use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::DocumentStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sv_number: String,
    pub station_code: String,
    pub customer_name: String,
    pub service_description: String,
    pub document_date: NaiveDate,
    /// Month the billed service belongs to; required before posting.
    pub period: Option<NaiveDate>,
    pub amount: Decimal,
    /// Posting splits `amount` into these two, by comparing the service
    /// period against the document month. Voiding zeroes both.
    pub unearned_amount: Decimal,
    pub current_and_previous_amount: Decimal,
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
pub enum Relation {}

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
