//! Supplier payment terms and due-date computation.

use chrono::{Days, NaiveDate};
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Payment terms offered by suppliers. The string forms are the values the
/// back office has always used on printed documents, so they are also the
/// stored and wire representation.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum PaymentTerms {
    #[sea_orm(string_value = "COD")]
    #[strum(serialize = "COD")]
    #[serde(rename = "COD")]
    Cod,
    #[sea_orm(string_value = "7D")]
    #[strum(serialize = "7D")]
    #[serde(rename = "7D")]
    Net7,
    #[sea_orm(string_value = "15D")]
    #[strum(serialize = "15D")]
    #[serde(rename = "15D")]
    Net15,
    #[sea_orm(string_value = "30D")]
    #[strum(serialize = "30D")]
    #[serde(rename = "30D")]
    Net30,
    #[sea_orm(string_value = "45D")]
    #[strum(serialize = "45D")]
    #[serde(rename = "45D")]
    Net45,
    #[sea_orm(string_value = "60D")]
    #[strum(serialize = "60D")]
    #[serde(rename = "60D")]
    Net60,
}

impl PaymentTerms {
    pub fn days(&self) -> u64 {
        match self {
            PaymentTerms::Cod => 0,
            PaymentTerms::Net7 => 7,
            PaymentTerms::Net15 => 15,
            PaymentTerms::Net30 => 30,
            PaymentTerms::Net45 => 45,
            PaymentTerms::Net60 => 60,
        }
    }

    /// Due date for a document dated `from` under these terms. COD falls due
    /// the same day.
    pub fn due_date(&self, from: NaiveDate) -> NaiveDate {
        // Days::new never overflows chrono's range for these term lengths.
        from.checked_add_days(Days::new(self.days())).unwrap_or(from)
    }
}
