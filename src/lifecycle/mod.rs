//! Shared document lifecycle engine.
//!
//! Purchase orders, receiving reports, and service invoices all follow the
//! same Draft -> Posted -> (Voided | Canceled) progression. The engine keeps
//! that progression in one place: a tagged [`DocumentState`], the transition
//! rules over it, per-station sequence numbering, and payment-term due-date
//! arithmetic. Everything here is pure; persistence lives in the services.

pub mod sequence;
pub mod terms;
pub mod transition;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::StringLen;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use terms::PaymentTerms;
pub use transition::TransitionError;

/// The stored status discriminant. Derived from [`DocumentState`] on write,
/// cross-checked against the witness columns on read.
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum DocumentStatus {
    #[sea_orm(string_value = "Draft")]
    Draft,
    #[sea_orm(string_value = "Posted")]
    Posted,
    #[sea_orm(string_value = "Voided")]
    Voided,
    #[sea_orm(string_value = "Canceled")]
    Canceled,
}

/// A document's lifecycle position as a single tagged variant.
///
/// The "by" fields are the state witnesses: each is set at most once, by the
/// transition that produces the variant carrying it. Voiding discards the
/// posted witness entirely, which is what clears `posted_by` in storage.
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentState {
    Draft,
    Posted {
        posted_by: String,
        posted_at: DateTime<Utc>,
    },
    Voided {
        voided_by: String,
        voided_at: DateTime<Utc>,
    },
    Canceled {
        canceled_by: String,
        canceled_at: DateTime<Utc>,
        remark: Option<String>,
    },
}

impl DocumentState {
    pub fn status(&self) -> DocumentStatus {
        match self {
            DocumentState::Draft => DocumentStatus::Draft,
            DocumentState::Posted { .. } => DocumentStatus::Posted,
            DocumentState::Voided { .. } => DocumentStatus::Voided,
            DocumentState::Canceled { .. } => DocumentStatus::Canceled,
        }
    }

    pub fn is_posted(&self) -> bool {
        matches!(self, DocumentState::Posted { .. })
    }

    /// Reconstructs the tagged state from stored columns, refusing rows whose
    /// `status` string disagrees with the witness columns. The source system
    /// stored both redundantly; a mismatch here is a data-integrity fault and
    /// must fail loudly rather than trust either side.
    pub fn from_columns(columns: LifecycleColumns) -> Result<Self, StateIntegrityError> {
        let LifecycleColumns {
            status,
            posted_by,
            posted_at,
            voided_by,
            voided_at,
            canceled_by,
            canceled_at,
            cancellation_remark,
        } = columns;

        let state = match status {
            DocumentStatus::Draft => {
                if posted_by.is_some() || voided_by.is_some() || canceled_by.is_some() {
                    return Err(StateIntegrityError::witness(status));
                }
                DocumentState::Draft
            }
            DocumentStatus::Posted => match (posted_by, posted_at) {
                (Some(posted_by), Some(posted_at)) if voided_by.is_none() && canceled_by.is_none() => {
                    DocumentState::Posted { posted_by, posted_at }
                }
                _ => return Err(StateIntegrityError::witness(status)),
            },
            DocumentStatus::Voided => match (voided_by, voided_at) {
                // Voiding clears the posted witness; a surviving posted_by is
                // exactly the inconsistency this check exists to catch.
                (Some(voided_by), Some(voided_at)) if posted_by.is_none() && canceled_by.is_none() => {
                    DocumentState::Voided { voided_by, voided_at }
                }
                _ => return Err(StateIntegrityError::witness(status)),
            },
            DocumentStatus::Canceled => match (canceled_by, canceled_at) {
                (Some(canceled_by), Some(canceled_at))
                    if posted_by.is_none() && voided_by.is_none() =>
                {
                    DocumentState::Canceled {
                        canceled_by,
                        canceled_at,
                        remark: cancellation_remark,
                    }
                }
                _ => return Err(StateIntegrityError::witness(status)),
            },
        };

        Ok(state)
    }

    /// Flattens the tagged state back into the stored column shape.
    pub fn to_columns(&self) -> LifecycleColumns {
        let mut columns = LifecycleColumns {
            status: self.status(),
            posted_by: None,
            posted_at: None,
            voided_by: None,
            voided_at: None,
            canceled_by: None,
            canceled_at: None,
            cancellation_remark: None,
        };
        match self {
            DocumentState::Draft => {}
            DocumentState::Posted { posted_by, posted_at } => {
                columns.posted_by = Some(posted_by.clone());
                columns.posted_at = Some(*posted_at);
            }
            DocumentState::Voided { voided_by, voided_at } => {
                columns.voided_by = Some(voided_by.clone());
                columns.voided_at = Some(*voided_at);
            }
            DocumentState::Canceled {
                canceled_by,
                canceled_at,
                remark,
            } => {
                columns.canceled_by = Some(canceled_by.clone());
                columns.canceled_at = Some(*canceled_at);
                columns.cancellation_remark = remark.clone();
            }
        }
        columns
    }
}

/// The lifecycle column set shared by every document table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LifecycleColumns {
    pub status: DocumentStatus,
    pub posted_by: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub voided_by: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    pub canceled_by: Option<String>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub cancellation_remark: Option<String>,
}

impl Default for DocumentStatus {
    fn default() -> Self {
        DocumentStatus::Draft
    }
}

/// Stored status and witness columns disagree.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("document status {status} does not match its witness columns")]
pub struct StateIntegrityError {
    pub status: DocumentStatus,
}

impl StateIntegrityError {
    fn witness(status: DocumentStatus) -> Self {
        Self { status }
    }
}

/// The acting user, passed explicitly into every workflow call rather than
/// re-fetched from ambient claims.
#[derive(Clone, Debug)]
pub struct Actor {
    pub display_name: String,
    pub station_code: String,
}

/// The three document types sharing the lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum DocumentKind {
    #[strum(serialize = "Purchase Order")]
    PurchaseOrder,
    #[strum(serialize = "Receiving Report")]
    ReceivingReport,
    #[strum(serialize = "Service Invoice")]
    ServiceInvoice,
}

impl DocumentKind {
    /// Document-number prefix ahead of the 10-digit suffix.
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::PurchaseOrder => "PO",
            DocumentKind::ReceivingReport => "RR",
            DocumentKind::ServiceInvoice => "SV",
        }
    }

    /// Short tag used in audit activity text, e.g. "Posted PO# PO0000000001".
    pub fn tag(&self) -> &'static str {
        self.prefix()
    }

    /// Whether cancellation demands an explanatory remark. Purchase orders
    /// and receiving reports carry quantities that get zeroed, so the remark
    /// is the only record of why; invoices keep theirs optional.
    pub fn cancellation_remark_required(&self) -> bool {
        !matches!(self, DocumentKind::ServiceInvoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn columns_round_trip_each_state() {
        let states = [
            DocumentState::Draft,
            DocumentState::Posted {
                posted_by: "ana".into(),
                posted_at: at(),
            },
            DocumentState::Voided {
                voided_by: "ben".into(),
                voided_at: at(),
            },
            DocumentState::Canceled {
                canceled_by: "cai".into(),
                canceled_at: at(),
                remark: Some("duplicate encoding".into()),
            },
        ];
        for state in states {
            let restored = DocumentState::from_columns(state.to_columns()).unwrap();
            assert_eq!(restored, state);
        }
    }

    #[test]
    fn mismatched_witness_fails_loudly() {
        // Posted status without a posted_by witness.
        let columns = LifecycleColumns {
            status: DocumentStatus::Posted,
            ..Default::default()
        };
        assert!(DocumentState::from_columns(columns).is_err());

        // Voided row that still carries the posted witness.
        let columns = LifecycleColumns {
            status: DocumentStatus::Voided,
            posted_by: Some("ana".into()),
            posted_at: Some(at()),
            voided_by: Some("ben".into()),
            voided_at: Some(at()),
            ..Default::default()
        };
        assert!(DocumentState::from_columns(columns).is_err());

        // Draft with a stray canceled witness.
        let columns = LifecycleColumns {
            status: DocumentStatus::Draft,
            canceled_by: Some("cai".into()),
            canceled_at: Some(at()),
            ..Default::default()
        };
        assert!(DocumentState::from_columns(columns).is_err());
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            DocumentStatus::Draft,
            DocumentStatus::Posted,
            DocumentStatus::Voided,
            DocumentStatus::Canceled,
        ] {
            let parsed: DocumentStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
