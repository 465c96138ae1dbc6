//! Transition rules over [`DocumentState`].
//!
//! Each rule consumes the current state and either yields the successor state
//! plus the audit activity describing the step, or a [`TransitionError`] with
//! no state change. Services run these inside the same transaction as the
//! header update and the audit insert, so a refusal here rolls back nothing.

use chrono::{DateTime, Utc};

use super::{Actor, DocumentKind, DocumentState};

/// A transition the engine refused. Every variant maps to a user-facing
/// message; none of them indicate infrastructure trouble.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("{kind} {document_no} has already been posted")]
    AlreadyPosted { kind: DocumentKind, document_no: String },

    #[error("{kind} {document_no} has already been voided")]
    AlreadyVoided { kind: DocumentKind, document_no: String },

    #[error("{kind} {document_no} has already been canceled")]
    AlreadyCanceled { kind: DocumentKind, document_no: String },

    #[error("{kind} {document_no} is {status} and can no longer be posted")]
    NotPostable {
        kind: DocumentKind,
        document_no: String,
        status: super::DocumentStatus,
    },

    #[error("only draft documents can be canceled; {kind} {document_no} is {status}")]
    NotCancelable {
        kind: DocumentKind,
        document_no: String,
        status: super::DocumentStatus,
    },

    #[error("cannot void {kind} {document_no}: {dependents}")]
    DownstreamInUse {
        kind: DocumentKind,
        document_no: String,
        dependents: String,
    },

    #[error("a cancellation remark is required for {kind} {document_no}")]
    RemarkRequired { kind: DocumentKind, document_no: String },
}

/// The outcome of a successful transition: the new state and the audit
/// activity text the engine emits for it. Writing the audit row from here,
/// rather than in each caller, keeps the trail uniform across document types.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: DocumentState,
    pub activity: String,
}

/// Identifies the document under transition for error and audit text.
#[derive(Clone, Copy, Debug)]
pub struct DocumentRef<'a> {
    pub kind: DocumentKind,
    pub document_no: &'a str,
}

impl<'a> DocumentRef<'a> {
    pub fn new(kind: DocumentKind, document_no: &'a str) -> Self {
        Self { kind, document_no }
    }

    fn no(&self) -> String {
        self.document_no.to_string()
    }
}

/// Draft -> Posted. Per-type posting preconditions (a required supporting
/// date, a service period) are the caller's to check before invoking this.
pub fn post(
    state: &DocumentState,
    doc: DocumentRef<'_>,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    match state {
        DocumentState::Draft => Ok(Transition {
            state: DocumentState::Posted {
                posted_by: actor.display_name.clone(),
                posted_at: now,
            },
            activity: format!("Posted {}# {}", doc.kind.tag(), doc.document_no),
        }),
        DocumentState::Posted { .. } => Err(TransitionError::AlreadyPosted {
            kind: doc.kind,
            document_no: doc.no(),
        }),
        DocumentState::Voided { .. } | DocumentState::Canceled { .. } => {
            Err(TransitionError::NotPostable {
                kind: doc.kind,
                document_no: doc.no(),
                status: state.status(),
            })
        }
    }
}

/// Draft | Posted -> Voided, gated on the downstream reference guard. The
/// caller evaluates the guard query inside its transaction and passes the
/// result in; `Some(description)` refuses the void with no state change.
pub fn void(
    state: &DocumentState,
    doc: DocumentRef<'_>,
    actor: &Actor,
    now: DateTime<Utc>,
    active_dependents: Option<String>,
) -> Result<Transition, TransitionError> {
    if let Some(dependents) = active_dependents {
        return Err(TransitionError::DownstreamInUse {
            kind: doc.kind,
            document_no: doc.no(),
            dependents,
        });
    }
    match state {
        DocumentState::Draft | DocumentState::Posted { .. } => Ok(Transition {
            state: DocumentState::Voided {
                voided_by: actor.display_name.clone(),
                voided_at: now,
            },
            activity: format!("Voided {}# {}", doc.kind.tag(), doc.document_no),
        }),
        DocumentState::Voided { .. } => Err(TransitionError::AlreadyVoided {
            kind: doc.kind,
            document_no: doc.no(),
        }),
        DocumentState::Canceled { .. } => Err(TransitionError::AlreadyCanceled {
            kind: doc.kind,
            document_no: doc.no(),
        }),
    }
}

/// Draft -> Canceled. A blank remark counts as missing when the document
/// kind mandates one.
pub fn cancel(
    state: &DocumentState,
    doc: DocumentRef<'_>,
    actor: &Actor,
    now: DateTime<Utc>,
    remark: Option<String>,
) -> Result<Transition, TransitionError> {
    let remark = remark.filter(|r| !r.trim().is_empty());
    if doc.kind.cancellation_remark_required() && remark.is_none() {
        return Err(TransitionError::RemarkRequired {
            kind: doc.kind,
            document_no: doc.no(),
        });
    }
    match state {
        DocumentState::Draft => Ok(Transition {
            state: DocumentState::Canceled {
                canceled_by: actor.display_name.clone(),
                canceled_at: now,
                remark,
            },
            activity: format!("Canceled {}# {}", doc.kind.tag(), doc.document_no),
        }),
        DocumentState::Canceled { .. } => Err(TransitionError::AlreadyCanceled {
            kind: doc.kind,
            document_no: doc.no(),
        }),
        DocumentState::Posted { .. } | DocumentState::Voided { .. } => {
            Err(TransitionError::NotCancelable {
                kind: doc.kind,
                document_no: doc.no(),
                status: state.status(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::DocumentStatus;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn actor() -> Actor {
        Actor {
            display_name: "jdoe".into(),
            station_code: "S07".into(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap()
    }

    fn doc() -> DocumentRef<'static> {
        DocumentRef::new(DocumentKind::PurchaseOrder, "PO0000000007")
    }

    #[test]
    fn post_from_draft_sets_witness_and_activity() {
        let t = post(&DocumentState::Draft, doc(), &actor(), now()).unwrap();
        assert_eq!(t.activity, "Posted PO# PO0000000007");
        assert_matches!(
            t.state,
            DocumentState::Posted { ref posted_by, posted_at }
                if posted_by == "jdoe" && posted_at == now()
        );
    }

    #[test]
    fn double_post_is_rejected() {
        let posted = post(&DocumentState::Draft, doc(), &actor(), now())
            .unwrap()
            .state;
        assert_matches!(
            post(&posted, doc(), &actor(), now()),
            Err(TransitionError::AlreadyPosted { .. })
        );
    }

    #[test]
    fn void_clears_posted_witness() {
        let posted = post(&DocumentState::Draft, doc(), &actor(), now())
            .unwrap()
            .state;
        let t = void(&posted, doc(), &actor(), now(), None).unwrap();
        let columns = t.state.to_columns();
        assert_eq!(columns.status, DocumentStatus::Voided);
        assert_eq!(columns.posted_by, None);
        assert_eq!(columns.voided_by.as_deref(), Some("jdoe"));
    }

    #[test]
    fn void_refused_while_downstream_active() {
        let posted = post(&DocumentState::Draft, doc(), &actor(), now())
            .unwrap()
            .state;
        let err = void(
            &posted,
            doc(),
            &actor(),
            now(),
            Some("2 receiving reports are still active".into()),
        )
        .unwrap_err();
        assert_matches!(err, TransitionError::DownstreamInUse { .. });
    }

    #[test]
    fn void_allowed_from_draft_but_only_once() {
        let voided = void(&DocumentState::Draft, doc(), &actor(), now(), None)
            .unwrap()
            .state;
        assert_matches!(
            void(&voided, doc(), &actor(), now(), None),
            Err(TransitionError::AlreadyVoided { .. })
        );
    }

    #[test]
    fn cancel_requires_remark_for_purchase_orders() {
        assert_matches!(
            cancel(&DocumentState::Draft, doc(), &actor(), now(), None),
            Err(TransitionError::RemarkRequired { .. })
        );
        assert_matches!(
            cancel(
                &DocumentState::Draft,
                doc(),
                &actor(),
                now(),
                Some("   ".into())
            ),
            Err(TransitionError::RemarkRequired { .. })
        );
        let t = cancel(
            &DocumentState::Draft,
            doc(),
            &actor(),
            now(),
            Some("ordered twice".into()),
        )
        .unwrap();
        assert_matches!(
            t.state,
            DocumentState::Canceled { ref remark, .. } if remark.as_deref() == Some("ordered twice")
        );
    }

    #[test]
    fn cancel_remark_optional_for_service_invoices() {
        let sv = DocumentRef::new(DocumentKind::ServiceInvoice, "SV0000000001");
        let t = cancel(&DocumentState::Draft, sv, &actor(), now(), None).unwrap();
        assert_matches!(t.state, DocumentState::Canceled { remark: None, .. });
    }

    #[test]
    fn cancel_only_from_draft() {
        let posted = post(&DocumentState::Draft, doc(), &actor(), now())
            .unwrap()
            .state;
        assert_matches!(
            cancel(&posted, doc(), &actor(), now(), Some("r".into())),
            Err(TransitionError::NotCancelable { .. })
        );
    }

    #[test]
    fn terminal_states_admit_no_transitions() {
        let voided = DocumentState::Voided {
            voided_by: "jdoe".into(),
            voided_at: now(),
        };
        let canceled = DocumentState::Canceled {
            canceled_by: "jdoe".into(),
            canceled_at: now(),
            remark: Some("r".into()),
        };
        for terminal in [voided, canceled] {
            assert!(post(&terminal, doc(), &actor(), now()).is_err());
            assert!(void(&terminal, doc(), &actor(), now(), None).is_err());
            assert!(cancel(&terminal, doc(), &actor(), now(), Some("r".into())).is_err());
        }
    }
}
