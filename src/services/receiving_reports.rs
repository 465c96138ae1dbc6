use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    entities::{purchase_order, receiving_report},
    errors::ServiceError,
    events::{Event, EventSender},
    lifecycle::{
        sequence, transition, Actor, DocumentKind, DocumentState, DocumentStatus, LifecycleColumns,
    },
    services::NUMBER_ALLOCATION_ATTEMPTS,
};

lazy_static! {
    static ref RR_CREATIONS: IntCounter = IntCounter::new(
        "receiving_report_creations_total",
        "Total number of receiving reports created"
    )
    .expect("metric can be created");
    static ref RR_TRANSITION_FAILURES: IntCounter = IntCounter::new(
        "receiving_report_transition_failures_total",
        "Total number of refused receiving report transitions"
    )
    .expect("metric can be created");
}

const KIND: DocumentKind = DocumentKind::ReceivingReport;

/// Input for recording a delivery against a posted purchase order.
#[derive(Clone, Debug)]
pub struct CreateReceivingReport {
    pub purchase_order_id: Uuid,
    pub report_date: NaiveDate,
    pub quantity_delivered: Decimal,
    pub quantity_received: Decimal,
    pub supplier_invoice_no: Option<String>,
    pub supplier_invoice_date: Option<NaiveDate>,
    pub remarks: Option<String>,
}

#[derive(Clone)]
pub struct ReceivingReportService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl ReceivingReportService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates a draft report. The received quantity must fit inside the
    /// parent order's remaining balance; the same check runs again at
    /// posting, when the counter actually moves.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateReceivingReport,
    ) -> Result<receiving_report::Model, ServiceError> {
        if input.quantity_delivered <= Decimal::ZERO || input.quantity_received <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "delivered and received quantities must be greater than zero".into(),
            ));
        }

        let order = purchase_order::Entity::find_by_id(input.purchase_order_id)
            .filter(purchase_order::Column::StationCode.eq(actor.station_code.clone()))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "purchase order {} not found",
                    input.purchase_order_id
                ))
            })?;
        let order_state = po_state_of(&order)?;
        if !order_state.is_posted() {
            return Err(ServiceError::InvalidOperation(format!(
                "purchase order {} is {} and cannot receive deliveries",
                order.po_number,
                order_state.status()
            )));
        }
        check_remaining(&order, input.quantity_received)?;
        let amount = input
            .quantity_received
            .checked_mul(order.unit_price)
            .ok_or_else(|| {
                ServiceError::InvalidInput(
                    "received quantity times unit price exceeds the representable amount".into(),
                )
            })?;

        for attempt in 0..NUMBER_ALLOCATION_ATTEMPTS {
            match self.try_create(actor, &input, &order, amount).await {
                Err(ServiceError::DatabaseError(e))
                    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                {
                    warn!(attempt, "receiving report number collision, retrying");
                }
                Ok(model) => {
                    RR_CREATIONS.inc();
                    info!(rr_number = %model.rr_number, po_number = %order.po_number, "receiving report created");
                    self.emit(Event::ReceivingReportCreated(model.id)).await;
                    return Ok(model);
                }
                Err(other) => return Err(other),
            }
        }
        Err(ServiceError::Conflict(
            "could not allocate a unique receiving report number, please retry".into(),
        ))
    }

    async fn try_create(
        &self,
        actor: &Actor,
        input: &CreateReceivingReport,
        order: &purchase_order::Model,
        amount: Decimal,
    ) -> Result<receiving_report::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let last = receiving_report::Entity::find()
            .filter(receiving_report::Column::StationCode.eq(actor.station_code.clone()))
            .order_by_desc(receiving_report::Column::RrNumber)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|rr| rr.rr_number);
        let rr_number = sequence::next_number(KIND, last.as_deref())?;

        let now = Utc::now();
        let model = receiving_report::ActiveModel {
            id: Set(Uuid::new_v4()),
            rr_number: Set(rr_number.clone()),
            station_code: Set(actor.station_code.clone()),
            purchase_order_id: Set(order.id),
            report_date: Set(input.report_date),
            supplier_invoice_no: Set(input.supplier_invoice_no.clone()),
            supplier_invoice_date: Set(input.supplier_invoice_date),
            quantity_delivered: Set(input.quantity_delivered),
            quantity_received: Set(input.quantity_received),
            canceled_quantity: Set(Decimal::ZERO),
            amount: Set(amount),
            due_date: Set(None),
            remarks: Set(input.remarks.clone()),
            status: Set(DocumentStatus::Draft),
            created_by: Set(actor.display_name.clone()),
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
        let saved = model.insert(&txn).await.map_err(ServiceError::db_error)?;

        audit::record(
            &txn,
            actor,
            &KIND.to_string(),
            &format!("Created {}# {}", KIND.tag(), rr_number),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(saved)
    }

    pub async fn get(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<receiving_report::Model, ServiceError> {
        receiving_report::Entity::find_by_id(id)
            .filter(receiving_report::Column::StationCode.eq(actor.station_code.clone()))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("receiving report {} not found", id)))
    }

    pub async fn list(
        &self,
        actor: &Actor,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<receiving_report::Model>, u64), ServiceError> {
        let paginator = receiving_report::Entity::find()
            .filter(receiving_report::Column::StationCode.eq(actor.station_code.clone()))
            .order_by_desc(receiving_report::Column::RrNumber)
            .paginate(&*self.db, limit.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;
        Ok((rows, total))
    }

    /// Draft -> Posted. Requires the supplier invoice date, advances the
    /// parent order's received counter, and derives the due date from the
    /// order's payment terms plus the report date.
    #[instrument(skip(self))]
    pub async fn post(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<receiving_report::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let model = find_for_update(&txn, actor, id).await?;
        let state = state_of(&model)?;

        if model.supplier_invoice_date.is_none() {
            RR_TRANSITION_FAILURES.inc();
            return Err(ServiceError::ValidationError(format!(
                "{} cannot be posted without a supplier invoice date",
                model.rr_number
            )));
        }

        let order = parent_order(&txn, &model).await?;
        // The balance may have moved since this draft was created.
        check_remaining(&order, model.quantity_received)?;

        let doc = transition::DocumentRef::new(KIND, &model.rr_number);
        let outcome =
            transition::post(&state, doc, actor, Utc::now()).map_err(|e| refused(e))?;

        let due_date = order.terms.due_date(model.report_date);
        let new_received = order.quantity_received + model.quantity_received;
        let mut order_active: purchase_order::ActiveModel = order.into();
        order_active.quantity_received = Set(new_received);
        order_active.updated_at = Set(Utc::now());
        order_active
            .update(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let mut active: receiving_report::ActiveModel = model.into();
        apply_lifecycle(&mut active, outcome.state.to_columns());
        active.due_date = Set(Some(due_date));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        audit::record(&txn, actor, &KIND.to_string(), &outcome.activity).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(rr_number = %updated.rr_number, %due_date, "receiving report posted");
        self.emit(Event::ReceivingReportPosted(updated.id)).await;
        Ok(updated)
    }

    /// Draft | Posted -> Voided. A posted report returns its received
    /// quantity to the parent order before its own quantities are zeroed.
    #[instrument(skip(self))]
    pub async fn void(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<receiving_report::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let model = find_for_update(&txn, actor, id).await?;
        let state = state_of(&model)?;

        let doc = transition::DocumentRef::new(KIND, &model.rr_number);
        let outcome =
            transition::void(&state, doc, actor, Utc::now(), None).map_err(|e| refused(e))?;

        if state.is_posted() {
            let order = parent_order(&txn, &model).await?;
            let mut restored = order.quantity_received - model.quantity_received;
            if restored < Decimal::ZERO {
                // The counter must never go negative; clamp and flag it.
                warn!(
                    po_number = %order.po_number,
                    rr_number = %model.rr_number,
                    "received counter would go negative on void; clamping to zero"
                );
                restored = Decimal::ZERO;
            }
            let mut order_active: purchase_order::ActiveModel = order.into();
            order_active.quantity_received = Set(restored);
            order_active.updated_at = Set(Utc::now());
            order_active
                .update(&txn)
                .await
                .map_err(ServiceError::db_error)?;
        }

        let mut active: receiving_report::ActiveModel = model.into();
        apply_lifecycle(&mut active, outcome.state.to_columns());
        active.quantity_delivered = Set(Decimal::ZERO);
        active.quantity_received = Set(Decimal::ZERO);
        active.due_date = Set(None);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        audit::record(&txn, actor, &KIND.to_string(), &outcome.activity).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(rr_number = %updated.rr_number, "receiving report voided");
        self.emit(Event::ReceivingReportVoided(updated.id)).await;
        Ok(updated)
    }

    /// Draft -> Canceled, remark mandatory. Records min(delivered, received)
    /// as the canceled quantity before zeroing both working fields.
    #[instrument(skip(self, remark))]
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: Uuid,
        remark: Option<String>,
    ) -> Result<receiving_report::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let model = find_for_update(&txn, actor, id).await?;
        let state = state_of(&model)?;

        let doc = transition::DocumentRef::new(KIND, &model.rr_number);
        let outcome = transition::cancel(&state, doc, actor, Utc::now(), remark)
            .map_err(|e| refused(e))?;

        let canceled_quantity = model.quantity_delivered.min(model.quantity_received);
        let mut active: receiving_report::ActiveModel = model.into();
        apply_lifecycle(&mut active, outcome.state.to_columns());
        active.canceled_quantity = Set(canceled_quantity);
        active.quantity_delivered = Set(Decimal::ZERO);
        active.quantity_received = Set(Decimal::ZERO);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        audit::record(&txn, actor, &KIND.to_string(), &outcome.activity).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(rr_number = %updated.rr_number, "receiving report canceled");
        self.emit(Event::ReceivingReportCanceled(updated.id)).await;
        Ok(updated)
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("failed to emit receiving report event: {}", e);
        }
    }
}

/// Rejects a received quantity that exceeds the order's remaining balance.
fn check_remaining(
    order: &purchase_order::Model,
    quantity_received: Decimal,
) -> Result<(), ServiceError> {
    let remaining = order.quantity - order.quantity_received;
    if quantity_received > remaining {
        return Err(ServiceError::InsufficientQuantity(format!(
            "received quantity {} exceeds the remaining balance {} on {}",
            quantity_received, remaining, order.po_number
        )));
    }
    Ok(())
}

async fn parent_order(
    txn: &DatabaseTransaction,
    report: &receiving_report::Model,
) -> Result<purchase_order::Model, ServiceError> {
    purchase_order::Entity::find_by_id(report.purchase_order_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::InternalError(format!(
                "receiving report {} references missing purchase order {}",
                report.rr_number, report.purchase_order_id
            ))
        })
}

async fn find_for_update(
    txn: &DatabaseTransaction,
    actor: &Actor,
    id: Uuid,
) -> Result<receiving_report::Model, ServiceError> {
    receiving_report::Entity::find_by_id(id)
        .filter(receiving_report::Column::StationCode.eq(actor.station_code.clone()))
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("receiving report {} not found", id)))
}

fn state_of(model: &receiving_report::Model) -> Result<DocumentState, ServiceError> {
    DocumentState::from_columns(LifecycleColumns::from(model)).map_err(Into::into)
}

fn po_state_of(model: &purchase_order::Model) -> Result<DocumentState, ServiceError> {
    DocumentState::from_columns(LifecycleColumns::from(model)).map_err(Into::into)
}

fn apply_lifecycle(active: &mut receiving_report::ActiveModel, columns: LifecycleColumns) {
    active.status = Set(columns.status);
    active.posted_by = Set(columns.posted_by);
    active.posted_at = Set(columns.posted_at);
    active.voided_by = Set(columns.voided_by);
    active.voided_at = Set(columns.voided_at);
    active.canceled_by = Set(columns.canceled_by);
    active.canceled_at = Set(columns.canceled_at);
    active.cancellation_remark = Set(columns.cancellation_remark);
}

fn refused(err: crate::lifecycle::TransitionError) -> ServiceError {
    RR_TRANSITION_FAILURES.inc();
    err.into()
}
