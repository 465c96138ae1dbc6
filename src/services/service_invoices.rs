use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
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
    entities::service_invoice,
    errors::ServiceError,
    events::{Event, EventSender},
    lifecycle::{
        sequence, transition, Actor, DocumentKind, DocumentState, DocumentStatus, LifecycleColumns,
    },
    services::NUMBER_ALLOCATION_ATTEMPTS,
};

lazy_static! {
    static ref SV_CREATIONS: IntCounter = IntCounter::new(
        "service_invoice_creations_total",
        "Total number of service invoices created"
    )
    .expect("metric can be created");
    static ref SV_TRANSITION_FAILURES: IntCounter = IntCounter::new(
        "service_invoice_transition_failures_total",
        "Total number of refused service invoice transitions"
    )
    .expect("metric can be created");
}

const KIND: DocumentKind = DocumentKind::ServiceInvoice;

#[derive(Clone, Debug)]
pub struct CreateServiceInvoice {
    pub customer_name: String,
    pub service_description: String,
    pub document_date: NaiveDate,
    pub period: Option<NaiveDate>,
    pub amount: Decimal,
    pub remarks: Option<String>,
}

#[derive(Clone)]
pub struct ServiceInvoiceService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl ServiceInvoiceService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateServiceInvoice,
    ) -> Result<service_invoice::Model, ServiceError> {
        if input.amount <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "amount must be greater than zero".into(),
            ));
        }
        if input.customer_name.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "customer name must not be blank".into(),
            ));
        }

        for attempt in 0..NUMBER_ALLOCATION_ATTEMPTS {
            match self.try_create(actor, &input).await {
                Err(ServiceError::DatabaseError(e))
                    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                {
                    warn!(attempt, "service invoice number collision, retrying");
                }
                Ok(model) => {
                    SV_CREATIONS.inc();
                    info!(sv_number = %model.sv_number, station = %actor.station_code, "service invoice created");
                    self.emit(Event::ServiceInvoiceCreated(model.id)).await;
                    return Ok(model);
                }
                Err(other) => return Err(other),
            }
        }
        Err(ServiceError::Conflict(
            "could not allocate a unique service invoice number, please retry".into(),
        ))
    }

    async fn try_create(
        &self,
        actor: &Actor,
        input: &CreateServiceInvoice,
    ) -> Result<service_invoice::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let last = service_invoice::Entity::find()
            .filter(service_invoice::Column::StationCode.eq(actor.station_code.clone()))
            .order_by_desc(service_invoice::Column::SvNumber)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|sv| sv.sv_number);
        let sv_number = sequence::next_number(KIND, last.as_deref())?;

        let now = Utc::now();
        let model = service_invoice::ActiveModel {
            id: Set(Uuid::new_v4()),
            sv_number: Set(sv_number.clone()),
            station_code: Set(actor.station_code.clone()),
            customer_name: Set(input.customer_name.clone()),
            service_description: Set(input.service_description.clone()),
            document_date: Set(input.document_date),
            period: Set(input.period),
            amount: Set(input.amount),
            unearned_amount: Set(Decimal::ZERO),
            current_and_previous_amount: Set(Decimal::ZERO),
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
            &format!("Created {}# {}", KIND.tag(), sv_number),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(saved)
    }

    pub async fn get(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<service_invoice::Model, ServiceError> {
        service_invoice::Entity::find_by_id(id)
            .filter(service_invoice::Column::StationCode.eq(actor.station_code.clone()))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("service invoice {} not found", id)))
    }

    pub async fn list(
        &self,
        actor: &Actor,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<service_invoice::Model>, u64), ServiceError> {
        let paginator = service_invoice::Entity::find()
            .filter(service_invoice::Column::StationCode.eq(actor.station_code.clone()))
            .order_by_desc(service_invoice::Column::SvNumber)
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

    /// Draft -> Posted. Requires the service period and splits the billed
    /// amount: a period in a month after the document date is unearned
    /// revenue, anything else is current-and-previous.
    #[instrument(skip(self))]
    pub async fn post(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<service_invoice::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let model = find_for_update(&txn, actor, id).await?;
        let state = state_of(&model)?;

        let period = model.period.ok_or_else(|| {
            SV_TRANSITION_FAILURES.inc();
            ServiceError::ValidationError(format!(
                "{} cannot be posted without a service period",
                model.sv_number
            ))
        })?;

        let doc = transition::DocumentRef::new(KIND, &model.sv_number);
        let outcome =
            transition::post(&state, doc, actor, Utc::now()).map_err(|e| refused(e))?;

        let (unearned, current) = split_amount(model.amount, model.document_date, period);
        let mut active: service_invoice::ActiveModel = model.into();
        apply_lifecycle(&mut active, outcome.state.to_columns());
        active.unearned_amount = Set(unearned);
        active.current_and_previous_amount = Set(current);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        audit::record(&txn, actor, &KIND.to_string(), &outcome.activity).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(sv_number = %updated.sv_number, "service invoice posted");
        self.emit(Event::ServiceInvoicePosted(updated.id)).await;
        Ok(updated)
    }

    /// Draft | Posted -> Voided; the derived amount split is reversed.
    #[instrument(skip(self))]
    pub async fn void(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<service_invoice::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let model = find_for_update(&txn, actor, id).await?;
        let state = state_of(&model)?;

        let doc = transition::DocumentRef::new(KIND, &model.sv_number);
        let outcome =
            transition::void(&state, doc, actor, Utc::now(), None).map_err(|e| refused(e))?;

        let mut active: service_invoice::ActiveModel = model.into();
        apply_lifecycle(&mut active, outcome.state.to_columns());
        active.unearned_amount = Set(Decimal::ZERO);
        active.current_and_previous_amount = Set(Decimal::ZERO);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        audit::record(&txn, actor, &KIND.to_string(), &outcome.activity).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(sv_number = %updated.sv_number, "service invoice voided");
        self.emit(Event::ServiceInvoiceVoided(updated.id)).await;
        Ok(updated)
    }

    /// Draft -> Canceled. Service invoices do not mandate a remark.
    #[instrument(skip(self, remark))]
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: Uuid,
        remark: Option<String>,
    ) -> Result<service_invoice::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let model = find_for_update(&txn, actor, id).await?;
        let state = state_of(&model)?;

        let doc = transition::DocumentRef::new(KIND, &model.sv_number);
        let outcome = transition::cancel(&state, doc, actor, Utc::now(), remark)
            .map_err(|e| refused(e))?;

        let mut active: service_invoice::ActiveModel = model.into();
        apply_lifecycle(&mut active, outcome.state.to_columns());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        audit::record(&txn, actor, &KIND.to_string(), &outcome.activity).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(sv_number = %updated.sv_number, "service invoice canceled");
        self.emit(Event::ServiceInvoiceCanceled(updated.id)).await;
        Ok(updated)
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("failed to emit service invoice event: {}", e);
        }
    }
}

/// Splits the invoice amount into (unearned, current_and_previous).
fn split_amount(amount: Decimal, document_date: NaiveDate, period: NaiveDate) -> (Decimal, Decimal) {
    let billed_ahead =
        (period.year(), period.month()) > (document_date.year(), document_date.month());
    if billed_ahead {
        (amount, Decimal::ZERO)
    } else {
        (Decimal::ZERO, amount)
    }
}

async fn find_for_update(
    txn: &DatabaseTransaction,
    actor: &Actor,
    id: Uuid,
) -> Result<service_invoice::Model, ServiceError> {
    service_invoice::Entity::find_by_id(id)
        .filter(service_invoice::Column::StationCode.eq(actor.station_code.clone()))
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("service invoice {} not found", id)))
}

fn state_of(model: &service_invoice::Model) -> Result<DocumentState, ServiceError> {
    DocumentState::from_columns(LifecycleColumns::from(model)).map_err(Into::into)
}

fn apply_lifecycle(active: &mut service_invoice::ActiveModel, columns: LifecycleColumns) {
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
    SV_TRANSITION_FAILURES.inc();
    err.into()
}
