use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    entities::{purchase_order, receiving_report, supplier},
    errors::ServiceError,
    events::{Event, EventSender},
    lifecycle::{
        sequence, transition, Actor, DocumentKind, DocumentState, DocumentStatus, LifecycleColumns,
        PaymentTerms,
    },
    services::NUMBER_ALLOCATION_ATTEMPTS,
};

lazy_static! {
    static ref PO_CREATIONS: IntCounter = IntCounter::new(
        "purchase_order_creations_total",
        "Total number of purchase orders created"
    )
    .expect("metric can be created");
    static ref PO_TRANSITION_FAILURES: IntCounter = IntCounter::new(
        "purchase_order_transition_failures_total",
        "Total number of refused purchase order transitions"
    )
    .expect("metric can be created");
}

const KIND: DocumentKind = DocumentKind::PurchaseOrder;

/// Input for creating a draft purchase order.
#[derive(Clone, Debug)]
pub struct CreatePurchaseOrder {
    pub supplier_id: Uuid,
    pub product_code: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub order_date: NaiveDate,
    /// Defaults to the supplier's terms when omitted.
    pub terms: Option<PaymentTerms>,
    pub remarks: Option<String>,
}

#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Creates a draft order with the next number for the actor's station.
    /// A losing race on the number shows up as a unique-constraint violation
    /// and is retried with a freshly read maximum.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreatePurchaseOrder,
    ) -> Result<purchase_order::Model, ServiceError> {
        if input.quantity <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "quantity must be greater than zero".into(),
            ));
        }
        if input.unit_price < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "unit price must not be negative".into(),
            ));
        }
        let amount = input
            .quantity
            .checked_mul(input.unit_price)
            .ok_or_else(|| {
                ServiceError::InvalidInput(
                    "quantity times unit price exceeds the representable amount".into(),
                )
            })?;

        let supplier = supplier::Entity::find_by_id(input.supplier_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("supplier {} does not exist", input.supplier_id))
            })?;
        let terms = input.terms.unwrap_or(supplier.default_terms);

        for attempt in 0..NUMBER_ALLOCATION_ATTEMPTS {
            match self.try_create(actor, &input, terms, amount).await {
                Err(ServiceError::DatabaseError(e))
                    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                {
                    warn!(attempt, "purchase order number collision, retrying");
                }
                Ok(model) => {
                    PO_CREATIONS.inc();
                    info!(po_number = %model.po_number, station = %actor.station_code, "purchase order created");
                    self.emit(Event::PurchaseOrderCreated(model.id)).await;
                    return Ok(model);
                }
                Err(other) => return Err(other),
            }
        }
        Err(ServiceError::Conflict(
            "could not allocate a unique purchase order number, please retry".into(),
        ))
    }

    async fn try_create(
        &self,
        actor: &Actor,
        input: &CreatePurchaseOrder,
        terms: PaymentTerms,
        amount: Decimal,
    ) -> Result<purchase_order::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let last = purchase_order::Entity::find()
            .filter(purchase_order::Column::StationCode.eq(actor.station_code.clone()))
            .order_by_desc(purchase_order::Column::PoNumber)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|po| po.po_number);
        let po_number = sequence::next_number(KIND, last.as_deref())?;

        let now = Utc::now();
        let model = purchase_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            po_number: Set(po_number.clone()),
            station_code: Set(actor.station_code.clone()),
            supplier_id: Set(input.supplier_id),
            product_code: Set(input.product_code.clone()),
            quantity: Set(input.quantity),
            unit_price: Set(input.unit_price),
            amount: Set(amount),
            terms: Set(terms),
            order_date: Set(input.order_date),
            quantity_received: Set(Decimal::ZERO),
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
            &format!("Created {}# {}", KIND.tag(), po_number),
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(saved)
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<purchase_order::Model, ServiceError> {
        purchase_order::Entity::find_by_id(id)
            .filter(purchase_order::Column::StationCode.eq(actor.station_code.clone()))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("purchase order {} not found", id)))
    }

    pub async fn list(
        &self,
        actor: &Actor,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<purchase_order::Model>, u64), ServiceError> {
        let paginator = purchase_order::Entity::find()
            .filter(purchase_order::Column::StationCode.eq(actor.station_code.clone()))
            .order_by_desc(purchase_order::Column::PoNumber)
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

    /// Draft -> Posted.
    #[instrument(skip(self))]
    pub async fn post(&self, actor: &Actor, id: Uuid) -> Result<purchase_order::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let model = find_for_update(&txn, actor, id).await?;
        let state = state_of(&model)?;

        let doc = transition::DocumentRef::new(KIND, &model.po_number);
        let outcome =
            transition::post(&state, doc, actor, Utc::now()).map_err(|e| refused(e))?;

        let mut active: purchase_order::ActiveModel = model.into();
        apply_lifecycle(&mut active, outcome.state.to_columns());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        audit::record(&txn, actor, &KIND.to_string(), &outcome.activity).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(po_number = %updated.po_number, "purchase order posted");
        self.emit(Event::PurchaseOrderPosted(updated.id)).await;
        Ok(updated)
    }

    /// Draft | Posted -> Voided, refused while any non-voided receiving
    /// report still references the order.
    #[instrument(skip(self))]
    pub async fn void(&self, actor: &Actor, id: Uuid) -> Result<purchase_order::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let model = find_for_update(&txn, actor, id).await?;
        let state = state_of(&model)?;

        let active_reports = receiving_report::Entity::find()
            .filter(receiving_report::Column::PurchaseOrderId.eq(id))
            .filter(receiving_report::Column::Status.ne(DocumentStatus::Voided))
            .count(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        let dependents = (active_reports > 0).then(|| {
            format!(
                "{} receiving report(s) still reference it; void those first",
                active_reports
            )
        });

        let doc = transition::DocumentRef::new(KIND, &model.po_number);
        let outcome = transition::void(&state, doc, actor, Utc::now(), dependents)
            .map_err(|e| refused(e))?;

        let mut active: purchase_order::ActiveModel = model.into();
        apply_lifecycle(&mut active, outcome.state.to_columns());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        audit::record(&txn, actor, &KIND.to_string(), &outcome.activity).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(po_number = %updated.po_number, "purchase order voided");
        self.emit(Event::PurchaseOrderVoided(updated.id)).await;
        Ok(updated)
    }

    /// Draft -> Canceled, remark mandatory.
    #[instrument(skip(self, remark))]
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: Uuid,
        remark: Option<String>,
    ) -> Result<purchase_order::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let model = find_for_update(&txn, actor, id).await?;
        let state = state_of(&model)?;

        let doc = transition::DocumentRef::new(KIND, &model.po_number);
        let outcome = transition::cancel(&state, doc, actor, Utc::now(), remark)
            .map_err(|e| refused(e))?;

        let mut active: purchase_order::ActiveModel = model.into();
        apply_lifecycle(&mut active, outcome.state.to_columns());
        // Canceled drafts drop out of every rollup.
        active.quantity_received = Set(Decimal::ZERO);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        audit::record(&txn, actor, &KIND.to_string(), &outcome.activity).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(po_number = %updated.po_number, "purchase order canceled");
        self.emit(Event::PurchaseOrderCanceled(updated.id)).await;
        Ok(updated)
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("failed to emit purchase order event: {}", e);
        }
    }
}

async fn find_for_update(
    txn: &sea_orm::DatabaseTransaction,
    actor: &Actor,
    id: Uuid,
) -> Result<purchase_order::Model, ServiceError> {
    purchase_order::Entity::find_by_id(id)
        .filter(purchase_order::Column::StationCode.eq(actor.station_code.clone()))
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("purchase order {} not found", id)))
}

fn state_of(model: &purchase_order::Model) -> Result<DocumentState, ServiceError> {
    DocumentState::from_columns(LifecycleColumns::from(model)).map_err(Into::into)
}

fn apply_lifecycle(active: &mut purchase_order::ActiveModel, columns: LifecycleColumns) {
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
    PO_TRANSITION_FAILURES.inc();
    err.into()
}
