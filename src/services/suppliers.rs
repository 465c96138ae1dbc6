use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    entities::supplier,
    errors::ServiceError,
    events::{Event, EventSender},
    lifecycle::{Actor, PaymentTerms},
};

/// Supplier master data. Suppliers are shared across stations, so these rows
/// are not station-partitioned; the audit trail still records which station's
/// user maintained them.
#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

#[derive(Clone, Debug)]
pub struct CreateSupplier {
    pub name: String,
    pub address: String,
    pub tin: String,
    pub default_terms: PaymentTerms,
}

impl SupplierService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateSupplier,
    ) -> Result<supplier::Model, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "supplier name must not be blank".into(),
            ));
        }

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let now = Utc::now();
        let model = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            address: Set(input.address),
            tin: Set(input.tin),
            default_terms: Set(input.default_terms),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let saved = match model.insert(&txn).await {
            Ok(saved) => saved,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(ServiceError::Conflict(
                    "a supplier with that name already exists".into(),
                ));
            }
            Err(e) => return Err(ServiceError::db_error(e)),
        };

        audit::record(
            &txn,
            actor,
            "Supplier",
            &format!("Created Supplier {}", saved.name),
        )
        .await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(supplier = %saved.name, "supplier created");
        if let Err(e) = self.event_sender.send(Event::SupplierCreated(saved.id)).await {
            warn!("failed to emit supplier event: {}", e);
        }
        Ok(saved)
    }

    pub async fn get(&self, id: Uuid) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("supplier {} not found", id)))
    }

    pub async fn list(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<supplier::Model>, u64), ServiceError> {
        let paginator = supplier::Entity::find()
            .order_by_asc(supplier::Column::Name)
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
}
