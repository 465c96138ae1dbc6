//! Audit-trail writer.
//!
//! One row per lifecycle transition, inserted on the same transaction as the
//! header update so the two commit or roll back together.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use uuid::Uuid;

use crate::{entities::audit_trail, errors::ServiceError, lifecycle::Actor};

/// Appends an audit entry describing `activity` performed by `actor`.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    actor: &Actor,
    category: &str,
    activity: &str,
) -> Result<(), ServiceError> {
    let entry = audit_trail::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(actor.display_name.clone()),
        activity: Set(activity.to_string()),
        category: Set(category.to_string()),
        station_code: Set(actor.station_code.clone()),
        created_at: Set(Utc::now()),
    };
    entry.insert(conn).await.map_err(ServiceError::db_error)?;
    Ok(())
}
