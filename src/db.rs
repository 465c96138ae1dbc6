use std::time::Duration;

use sea_orm::sea_query::{Alias, Index, IndexCreateStatement};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
};
use tracing::{debug, info};

use crate::{config::AppConfig, entities, errors::ServiceError};

/// Type alias for a database connection pool.
pub type DbPool = DatabaseConnection;

/// Establishes the connection pool from application configuration.
pub async fn establish_connection(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let mut opt = ConnectOptions::new(cfg.database_url.clone());
    opt.max_connections(cfg.db_max_connections)
        .min_connections(cfg.db_min_connections)
        .connect_timeout(Duration::from_secs(cfg.db_connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(cfg.db_acquire_timeout_secs))
        .sqlx_logging(false);

    info!(
        max_connections = cfg.db_max_connections,
        "connecting to database"
    );
    let pool = Database::connect(opt)
        .await
        .map_err(ServiceError::db_error)?;
    info!("database connection pool established");
    Ok(pool)
}

/// Creates the document tables plus the per-station uniqueness indexes that
/// back document numbering. Idempotent; used by tests and `auto_schema`
/// development runs.
pub async fn init_schema(db: &DbPool) -> Result<(), ServiceError> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    async fn create_table<E: EntityTrait>(
        db: &DbPool,
        schema: &Schema,
        entity: E,
    ) -> Result<(), ServiceError> {
        let backend = db.get_database_backend();
        let mut stmt = schema.create_table_from_entity(entity);
        stmt.if_not_exists();
        debug!(table = %entity.table_name(), "ensuring table");
        db.execute(backend.build(&stmt))
            .await
            .map_err(ServiceError::db_error)?;
        Ok(())
    }

    create_table(db, &schema, entities::supplier::Entity).await?;
    create_table(db, &schema, entities::purchase_order::Entity).await?;
    create_table(db, &schema, entities::receiving_report::Entity).await?;
    create_table(db, &schema, entities::service_invoice::Entity).await?;
    create_table(db, &schema, entities::audit_trail::Entity).await?;

    // Document numbers are unique per station and type. The composite index
    // is what turns a concurrent duplicate into a retryable conflict.
    for stmt in [
        station_number_index("purchase_orders", "po_number"),
        station_number_index("receiving_reports", "rr_number"),
        station_number_index("service_invoices", "sv_number"),
    ] {
        db.execute(backend.build(&stmt))
            .await
            .map_err(ServiceError::db_error)?;
    }

    Ok(())
}

fn station_number_index(table: &str, number_column: &str) -> IndexCreateStatement {
    Index::create()
        .name(format!("uq_{table}_station_{number_column}"))
        .table(Alias::new(table))
        .col(Alias::new("station_code"))
        .col(Alias::new(number_column))
        .unique()
        .if_not_exists()
        .to_owned()
}

/// Liveness check used by the health endpoint.
pub async fn check_connection(db: &DbPool) -> Result<(), ServiceError> {
    db.ping().await.map_err(ServiceError::db_error)
}
