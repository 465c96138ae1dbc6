pub mod common;
pub mod health;
pub mod purchase_orders;
pub mod receiving_reports;
pub mod service_invoices;
pub mod suppliers;

use axum::{extract::Json, routing::get, Router};
use utoipa::OpenApi;

use crate::AppState;

/// Assembles the versioned API surface.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1/purchase-orders", purchase_orders::router())
        .nest("/api/v1/receiving-reports", receiving_reports::router())
        .nest("/api/v1/service-invoices", service_invoices::router())
        .nest("/api/v1/suppliers", suppliers::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(health::router())
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(crate::openapi::ApiDoc::openapi())
}
