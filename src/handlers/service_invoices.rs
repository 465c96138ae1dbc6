use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::{validate_input, CancelRequest};
use crate::{
    auth::ActorContext,
    errors::ServiceError,
    services::service_invoices::CreateServiceInvoice,
    AppState, ListQuery, ListResponse,
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateServiceInvoiceRequest {
    #[validate(length(min = 1, message = "customer name is required"))]
    pub customer_name: String,
    #[validate(length(min = 1, message = "service description is required"))]
    pub service_description: String,
    pub document_date: NaiveDate,
    /// Month the billed service belongs to; must be set before posting.
    pub period: Option<NaiveDate>,
    pub amount: Decimal,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_service_invoice).get(list_service_invoices))
        .route("/:id", get(get_service_invoice))
        .route("/:id/post", post(post_service_invoice))
        .route("/:id/void", post(void_service_invoice))
        .route("/:id/cancel", post(cancel_service_invoice))
}

/// Create a draft service invoice
#[utoipa::path(
    post,
    path = "/api/v1/service-invoices",
    request_body = CreateServiceInvoiceRequest,
    responses(
        (status = 201, description = "Service invoice created"),
        (status = 400, description = "Invalid request")
    ),
    tag = "service-invoices"
)]
pub async fn create_service_invoice(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Json(payload): Json<CreateServiceInvoiceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let invoice = state
        .services
        .service_invoices
        .create(
            &actor,
            CreateServiceInvoice {
                customer_name: payload.customer_name,
                service_description: payload.service_description,
                document_date: payload.document_date,
                period: payload.period,
                amount: payload.amount,
                remarks: payload.remarks,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Fetch one service invoice
#[utoipa::path(
    get,
    path = "/api/v1/service-invoices/{id}",
    responses(
        (status = 200, description = "Service invoice"),
        (status = 404, description = "Not found")
    ),
    tag = "service-invoices"
)]
pub async fn get_service_invoice(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.service_invoices.get(&actor, id).await?;
    Ok(Json(invoice))
}

/// List service invoices for the actor's station
#[utoipa::path(
    get,
    path = "/api/v1/service-invoices",
    responses((status = 200, description = "Paginated service invoices")),
    tag = "service-invoices"
)]
pub async fn list_service_invoices(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .service_invoices
        .list(&actor, query.page, query.limit)
        .await?;
    Ok(Json(ListResponse::new(items, total, &query)))
}

/// Post a draft service invoice, splitting unearned vs. current revenue
#[utoipa::path(
    post,
    path = "/api/v1/service-invoices/{id}/post",
    responses(
        (status = 200, description = "Service invoice posted"),
        (status = 400, description = "Transition refused or service period missing")
    ),
    tag = "service-invoices"
)]
pub async fn post_service_invoice(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.service_invoices.post(&actor, id).await?;
    Ok(Json(invoice))
}

/// Void a service invoice, reversing the revenue split
#[utoipa::path(
    post,
    path = "/api/v1/service-invoices/{id}/void",
    responses(
        (status = 200, description = "Service invoice voided"),
        (status = 400, description = "Transition refused")
    ),
    tag = "service-invoices"
)]
pub async fn void_service_invoice(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.service_invoices.void(&actor, id).await?;
    Ok(Json(invoice))
}

/// Cancel a draft service invoice
#[utoipa::path(
    post,
    path = "/api/v1/service-invoices/{id}/cancel",
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Service invoice canceled"),
        (status = 400, description = "Transition refused")
    ),
    tag = "service-invoices"
)]
pub async fn cancel_service_invoice(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let invoice = state
        .services
        .service_invoices
        .cancel(&actor, id, payload.remark)
        .await?;
    Ok(Json(invoice))
}
