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
    services::receiving_reports::CreateReceivingReport,
    AppState, ListQuery, ListResponse,
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateReceivingReportRequest {
    pub purchase_order_id: Uuid,
    pub report_date: NaiveDate,
    pub quantity_delivered: Decimal,
    pub quantity_received: Decimal,
    #[validate(length(max = 100))]
    pub supplier_invoice_no: Option<String>,
    pub supplier_invoice_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_receiving_report).get(list_receiving_reports))
        .route("/:id", get(get_receiving_report))
        .route("/:id/post", post(post_receiving_report))
        .route("/:id/void", post(void_receiving_report))
        .route("/:id/cancel", post(cancel_receiving_report))
}

/// Record a delivery against a posted purchase order
#[utoipa::path(
    post,
    path = "/api/v1/receiving-reports",
    request_body = CreateReceivingReportRequest,
    responses(
        (status = 201, description = "Receiving report created"),
        (status = 400, description = "Invalid request"),
        (status = 422, description = "Quantity exceeds the order's remaining balance")
    ),
    tag = "receiving-reports"
)]
pub async fn create_receiving_report(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Json(payload): Json<CreateReceivingReportRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let report = state
        .services
        .receiving_reports
        .create(
            &actor,
            CreateReceivingReport {
                purchase_order_id: payload.purchase_order_id,
                report_date: payload.report_date,
                quantity_delivered: payload.quantity_delivered,
                quantity_received: payload.quantity_received,
                supplier_invoice_no: payload.supplier_invoice_no,
                supplier_invoice_date: payload.supplier_invoice_date,
                remarks: payload.remarks,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// Fetch one receiving report
#[utoipa::path(
    get,
    path = "/api/v1/receiving-reports/{id}",
    responses(
        (status = 200, description = "Receiving report"),
        (status = 404, description = "Not found")
    ),
    tag = "receiving-reports"
)]
pub async fn get_receiving_report(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state.services.receiving_reports.get(&actor, id).await?;
    Ok(Json(report))
}

/// List receiving reports for the actor's station
#[utoipa::path(
    get,
    path = "/api/v1/receiving-reports",
    responses((status = 200, description = "Paginated receiving reports")),
    tag = "receiving-reports"
)]
pub async fn list_receiving_reports(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .receiving_reports
        .list(&actor, query.page, query.limit)
        .await?;
    Ok(Json(ListResponse::new(items, total, &query)))
}

/// Post a draft receiving report, advancing the order's received counter
#[utoipa::path(
    post,
    path = "/api/v1/receiving-reports/{id}/post",
    responses(
        (status = 200, description = "Receiving report posted"),
        (status = 400, description = "Transition refused or supplier invoice date missing"),
        (status = 422, description = "Quantity exceeds the order's remaining balance")
    ),
    tag = "receiving-reports"
)]
pub async fn post_receiving_report(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state.services.receiving_reports.post(&actor, id).await?;
    Ok(Json(report))
}

/// Void a receiving report, returning its quantity to the order
#[utoipa::path(
    post,
    path = "/api/v1/receiving-reports/{id}/void",
    responses(
        (status = 200, description = "Receiving report voided"),
        (status = 400, description = "Transition refused")
    ),
    tag = "receiving-reports"
)]
pub async fn void_receiving_report(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state.services.receiving_reports.void(&actor, id).await?;
    Ok(Json(report))
}

/// Cancel a draft receiving report; a remark is mandatory
#[utoipa::path(
    post,
    path = "/api/v1/receiving-reports/{id}/cancel",
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Receiving report canceled"),
        (status = 400, description = "Transition refused or remark missing")
    ),
    tag = "receiving-reports"
)]
pub async fn cancel_receiving_report(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let report = state
        .services
        .receiving_reports
        .cancel(&actor, id, payload.remark)
        .await?;
    Ok(Json(report))
}
