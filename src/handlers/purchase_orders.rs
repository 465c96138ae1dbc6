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
    services::purchase_orders::CreatePurchaseOrder,
    AppState, ListQuery, ListResponse,
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: Uuid,
    #[validate(length(min = 1, message = "product code is required"))]
    pub product_code: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub order_date: NaiveDate,
    /// One of COD, 7D, 15D, 30D, 45D, 60D; defaults to the supplier's terms.
    pub terms: Option<String>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order).get(list_purchase_orders))
        .route("/:id", get(get_purchase_order))
        .route("/:id/post", post(post_purchase_order))
        .route("/:id/void", post(void_purchase_order))
        .route("/:id/cancel", post(cancel_purchase_order))
}

/// Create a draft purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created"),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Document number conflict")
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let terms = payload
        .terms
        .as_deref()
        .map(|t| {
            t.parse().map_err(|_| {
                ServiceError::InvalidInput(format!("unknown payment terms {:?}", t))
            })
        })
        .transpose()?;

    let order = state
        .services
        .purchase_orders
        .create(
            &actor,
            CreatePurchaseOrder {
                supplier_id: payload.supplier_id,
                product_code: payload.product_code,
                quantity: payload.quantity,
                unit_price: payload.unit_price,
                order_date: payload.order_date,
                terms,
                remarks: payload.remarks,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Fetch one purchase order
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    responses(
        (status = 200, description = "Purchase order"),
        (status = 404, description = "Not found")
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.purchase_orders.get(&actor, id).await?;
    Ok(Json(order))
}

/// List purchase orders for the actor's station
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    responses((status = 200, description = "Paginated purchase orders")),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .purchase_orders
        .list(&actor, query.page, query.limit)
        .await?;
    Ok(Json(ListResponse::new(items, total, &query)))
}

/// Post a draft purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/post",
    responses(
        (status = 200, description = "Purchase order posted"),
        (status = 400, description = "Transition refused")
    ),
    tag = "purchase-orders"
)]
pub async fn post_purchase_order(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.purchase_orders.post(&actor, id).await?;
    Ok(Json(order))
}

/// Void a purchase order; refused while receiving reports reference it
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/void",
    responses(
        (status = 200, description = "Purchase order voided"),
        (status = 409, description = "Active downstream documents exist")
    ),
    tag = "purchase-orders"
)]
pub async fn void_purchase_order(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.purchase_orders.void(&actor, id).await?;
    Ok(Json(order))
}

/// Cancel a draft purchase order; a remark is mandatory
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/cancel",
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Purchase order canceled"),
        (status = 400, description = "Transition refused or remark missing")
    ),
    tag = "purchase-orders"
)]
pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let order = state
        .services
        .purchase_orders
        .cancel(&actor, id, payload.remark)
        .await?;
    Ok(Json(order))
}
