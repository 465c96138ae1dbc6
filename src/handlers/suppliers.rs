use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::validate_input;
use crate::{
    auth::ActorContext,
    errors::ServiceError,
    services::suppliers::CreateSupplier,
    AppState, ListQuery, ListResponse,
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, message = "supplier name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "TIN is required"))]
    pub tin: String,
    /// One of COD, 7D, 15D, 30D, 45D, 60D.
    pub default_terms: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_supplier).get(list_suppliers))
        .route("/:id", get(get_supplier))
}

/// Register a supplier
#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    request_body = CreateSupplierRequest,
    responses(
        (status = 201, description = "Supplier created"),
        (status = 409, description = "Supplier name already exists")
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    ActorContext(actor): ActorContext,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let default_terms = payload.default_terms.parse().map_err(|_| {
        ServiceError::InvalidInput(format!("unknown payment terms {:?}", payload.default_terms))
    })?;
    let supplier = state
        .services
        .suppliers
        .create(
            &actor,
            CreateSupplier {
                name: payload.name,
                address: payload.address,
                tin: payload.tin,
                default_terms,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// Fetch one supplier
#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{id}",
    responses(
        (status = 200, description = "Supplier"),
        (status = 404, description = "Not found")
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    _actor: ActorContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let supplier = state.services.suppliers.get(id).await?;
    Ok(Json(supplier))
}

/// List suppliers
#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    responses((status = 200, description = "Paginated suppliers")),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    _actor: ActorContext,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (items, total) = state
        .services
        .suppliers
        .list(query.page, query.limit)
        .await?;
    Ok(Json(ListResponse::new(items, total, &query)))
}
