use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServiceError;

/// Body of every `/:id/cancel` route. Whether the remark is mandatory
/// depends on the document type; services enforce it.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CancelRequest {
    #[validate(length(max = 500))]
    pub remark: Option<String>,
}

/// Runs derive-based validation on a request payload, mapping failures onto
/// the field-level validation error taxonomy.
pub fn validate_input<T: Validate>(payload: &T) -> Result<(), ServiceError> {
    payload.validate().map_err(ServiceError::from)
}
