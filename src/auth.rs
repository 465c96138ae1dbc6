//! Actor context extraction.
//!
//! Identity resolution itself happens upstream (gateway or reverse proxy);
//! this service only requires the resolved display name and station-code
//! claim to arrive as headers. The extractor turns them into an explicit
//! [`Actor`] passed into every workflow call, so no service re-fetches
//! ambient claims.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{errors::ServiceError, lifecycle::Actor};

pub const USER_NAME_HEADER: &str = "x-user-name";
pub const STATION_CODE_HEADER: &str = "x-station-code";

/// Axum extractor wrapper around [`Actor`].
#[derive(Clone, Debug)]
pub struct ActorContext(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| -> Result<String, ServiceError> {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ServiceError::Unauthorized(format!("missing {} header", name)))
        };

        Ok(ActorContext(Actor {
            display_name: header(USER_NAME_HEADER)?,
            station_code: header(STATION_CODE_HEADER)?,
        }))
    }
}
