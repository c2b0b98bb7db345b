//! Request extractors that reject with [`ApiError`] instead of axum's
//! plain-text rejections.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path},
    http::request::Parts,
};
use crm_core::EntityId;

use crate::error::ApiError;

/// JSON body extractor; malformed bodies become `VALIDATION_FAILED` or
/// `INVALID_INPUT` error responses.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ValidJson<T>(pub T);

/// Numeric record id from the `{id}` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathId(pub EntityId);

#[async_trait]
impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<EntityId>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::invalid_input(format!("Invalid record id: {}", rejection.body_text()))
            })?;
        Ok(PathId(id))
    }
}
