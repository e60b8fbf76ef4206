//! Request extractors that reject with [`ApiError`] rather than plain text.

use axum::{
  Json,
  extract::{FromRequest, FromRequestParts, Path, Request},
  http::request::Parts,
};
use loom_core::access::Principal;
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;

/// The authenticated caller.
///
/// Authentication middleware must insert a [`Principal`] into the request
/// extensions; without one the request is rejected with 401.
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Principal>()
      .cloned()
      .map(Caller)
      .ok_or_else(|| ApiError::Unauthenticated("Access token required".into()))
  }
}

/// An arbitrary JSON body, left untyped for the validation layer.
#[derive(Debug)]
pub struct JsonBody(pub Value);

impl<S: Send + Sync> FromRequest<S> for JsonBody {
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    Json::<Value>::from_request(req, state)
      .await
      .map(|Json(value)| JsonBody(value))
      .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
  }
}

/// The `{id}` path segment of a single-record route.
///
/// An id that is not a UUID cannot name a stored record, so it is a JSON 404
/// like any other unknown id.
#[derive(Debug, Clone, Copy)]
pub struct RatingId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for RatingId {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let Path(raw) = Path::<String>::from_request_parts(parts, state)
      .await
      .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    Uuid::parse_str(raw.trim())
      .map(RatingId)
      .map_err(|_| ApiError::NotFound("Rating not found".into()))
  }
}
