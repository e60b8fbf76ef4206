//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use loom_core::validate::ValidationError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler. Every variant renders as a JSON body
/// with `success: false`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Validation(ValidationError),

  #[error("unauthenticated: {0}")]
  Unauthenticated(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
      Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
      Self::Forbidden(_) => StatusCode::FORBIDDEN,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<loom_core::Error> for ApiError {
  fn from(e: loom_core::Error) -> Self {
    use loom_core::Error as Core;
    match e {
      Core::Validation(v) => Self::Validation(v),
      Core::RatingNotFound(id) => Self::NotFound(format!("rating {id} not found")),
      Core::Forbidden(m) => Self::Forbidden(m),
      e @ (Core::MalformedRecord { .. } | Core::Serialization(_)) => {
        Self::Internal(e.to_string())
      }
    }
  }
}

impl From<ValidationError> for ApiError {
  fn from(e: ValidationError) -> Self { Self::Validation(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let body = match &self {
      Self::Validation(v) => json!({
        "success": false,
        "message": "Validation failed",
        "missingFields": v.missing_fields,
        "invalidFields": v.invalid_fields,
      }),
      Self::Store(_) | Self::Internal(_) => json!({
        "success": false,
        "message": "Internal server error",
        "error": self.to_string(),
      }),
      Self::BadRequest(m)
      | Self::Unauthenticated(m)
      | Self::Forbidden(m)
      | Self::NotFound(m) => json!({ "success": false, "message": m }),
    };
    (status, Json(body)).into_response()
  }
}
