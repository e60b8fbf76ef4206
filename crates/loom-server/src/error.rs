//! Server-level errors: authentication and token handling.
//!
//! Rendered through [`ApiError`] so every failure leaves the server as the
//! same JSON shape the API handlers use.

use axum::response::{IntoResponse, Response};
use loom_api::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid credentials")]
  InvalidCredentials,
  #[error("missing bearer token")]
  MissingToken,
  #[error("invalid token: {0}")]
  InvalidToken(#[source] jsonwebtoken::errors::Error),
  #[error("failed to issue token: {0}")]
  TokenIssue(#[source] jsonwebtoken::errors::Error),
  #[error("bad request: {0}")]
  BadRequest(String),
}

impl From<Error> for ApiError {
  fn from(e: Error) -> Self {
    match e {
      Error::InvalidCredentials => Self::Unauthenticated("Invalid credentials".into()),
      Error::MissingToken => Self::Unauthenticated("Access token required".into()),
      Error::InvalidToken(_) => Self::Unauthenticated("Invalid or expired token".into()),
      Error::TokenIssue(e) => Self::Internal(e.to_string()),
      Error::BadRequest(m) => Self::BadRequest(m),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    if let Error::InvalidToken(e) = &self {
      tracing::debug!(error = %e, "rejected bearer token");
    }
    ApiError::from(self).into_response()
  }
}
