//! The success envelope shared by every endpoint.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use loom_core::query::Pagination;
use serde::Serialize;

/// `{ "success": true, "data": …, "message"?, "pagination"? }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
  success:    bool,
  data:       T,
  #[serde(skip_serializing_if = "Option::is_none")]
  message:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pagination: Option<Pagination>,
  #[serde(skip)]
  status:     StatusCode,
}

impl<T: Serialize> Envelope<T> {
  pub fn ok(data: T) -> Self {
    Self { success: true, data, message: None, pagination: None, status: StatusCode::OK }
  }

  pub fn created(data: T) -> Self { Self { status: StatusCode::CREATED, ..Self::ok(data) } }

  pub fn message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }

  pub fn paginated(mut self, pagination: Pagination) -> Self {
    self.pagination = Some(pagination);
    self
  }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
  fn into_response(self) -> Response { (self.status, Json(&self)).into_response() }
}
