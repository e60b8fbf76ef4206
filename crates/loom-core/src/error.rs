//! Error types for `loom-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::validate::ValidationError;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("rating not found: {0}")]
  RatingNotFound(Uuid),

  #[error("access denied: {0}")]
  Forbidden(String),

  /// A stored record violates a record invariant. Validation should make
  /// this unreachable; aggregation refuses to average over it.
  #[error("malformed rating {id}: {reason}")]
  MalformedRecord { id: Uuid, reason: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
