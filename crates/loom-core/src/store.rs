//! The `RatingStore` trait.
//!
//! Implemented by storage backends (e.g. `loom-store-sqlite`). The HTTP layer
//! depends on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  query::{RatingFilter, RatingPage, RatingQuery},
  rating::{NewRating, Rating, RatingPatch},
};

/// Abstraction over a rating store backend.
///
/// Access control is not the store's concern: callers narrow the filter
/// before asking. Writes are last-write-wins.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RatingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a validated submission. The store assigns the id and the
  /// submission timestamp.
  fn insert(
    &self,
    input: NewRating,
  ) -> impl Future<Output = Result<Rating, Self::Error>> + Send + '_;

  /// Retrieve a record by id. Returns `None` if not found.
  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Rating>, Self::Error>> + Send + '_;

  /// One sorted page of the records matching the query's filter.
  fn list<'a>(
    &'a self,
    query: &'a RatingQuery,
  ) -> impl Future<Output = Result<RatingPage, Self::Error>> + Send + 'a;

  /// Every record matching `filter`, oldest first. Feeds the aggregation
  /// engine.
  fn scan<'a>(
    &'a self,
    filter: &'a RatingFilter,
  ) -> impl Future<Output = Result<Vec<Rating>, Self::Error>> + Send + 'a;

  /// Apply a partial update. Returns `None` if the record does not exist.
  fn update(
    &self,
    id: Uuid,
    patch: RatingPatch,
  ) -> impl Future<Output = Result<Option<Rating>, Self::Error>> + Send + '_;

  /// Hard delete. Returns whether a record was removed.
  fn delete(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
