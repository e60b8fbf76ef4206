//! JSON REST API for Loom.
//!
//! Exposes an axum [`Router`] backed by any [`loom_core::store::RatingStore`].
//! Authentication, TLS and transport concerns are the caller's
//! responsibility: the caller must install middleware that puts a
//! [`loom_core::access::Principal`] into each request's extensions.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", loom_api::api_router(store.clone()))
//! ```

pub mod analytics;
pub mod error;
pub mod extract;
pub mod params;
pub mod ratings;
pub mod response;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use loom_core::store::RatingStore;

pub use error::ApiError;
pub use response::Envelope;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RatingStore + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Ratings
    .route("/ratings", get(ratings::list::<S>).post(ratings::create::<S>))
    .route("/ratings/reviews", post(ratings::create_review::<S>))
    .route("/ratings/filters", get(ratings::filter_options::<S>))
    .route("/ratings/stats/by-form-type", get(ratings::form_type_stats::<S>))
    .route(
      "/ratings/{id}",
      get(ratings::get_one::<S>)
        .put(ratings::update::<S>)
        .delete(ratings::delete_one::<S>),
    )
    // Analytics
    .route("/analytics/dashboard", get(analytics::dashboard::<S>))
    .route("/analytics/overall", get(analytics::overall::<S>))
    .route("/analytics/detailed", get(analytics::detailed::<S>))
    .route("/analytics/star-distribution", get(analytics::star_distribution::<S>))
    .route("/analytics/products", get(analytics::products::<S>))
    .route("/analytics/monthly", get(analytics::monthly::<S>))
    .with_state(store)
}
