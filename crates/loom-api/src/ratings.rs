//! Handlers for `/ratings` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/ratings` | Feedback form; 201 + stored record |
//! | `POST`   | `/ratings/reviews` | Star-only review; detail fields discarded |
//! | `GET`    | `/ratings` | Filtered, sorted, paginated listing |
//! | `GET`    | `/ratings/filters` | Distinct values for the filter drop-downs |
//! | `GET`    | `/ratings/stats/by-form-type` | Count, average and reviews per form type |
//! | `GET`    | `/ratings/{id}` | 404 if absent, 403 if another segment's |
//! | `PUT`    | `/ratings/{id}` | Partial update |
//! | `DELETE` | `/ratings/{id}` | Hard delete |
//!
//! Every handler narrows what it reads through the access policy.

use std::sync::Arc;

use axum::extract::{Query, State};
use loom_core::{
  access,
  aggregate::{Aggregator, FormTypeStats},
  query::{FilterOptions, Pagination, RatingFilter},
  rating::Rating,
  store::RatingStore,
  validate::{self, SubmissionKind},
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{Caller, JsonBody, RatingId},
  params::Params,
  response::Envelope,
};

// ─── Create ──────────────────────────────────────────────────────────────────

async fn submit<S>(
  store: &S,
  Caller(principal): Caller,
  body: Value,
  kind: SubmissionKind,
) -> Result<Rating, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let input = validate::submission(&body, kind)?;
  access::authorize_submission(&principal, input.customer_segment)?;

  let rating = store.insert(input).await.map_err(ApiError::store)?;
  tracing::info!(
    id = %rating.id,
    user = %principal.username,
    form_type = rating.form_type.as_str(),
    "rating submitted"
  );
  Ok(rating)
}

/// `POST /ratings`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  caller: Caller,
  JsonBody(body): JsonBody,
) -> Result<Envelope<Rating>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rating = submit(store.as_ref(), caller, body, SubmissionKind::Feedback).await?;
  Ok(Envelope::created(rating).message("Feedback submitted successfully"))
}

/// `POST /ratings/reviews`
pub async fn create_review<S>(
  State(store): State<Arc<S>>,
  caller: Caller,
  JsonBody(body): JsonBody,
) -> Result<Envelope<Rating>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rating = submit(store.as_ref(), caller, body, SubmissionKind::Review).await?;
  Ok(Envelope::created(rating).message("Review submitted successfully"))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /ratings[?page&limit&year&month&product&minRating&maxRating&customer&formType&sortBy&sortOrder]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Caller(principal): Caller,
  Query(params): Query<Params>,
) -> Result<Envelope<Vec<Rating>>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let filter = access::effective_filter(&principal, params.filter()?);
  let query = params.query(filter)?;

  let page = store.list(&query).await.map_err(ApiError::store)?;
  let pagination = Pagination::new(&query, page.total);
  Ok(Envelope::ok(page.ratings).paginated(pagination))
}

/// `GET /ratings/filters`
pub async fn filter_options<S>(
  State(store): State<Arc<S>>,
  Caller(principal): Caller,
) -> Result<Envelope<FilterOptions>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let filter = access::effective_filter(&principal, RatingFilter::default());
  let records = store.scan(&filter).await.map_err(ApiError::store)?;
  Ok(Envelope::ok(FilterOptions::from_records(&records)))
}

/// `GET /ratings/stats/by-form-type`
pub async fn form_type_stats<S>(
  State(store): State<Arc<S>>,
  Caller(principal): Caller,
  Query(params): Query<Params>,
) -> Result<Envelope<Vec<FormTypeStats>>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let filter = access::effective_filter(&principal, params.filter()?);
  let records = store.scan(&filter).await.map_err(ApiError::store)?;
  let stats = Aggregator::new(params.rating_source()?).form_type_stats(&records)?;
  Ok(Envelope::ok(stats))
}

// ─── Single record ───────────────────────────────────────────────────────────

/// Fetch a record the caller is allowed to see.
async fn visible<S>(
  store: &S,
  principal: &access::Principal,
  id: Uuid,
) -> Result<Rating, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rating = store
    .get(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Rating not found".into()))?;
  access::authorize_record(principal, &rating)?;
  Ok(rating)
}

/// `GET /ratings/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Caller(principal): Caller,
  RatingId(id): RatingId,
) -> Result<Envelope<Rating>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rating = visible(store.as_ref(), &principal, id).await?;
  Ok(Envelope::ok(rating))
}

/// `PUT /ratings/{id}`
///
/// A restricted caller may not move a record into another segment.
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Caller(principal): Caller,
  RatingId(id): RatingId,
  JsonBody(body): JsonBody,
) -> Result<Envelope<Rating>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  visible(store.as_ref(), &principal, id).await?;

  let patch = validate::patch(&body)?;
  if let Some(segment) = patch.customer_segment {
    access::authorize_submission(&principal, segment)?;
  }

  let rating = store
    .update(id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Rating not found".into()))?;
  tracing::info!(%id, user = %principal.username, "rating updated");
  Ok(Envelope::ok(rating).message("Rating updated successfully"))
}

/// `DELETE /ratings/{id}`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Caller(principal): Caller,
  RatingId(id): RatingId,
) -> Result<Envelope<Value>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  visible(store.as_ref(), &principal, id).await?;

  if !store.delete(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound("Rating not found".into()));
  }
  tracing::info!(%id, user = %principal.username, "rating deleted");
  Ok(Envelope::ok(json!({ "id": id })).message("Rating deleted successfully"))
}
