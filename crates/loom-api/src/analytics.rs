//! Handlers for `/analytics` endpoints.
//!
//! Each handler scans the records the caller may see, narrowed by the usual
//! filter parameters, and hands them to the aggregation engine.
//! `?ratingSource=overall|histogram` picks how averages are computed.

use std::sync::Arc;

use axum::extract::{Query, State};
use chrono::Utc;
use loom_core::{
  access::{self, Principal},
  aggregate::{
    Aggregator, DASHBOARD_TOP_PRODUCTS, Dashboard, DetailedAnalytics, MonthlyPoint,
    OverallSummary, ProductStats, RankingOrder, RatingBucket, TREND_WINDOW,
  },
  query::RatingFilter,
  rating::{Rating, StarCounts},
  store::RatingStore,
};
use serde::Serialize;

use crate::{error::ApiError, extract::Caller, params::Params, response::Envelope};

async fn visible_records<S>(
  store: &S,
  principal: &Principal,
  filter: RatingFilter,
) -> Result<Vec<Rating>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let filter = access::effective_filter(principal, filter);
  store.scan(&filter).await.map_err(ApiError::store)
}

/// `GET /analytics/dashboard[?dashboardType=feedback|reviews]`
pub async fn dashboard<S>(
  State(store): State<Arc<S>>,
  Caller(principal): Caller,
  Query(params): Query<Params>,
) -> Result<Envelope<Dashboard>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let kind = params.dashboard_kind()?;
  let records = visible_records(store.as_ref(), &principal, params.filter()?).await?;
  tracing::debug!(user = %principal.username, records = records.len(), ?kind, "dashboard");

  let dashboard = Aggregator::new(params.rating_source()?).dashboard(&records, kind)?;
  Ok(Envelope::ok(dashboard))
}

/// `GET /analytics/overall`
pub async fn overall<S>(
  State(store): State<Arc<S>>,
  Caller(principal): Caller,
  Query(params): Query<Params>,
) -> Result<Envelope<OverallSummary>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let records = visible_records(store.as_ref(), &principal, params.filter()?).await?;
  let summary = Aggregator::new(params.rating_source()?).overall(&records)?;
  Ok(Envelope::ok(summary))
}

/// `GET /analytics/detailed[?startDate&endDate]`
///
/// Without a date range the last six months are analysed.
pub async fn detailed<S>(
  State(store): State<Arc<S>>,
  Caller(principal): Caller,
  Query(params): Query<Params>,
) -> Result<Envelope<DetailedAnalytics>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let filter = params.recent_filter(Utc::now())?;
  let records = visible_records(store.as_ref(), &principal, filter).await?;
  let detailed = Aggregator::new(params.rating_source()?).detailed(&records)?;
  Ok(Envelope::ok(detailed))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarView {
  pub star_counts:         StarCounts,
  pub rating_distribution: Vec<RatingBucket>,
}

/// `GET /analytics/star-distribution`
pub async fn star_distribution<S>(
  State(store): State<Arc<S>>,
  Caller(principal): Caller,
  Query(params): Query<Params>,
) -> Result<Envelope<StarView>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let records = visible_records(store.as_ref(), &principal, params.filter()?).await?;
  let agg = Aggregator::default();
  Ok(Envelope::ok(StarView {
    star_counts:         agg.star_distribution(&records),
    rating_distribution: agg.rating_distribution(&records)?,
  }))
}

/// `GET /analytics/products[?limit=10][&sortBy=issueCount]`
pub async fn products<S>(
  State(store): State<Arc<S>>,
  Caller(principal): Caller,
  Query(params): Query<Params>,
) -> Result<Envelope<Vec<ProductStats>>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let order = match params.sort_by.as_deref().map(str::trim) {
    Some("issueCount" | "issues") => RankingOrder::FewestIssues,
    _ => RankingOrder::HighestRated,
  };
  let limit = params.limit_or(DASHBOARD_TOP_PRODUCTS)?;

  let records = visible_records(store.as_ref(), &principal, params.filter()?).await?;
  let ranking =
    Aggregator::new(params.rating_source()?).product_ranking(&records, order, Some(limit))?;
  Ok(Envelope::ok(ranking))
}

/// `GET /analytics/monthly[?year=2024]`
pub async fn monthly<S>(
  State(store): State<Arc<S>>,
  Caller(principal): Caller,
  Query(params): Query<Params>,
) -> Result<Envelope<Vec<MonthlyPoint>>, ApiError>
where
  S: RatingStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let records = visible_records(store.as_ref(), &principal, params.filter()?).await?;
  let trend =
    Aggregator::new(params.rating_source()?).monthly_trend(&records, Some(TREND_WINDOW))?;
  Ok(Envelope::ok(trend))
}
