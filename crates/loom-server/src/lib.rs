//! HTTP server assembly for Loom.
//!
//! Mounts the [`loom_api`] router under `/api` behind bearer-token
//! authentication, alongside the public login, logout and health endpoints.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  middleware,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use chrono::{Duration, Utc};
use loom_api::ApiError;
use loom_core::store::RatingStore;
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use auth::{AuthConfig, UserAccount};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `LOOM_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  pub jwt_secret:      String,
  #[serde(default = "default_token_ttl_hours")]
  pub token_ttl_hours: i64,
  #[serde(default = "enabled")]
  pub require_token:   bool,
  #[serde(default = "enabled")]
  pub cors_any_origin: bool,
  #[serde(default)]
  pub users:           Vec<UserAccount>,
}

fn default_token_ttl_hours() -> i64 { 24 }

fn enabled() -> bool { true }

impl ServerConfig {
  pub fn auth(&self) -> AuthConfig {
    AuthConfig::new(
      &self.jwt_secret,
      Duration::hours(self.token_ttl_hours),
      self.require_token,
      self.users.clone(),
    )
  }
}

// ─── Application state ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState<S: RatingStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: RatingStore + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let protected = loom_api::api_router(state.store.clone())
    .route("/auth/validate", get(auth::validate))
    .route_layer(middleware::from_fn_with_state(
      state.auth.clone(),
      auth::require_principal,
    ));

  let public = Router::new()
    .route("/auth/login", post(auth::login))
    .route("/auth/logout", post(auth::logout))
    .route("/health", get(health))
    .with_state(state.auth.clone());

  let app = Router::new()
    .nest("/api", public.merge(protected))
    .fallback(not_found)
    .layer(TraceLayer::new_for_http());

  if state.config.cors_any_origin {
    app.layer(CorsLayer::permissive())
  } else {
    app
  }
}

async fn health() -> Response {
  Json(json!({
    "success": true,
    "message": "Server is running",
    "timestamp": Utc::now(),
  }))
  .into_response()
}

async fn not_found() -> ApiError { ApiError::NotFound("Endpoint not found".into()) }

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{DateTime, TimeZone};
  use loom_core::{
    access::{Principal, Role},
    issue::QualityIssue,
    query::{RatingFilter, RatingPage, RatingQuery},
    rating::{CustomerSegment, NewRating, Rating, RatingPatch, StarCounts},
  };
  use loom_store_sqlite::SqliteStore;
  use serde_json::Value;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  fn app_state<S: RatingStore>(store: S, require_token: bool) -> AppState<S> {
    let auth = auth::tests::make_auth(require_token);

    AppState {
      store:  Arc::new(store),
      config: Arc::new(ServerConfig {
        host:            "127.0.0.1".to_string(),
        port:            5000,
        store_path:      PathBuf::from(":memory:"),
        jwt_secret:      "test-secret".to_string(),
        token_ttl_hours: 24,
        require_token,
        cors_any_origin: true,
        users:           auth.users.clone(),
      }),
      auth:   Arc::new(auth),
    }
  }

  async fn make_state(require_token: bool) -> AppState<SqliteStore> {
    app_state(SqliteStore::open_in_memory().await.unwrap(), require_token)
  }

  fn token<S: RatingStore>(state: &AppState<S>, username: &str, role: Role) -> String {
    state.auth.issue(&Principal::new(username, role), Utc::now()).unwrap()
  }

  async fn send<S>(
    state: &AppState<S>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value)
  where
    S: RatingStore + Clone + Send + Sync + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
  {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    let resp = router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let is_json = resp
      .headers()
      .get(header::CONTENT_TYPE)
      .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    assert!(is_json || bytes.is_empty(), "non-JSON response body");
    (status, json)
  }

  async fn seed(state: &AppState<SqliteStore>, product: &str, segment: CustomerSegment, overall: f64) -> String {
    let rating = state
      .store
      .insert(NewRating::review(product, "ITEM-1", segment, overall))
      .await
      .unwrap();
    rating.id.to_string()
  }

  // ── Public endpoints ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_is_public() {
    let state = make_state(true).await;
    let (status, body) = send(&state, "GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["timestamp"].is_string());
  }

  #[tokio::test]
  async fn unknown_endpoint_is_json_404() {
    let state = make_state(true).await;
    let (status, body) = send(&state, "GET", "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Endpoint not found");
  }

  // ── Login ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn login_issues_usable_token() {
    let state = make_state(true).await;
    let creds = json!({ "username": "walmart", "password": "walmart123" });
    let (status, body) = send(&state, "POST", "/api/auth/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["role"], "walmart");

    let token = body["data"]["token"].as_str().unwrap().to_owned();
    let (status, body) = send(&state, "GET", "/api/auth/validate", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "walmart");
  }

  #[tokio::test]
  async fn login_with_bad_password_is_401() {
    let state = make_state(true).await;
    let creds = json!({ "username": "admin", "password": "guess" });
    let (status, body) = send(&state, "POST", "/api/auth/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
  }

  #[tokio::test]
  async fn login_without_password_is_400() {
    let state = make_state(true).await;
    let (status, _) =
      send(&state, "POST", "/api/auth/login", None, Some(json!({ "username": "admin" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Token enforcement ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_token_is_401() {
    let state = make_state(true).await;
    let (status, body) = send(&state, "GET", "/api/ratings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access token required");
  }

  #[tokio::test]
  async fn garbage_token_is_401_even_when_optional() {
    let state = make_state(false).await;
    let (status, _) = send(&state, "GET", "/api/ratings", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn optional_token_serves_public_caller() {
    let state = make_state(false).await;
    seed(&state, "Towel", CustomerSegment::Walmart, 4.0).await;
    seed(&state, "Sheet", CustomerSegment::SamsClub, 3.0).await;

    let (status, body) = send(&state, "GET", "/api/ratings", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);
  }

  // ── Segment isolation ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn restricted_list_only_shows_own_segment() {
    let state = make_state(true).await;
    seed(&state, "Towel", CustomerSegment::Walmart, 4.0).await;
    seed(&state, "Sheet", CustomerSegment::SamsClub, 3.0).await;
    seed(&state, "Robe", CustomerSegment::SamsClub, 5.0).await;
    let token = token(&state, "sams", Role::Sams);

    let (status, body) =
      send(&state, "GET", "/api/ratings?customer=Walmart", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let ratings = body["data"].as_array().unwrap();
    assert_eq!(ratings.len(), 2);
    assert!(ratings.iter().all(|r| r["customerSegment"] == "Sam's Club"));
  }

  #[tokio::test]
  async fn other_segments_record_is_403() {
    let state = make_state(true).await;
    let id = seed(&state, "Towel", CustomerSegment::Walmart, 4.0).await;
    let sams = token(&state, "sams", Role::Sams);

    let (status, body) = send(&state, "GET", &format!("/api/ratings/{id}"), Some(&sams), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let patch = json!({ "item": "T-9" });
    let (status, _) =
      send(&state, "PUT", &format!("/api/ratings/{id}"), Some(&sams), Some(patch)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&state, "DELETE", &format!("/api/ratings/{id}"), Some(&sams), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = token(&state, "admin", Role::Admin);
    let (_, body) = send(&state, "GET", &format!("/api/ratings/{id}"), Some(&admin), None).await;
    assert_eq!(body["data"]["item"], "ITEM-1");
  }

  #[tokio::test]
  async fn restricted_update_cannot_move_record_to_other_segment() {
    let state = make_state(true).await;
    let id = seed(&state, "Towel", CustomerSegment::Walmart, 4.0).await;
    let token = token(&state, "walmart", Role::Walmart);
    let uri = format!("/api/ratings/{id}");

    let (status, _) =
      send(&state, "PUT", &uri, Some(&token), Some(json!({ "customerSegment": "Sam's Club" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&state, "PUT", &uri, Some(&token), Some(json!({ "color": "Blue" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["color"], "Blue");
    assert_eq!(body["data"]["customerSegment"], "Walmart");
  }

  #[tokio::test]
  async fn non_uuid_id_is_json_404() {
    let state = make_state(true).await;
    let token = token(&state, "admin", Role::Admin);
    let uri = "/api/ratings/65a1f0c2e4b0a1b2c3d4e5f6";

    for method in ["GET", "DELETE"] {
      let (status, body) = send(&state, method, uri, Some(&token), None).await;
      assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
      assert_eq!(body["success"], false);
      assert_eq!(body["message"], "Rating not found");
    }
    let (status, body) = send(&state, "PUT", uri, Some(&token), Some(json!({ "color": "Blue" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
  }

  #[tokio::test]
  async fn restricted_aggregates_exclude_other_segments() {
    let state = make_state(true).await;
    seed(&state, "Towel", CustomerSegment::Walmart, 2.0).await;
    seed(&state, "Sheet", CustomerSegment::SamsClub, 4.0).await;
    let token = token(&state, "walmart", Role::Walmart);

    let (status, body) = send(&state, "GET", "/api/analytics/overall", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalRatings"], 1);
    assert_eq!(body["data"]["averageRating"], 2.0);
  }

  // ── Ratings CRUD ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn submission_missing_fields_is_400() {
    let state = make_state(true).await;
    let token = token(&state, "admin", Role::Admin);
    let (status, body) = send(
      &state,
      "POST",
      "/api/ratings",
      Some(&token),
      Some(json!({ "productDescription": "Towel" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let missing = body["missingFields"].as_array().unwrap();
    assert!(missing.iter().any(|f| f == "item"));
    assert!(missing.iter().any(|f| f == "customerSegment"));
  }

  #[tokio::test]
  async fn restricted_submission_for_other_segment_is_403() {
    let state = make_state(true).await;
    let token = token(&state, "walmart", Role::Walmart);
    let body = json!({
      "productDescription": "Towel",
      "item": "T-1",
      "comboOrVariant": "Single",
      "color": "Blue",
      "customerSegment": "Sam's Club",
      "overallRating": 4,
      "totalReviewCount": 1,
    });
    let (status, _) = send(&state, "POST", "/api/ratings/reviews", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn create_then_fetch_then_delete() {
    let state = make_state(true).await;
    let token = token(&state, "admin", Role::Admin);
    let body = json!({
      "productDescription": "Bath Towel",
      "item": "BT-100",
      "comboOrVariant": "Set of 2",
      "color": "White",
      "customerSegment": "Walmart",
      "overallRating": "4.5",
      "totalReviewCount": 3,
    });
    let (status, created) = send(&state, "POST", "/api/ratings/reviews", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["overallRating"], 4.5);
    assert_eq!(created["data"]["formType"], "review");
    let id = created["data"]["id"].as_str().unwrap().to_owned();

    let (status, fetched) = send(&state, "GET", &format!("/api/ratings/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["item"], "BT-100");

    let (status, _) = send(&state, "DELETE", &format!("/api/ratings/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&state, "GET", &format!("/api/ratings/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Listing ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn list_filters_by_rating_range() {
    let state = make_state(true).await;
    for overall in [1.0, 2.5, 3.9, 4.0, 4.6, 5.0] {
      seed(&state, "Towel", CustomerSegment::Walmart, overall).await;
    }
    let token = token(&state, "admin", Role::Admin);

    let (status, body) =
      send(&state, "GET", "/api/ratings?minRating=4&maxRating=5", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 3);
    let ratings = body["data"].as_array().unwrap();
    assert!(ratings.iter().all(|r| {
      let v = r["overallRating"].as_f64().unwrap();
      (4.0..=5.0).contains(&v)
    }));
  }

  #[tokio::test]
  async fn list_third_page_holds_remainder() {
    let state = make_state(true).await;
    for _ in 0..45 {
      seed(&state, "Towel", CustomerSegment::Walmart, 4.0).await;
    }
    let token = token(&state, "admin", Role::Admin);

    let (status, body) = send(&state, "GET", "/api/ratings?page=3&limit=20", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
    assert_eq!(body["pagination"], json!({ "page": 3, "limit": 20, "total": 45, "pages": 3 }));
  }

  // ── Analytics ──────────────────────────────────────────────────────────────

  /// A store over a plain vector so records can carry any submission date.
  #[derive(Clone)]
  struct MemStore(Arc<std::sync::Mutex<Vec<Rating>>>);

  impl MemStore {
    fn with(records: Vec<Rating>) -> Self { Self(Arc::new(std::sync::Mutex::new(records))) }
  }

  impl RatingStore for MemStore {
    type Error = std::convert::Infallible;

    async fn insert(&self, input: NewRating) -> Result<Rating, Self::Error> {
      let rating = Rating::create(Uuid::new_v4(), Utc::now(), input);
      self.0.lock().unwrap().push(rating.clone());
      Ok(rating)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Rating>, Self::Error> {
      Ok(self.0.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, query: &RatingQuery) -> Result<RatingPage, Self::Error> {
      let mut ratings = self.scan(&query.filter).await?;
      ratings.reverse();
      let total = ratings.len() as u64;
      let ratings = ratings
        .into_iter()
        .skip(query.offset() as usize)
        .take(query.limit as usize)
        .collect();
      Ok(RatingPage { ratings, total })
    }

    async fn scan(&self, filter: &RatingFilter) -> Result<Vec<Rating>, Self::Error> {
      let mut ratings: Vec<Rating> =
        self.0.lock().unwrap().iter().filter(|r| filter.matches(r)).cloned().collect();
      ratings.sort_by_key(|r| r.submitted_at);
      Ok(ratings)
    }

    async fn update(&self, id: Uuid, patch: RatingPatch) -> Result<Option<Rating>, Self::Error> {
      let mut records = self.0.lock().unwrap();
      Ok(records.iter_mut().find(|r| r.id == id).map(|r| {
        r.apply(patch, Utc::now());
        r.clone()
      }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, Self::Error> {
      let mut records = self.0.lock().unwrap();
      let before = records.len();
      records.retain(|r| r.id != id);
      Ok(records.len() < before)
    }
  }

  fn dated(at: DateTime<Utc>, product: &str, overall: f64) -> Rating {
    Rating::create(
      Uuid::new_v4(),
      at,
      NewRating::review(product, "SKU", CustomerSegment::Walmart, overall),
    )
  }

  fn in_month(year: i32, month: u32, product: &str, overall: f64) -> Rating {
    dated(Utc.with_ymd_and_hms(year, month, 10, 12, 0, 0).unwrap(), product, overall)
  }

  /// "Best" is rated higher but has a quality issue; "Plain" has none.
  fn ranked_products() -> MemStore {
    let mut best = in_month(2024, 1, "Best", 5.0);
    best.quality_issue_flags.set(QualityIssue::Hole, true);
    MemStore::with(vec![best, in_month(2024, 1, "Plain", 3.0)])
  }

  #[tokio::test]
  async fn dashboard_kind_selects_product_ranking() {
    let state = app_state(ranked_products(), true);
    let token = token(&state, "admin", Role::Admin);

    let (status, body) =
      send(&state, "GET", "/api/analytics/dashboard?dashboardType=reviews", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["kind"], "reviews");
    assert_eq!(body["data"]["topProducts"][0]["product"], "Best");

    let (_, body) =
      send(&state, "GET", "/api/analytics/dashboard?dashboardType=feedback", Some(&token), None).await;
    assert_eq!(body["data"]["topProducts"][0]["product"], "Plain");
    assert_eq!(body["data"]["qualityIssues"]["hole"], 1);

    let (status, _) =
      send(&state, "GET", "/api/analytics/dashboard?dashboardType=weekly", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn products_sort_and_limit() {
    let state = app_state(ranked_products(), true);
    let token = token(&state, "admin", Role::Admin);

    let (status, body) = send(&state, "GET", "/api/analytics/products", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let products = body["data"].as_array().unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["product"], "Best");

    let (_, body) = send(
      &state,
      "GET",
      "/api/analytics/products?sortBy=issueCount&limit=1",
      Some(&token),
      None,
    )
    .await;
    let products = body["data"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["product"], "Plain");
    assert_eq!(products[0]["issueCount"], 0);
  }

  #[tokio::test]
  async fn monthly_trend_is_chronological_with_change() {
    let store = MemStore::with(vec![
      in_month(2024, 2, "Towel", 2.0),
      in_month(2023, 12, "Towel", 5.0),
      in_month(2024, 1, "Towel", 4.0),
      in_month(2024, 1, "Robe", 4.0),
    ]);
    let state = app_state(store, true);
    let token = token(&state, "admin", Role::Admin);

    let (status, body) = send(&state, "GET", "/api/analytics/monthly?year=2024", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let trend = body["data"].as_array().unwrap();
    let periods: Vec<&str> = trend.iter().map(|p| p["period"].as_str().unwrap()).collect();
    assert_eq!(periods, ["2024-01", "2024-02"]);
    assert_eq!(trend[0]["count"], 2);
    assert_eq!(trend[0]["change"], Value::Null);
    assert_eq!(trend[1]["change"], -2.0);
  }

  #[tokio::test]
  async fn detailed_defaults_to_last_six_months() {
    let now = Utc::now();
    let store = MemStore::with(vec![
      dated(now - Duration::days(30), "Towel", 4.0),
      dated(now - Duration::days(400), "Towel", 1.0),
    ]);
    let state = app_state(store, true);
    let token = token(&state, "admin", Role::Admin);

    let (status, body) = send(&state, "GET", "/api/analytics/detailed", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["overall"]["totalRatings"], 1);
    assert_eq!(body["data"]["overall"]["averageRating"], 4.0);

    let uri = format!(
      "/api/analytics/detailed?startDate={}",
      (now - Duration::days(500)).format("%Y-%m-%d")
    );
    let (_, body) = send(&state, "GET", &uri, Some(&token), None).await;
    assert_eq!(body["data"]["overall"]["totalRatings"], 2);
  }

  #[tokio::test]
  async fn star_distribution_sums_histograms_and_buckets_ratings() {
    let mut a = in_month(2024, 3, "Towel", 4.6);
    a.star_counts = StarCounts::from_levels([0, 0, 0, 2, 3]);
    let mut b = in_month(2024, 3, "Robe", 1.0);
    b.star_counts = StarCounts::from_levels([1, 0, 0, 0, 0]);
    let state = app_state(MemStore::with(vec![a, b]), true);
    let token = token(&state, "admin", Role::Admin);

    let (status, body) =
      send(&state, "GET", "/api/analytics/star-distribution", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["starCounts"], json!({ "1": 1, "2": 0, "3": 0, "4": 2, "5": 3 }));
    let buckets = body["data"]["ratingDistribution"].as_array().unwrap();
    assert_eq!(buckets.len(), 5);
    assert_eq!(buckets[1]["count"], 1);
    assert_eq!(buckets[4]["count"], 1);
  }

  #[tokio::test]
  async fn analytics_respect_segment_restriction() {
    let mut sams = in_month(2024, 1, "Sheet", 1.0);
    sams.customer_segment = CustomerSegment::SamsClub;
    let state = app_state(MemStore::with(vec![in_month(2024, 1, "Towel", 4.0), sams]), true);
    let token = token(&state, "walmart", Role::Walmart);

    for uri in ["/api/analytics/products", "/api/analytics/monthly"] {
      let (status, body) = send(&state, "GET", uri, Some(&token), None).await;
      assert_eq!(status, StatusCode::OK, "{uri}");
      let rows = body["data"].as_array().unwrap();
      assert_eq!(rows.len(), 1, "{uri}");
      assert_eq!(rows[0]["averageRating"], 4.0, "{uri}");
    }
  }
}
