//! [`SqliteStore`], the SQLite implementation of [`RatingStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use loom_core::{
  query::{RatingFilter, RatingPage, RatingQuery, SortKey, SortOrder, fold_product},
  rating::{NewRating, Rating, RatingPatch},
  store::RatingStore,
};

use crate::{
  Result,
  encode::{RawRating, encode_dt, encode_uuid, rating_values},
  schema::{COLUMNS, SCHEMA},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rating store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted and its
/// dedicated thread serialises access.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Replace every column of a row, provided it still carries the
  /// `updated_at` it was read with. Returns whether a row was written.
  async fn write_back(&self, rating: &Rating, read_at: DateTime<Utc>) -> Result<bool> {
    let mut values = rating_values(rating)?;
    // Move the id from the front to the WHERE parameters.
    let id = values.remove(0);
    values.push(id);
    values.push(Value::Text(encode_dt(read_at)));

    let written = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE ratings SET
             submitted_at = ?, updated_at = ?, year = ?, month = ?, day = ?,
             product_description = ?, item = ?, combo_or_variant = ?, color = ?,
             customer_segment = ?,
             star1 = ?, star2 = ?, star3 = ?, star4 = ?, star5 = ?,
             overall_rating = ?, total_review_count = ?, review_comments = ?,
             nature_of_review = ?, happy_customer = ?, customer_expectation = ?,
             quality_issues = ?, form_type = ?
           WHERE rating_id = ? AND updated_at = ?",
          rusqlite::params_from_iter(values),
        )?)
      })
      .await?;
    Ok(written > 0)
  }
}

// ─── Query building ──────────────────────────────────────────────────────────

/// `WHERE` clause and its positional parameters for `filter`.
fn where_clause(filter: &RatingFilter) -> (String, Vec<Value>) {
  let mut conds: Vec<&'static str> = vec![];
  let mut params: Vec<Value> = vec![];

  if let Some(year) = filter.year {
    conds.push("year = ?");
    params.push(Value::Integer(i64::from(year)));
  }
  if let Some(month) = filter.month {
    conds.push("month = ?");
    params.push(Value::Integer(i64::from(month)));
  }
  if let Some(segment) = filter.customer {
    conds.push("customer_segment = ?");
    params.push(Value::Text(segment.as_str().to_owned()));
  }
  if let Some(form_type) = filter.form_type {
    conds.push("form_type = ?");
    params.push(Value::Text(form_type.as_str().to_owned()));
  }
  if let Some(product) = filter.product.as_deref() {
    conds.push("LOWER(product_description) LIKE ? ESCAPE '\\'");
    params.push(Value::Text(format!("%{}%", escape_like(&fold_product(product)))));
  }
  if let Some(min) = filter.min_rating {
    conds.push("overall_rating >= ?");
    params.push(Value::Real(min));
  }
  if let Some(max) = filter.max_rating {
    conds.push("overall_rating <= ?");
    params.push(Value::Real(max));
  }
  if let Some(after) = filter.submitted_after {
    conds.push("submitted_at >= ?");
    params.push(Value::Text(encode_dt(after)));
  }
  if let Some(before) = filter.submitted_before {
    conds.push("submitted_at <= ?");
    params.push(Value::Text(encode_dt(before)));
  }

  let clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (clause, params)
}

fn escape_like(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

fn order_clause(by: SortKey, order: SortOrder) -> String {
  let column = match by {
    SortKey::SubmittedAt => "submitted_at",
    SortKey::OverallRating => "overall_rating",
    SortKey::TotalReviewCount => "total_review_count",
    SortKey::ProductDescription => "product_description",
    SortKey::Item => "item",
    SortKey::CustomerSegment => "customer_segment",
  };
  let direction = match order {
    SortOrder::Asc => "ASC",
    SortOrder::Desc => "DESC",
  };
  format!("ORDER BY {column} {direction}, submitted_at {direction}, rating_id ASC")
}

fn select_ratings(
  conn: &rusqlite::Connection,
  sql: &str,
  params: Vec<Value>,
) -> rusqlite::Result<Vec<RawRating>> {
  let mut stmt = conn.prepare(sql)?;
  stmt
    .query_map(rusqlite::params_from_iter(params), RawRating::from_row)?
    .collect()
}

// ─── RatingStore impl ────────────────────────────────────────────────────────

impl RatingStore for SqliteStore {
  type Error = crate::Error;

  async fn insert(&self, input: NewRating) -> Result<Rating> {
    // Stored timestamps carry microseconds; truncate so the returned record
    // equals what a later read yields.
    let now = Utc::now().trunc_subsecs(6);
    let rating = Rating::create(Uuid::new_v4(), now, input);
    let values = rating_values(&rating)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO ratings ({COLUMNS}) VALUES
               (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
          ),
          rusqlite::params_from_iter(values),
        )?;
        Ok(())
      })
      .await?;

    Ok(rating)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Rating>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRating> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {COLUMNS} FROM ratings WHERE rating_id = ?1"),
            rusqlite::params![id_str],
            RawRating::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRating::into_rating).transpose()
  }

  async fn list(&self, query: &RatingQuery) -> Result<RatingPage> {
    let (where_sql, mut params) = where_clause(&query.filter);
    let count_params = params.clone();
    let count_sql = format!("SELECT COUNT(*) FROM ratings {where_sql}");
    let page_sql = format!(
      "SELECT {COLUMNS} FROM ratings {where_sql} {} LIMIT ? OFFSET ?",
      order_clause(query.sort_by, query.sort_order)
    );
    params.push(Value::Integer(i64::from(query.limit)));
    params.push(Value::Integer(i64::try_from(query.offset()).unwrap_or(i64::MAX)));

    let (total, raws): (i64, Vec<RawRating>) = self
      .conn
      .call(move |conn| {
        let total = conn.query_row(
          &count_sql,
          rusqlite::params_from_iter(count_params),
          |row| row.get(0),
        )?;
        let raws = select_ratings(conn, &page_sql, params)?;
        Ok((total, raws))
      })
      .await?;

    let ratings = raws
      .into_iter()
      .map(RawRating::into_rating)
      .collect::<Result<_>>()?;

    Ok(RatingPage { ratings, total: u64::try_from(total).unwrap_or(0) })
  }

  async fn scan(&self, filter: &RatingFilter) -> Result<Vec<Rating>> {
    let (where_sql, params) = where_clause(filter);
    let sql = format!(
      "SELECT {COLUMNS} FROM ratings {where_sql} ORDER BY submitted_at ASC, rating_id ASC"
    );

    let raws: Vec<RawRating> = self
      .conn
      .call(move |conn| Ok(select_ratings(conn, &sql, params)?))
      .await?;

    raws.into_iter().map(RawRating::into_rating).collect()
  }

  async fn update(&self, id: Uuid, patch: RatingPatch) -> Result<Option<Rating>> {
    // Optimistic: a write that loses to a concurrent update or delete
    // re-reads and tries again, so a vanished row yields `None`.
    loop {
      let Some(current) = self.get(id).await? else {
        return Ok(None);
      };

      let read_at = current.updated_at;
      let mut rating = current;
      rating.apply(patch.clone(), Utc::now().trunc_subsecs(6));
      if self.write_back(&rating, read_at).await? {
        return Ok(Some(rating));
      }
    }
  }

  async fn delete(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM ratings WHERE rating_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    Ok(removed > 0)
  }
}
