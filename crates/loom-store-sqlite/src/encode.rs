//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that string order is time order. Enumerations are stored by their
//! display label. Quality-issue flags are stored as a compact JSON object.

use chrono::{DateTime, SecondsFormat, Utc};
use loom_core::{
  issue::QualityIssueFlags,
  rating::{CustomerSegment, Rating, StarCounts},
};
use rusqlite::types::Value;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_segment(s: &str) -> Result<CustomerSegment> {
  CustomerSegment::from_label(s).ok_or_else(|| Error::Decode {
    column: "customer_segment",
    value:  s.to_owned(),
  })
}

/// Parse any `strum`-labelled column.
pub fn decode_label<T: std::str::FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Decode { column, value: s.to_owned() })
}

// ─── Quality issues ──────────────────────────────────────────────────────────

pub fn encode_flags(flags: &QualityIssueFlags) -> Result<String> {
  Ok(serde_json::to_string(flags)?)
}

/// Keys added to the checklist after a row was written decode as `false`.
pub fn decode_flags(s: &str) -> Result<QualityIssueFlags> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `ratings` row.
pub struct RawRating {
  pub rating_id:            String,
  pub submitted_at:         String,
  pub updated_at:           String,
  pub year:                 i32,
  pub month:                u32,
  pub day:                  u32,
  pub product_description:  String,
  pub item:                 String,
  pub combo_or_variant:     String,
  pub color:                String,
  pub customer_segment:     String,
  pub stars:                [i64; 5],
  pub overall_rating:       f64,
  pub total_review_count:   i64,
  pub review_comments:      String,
  pub nature_of_review:     String,
  pub happy_customer:       bool,
  pub customer_expectation: String,
  pub quality_issues:       String,
  pub form_type:            String,
}

impl RawRating {
  /// Map a row selected with [`crate::schema::COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      rating_id:            row.get(0)?,
      submitted_at:         row.get(1)?,
      updated_at:           row.get(2)?,
      year:                 row.get(3)?,
      month:                row.get(4)?,
      day:                  row.get(5)?,
      product_description:  row.get(6)?,
      item:                 row.get(7)?,
      combo_or_variant:     row.get(8)?,
      color:                row.get(9)?,
      customer_segment:     row.get(10)?,
      stars:                [row.get(11)?, row.get(12)?, row.get(13)?, row.get(14)?, row.get(15)?],
      overall_rating:       row.get(16)?,
      total_review_count:   row.get(17)?,
      review_comments:      row.get(18)?,
      nature_of_review:     row.get(19)?,
      happy_customer:       row.get(20)?,
      customer_expectation: row.get(21)?,
      quality_issues:       row.get(22)?,
      form_type:            row.get(23)?,
    })
  }

  pub fn into_rating(self) -> Result<Rating> {
    let mut stars = [0u64; 5];
    for (slot, n) in stars.iter_mut().zip(self.stars) {
      *slot = u64::try_from(n)
        .map_err(|_| Error::Decode { column: "star_counts", value: n.to_string() })?;
    }
    let total_review_count =
      u32::try_from(self.total_review_count).map_err(|_| Error::Decode {
        column: "total_review_count",
        value:  self.total_review_count.to_string(),
      })?;

    Ok(Rating {
      id: decode_uuid(&self.rating_id)?,
      submitted_at: decode_dt(&self.submitted_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      year: self.year,
      month: self.month,
      day: self.day,
      product_description: self.product_description,
      item: self.item,
      combo_or_variant: self.combo_or_variant,
      color: self.color,
      customer_segment: decode_segment(&self.customer_segment)?,
      star_counts: StarCounts::from_levels(stars),
      overall_rating: self.overall_rating,
      total_review_count,
      review_comments: self.review_comments,
      nature_of_review: decode_label("nature_of_review", &self.nature_of_review)?,
      happy_customer: self.happy_customer,
      customer_expectation: decode_label(
        "customer_expectation",
        &self.customer_expectation,
      )?,
      quality_issue_flags: decode_flags(&self.quality_issues)?,
      form_type: decode_label("form_type", &self.form_type)?,
    })
  }
}

/// Every column of `rating` as owned SQL values, in [`crate::schema::COLUMNS`]
/// order.
pub fn rating_values(rating: &Rating) -> Result<Vec<Value>> {
  let nature: &'static str = rating.nature_of_review.into();
  let expectation: &'static str = rating.customer_expectation.into();
  let stars = rating.star_counts.levels();

  let mut values = vec![
    Value::Text(encode_uuid(rating.id)),
    Value::Text(encode_dt(rating.submitted_at)),
    Value::Text(encode_dt(rating.updated_at)),
    Value::Integer(i64::from(rating.year)),
    Value::Integer(i64::from(rating.month)),
    Value::Integer(i64::from(rating.day)),
    Value::Text(rating.product_description.clone()),
    Value::Text(rating.item.clone()),
    Value::Text(rating.combo_or_variant.clone()),
    Value::Text(rating.color.clone()),
    Value::Text(rating.customer_segment.as_str().to_owned()),
  ];
  for n in stars {
    let n = i64::try_from(n)
      .map_err(|_| Error::Decode { column: "star_counts", value: n.to_string() })?;
    values.push(Value::Integer(n));
  }
  values.extend([
    Value::Real(rating.overall_rating),
    Value::Integer(i64::from(rating.total_review_count)),
    Value::Text(rating.review_comments.clone()),
    Value::Text(nature.to_owned()),
    Value::Integer(i64::from(rating.happy_customer)),
    Value::Text(expectation.to_owned()),
    Value::Text(encode_flags(&rating.quality_issue_flags)?),
    Value::Text(rating.form_type.as_str().to_owned()),
  ]);
  Ok(values)
}
