//! Query types shared by the store, the access policy and the HTTP layer.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::rating::{CustomerSegment, FormType, Rating};

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Record selection applied before listing or aggregation. Every criterion
/// is optional; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingFilter {
  pub year:             Option<i32>,
  pub month:            Option<u32>,
  pub customer:         Option<CustomerSegment>,
  pub form_type:        Option<FormType>,
  /// Case-insensitive substring of `product_description`.
  pub product:          Option<String>,
  /// Inclusive.
  pub min_rating:       Option<f64>,
  /// Inclusive.
  pub max_rating:       Option<f64>,
  /// Inclusive lower bound on `submitted_at`.
  pub submitted_after:  Option<DateTime<Utc>>,
  /// Inclusive upper bound on `submitted_at`.
  pub submitted_before: Option<DateTime<Utc>>,
}

/// Case folding for product matching: ASCII only, the same as SQLite's
/// built-in `LOWER()`, so stores and [`RatingFilter::matches`] agree.
pub fn fold_product(s: &str) -> String { s.to_ascii_lowercase() }

impl RatingFilter {
  pub fn matches(&self, rating: &Rating) -> bool {
    self.year.is_none_or(|y| rating.year == y)
      && self.month.is_none_or(|m| rating.month == m)
      && self.customer.is_none_or(|c| rating.customer_segment == c)
      && self.form_type.is_none_or(|f| rating.form_type == f)
      && self
        .product
        .as_deref()
        .is_none_or(|p| fold_product(&rating.product_description).contains(&fold_product(p)))
      && self.min_rating.is_none_or(|min| rating.overall_rating >= min)
      && self.max_rating.is_none_or(|max| rating.overall_rating <= max)
      && self.submitted_after.is_none_or(|t| rating.submitted_at >= t)
      && self.submitted_before.is_none_or(|t| rating.submitted_at <= t)
  }
}

// ─── Sorting ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
  #[default]
  SubmittedAt,
  OverallRating,
  TotalReviewCount,
  ProductDescription,
  Item,
  CustomerSegment,
}

impl SortKey {
  /// Parse a `sortBy` parameter. Unknown keys fall back to the default
  /// rather than failing the request.
  pub fn from_param(param: &str) -> Self {
    match param.trim() {
      "submittedAt" | "createdAt" | "date" => Self::SubmittedAt,
      "overallRating" | "rating" => Self::OverallRating,
      "totalReviewCount" | "ttlReviews" => Self::TotalReviewCount,
      "productDescription" | "product" => Self::ProductDescription,
      "item" => Self::Item,
      "customerSegment" | "customer" => Self::CustomerSegment,
      _ => Self::default(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl SortOrder {
  pub fn from_param(param: &str) -> Self {
    if param.trim().eq_ignore_ascii_case("asc") { Self::Asc } else { Self::Desc }
  }
}

// ─── Paged query ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RatingQuery {
  pub filter:     RatingFilter,
  pub sort_by:    SortKey,
  pub sort_order: SortOrder,
  /// 1-based.
  pub page:       u32,
  pub limit:      u32,
}

impl RatingQuery {
  pub const DEFAULT_LIMIT: u32 = 20;
  pub const MAX_LIMIT: u32 = 500;

  /// Build a query, normalising out-of-range paging values.
  pub fn new(filter: RatingFilter, page: Option<u32>, limit: Option<u32>) -> Self {
    Self {
      filter,
      sort_by: SortKey::default(),
      sort_order: SortOrder::default(),
      page: page.unwrap_or(1).max(1),
      limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
    }
  }

  pub fn sorted(mut self, by: SortKey, order: SortOrder) -> Self {
    self.sort_by = by;
    self.sort_order = order;
    self
  }

  pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.limit) }
}

impl Default for RatingQuery {
  fn default() -> Self { Self::new(RatingFilter::default(), None, None) }
}

/// One page of a listing plus the size of the whole result set.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingPage {
  pub ratings: Vec<Rating>,
  pub total:   u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
  pub page:  u32,
  pub limit: u32,
  pub total: u64,
  pub pages: u64,
}

impl Pagination {
  pub fn new(query: &RatingQuery, total: u64) -> Self {
    Self {
      page: query.page,
      limit: query.limit,
      total,
      pages: total.div_ceil(u64::from(query.limit)),
    }
  }
}

// ─── Filter options ──────────────────────────────────────────────────────────

/// Distinct values offered by the dashboard's filter drop-downs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
  pub customers: Vec<String>,
  pub products:  Vec<String>,
  pub combos:    Vec<String>,
  pub colors:    Vec<String>,
}

impl FilterOptions {
  pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Rating>) -> Self {
    let mut customers = BTreeSet::new();
    let mut products = BTreeSet::new();
    let mut combos = BTreeSet::new();
    let mut colors = BTreeSet::new();

    for r in records {
      customers.insert(r.customer_segment.as_str());
      products.insert(r.product_description.as_str());
      combos.insert(r.combo_or_variant.as_str());
      colors.insert(r.color.as_str());
    }

    fn collect(set: BTreeSet<&str>) -> Vec<String> {
      set.into_iter().filter(|s| !s.is_empty()).map(str::to_owned).collect()
    }

    Self {
      customers: collect(customers),
      products:  collect(products),
      combos:    collect(combos),
      colors:    collect(colors),
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use uuid::Uuid;

  use super::*;
  use crate::rating::NewRating;

  fn rating(product: &str, segment: CustomerSegment, overall: f64) -> Rating {
    Rating::create(
      Uuid::new_v4(),
      Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap(),
      NewRating::review(product, "X-1", segment, overall),
    )
  }

  #[test]
  fn filter_criteria_combine() {
    let r = rating("Luxe Bath Towel", CustomerSegment::Walmart, 4.5);

    assert!(RatingFilter::default().matches(&r));
    assert!(
      RatingFilter { product: Some("bath".into()), year: Some(2024), ..Default::default() }
        .matches(&r)
    );
    assert!(
      !RatingFilter { customer: Some(CustomerSegment::SamsClub), ..Default::default() }
        .matches(&r)
    );
    assert!(
      RatingFilter { min_rating: Some(4.5), max_rating: Some(5.0), ..Default::default() }
        .matches(&r)
    );
    assert!(!RatingFilter { max_rating: Some(4.0), ..Default::default() }.matches(&r));
    assert!(!RatingFilter { month: Some(7), ..Default::default() }.matches(&r));
  }

  #[test]
  fn product_match_folds_ascii_only() {
    let r = rating("ÉPONGE Towel", CustomerSegment::Walmart, 4.0);
    let by = |p: &str| RatingFilter { product: Some(p.into()), ..Default::default() };

    assert!(by("towel").matches(&r));
    assert!(by("ÉPONGE").matches(&r));
    assert!(!by("éponge").matches(&r));
  }

  #[test]
  fn paging_is_normalised() {
    let q = RatingQuery::new(RatingFilter::default(), Some(0), Some(10_000));
    assert_eq!((q.page, q.limit), (1, RatingQuery::MAX_LIMIT));

    let q = RatingQuery::new(RatingFilter::default(), Some(3), Some(20));
    assert_eq!(q.offset(), 40);
    let p = Pagination::new(&q, 45);
    assert_eq!(p.pages, 3);
    assert_eq!(Pagination::new(&q, 0).pages, 0);
  }

  #[test]
  fn sort_params_are_lenient() {
    assert_eq!(SortKey::from_param("createdAt"), SortKey::SubmittedAt);
    assert_eq!(SortKey::from_param("overallRating"), SortKey::OverallRating);
    assert_eq!(SortKey::from_param("nonsense"), SortKey::SubmittedAt);
    assert_eq!(SortOrder::from_param("ASC"), SortOrder::Asc);
    assert_eq!(SortOrder::from_param(""), SortOrder::Desc);
  }

  #[test]
  fn filter_options_are_sorted_and_distinct() {
    let records = [
      rating("Towel", CustomerSegment::Walmart, 4.0),
      rating("Robe", CustomerSegment::SamsClub, 3.0),
      rating("Towel", CustomerSegment::Walmart, 5.0),
    ];
    let options = FilterOptions::from_records(&records);
    assert_eq!(options.products, vec!["Robe", "Towel"]);
    assert_eq!(options.customers, vec!["Sam's Club", "Walmart"]);
    assert_eq!(options.colors, vec!["White"]);
  }
}
