//! The rating record: one feedback or review submission for a product.
//!
//! A record summarises a batch of customer reviews: `star_counts` is a
//! histogram, not a single respondent's pick. The calendar fields are copies
//! of `submitted_at` taken once at creation and never written independently.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  aggregate::round_to,
  issue::{QualityIssue, QualityIssueFlags},
};

// ─── Enumerations ────────────────────────────────────────────────────────────

/// The retail customer a record belongs to; the unit of access control.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  EnumIter,
  IntoStaticStr,
)]
pub enum CustomerSegment {
  #[serde(rename = "Sam's Club")]
  #[strum(serialize = "Sam's Club")]
  SamsClub,
  Walmart,
  #[default]
  Other,
}

impl CustomerSegment {
  pub fn as_str(self) -> &'static str { self.into() }

  /// Lenient label parsing: case, spacing and the apostrophe are ignored, and
  /// the short role names (`sams`) are accepted.
  pub fn from_label(label: &str) -> Option<Self> {
    let folded: String = label
      .chars()
      .filter(|c| c.is_ascii_alphanumeric())
      .map(|c| c.to_ascii_lowercase())
      .collect();
    match folded.as_str() {
      "samsclub" | "sams" | "sam" => Some(Self::SamsClub),
      "walmart" => Some(Self::Walmart),
      "other" => Some(Self::Other),
      _ => None,
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum NatureOfReview {
  Positive,
  Negative,
  #[default]
  Neutral,
  Mixed,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum CustomerExpectation {
  #[default]
  Met,
  Exceeded,
  #[serde(alias = "Not Met")]
  #[strum(to_string = "Below", serialize = "not met", serialize = "notmet")]
  Below,
}

/// Distinguishes a full quality-feedback submission from a star-only review.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FormType {
  Feedback,
  Review,
}

/// The inputs [`FormType::infer`] looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormSignals {
  pub any_issue_flagged:    bool,
  pub has_comments:         bool,
  pub happy_customer:       bool,
  /// Whether the submitter chose an expectation at all, whatever its value.
  pub expectation_supplied: bool,
  pub nature:               NatureOfReview,
}

impl FormType {
  /// Classify a submission that did not say which form it came from.
  ///
  /// Anything beyond the star histogram (a flagged issue, a comment, a happy
  /// customer, a chosen expectation, a non-neutral nature) marks it as a
  /// feedback form.
  pub fn infer(signals: &FormSignals) -> Self {
    let has_details = signals.has_comments
      || signals.happy_customer
      || signals.expectation_supplied
      || signals.nature != NatureOfReview::Neutral;

    if signals.any_issue_flagged || has_details {
      Self::Feedback
    } else {
      Self::Review
    }
  }

  pub fn as_str(self) -> &'static str { self.into() }
}

// ─── Star histogram ──────────────────────────────────────────────────────────

/// Largest review count accepted for a single star level.
pub const MAX_STAR_COUNT: u64 = u32::MAX as u64;

/// Review counts per star level, serialised as `{"1": n, …, "5": n}`.
///
/// Sums saturate at `u64::MAX` rather than wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarCounts {
  #[serde(rename = "1", default)]
  pub one:   u64,
  #[serde(rename = "2", default)]
  pub two:   u64,
  #[serde(rename = "3", default)]
  pub three: u64,
  #[serde(rename = "4", default)]
  pub four:  u64,
  #[serde(rename = "5", default)]
  pub five:  u64,
}

impl StarCounts {
  pub fn from_levels(levels: [u64; 5]) -> Self {
    let [one, two, three, four, five] = levels;
    Self { one, two, three, four, five }
  }

  /// Counts indexed by `level - 1`.
  pub fn levels(&self) -> [u64; 5] {
    [self.one, self.two, self.three, self.four, self.five]
  }

  pub fn total(&self) -> u64 {
    self.levels().iter().fold(0, |acc, n| acc.saturating_add(*n))
  }

  /// Σ level × count.
  pub fn weighted_sum(&self) -> u64 {
    self
      .levels()
      .iter()
      .zip(1u64..)
      .fold(0, |acc, (count, level)| acc.saturating_add(count.saturating_mul(level)))
  }

  /// Count-weighted mean star level, or `None` for an empty histogram.
  pub fn mean(&self) -> Option<f64> {
    match self.total() {
      0 => None,
      total => Some(self.weighted_sum() as f64 / total as f64),
    }
  }
}

impl std::ops::AddAssign for StarCounts {
  fn add_assign(&mut self, rhs: Self) {
    self.one = self.one.saturating_add(rhs.one);
    self.two = self.two.saturating_add(rhs.two);
    self.three = self.three.saturating_add(rhs.three);
    self.four = self.four.saturating_add(rhs.four);
    self.five = self.five.saturating_add(rhs.five);
  }
}

// ─── Rating ──────────────────────────────────────────────────────────────────

/// A stored rating record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
  pub id:                   Uuid,
  /// Server-assigned; never changes after creation.
  pub submitted_at:         DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
  pub year:                 i32,
  pub month:                u32,
  pub day:                  u32,
  pub product_description:  String,
  pub item:                 String,
  pub combo_or_variant:     String,
  pub color:                String,
  pub customer_segment:     CustomerSegment,
  pub star_counts:          StarCounts,
  /// Always within `0.0..=5.0`.
  pub overall_rating:       f64,
  /// Always at least 1.
  pub total_review_count:   u32,
  pub review_comments:      String,
  pub nature_of_review:     NatureOfReview,
  pub happy_customer:       bool,
  pub customer_expectation: CustomerExpectation,
  pub quality_issue_flags:  QualityIssueFlags,
  pub form_type:            FormType,
}

impl Rating {
  /// Materialise a validated submission. The store supplies the identity and
  /// the timestamp; the calendar fields are derived here and nowhere else.
  pub fn create(id: Uuid, submitted_at: DateTime<Utc>, input: NewRating) -> Self {
    Self {
      id,
      submitted_at,
      updated_at: submitted_at,
      year: submitted_at.year(),
      month: submitted_at.month(),
      day: submitted_at.day(),
      product_description: input.product_description,
      item: input.item,
      combo_or_variant: input.combo_or_variant,
      color: input.color,
      customer_segment: input.customer_segment,
      star_counts: input.star_counts,
      overall_rating: input.overall_rating,
      total_review_count: input.total_review_count.max(1),
      review_comments: input.review_comments,
      nature_of_review: input.nature_of_review,
      happy_customer: input.happy_customer,
      customer_expectation: input.customer_expectation,
      quality_issue_flags: input.quality_issue_flags,
      form_type: input.form_type,
    }
  }

  /// Apply a partial update in place.
  ///
  /// Derived values are left alone: changing `star_counts` does not
  /// recompute `overall_rating`, and the calendar fields never move.
  pub fn apply(&mut self, patch: RatingPatch, at: DateTime<Utc>) {
    if let Some(v) = patch.product_description {
      self.product_description = v;
    }
    if let Some(v) = patch.item {
      self.item = v;
    }
    if let Some(v) = patch.combo_or_variant {
      self.combo_or_variant = v;
    }
    if let Some(v) = patch.color {
      self.color = v;
    }
    if let Some(v) = patch.customer_segment {
      self.customer_segment = v;
    }
    if let Some(v) = patch.star_counts {
      self.star_counts = v;
    }
    if let Some(v) = patch.overall_rating {
      self.overall_rating = v;
    }
    if let Some(v) = patch.total_review_count {
      self.total_review_count = v.max(1);
    }
    if let Some(v) = patch.review_comments {
      self.review_comments = v;
    }
    if let Some(v) = patch.nature_of_review {
      self.nature_of_review = v;
    }
    if let Some(v) = patch.happy_customer {
      self.happy_customer = v;
    }
    if let Some(v) = patch.customer_expectation {
      self.customer_expectation = v;
    }
    if let Some(flags) = &patch.quality_issue_flags {
      self.quality_issue_flags.merge(flags);
    }
    if let Some(v) = patch.form_type {
      self.form_type = v;
    }
    self.updated_at = at;
  }

  /// Number of quality issues flagged on this record.
  pub fn issue_count(&self) -> usize { self.quality_issue_flags.count() }
}

// ─── NewRating ───────────────────────────────────────────────────────────────

/// A validated submission, ready to be stored.
/// `id` and `submitted_at` are always set by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRating {
  pub product_description:  String,
  pub item:                 String,
  pub combo_or_variant:     String,
  pub color:                String,
  pub customer_segment:     CustomerSegment,
  pub star_counts:          StarCounts,
  pub overall_rating:       f64,
  pub total_review_count:   u32,
  pub review_comments:      String,
  pub nature_of_review:     NatureOfReview,
  pub happy_customer:       bool,
  pub customer_expectation: CustomerExpectation,
  pub quality_issue_flags:  QualityIssueFlags,
  pub form_type:            FormType,
}

impl NewRating {
  /// A star-only review with every detail field at its default.
  pub fn review(
    product_description: impl Into<String>,
    item: impl Into<String>,
    customer_segment: CustomerSegment,
    overall_rating: f64,
  ) -> Self {
    Self {
      product_description: product_description.into(),
      item: item.into(),
      combo_or_variant: "Single".into(),
      color: "White".into(),
      customer_segment,
      star_counts: StarCounts::default(),
      overall_rating,
      total_review_count: 1,
      review_comments: String::new(),
      nature_of_review: NatureOfReview::default(),
      happy_customer: false,
      customer_expectation: CustomerExpectation::default(),
      quality_issue_flags: QualityIssueFlags::default(),
      form_type: FormType::Review,
    }
  }
}

/// Rounded count-weighted mean of a histogram, as stored in `overall_rating`.
pub fn rating_from_histogram(stars: &StarCounts) -> Option<f64> {
  stars.mean().map(|m| round_to(m, 1))
}

// ─── RatingPatch ─────────────────────────────────────────────────────────────

/// A partial update. `None` leaves the field untouched; quality-issue flags
/// are merged key by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingPatch {
  pub product_description:  Option<String>,
  pub item:                 Option<String>,
  pub combo_or_variant:     Option<String>,
  pub color:                Option<String>,
  pub customer_segment:     Option<CustomerSegment>,
  pub star_counts:          Option<StarCounts>,
  pub overall_rating:       Option<f64>,
  pub total_review_count:   Option<u32>,
  pub review_comments:      Option<String>,
  pub nature_of_review:     Option<NatureOfReview>,
  pub happy_customer:       Option<bool>,
  pub customer_expectation: Option<CustomerExpectation>,
  pub quality_issue_flags:  Option<BTreeMap<QualityIssue, bool>>,
  pub form_type:            Option<FormType>,
}

impl RatingPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn histogram_mean_is_count_weighted() {
    let stars = StarCounts::from_levels([0, 0, 0, 2, 3]);
    assert_eq!(stars.total(), 5);
    assert_eq!(stars.weighted_sum(), 23);
    assert_eq!(rating_from_histogram(&stars), Some(4.6));
    assert_eq!(rating_from_histogram(&StarCounts::default()), None);
  }

  #[test]
  fn star_arithmetic_saturates() {
    let mut stars = StarCounts::from_levels([0, 0, 0, 0, u64::MAX]);
    assert_eq!(stars.weighted_sum(), u64::MAX);
    stars += StarCounts::from_levels([1, 0, 0, 0, 1]);
    assert_eq!(stars.five, u64::MAX);
    assert_eq!(stars.total(), u64::MAX);

    let bounded = StarCounts::from_levels([MAX_STAR_COUNT; 5]);
    assert_eq!(bounded.weighted_sum(), 15 * MAX_STAR_COUNT);
    assert_eq!(bounded.mean(), Some(3.0));
  }

  #[test]
  fn star_counts_serialise_by_level() {
    let stars = StarCounts::from_levels([1, 0, 0, 0, 9]);
    let json = serde_json::to_value(stars).unwrap();
    assert_eq!(json, serde_json::json!({"1":1,"2":0,"3":0,"4":0,"5":9}));
  }

  #[test]
  fn infer_form_type() {
    assert_eq!(FormType::infer(&FormSignals::default()), FormType::Review);
    let flagged = FormSignals { any_issue_flagged: true, ..Default::default() };
    assert_eq!(FormType::infer(&flagged), FormType::Feedback);
    let commented = FormSignals { has_comments: true, ..Default::default() };
    assert_eq!(FormType::infer(&commented), FormType::Feedback);
    let expectation = FormSignals { expectation_supplied: true, ..Default::default() };
    assert_eq!(FormType::infer(&expectation), FormType::Feedback);
    let mixed = FormSignals { nature: NatureOfReview::Mixed, ..Default::default() };
    assert_eq!(FormType::infer(&mixed), FormType::Feedback);
  }

  #[test]
  fn create_derives_calendar_fields_and_clamps_review_count() {
    let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
    let mut input = NewRating::review("Bath Towel", "BT-1", CustomerSegment::Walmart, 4.0);
    input.total_review_count = 0;
    let rating = Rating::create(Uuid::new_v4(), at, input);
    assert_eq!((rating.year, rating.month, rating.day), (2024, 3, 9));
    assert_eq!(rating.total_review_count, 1);
    assert_eq!(rating.updated_at, at);
  }

  #[test]
  fn apply_leaves_derived_fields_alone() {
    let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    let mut rating = Rating::create(
      Uuid::new_v4(),
      at,
      NewRating::review("Bath Towel", "BT-1", CustomerSegment::Walmart, 4.0),
    );

    rating.apply(
      RatingPatch {
        star_counts: Some(StarCounts::from_levels([5, 0, 0, 0, 0])),
        quality_issue_flags: Some(BTreeMap::from([(QualityIssue::Stain, true)])),
        ..Default::default()
      },
      later,
    );

    assert_eq!(rating.overall_rating, 4.0);
    assert_eq!(rating.month, 3);
    assert!(rating.quality_issue_flags.get(QualityIssue::Stain));
    assert_eq!(rating.updated_at, later);
  }

  #[test]
  fn segment_labels() {
    assert_eq!(CustomerSegment::from_label("Sam's Club"), Some(CustomerSegment::SamsClub));
    assert_eq!(CustomerSegment::from_label("sams"), Some(CustomerSegment::SamsClub));
    assert_eq!(CustomerSegment::from_label(" WALMART "), Some(CustomerSegment::Walmart));
    assert_eq!(CustomerSegment::from_label("Target"), None);
    assert_eq!(CustomerSegment::SamsClub.as_str(), "Sam's Club");
  }
}
