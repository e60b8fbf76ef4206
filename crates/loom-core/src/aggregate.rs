//! The aggregation engine behind the analytics dashboard.
//!
//! Every view here is a pure reduction over a slice of records that has
//! already been filtered (and narrowed by the access policy). Empty input
//! produces zeroes, never an error. A record whose `overall_rating` breaks the
//! record invariant fails the whole aggregation with
//! [`Error::MalformedRecord`] instead of skewing an average.
//!
//! Averages come from one of two sources, chosen per [`Aggregator`]:
//! the mean of each record's `overall_rating`, or the pooled count-weighted
//! mean of all star histograms. Views that report an average also report the
//! source.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
  error::{Error, Result},
  issue::QualityIssue,
  rating::{CustomerExpectation, FormType, Rating, StarCounts},
};

/// Periods kept by the bounded trend views.
pub const TREND_WINDOW: usize = 12;
pub const DASHBOARD_TOP_PRODUCTS: usize = 10;
pub const DETAILED_TOP_PRODUCTS: usize = 15;

// ─── Numeric helpers ─────────────────────────────────────────────────────────

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
  let factor = 10f64.powi(places);
  (value * factor).round() / factor
}

/// `100 × part / whole` to 2 decimals; 0 when `whole` is 0.
pub fn percent(part: u64, whole: u64) -> f64 {
  if whole == 0 {
    0.0
  } else {
    round_to(100.0 * part as f64 / whole as f64, 2)
  }
}

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RatingSource {
  /// Mean of per-record `overall_rating`.
  #[default]
  Overall,
  /// Pooled count-weighted mean of the star histograms.
  Histogram,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RankingOrder {
  /// `average_rating` descending.
  #[default]
  HighestRated,
  /// `issue_count` ascending.
  FewestIssues,
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DashboardKind {
  #[default]
  Feedback,
  Reviews,
}

impl DashboardKind {
  pub fn ranking(self) -> RankingOrder {
    match self {
      Self::Feedback => RankingOrder::FewestIssues,
      Self::Reviews => RankingOrder::HighestRated,
    }
  }
}

// ─── Accumulator ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct Tally {
  records:         u64,
  reviews:         u64,
  rating_sum:      f64,
  stars:           StarCounts,
  happy:           u64,
  expectation_met: u64,
  issues:          u64,
}

impl Tally {
  fn add(&mut self, r: &Rating) {
    self.records += 1;
    self.reviews += u64::from(r.total_review_count);
    self.rating_sum += r.overall_rating;
    self.stars += r.star_counts;
    self.happy += u64::from(r.happy_customer);
    self.expectation_met += u64::from(r.customer_expectation == CustomerExpectation::Met);
    self.issues += r.issue_count() as u64;
  }

  fn average(&self, source: RatingSource) -> f64 {
    let mean = match source {
      RatingSource::Overall if self.records > 0 => self.rating_sum / self.records as f64,
      RatingSource::Overall => 0.0,
      RatingSource::Histogram => self.stars.mean().unwrap_or(0.0),
    };
    round_to(mean, 2)
  }

  fn satisfaction(&self) -> f64 { percent(self.happy, self.records) }
}

fn check(r: &Rating) -> Result<()> {
  if r.overall_rating.is_finite() && (0.0..=5.0).contains(&r.overall_rating) {
    Ok(())
  } else {
    Err(Error::MalformedRecord {
      id:     r.id,
      reason: format!("overall rating {} is outside 0..=5", r.overall_rating),
    })
  }
}

fn check_all(records: &[Rating]) -> Result<()> { records.iter().try_for_each(check) }

// ─── Output types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallSummary {
  pub total_ratings:        u64,
  pub total_reviews:        u64,
  pub average_rating:       f64,
  pub happy_customers:      u64,
  pub unhappy_customers:    u64,
  pub satisfaction_rate:    f64,
  pub expectation_met_rate: f64,
  pub total_issues:         u64,
  pub rating_source:        RatingSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingBucket {
  pub range: String,
  pub min:   f64,
  pub max:   f64,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPoint {
  /// `YYYY-MM`.
  pub period:            String,
  pub year:              i32,
  pub month:             u32,
  pub average_rating:    f64,
  pub count:             u64,
  pub total_reviews:     u64,
  pub satisfaction_rate: f64,
  pub stars:             StarCounts,
  /// Average rating minus the preceding period's; `None` for the first.
  pub change:            Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
  pub product:           String,
  pub average_rating:    f64,
  pub total_ratings:     u64,
  pub total_reviews:     u64,
  pub happy_customers:   u64,
  pub satisfaction_rate: f64,
  pub issue_count:       u64,
  pub stars:             StarCounts,
}

/// Count of records flagging each quality issue. Every known issue is
/// present, including those never flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IssueTally(BTreeMap<QualityIssue, u64>);

impl IssueTally {
  pub fn get(&self, issue: QualityIssue) -> u64 { self.0.get(&issue).copied().unwrap_or(0) }

  pub fn total(&self) -> u64 { self.0.values().sum() }

  pub fn iter(&self) -> impl Iterator<Item = (QualityIssue, u64)> + '_ {
    self.0.iter().map(|(k, v)| (*k, *v))
  }
}

/// One slice of a categorical distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
  pub name:       &'static str,
  pub count:      u64,
  pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTypeStats {
  pub form_type:      FormType,
  pub count:          u64,
  pub average_rating: f64,
  pub total_reviews:  u64,
  pub rating_source:  RatingSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SatisfactionSplit {
  pub happy:             u64,
  pub unhappy:           u64,
  pub satisfaction_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
  pub kind:                DashboardKind,
  pub overall:             OverallSummary,
  pub star_distribution:   StarCounts,
  pub rating_distribution: Vec<RatingBucket>,
  pub monthly_trend:       Vec<MonthlyPoint>,
  pub top_products:        Vec<ProductStats>,
  pub quality_issues:      IssueTally,
  pub nature_of_review:    Vec<Share>,
  pub expectations:        Vec<Share>,
  pub customer_segments:   Vec<Share>,
  pub form_types:          Vec<Share>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnalytics {
  pub overall:             OverallSummary,
  pub monthly_trend:       Vec<MonthlyPoint>,
  pub top_products:        Vec<ProductStats>,
  pub quality_issues:      IssueTally,
  pub rating_distribution: Vec<RatingBucket>,
  pub satisfaction:        SatisfactionSplit,
}

// ─── Aggregator ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
  source: RatingSource,
}

impl Aggregator {
  pub fn new(source: RatingSource) -> Self { Self { source } }

  pub fn source(&self) -> RatingSource { self.source }

  pub fn overall(&self, records: &[Rating]) -> Result<OverallSummary> {
    check_all(records)?;
    let mut t = Tally::default();
    records.iter().for_each(|r| t.add(r));

    Ok(OverallSummary {
      total_ratings:        t.records,
      total_reviews:        t.reviews,
      average_rating:       t.average(self.source),
      happy_customers:      t.happy,
      unhappy_customers:    t.records - t.happy,
      satisfaction_rate:    t.satisfaction(),
      expectation_met_rate: percent(t.expectation_met, t.records),
      total_issues:         t.issues,
      rating_source:        self.source,
    })
  }

  pub fn star_distribution(&self, records: &[Rating]) -> StarCounts {
    records.iter().fold(StarCounts::default(), |mut acc, r| {
      acc += r.star_counts;
      acc
    })
  }

  /// Records per whole-star band. A rating of exactly 5 falls in the top
  /// band, so there are always five buckets.
  pub fn rating_distribution(&self, records: &[Rating]) -> Result<Vec<RatingBucket>> {
    check_all(records)?;
    let mut counts = [0u64; 5];
    for r in records {
      let band = (r.overall_rating.floor() as usize).min(4);
      counts[band] += 1;
    }

    Ok(
      counts
        .iter()
        .zip(0u32..)
        .map(|(count, low)| RatingBucket {
          range: format!("{}-{}", low, low + 1),
          min:   f64::from(low),
          max:   f64::from(low + 1),
          count: *count,
        })
        .collect(),
    )
  }

  /// Per-month figures in ascending period order.
  ///
  /// `change` is computed over the full series, so the first period kept by
  /// `window` still reports its change from the period before it.
  pub fn monthly_trend(
    &self,
    records: &[Rating],
    window: Option<usize>,
  ) -> Result<Vec<MonthlyPoint>> {
    check_all(records)?;
    let mut months: BTreeMap<(i32, u32), Tally> = BTreeMap::new();
    for r in records {
      months.entry((r.year, r.month)).or_default().add(r);
    }

    let mut previous: Option<f64> = None;
    let mut points: Vec<MonthlyPoint> = months
      .into_iter()
      .map(|((year, month), t)| {
        let average_rating = t.average(self.source);
        let change = previous.map(|p| round_to(average_rating - p, 2));
        previous = Some(average_rating);
        MonthlyPoint {
          period: format!("{year:04}-{month:02}"),
          year,
          month,
          average_rating,
          count: t.records,
          total_reviews: t.reviews,
          satisfaction_rate: t.satisfaction(),
          stars: t.stars,
          change,
        }
      })
      .collect();

    if let Some(window) = window {
      let excess = points.len().saturating_sub(window);
      points.drain(..excess);
    }
    Ok(points)
  }

  pub fn product_ranking(
    &self,
    records: &[Rating],
    order: RankingOrder,
    limit: Option<usize>,
  ) -> Result<Vec<ProductStats>> {
    check_all(records)?;
    let mut products: BTreeMap<&str, Tally> = BTreeMap::new();
    for r in records {
      products.entry(r.product_description.as_str()).or_default().add(r);
    }

    let mut ranked: Vec<ProductStats> = products
      .into_iter()
      .map(|(product, t)| ProductStats {
        product:           product.to_owned(),
        average_rating:    t.average(self.source),
        total_ratings:     t.records,
        total_reviews:     t.reviews,
        happy_customers:   t.happy,
        satisfaction_rate: t.satisfaction(),
        issue_count:       t.issues,
        stars:             t.stars,
      })
      .collect();

    // The map already yields products by name, and the sort is stable.
    match order {
      RankingOrder::HighestRated => {
        ranked.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating))
      }
      RankingOrder::FewestIssues => ranked.sort_by_key(|p| p.issue_count),
    }
    if let Some(limit) = limit {
      ranked.truncate(limit);
    }
    Ok(ranked)
  }

  pub fn issue_tally(&self, records: &[Rating]) -> IssueTally {
    let mut counts: BTreeMap<QualityIssue, u64> =
      QualityIssue::all().map(|issue| (issue, 0)).collect();
    for issue in records.iter().flat_map(|r| r.quality_issue_flags.raised()) {
      *counts.entry(issue).or_default() += 1;
    }
    IssueTally(counts)
  }

  pub fn nature_distribution(&self, records: &[Rating]) -> Vec<Share> {
    distribution(records, |r| r.nature_of_review)
  }

  pub fn expectation_distribution(&self, records: &[Rating]) -> Vec<Share> {
    distribution(records, |r| r.customer_expectation)
  }

  pub fn segment_distribution(&self, records: &[Rating]) -> Vec<Share> {
    distribution(records, |r| r.customer_segment)
  }

  pub fn form_type_distribution(&self, records: &[Rating]) -> Vec<Share> {
    distribution(records, |r| r.form_type)
  }

  pub fn form_type_stats(&self, records: &[Rating]) -> Result<Vec<FormTypeStats>> {
    check_all(records)?;
    Ok(
      FormType::iter()
        .map(|form_type| {
          let mut t = Tally::default();
          records
            .iter()
            .filter(|r| r.form_type == form_type)
            .for_each(|r| t.add(r));
          FormTypeStats {
            form_type,
            count: t.records,
            average_rating: t.average(self.source),
            total_reviews: t.reviews,
            rating_source: self.source,
          }
        })
        .collect(),
    )
  }

  pub fn dashboard(&self, records: &[Rating], kind: DashboardKind) -> Result<Dashboard> {
    Ok(Dashboard {
      kind,
      overall: self.overall(records)?,
      star_distribution: self.star_distribution(records),
      rating_distribution: self.rating_distribution(records)?,
      monthly_trend: self.monthly_trend(records, Some(TREND_WINDOW))?,
      top_products: self.product_ranking(
        records,
        kind.ranking(),
        Some(DASHBOARD_TOP_PRODUCTS),
      )?,
      quality_issues: self.issue_tally(records),
      nature_of_review: self.nature_distribution(records),
      expectations: self.expectation_distribution(records),
      customer_segments: self.segment_distribution(records),
      form_types: self.form_type_distribution(records),
    })
  }

  pub fn detailed(&self, records: &[Rating]) -> Result<DetailedAnalytics> {
    let overall = self.overall(records)?;
    let satisfaction = SatisfactionSplit {
      happy:             overall.happy_customers,
      unhappy:           overall.unhappy_customers,
      satisfaction_rate: overall.satisfaction_rate,
    };

    Ok(DetailedAnalytics {
      monthly_trend: self.monthly_trend(records, Some(TREND_WINDOW))?,
      top_products: self.product_ranking(
        records,
        RankingOrder::HighestRated,
        Some(DETAILED_TOP_PRODUCTS),
      )?,
      quality_issues: self.issue_tally(records),
      rating_distribution: self.rating_distribution(records)?,
      overall,
      satisfaction,
    })
  }
}

/// Group-by count over an enum with every variant present, in declaration
/// order.
fn distribution<T, F>(records: &[Rating], key: F) -> Vec<Share>
where
  T: IntoEnumIterator + PartialEq + Into<&'static str>,
  F: Fn(&Rating) -> T,
{
  let total = records.len() as u64;
  T::iter()
    .map(|variant| {
      let count = records.iter().filter(|&r| key(r) == variant).count() as u64;
      Share {
        name: variant.into(),
        count,
        percentage: percent(count, total),
      }
    })
    .collect()
}
