//! Query-string parameters shared by the rating and analytics endpoints.
//!
//! Every value arrives as text and is parsed here, so a malformed parameter
//! produces a JSON 400 naming it. Blank values count as absent.

use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};
use loom_core::{
  aggregate::{DashboardKind, RatingSource},
  query::{RatingFilter, RatingQuery, SortKey, SortOrder},
  rating::{CustomerSegment, FormType},
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
  // Filter
  pub year:           Option<String>,
  pub month:          Option<String>,
  pub customer:       Option<String>,
  pub form_type:      Option<String>,
  pub product:        Option<String>,
  pub min_rating:     Option<String>,
  pub max_rating:     Option<String>,
  pub start_date:     Option<String>,
  pub end_date:       Option<String>,
  // Paging and sorting
  pub page:           Option<String>,
  pub limit:          Option<String>,
  pub sort_by:        Option<String>,
  pub sort_order:     Option<String>,
  // Analytics
  pub dashboard_type: Option<String>,
  pub rating_source:  Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse<T: std::str::FromStr>(name: &str, value: &Option<String>) -> Result<Option<T>, ApiError> {
  present(value)
    .map(|v| {
      v.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {name}: {v:?}")))
    })
    .transpose()
}

/// `YYYY-MM-DD` (whole day) or a full RFC 3339 timestamp.
fn parse_date(
  name: &str,
  value: &Option<String>,
  time: NaiveTime,
) -> Result<Option<DateTime<Utc>>, ApiError> {
  let Some(v) = present(value) else { return Ok(None) };
  if let Ok(date) = NaiveDate::parse_from_str(v, "%Y-%m-%d") {
    return Ok(Some(date.and_time(time).and_utc()));
  }
  DateTime::parse_from_rfc3339(v)
    .map(|dt| Some(dt.with_timezone(&Utc)))
    .map_err(|_| ApiError::BadRequest(format!("invalid {name}: {v:?}")))
}

impl Params {
  /// The requested filter, before the access policy narrows it.
  pub fn filter(&self) -> Result<RatingFilter, ApiError> {
    let customer = match present(&self.customer) {
      None | Some("all") => None,
      Some(label) => Some(
        CustomerSegment::from_label(label)
          .ok_or_else(|| ApiError::BadRequest(format!("invalid customer: {label:?}")))?,
      ),
    };

    let end_of_day = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN);

    Ok(RatingFilter {
      year: parse("year", &self.year)?,
      month: parse("month", &self.month)?,
      customer,
      form_type: parse::<FormType>("formType", &self.form_type)?,
      product: present(&self.product).map(str::to_owned),
      min_rating: parse("minRating", &self.min_rating)?,
      max_rating: parse("maxRating", &self.max_rating)?,
      submitted_after: parse_date("startDate", &self.start_date, NaiveTime::MIN)?,
      submitted_before: parse_date("endDate", &self.end_date, end_of_day)?,
    })
  }

  /// Like [`Params::filter`], but an unbounded date range defaults to the
  /// last six months.
  pub fn recent_filter(&self, now: DateTime<Utc>) -> Result<RatingFilter, ApiError> {
    let mut filter = self.filter()?;
    if filter.submitted_after.is_none() && filter.submitted_before.is_none() {
      filter.submitted_after = now.checked_sub_months(Months::new(6));
      filter.submitted_before = Some(now);
    }
    Ok(filter)
  }

  /// A paged, sorted listing query over `filter`.
  pub fn query(&self, filter: RatingFilter) -> Result<RatingQuery, ApiError> {
    let by = present(&self.sort_by).map(SortKey::from_param).unwrap_or_default();
    let order = present(&self.sort_order).map(SortOrder::from_param).unwrap_or_default();
    Ok(
      RatingQuery::new(filter, parse("page", &self.page)?, parse("limit", &self.limit)?)
        .sorted(by, order),
    )
  }

  pub fn limit_or(&self, default: usize) -> Result<usize, ApiError> {
    Ok(parse("limit", &self.limit)?.unwrap_or(default))
  }

  pub fn dashboard_kind(&self) -> Result<DashboardKind, ApiError> {
    Ok(parse("dashboardType", &self.dashboard_type)?.unwrap_or_default())
  }

  pub fn rating_source(&self) -> Result<RatingSource, ApiError> {
    Ok(parse("ratingSource", &self.rating_source)?.unwrap_or_default())
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn params(pairs: &[(&str, &str)]) -> Params {
    let query: String = pairs
      .iter()
      .map(|(k, v)| format!("{k}={v}"))
      .collect::<Vec<_>>()
      .join("&");
    axum::extract::Query::<Params>::try_from_uri(
      &format!("/?{query}").parse().unwrap(),
    )
    .unwrap()
    .0
  }

  #[test]
  fn blank_values_are_absent() {
    let filter = params(&[("year", ""), ("customer", "all")]).filter().unwrap();
    assert_eq!(filter, RatingFilter::default());
  }

  #[test]
  fn filter_fields_parse() {
    let filter = params(&[
      ("year", "2024"),
      ("customer", "Walmart"),
      ("formType", "review"),
      ("minRating", "4"),
      ("startDate", "2024-01-01"),
      ("endDate", "2024-01-31"),
    ])
    .filter()
    .unwrap();
    assert_eq!(filter.year, Some(2024));
    assert_eq!(filter.customer, Some(CustomerSegment::Walmart));
    assert_eq!(filter.form_type, Some(FormType::Review));
    assert_eq!(filter.min_rating, Some(4.0));
    assert_eq!(
      filter.submitted_after,
      Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    );
    assert!(filter.submitted_before.unwrap() > Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap());
  }

  #[test]
  fn malformed_values_are_bad_requests() {
    assert!(matches!(
      params(&[("month", "june")]).filter(),
      Err(ApiError::BadRequest(_))
    ));
    assert!(params(&[("dashboardType", "weekly")]).dashboard_kind().is_err());
  }

  #[test]
  fn recent_filter_defaults_to_six_months() {
    let now = Utc.with_ymd_and_hms(2024, 9, 15, 0, 0, 0).unwrap();
    let filter = Params::default().recent_filter(now).unwrap();
    assert_eq!(filter.submitted_after, Some(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()));
    assert_eq!(filter.submitted_before, Some(now));
  }

  #[test]
  fn listing_defaults() {
    let q = Params::default().query(RatingFilter::default()).unwrap();
    assert_eq!((q.page, q.limit), (1, 20));
    assert_eq!((q.sort_by, q.sort_order), (SortKey::SubmittedAt, SortOrder::Desc));
  }
}
