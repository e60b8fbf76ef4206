//! Validation of raw submission and update payloads.
//!
//! Payloads arrive as loose JSON from several generations of the form: numbers
//! as strings, checkboxes as `"on"`/`""`, misspelled keys. Everything is
//! coerced here, once, and every problem is reported together so a client can
//! fix the whole form in one round trip.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::Serialize;
use serde_json::{Map, Value};
use strum::IntoEnumIterator;

use crate::{
  issue::{QualityIssue, QualityIssueFlags},
  legacy,
  rating::{
    CustomerExpectation, CustomerSegment, FormSignals, FormType, NatureOfReview,
    MAX_STAR_COUNT, NewRating, RatingPatch, StarCounts, rating_from_histogram,
  },
};

/// Which endpoint a submission came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
  /// The full quality-feedback form.
  Feedback,
  /// A star-only review; detail fields are discarded.
  Review,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidField {
  pub field:  String,
  pub reason: String,
}

/// Every problem found in a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
  pub missing_fields: Vec<String>,
  pub invalid_fields: Vec<InvalidField>,
}

impl ValidationError {
  pub fn is_empty(&self) -> bool {
    self.missing_fields.is_empty() && self.invalid_fields.is_empty()
  }

  fn is_invalid(&self, field: &str) -> bool {
    self.invalid_fields.iter().any(|i| i.field == field)
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("validation failed")?;
    if !self.missing_fields.is_empty() {
      write!(f, "; missing: {}", self.missing_fields.join(", "))?;
    }
    if !self.invalid_fields.is_empty() {
      let invalid: Vec<String> = self
        .invalid_fields
        .iter()
        .map(|i| format!("{} ({})", i.field, i.reason))
        .collect();
      write!(f, "; invalid: {}", invalid.join(", "))?;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationError {}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Validate a new submission of either kind.
pub fn submission(
  payload: &Value,
  kind: SubmissionKind,
) -> Result<NewRating, ValidationError> {
  let payload = object(payload)?;
  let mut r = Reader::new(&payload);

  let product_description = r.required_text("productDescription");
  let item = r.required_text("item");
  let combo_or_variant = r.required_text("comboOrVariant");
  let color = r.required_text("color");
  let customer_segment = r.segment();
  if customer_segment.is_none() && !r.errors.is_invalid("customerSegment") {
    r.missing("customerSegment");
  }

  let star_counts = r.star_counts().unwrap_or_default();

  let mut overall_rating = r.rating();
  if overall_rating.is_none() && !r.errors.is_invalid("overallRating") {
    overall_rating = rating_from_histogram(&star_counts);
    if overall_rating.is_none() {
      r.missing("overallRating");
    }
  }

  let mut total_review_count = r.count("totalReviewCount");
  if total_review_count.is_none() && !r.errors.is_invalid("totalReviewCount") {
    total_review_count = Some(star_counts.total()).filter(|n| *n > 0);
    if total_review_count.is_none() {
      r.missing("totalReviewCount");
    }
  }

  let details = match kind {
    SubmissionKind::Review => Details::review(),
    SubmissionKind::Feedback => r.details(),
  };

  let (
    Some(product_description),
    Some(item),
    Some(combo_or_variant),
    Some(color),
    Some(customer_segment),
    Some(overall_rating),
    Some(total_review_count),
    Some(details),
  ) = (
    product_description,
    item,
    combo_or_variant,
    color,
    customer_segment,
    overall_rating,
    total_review_count,
    details,
  )
  else {
    return Err(r.errors);
  };
  if !r.errors.is_empty() {
    return Err(r.errors);
  }

  Ok(NewRating {
    product_description,
    item,
    combo_or_variant,
    color,
    customer_segment,
    star_counts,
    overall_rating,
    total_review_count: clamp_review_count(total_review_count),
    review_comments: details.review_comments,
    nature_of_review: details.nature_of_review,
    happy_customer: details.happy_customer,
    customer_expectation: details.customer_expectation,
    quality_issue_flags: details.quality_issue_flags,
    form_type: details.form_type,
  })
}

/// Validate a partial update.
///
/// Only keys that are present (and not `null`) produce a change. The
/// identity and the timestamp-derived fields are not patchable and are
/// silently dropped along with any other unknown key.
pub fn patch(payload: &Value) -> Result<RatingPatch, ValidationError> {
  let payload = object(payload)?;
  let mut r = Reader::new(&payload);

  let patch = RatingPatch {
    product_description:  r.replacement_text("productDescription"),
    item:                 r.replacement_text("item"),
    combo_or_variant:     r.replacement_text("comboOrVariant"),
    color:                r.replacement_text("color"),
    customer_segment:     r.segment(),
    star_counts:          r.star_counts(),
    overall_rating:       r.rating(),
    total_review_count:   r.count("totalReviewCount").map(clamp_review_count),
    review_comments:      r.comments(),
    nature_of_review:     r.choice("natureOfReview"),
    happy_customer:       r.boolean("happyCustomer"),
    customer_expectation: r.choice("customerExpectation"),
    quality_issue_flags:  r.flags(),
    form_type:            r.choice("formType"),
  };

  if r.errors.is_empty() { Ok(patch) } else { Err(r.errors) }
}

fn object(payload: &Value) -> Result<Map<String, Value>, ValidationError> {
  match payload {
    Value::Object(map) => Ok(legacy::upgrade(map.clone())),
    _ => Err(ValidationError {
      missing_fields: Vec::new(),
      invalid_fields: vec![InvalidField {
        field:  "body".into(),
        reason: "expected a JSON object".into(),
      }],
    }),
  }
}

fn clamp_review_count(n: u64) -> u32 { n.clamp(1, u32::MAX as u64) as u32 }

// ─── Review details ──────────────────────────────────────────────────────────

struct Details {
  review_comments:      String,
  nature_of_review:     NatureOfReview,
  happy_customer:       bool,
  customer_expectation: CustomerExpectation,
  quality_issue_flags:  QualityIssueFlags,
  form_type:            FormType,
}

impl Details {
  fn review() -> Option<Self> {
    Some(Self {
      review_comments:      String::new(),
      nature_of_review:     NatureOfReview::default(),
      happy_customer:       false,
      customer_expectation: CustomerExpectation::default(),
      quality_issue_flags:  QualityIssueFlags::default(),
      form_type:            FormType::Review,
    })
  }
}

// ─── Field reader ────────────────────────────────────────────────────────────

struct Reader<'a> {
  payload: &'a Map<String, Value>,
  errors:  ValidationError,
}

impl<'a> Reader<'a> {
  fn new(payload: &'a Map<String, Value>) -> Self {
    Self { payload, errors: ValidationError::default() }
  }

  /// A present, non-null value.
  fn get(&self, field: &str) -> Option<&'a Value> {
    match self.payload.get(field) {
      None | Some(Value::Null) => None,
      Some(value) => Some(value),
    }
  }

  fn missing(&mut self, field: &str) {
    self.errors.missing_fields.push(field.to_owned());
  }

  fn invalid(&mut self, field: &str, reason: impl Into<String>) {
    self.errors.invalid_fields.push(InvalidField {
      field:  field.to_owned(),
      reason: reason.into(),
    });
  }

  /// Trimmed text; blank counts as absent. Numbers are accepted as text
  /// since item codes are often typed as numbers.
  fn text(&mut self, field: &str) -> Option<String> {
    match self.get(field)? {
      Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_owned),
      Value::Number(n) => Some(n.to_string()),
      _ => {
        self.invalid(field, "expected text");
        None
      }
    }
  }

  fn required_text(&mut self, field: &str) -> Option<String> {
    let value = self.text(field);
    if value.is_none() && !self.errors.is_invalid(field) {
      self.missing(field);
    }
    value
  }

  /// For updates: a present required text field may not be cleared.
  fn replacement_text(&mut self, field: &str) -> Option<String> {
    let value = self.text(field);
    if value.is_none() && self.get(field).is_some() && !self.errors.is_invalid(field) {
      self.invalid(field, "must not be empty");
    }
    value
  }

  fn comments(&mut self) -> Option<String> {
    self.get("reviewComments")?;
    Some(self.text("reviewComments").unwrap_or_default())
  }

  fn segment(&mut self) -> Option<CustomerSegment> {
    let label = self.text("customerSegment")?;
    let segment = CustomerSegment::from_label(&label);
    if segment.is_none() {
      let expected: Vec<&str> = CustomerSegment::iter().map(CustomerSegment::as_str).collect();
      self.invalid("customerSegment", format!("expected one of {}", expected.join(", ")));
    }
    segment
  }

  fn rating(&mut self) -> Option<f64> {
    let value = self.get("overallRating")?;
    match as_number(value) {
      Ok(Some(v)) if (0.0..=5.0).contains(&v) => Some(v),
      Ok(Some(_)) => {
        self.invalid("overallRating", "must be between 0 and 5");
        None
      }
      Ok(None) => None,
      Err(reason) => {
        self.invalid("overallRating", reason);
        None
      }
    }
  }

  fn count(&mut self, field: &str) -> Option<u64> {
    let value = self.get(field)?;
    match as_count(value) {
      Ok(count) => count,
      Err(reason) => {
        self.invalid(field, reason);
        None
      }
    }
  }

  fn boolean(&mut self, field: &str) -> Option<bool> {
    let value = self.get(field)?;
    let coerced = as_bool(value);
    if coerced.is_none() {
      self.invalid(field, "expected a boolean");
    }
    coerced
  }

  fn choice<T>(&mut self, field: &str) -> Option<T>
  where
    T: FromStr + IntoEnumIterator + Into<&'static str>,
  {
    let label = self.text(field)?;
    let parsed = label.parse().ok();
    if parsed.is_none() {
      let expected: Vec<&'static str> = T::iter().map(Into::into).collect();
      self.invalid(field, format!("expected one of {}", expected.join(", ")));
    }
    parsed
  }

  fn star_counts(&mut self) -> Option<StarCounts> {
    let Value::Object(levels) = self.get("starCounts")? else {
      self.invalid("starCounts", "expected an object keyed by star level");
      return None;
    };

    let mut counts = [0u64; 5];
    let mut ok = true;
    for (slot, level) in counts.iter_mut().zip(1..) {
      let key = format!("{level}");
      let Some(raw) = levels.get(&key) else { continue };
      match as_count(raw) {
        Ok(Some(n)) if n > MAX_STAR_COUNT => {
          self.invalid(&format!("starCounts.{key}"), "exceeds 4294967295");
          ok = false;
        }
        Ok(n) => *slot = n.unwrap_or(0),
        Err(reason) => {
          self.invalid(&format!("starCounts.{key}"), reason);
          ok = false;
        }
      }
    }
    ok.then(|| StarCounts::from_levels(counts))
  }

  /// The flags present in the payload. Unknown keys are skipped.
  fn flags(&mut self) -> Option<BTreeMap<QualityIssue, bool>> {
    let Value::Object(raw) = self.get("qualityIssueFlags")? else {
      self.invalid("qualityIssueFlags", "expected an object of issue flags");
      return None;
    };

    let mut flags = BTreeMap::new();
    for (key, value) in raw {
      let Some(issue) = QualityIssue::from_key(key) else { continue };
      match as_bool(value) {
        Some(flag) => {
          flags.insert(issue, flag);
        }
        None => self.invalid(&format!("qualityIssueFlags.{key}"), "expected a boolean"),
      }
    }
    Some(flags)
  }

  fn details(&mut self) -> Option<Details> {
    let review_comments = self.comments().unwrap_or_default();
    let nature_of_review = self.choice("natureOfReview").unwrap_or_default();
    let happy_customer = self.boolean("happyCustomer").unwrap_or(false);
    let expectation = self.choice::<CustomerExpectation>("customerExpectation");
    let quality_issue_flags = QualityIssueFlags::from(self.flags().unwrap_or_default());
    let explicit_form = self.choice::<FormType>("formType");

    let form_type = explicit_form.unwrap_or_else(|| {
      FormType::infer(&FormSignals {
        any_issue_flagged: quality_issue_flags.any(),
        has_comments: !review_comments.is_empty(),
        happy_customer,
        expectation_supplied: expectation.is_some(),
        nature: nature_of_review,
      })
    });

    Some(Details {
      review_comments,
      nature_of_review,
      happy_customer,
      customer_expectation: expectation.unwrap_or_default(),
      quality_issue_flags,
      form_type,
    })
  }
}

// ─── Coercions ───────────────────────────────────────────────────────────────

/// A finite number from a JSON number or numeric string. Blank is absent.
fn as_number(value: &Value) -> Result<Option<f64>, &'static str> {
  let parsed = match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) if s.trim().is_empty() => return Ok(None),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  };
  match parsed {
    Some(v) if v.is_finite() => Ok(Some(v)),
    _ => Err("expected a number"),
  }
}

fn as_count(value: &Value) -> Result<Option<u64>, &'static str> {
  match as_number(value).map_err(|_| "expected a non-negative integer")? {
    None => Ok(None),
    Some(v) if v < 0.0 || v.fract() != 0.0 => Err("expected a non-negative integer"),
    // `u64::MAX as f64` rounds up to 2^64, so this admits exactly the
    // representable range.
    Some(v) if v >= u64::MAX as f64 => Err("number is too large"),
    Some(v) => Ok(Some(v as u64)),
  }
}

/// Checkbox coercion. `null`, blank, `false`, `0`, `no` and `off` are false;
/// any other text is true.
fn as_bool(value: &Value) -> Option<bool> {
  match value {
    Value::Null => Some(false),
    Value::Bool(b) => Some(*b),
    Value::Number(n) => Some(n.as_f64().is_some_and(|v| v != 0.0)),
    Value::String(s) => {
      let folded = s.trim().to_ascii_lowercase();
      Some(!matches!(folded.as_str(), "" | "false" | "0" | "no" | "off"))
    }
    _ => None,
  }
}
