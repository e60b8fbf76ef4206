//! Adapters for historical submission payloads.
//!
//! Three generations of the feedback form are still in circulation:
//!
//! - **nested issues**: a `qualityIssues` object, a single `comboColor`
//!   field, `customer`, `ttlReviews` and `star1`..`star5`;
//! - **flat strings**: every checkbox as a top-level string (`"true"`, `""`),
//!   `combo` instead of `comboOrVariant`, misspelled keys;
//! - **canonical**: the shape [`crate::validate`] expects.
//!
//! [`upgrade`] rewrites the first two into the third. It only moves keys
//! around; value coercion stays in the validation layer. A canonical key
//! already present in the payload always wins over its legacy counterpart.

use serde_json::{Map, Value};

use crate::issue::QualityIssue;

/// Which generation of the form a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
  NestedIssues,
  FlatStrings,
  Canonical,
}

impl PayloadShape {
  pub fn detect(payload: &Map<String, Value>) -> Self {
    if payload.contains_key("qualityIssues") || payload.contains_key("comboColor") {
      Self::NestedIssues
    } else if payload.contains_key("combo")
      || payload.keys().any(|k| QualityIssue::from_key(k).is_some())
    {
      Self::FlatStrings
    } else {
      Self::Canonical
    }
  }
}

/// Rewrite a payload of any known shape into the canonical one.
pub fn upgrade(mut payload: Map<String, Value>) -> Map<String, Value> {
  let shape = PayloadShape::detect(&payload);

  rename(&mut payload, "customer", "customerSegment");
  rename(&mut payload, "ttlReviews", "totalReviewCount");
  gather_star_levels(&mut payload);

  match shape {
    PayloadShape::NestedIssues => {
      if let Some(combo_color) = payload.remove("comboColor") {
        if !payload.contains_key("color") {
          payload.insert("color".into(), combo_color.clone());
        }
        payload.entry("comboOrVariant").or_insert(combo_color);
      }
      rename(&mut payload, "qualityIssues", "qualityIssueFlags");
    }
    PayloadShape::FlatStrings => {
      rename(&mut payload, "combo", "comboOrVariant");
      lift_flags(&mut payload);
    }
    PayloadShape::Canonical => {}
  }

  payload
}

fn rename(payload: &mut Map<String, Value>, from: &str, to: &str) {
  if let Some(value) = payload.remove(from) {
    payload.entry(to).or_insert(value);
  }
}

/// `star1`..`star5` → `starCounts {"1".."5"}`.
fn gather_star_levels(payload: &mut Map<String, Value>) {
  let mut levels = Map::new();
  for level in 1..=5 {
    if let Some(count) = payload.remove(&format!("star{level}")) {
      levels.insert(level.to_string(), count);
    }
  }
  if !levels.is_empty() {
    payload
      .entry("starCounts")
      .or_insert(Value::Object(levels));
  }
}

/// Move top-level checkbox keys into `qualityIssueFlags`, under their
/// canonical names. Flags already in the nested map are kept.
fn lift_flags(payload: &mut Map<String, Value>) {
  let flag_keys: Vec<String> = payload
    .keys()
    .filter(|k| QualityIssue::from_key(k).is_some())
    .cloned()
    .collect();
  if flag_keys.is_empty() {
    return;
  }

  let mut flags = match payload.remove("qualityIssueFlags") {
    Some(Value::Object(existing)) => existing,
    _ => Map::new(),
  };
  for key in flag_keys {
    let (Some(value), Some(issue)) = (payload.remove(&key), QualityIssue::from_key(&key))
    else {
      continue;
    };
    flags.entry(issue.key()).or_insert(value);
  }
  payload.insert("qualityIssueFlags".into(), Value::Object(flags));
}
