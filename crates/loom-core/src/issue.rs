//! The quality-issue checklist.
//!
//! The checklist has grown across form revisions, so the key set is versioned
//! rather than closed: each key knows the revision that introduced it. A
//! stored record always carries a value for every key this build knows about.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

// ─── Issue keys ──────────────────────────────────────────────────────────────

/// One checkbox on the quality-feedback form.
///
/// The camelCase key is the wire and storage name. Misspellings and short
/// forms used by older form revisions are accepted on input only.
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
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
#[non_exhaustive]
pub enum QualityIssue {
  // ── Revision 1 ──────────────────────────────────────────────────────────
  OpenCorner,
  LooseThread,
  ThinFabric,
  UnravelingSeam,
  Unclear,
  PriceIssue,
  ShadeVariation,
  Lint,
  #[serde(alias = "shortQty")]
  #[strum(to_string = "shortQtyInPack", serialize = "shortQty")]
  ShortQtyInPack,
  ImproperHem,
  PoorQuality,
  Stain,
  DeliveryIssue,
  Absorbency,
  Wet,
  Hole,

  // ── Revision 2 ──────────────────────────────────────────────────────────
  HarshFeel,
  #[serde(alias = "skrinkage")]
  #[strum(to_string = "shrinkage", serialize = "skrinkage")]
  Shrinkage,
  Pilling,
  ColorBleeding,
  OutOfStock,
  #[serde(alias = "badSmall")]
  #[strum(to_string = "badSmell", serialize = "badSmall")]
  BadSmell,
  ShapeOut,
}

impl QualityIssue {
  /// The newest checklist revision this build understands.
  pub const LATEST_REVISION: u8 = 2;

  /// Every known issue, in checklist order.
  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }

  /// The canonical camelCase key.
  pub fn key(self) -> &'static str { self.into() }

  /// Parse a key, accepting the legacy spellings.
  pub fn from_key(key: &str) -> Option<Self> { key.parse().ok() }

  /// The form revision that introduced this checkbox.
  pub fn revision(self) -> u8 {
    match self {
      Self::HarshFeel
      | Self::Shrinkage
      | Self::Pilling
      | Self::ColorBleeding
      | Self::OutOfStock
      | Self::BadSmell
      | Self::ShapeOut => 2,
      _ => 1,
    }
  }
}

// ─── Flag set ────────────────────────────────────────────────────────────────

/// A complete checklist: every known issue maps to a boolean.
///
/// Construction always starts from "all false", so a key missing from the
/// input is stored as `false` rather than left undefined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<QualityIssue, bool>")]
pub struct QualityIssueFlags(BTreeMap<QualityIssue, bool>);

impl Default for QualityIssueFlags {
  fn default() -> Self {
    Self(QualityIssue::all().map(|issue| (issue, false)).collect())
  }
}

impl From<BTreeMap<QualityIssue, bool>> for QualityIssueFlags {
  fn from(partial: BTreeMap<QualityIssue, bool>) -> Self {
    let mut flags = Self::default();
    flags.0.extend(partial);
    flags
  }
}

impl QualityIssueFlags {
  pub fn get(&self, issue: QualityIssue) -> bool {
    self.0.get(&issue).copied().unwrap_or(false)
  }

  pub fn set(&mut self, issue: QualityIssue, value: bool) {
    self.0.insert(issue, value);
  }

  /// Overwrite only the issues present in `partial`.
  pub fn merge(&mut self, partial: &BTreeMap<QualityIssue, bool>) {
    self.0.extend(partial.iter().map(|(k, v)| (*k, *v)));
  }

  /// Issues currently flagged, in checklist order.
  pub fn raised(&self) -> impl Iterator<Item = QualityIssue> + '_ {
    self.0.iter().filter(|(_, v)| **v).map(|(k, _)| *k)
  }

  pub fn count(&self) -> usize { self.raised().count() }

  pub fn any(&self) -> bool { self.0.values().any(|v| *v) }

  pub fn iter(&self) -> impl Iterator<Item = (QualityIssue, bool)> + '_ {
    self.0.iter().map(|(k, v)| (*k, *v))
  }
}
