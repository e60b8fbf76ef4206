//! Segment-based access policy.
//!
//! Admins see everything. Every other role is bound to one customer segment:
//! lists and aggregates are narrowed to it, single records outside it are
//! refused with [`Error::Forbidden`], and writes may only target it.

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::{
  error::{Error, Result},
  query::RatingFilter,
  rating::{CustomerSegment, Rating},
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  Sams,
  Walmart,
}

impl Role {
  /// The only segment this role may touch, or `None` for unrestricted.
  pub fn restriction(self) -> Option<CustomerSegment> {
    match self {
      Self::Admin => None,
      Self::Sams => Some(CustomerSegment::SamsClub),
      Self::Walmart => Some(CustomerSegment::Walmart),
    }
  }

  pub fn as_str(self) -> &'static str { self.into() }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub username: String,
  pub role:     Role,
}

impl Principal {
  pub fn new(username: impl Into<String>, role: Role) -> Self {
    Self { username: username.into(), role }
  }

  /// The caller used for tokenless requests when authentication is optional.
  pub fn public() -> Self { Self::new("public", Role::Admin) }

  pub fn restriction(&self) -> Option<CustomerSegment> { self.role.restriction() }
}

/// Narrow a requested filter to what `principal` may see. A restricted
/// principal's own segment replaces whatever segment was asked for.
pub fn effective_filter(principal: &Principal, mut filter: RatingFilter) -> RatingFilter {
  if let Some(segment) = principal.restriction() {
    filter.customer = Some(segment);
  }
  filter
}

/// Refuse a record outside the principal's segment.
pub fn authorize_record(principal: &Principal, record: &Rating) -> Result<()> {
  authorize_segment(principal, record.customer_segment, "access")
}

/// Refuse a write that targets another segment.
pub fn authorize_submission(principal: &Principal, segment: CustomerSegment) -> Result<()> {
  authorize_segment(principal, segment, "submit")
}

fn authorize_segment(
  principal: &Principal,
  segment: CustomerSegment,
  verb: &str,
) -> Result<()> {
  match principal.restriction() {
    Some(own) if own != segment => Err(Error::Forbidden(format!(
      "{} users can only {verb} {} data",
      own.as_str(),
      own.as_str()
    ))),
    _ => Ok(()),
  }
}
