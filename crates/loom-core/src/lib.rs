//! Core types for the Loom rating backend.
//!
//! Holds the canonical rating record, the validation layer that turns raw
//! form payloads into records, the aggregation engine behind the dashboard,
//! and the segment-based access policy.
//!
//! Free of HTTP and database dependencies; every other crate depends on it.

pub mod access;
pub mod aggregate;
pub mod error;
pub mod issue;
pub mod legacy;
pub mod query;
pub mod rating;
pub mod store;
pub mod validate;

pub use error::{Error, Result};
