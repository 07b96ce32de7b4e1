//! SearchQ-RS: nested search criteria to MongoDB filter fragments
//!
//! Converts an arbitrary nested search object into a MongoDB `$match`
//! filter: nested keys are flattened into dot-addressed paths, each value
//! is mapped to a per-field operator by shape, and the results are joined
//! into a single `$and` conjunction.
//!
//! The whole crate is a pure, synchronous value transformation. It never
//! executes queries, never touches a connection, and never raises:
//! unmatched or malformed values are silently omitted, and self-referential
//! inputs are truncated instead of looping.

pub mod filter;
pub mod flatten;
pub mod normalize;
pub mod query;
pub mod value;

pub use filter::{FieldCondition, FilterFragment, MatchCondition};
pub use query::{build_filter, build_filter_json, match_condition};
pub use value::{DateRange, SearchDoc, SearchValue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
