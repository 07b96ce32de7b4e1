//! Flattening pass
//!
//! Depth-first traversal of a criteria map into dot-addressed paths.
//! Nested maps are descended into; arrays, dates, identifiers, and ranges
//! are terminal. A visited set keyed by map identity stops descent into any
//! map seen before, so self-referential input yields the partial result
//! collected up to the cycle instead of looping.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;

use crate::value::{SearchDoc, SearchValue};

/// Flatten a criteria map into `(dot.path, terminal value)` pairs in
/// traversal order.
pub fn flatten(search: &Arc<SearchDoc>) -> Vec<(String, SearchValue)> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    flatten_into(search, "", &mut out, &mut seen);
    out
}

fn flatten_into(
    doc: &Arc<SearchDoc>,
    prefix: &str,
    out: &mut Vec<(String, SearchValue)>,
    seen: &mut HashSet<*const SearchDoc>,
) {
    if !seen.insert(Arc::as_ptr(doc)) {
        trace!("revisited criteria map at '{}', truncating descent", prefix);
        return;
    }

    for (key, value) in doc.entries() {
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            SearchValue::Object(child) => flatten_into(&child, &path, out, seen),
            terminal => out.push((path, terminal)),
        }
    }
}
