//! Query builder
//!
//! Top of the pipeline: flatten the criteria map, derive one operator per
//! flattened field by exhaustively matching the value shape, and join the
//! survivors into a single `$and` conjunction. Unmatched shapes and empty
//! strings yield no condition; an input producing no conditions at all
//! yields `None`, which callers may read as "no filter".

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::filter::{FieldCondition, FilterFragment, MatchCondition};
use crate::flatten::flatten;
use crate::normalize::pattern_literal;
use crate::value::{DateRange, SearchDoc, SearchValue};

/// Build a filter fragment from a criteria map.
///
/// Returns `None` when no key produced a condition (including the empty
/// map). Never fails: malformed values are omitted, cycles are truncated.
pub fn build_filter(search: &Arc<SearchDoc>) -> Option<FilterFragment> {
    let conditions = flatten(search)
        .into_iter()
        .filter_map(|(path, value)| match_condition(path, &value))
        .collect();
    FilterFragment::new(conditions)
}

/// Build a filter fragment from user-supplied JSON criteria.
///
/// Non-object roots carry no keyed criteria and yield `None`. Root-level
/// `from`/`to` keys are ordinary fields, not a range; range detection
/// applies to nested values only.
pub fn build_filter_json(search: &JsonValue) -> Option<FilterFragment> {
    let JsonValue::Object(map) = search else {
        return None;
    };
    let doc = SearchDoc::new();
    for (key, value) in map {
        doc.insert(key.clone(), SearchValue::from_json(value));
    }
    build_filter(&doc)
}

/// Derive the condition for one flattened field, or `None` when the value
/// shape yields nothing.
pub fn match_condition(path: impl Into<String>, value: &SearchValue) -> Option<MatchCondition> {
    let path = path.into();
    match field_condition(value) {
        Some(condition) => Some(MatchCondition::new(path, condition)),
        None => {
            trace!("no condition for '{}'", path);
            None
        }
    }
}

fn field_condition(value: &SearchValue) -> Option<FieldCondition> {
    match value {
        SearchValue::Str(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(FieldCondition::Regex {
                pattern: pattern_literal(trimmed),
            })
        }
        SearchValue::Int(n) => Some(FieldCondition::Eq(bson::Bson::Int64(*n))),
        SearchValue::Float(n) => Some(FieldCondition::Eq(bson::Bson::Double(*n))),
        SearchValue::Date(d) => Some(FieldCondition::Eq(bson::Bson::DateTime(
            bson::DateTime::from_chrono(*d),
        ))),
        SearchValue::Id(oid) => Some(FieldCondition::Eq(bson::Bson::ObjectId(*oid))),
        SearchValue::Array(items) => Some(array_condition(items)),
        SearchValue::Range(range) => range_condition(range),
        SearchValue::Object(doc) => Some(FieldCondition::ElemMatch(doc.to_document())),
        SearchValue::Bool(_) | SearchValue::Null => None,
    }
}

// Only the first element decides between element-match and membership;
// the shapes of later elements are deliberately not consulted. A map-shaped
// first element (nested map or range bounds) becomes the match pattern.
fn array_condition(items: &[SearchValue]) -> FieldCondition {
    match items.first() {
        Some(SearchValue::Object(first)) => FieldCondition::ElemMatch(first.to_document()),
        Some(SearchValue::Range(first)) => FieldCondition::ElemMatch(first.to_document()),
        _ => FieldCondition::In(items.iter().map(SearchValue::to_bson).collect()),
    }
}

fn range_condition(range: &DateRange) -> Option<FieldCondition> {
    if range.is_empty() {
        return None;
    }
    let from = range.from.as_deref().and_then(parse_date_bound);
    let to = range.to.as_deref().and_then(parse_date_bound);
    if from.is_none() && to.is_none() {
        return None;
    }
    Some(FieldCondition::Between { from, to })
}

/// Parse a range bound: RFC 3339 first, then bare `YYYY-MM-DD` at UTC
/// midnight.
pub fn parse_date_bound(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
