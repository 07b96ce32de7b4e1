//! End-to-end query builder harness.
//!
//! # What this covers
//!
//! The full pipeline — flatten, per-field dispatch, assembly — exercised
//! through the public API with rendered BSON as the oracle:
//!
//! - The operator contract: equality, case-insensitive escaped regex,
//!   `$in`, `$elemMatch`, and inclusive `$gte`/`$lte` ranges.
//! - Dot-path flattening of nested criteria, in traversal order.
//! - Degradation: blank strings, unmatched shapes, and empty input yield
//!   `None` rather than an error; cyclic input terminates with the partial
//!   result.
//! - Parity between the typed API and the JSON ingestion path.
//!
//! # What this does NOT cover
//!
//! - Executing the rendered filter against a live database.
//!
//! # Running
//!
//! ```sh
//! cargo test --test query_harness
//! ```

use std::sync::Arc;

use bson::doc;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

use searchq::{build_filter, build_filter_json, DateRange, SearchDoc, SearchValue};

// ---------------------------------------------------------------------------
// The spec'd end-to-end examples
// ---------------------------------------------------------------------------

/// `{name: "José"}` → case-insensitive substring match on the stripped
/// literal.
#[test]
fn accented_string_becomes_insensitive_regex() {
    let fragment = build_filter_json(&json!({ "name": "José" })).unwrap();
    assert_eq!(
        fragment.to_match_stage(),
        doc! { "$match": { "$and": [
            { "name": { "$regex": "Jose", "$options": "i" } },
        ] } }
    );
}

/// `{age: 30}` → bare equality.
#[test]
fn number_becomes_equality() {
    let fragment = build_filter_json(&json!({ "age": 30 })).unwrap();
    assert_eq!(
        fragment.to_document(),
        doc! { "$and": [ { "age": 30_i64 } ] }
    );
}

/// `{tags: ["a","b"]}` → set membership.
#[test]
fn scalar_array_becomes_membership() {
    let fragment = build_filter_json(&json!({ "tags": ["a", "b"] })).unwrap();
    assert_eq!(
        fragment.to_document(),
        doc! { "$and": [ { "tags": { "$in": ["a", "b"] } } ] }
    );
}

/// `{createdAt: {from, to}}` → inclusive date range.
#[test]
fn range_object_becomes_bounded_comparison() {
    let fragment = build_filter_json(&json!({
        "createdAt": { "from": "2024-01-01", "to": "2024-12-31" }
    }))
    .unwrap();

    let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
    assert_eq!(
        fragment.to_document(),
        doc! { "$and": [ { "createdAt": {
            "$gte": bson::DateTime::from_chrono(from),
            "$lte": bson::DateTime::from_chrono(to),
        } } ] }
    );
}

/// `{profile: {city: "NYC"}}` → flattened to `profile.city`.
#[test]
fn nested_object_flattens_to_dot_path() {
    let fragment = build_filter_json(&json!({ "profile": { "city": "NYC" } })).unwrap();
    assert_eq!(
        fragment.to_document(),
        doc! { "$and": [
            { "profile.city": { "$regex": "NYC", "$options": "i" } },
        ] }
    );
}

/// `{}` → no filter.
#[test]
fn empty_input_yields_none() {
    assert!(build_filter_json(&json!({})).is_none());
}

// ---------------------------------------------------------------------------
// Degradation
// ---------------------------------------------------------------------------

/// Blank strings, booleans, and nulls contribute nothing; when nothing is
/// left, the whole result is `None`.
#[test]
fn all_unmatched_keys_yield_none() {
    let input = json!({
        "q": "   ",
        "active": true,
        "deleted_at": null,
    });
    assert!(build_filter_json(&input).is_none());
}

/// Unmatched keys drop out individually while their siblings survive.
#[test]
fn unmatched_keys_drop_while_siblings_survive() {
    let fragment = build_filter_json(&json!({
        "q": "",
        "age": 30,
        "active": false,
    }))
    .unwrap();
    assert_eq!(
        fragment.to_document(),
        doc! { "$and": [ { "age": 30_i64 } ] }
    );
}

/// A self-referential criteria map terminates and keeps everything
/// collected outside the cycle.
#[test]
fn cyclic_input_terminates_with_partial_filter() {
    let doc = SearchDoc::new();
    doc.insert("name", SearchValue::from("ada"));
    doc.insert("loop", SearchValue::Object(Arc::clone(&doc)));
    doc.insert("age", SearchValue::Int(30));

    let fragment = build_filter(&doc).unwrap();
    assert_eq!(
        fragment.to_document(),
        doc! { "$and": [
            { "name": { "$regex": "ada", "$options": "i" } },
            { "age": 30_i64 },
        ] }
    );
}

// ---------------------------------------------------------------------------
// Typed-only shapes (dates, identifiers, element-match arrays)
// ---------------------------------------------------------------------------

/// Date and identifier values use exact equality, same as numbers.
#[test]
fn dates_and_ids_match_by_equality() {
    let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let oid = bson::oid::ObjectId::new();

    let doc = SearchDoc::new();
    doc.insert("updated_at", SearchValue::Date(ts));
    doc.insert("owner", SearchValue::Id(oid));

    let fragment = build_filter(&doc).unwrap();
    assert_eq!(
        fragment.to_document(),
        doc! { "$and": [
            { "updated_at": bson::DateTime::from_chrono(ts) },
            { "owner": oid },
        ] }
    );
}

/// An array whose first element is a map becomes `$elemMatch` on that map;
/// later elements are not consulted.
#[test]
fn object_led_array_becomes_element_match() {
    let fragment = build_filter_json(&json!({
        "items": [ { "sku": "x", "qty": 2 }, "ignored" ]
    }))
    .unwrap();
    assert_eq!(
        fragment.to_document(),
        doc! { "$and": [
            { "items": { "$elemMatch": { "sku": "x", "qty": 2_i64 } } },
        ] }
    );
}

/// An array whose first element is range-shaped is still map-led: it
/// becomes `$elemMatch` on the raw bounds, not `$in`.
#[test]
fn range_led_array_becomes_element_match() {
    let fragment = build_filter_json(&json!({
        "items": [ { "from": "2024-01-01" } ]
    }))
    .unwrap();
    assert_eq!(
        fragment.to_document(),
        doc! { "$and": [
            { "items": { "$elemMatch": { "from": "2024-01-01" } } },
        ] }
    );
}

/// Open-ended range: one missing bound is simply omitted.
#[test]
fn half_open_range_omits_missing_bound() {
    let doc = SearchDoc::new();
    doc.insert(
        "created_at",
        SearchValue::Range(DateRange::new(Some("2024-01-01".into()), None)),
    );

    let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let fragment = build_filter(&doc).unwrap();
    assert_eq!(
        fragment.to_document(),
        doc! { "$and": [
            { "created_at": { "$gte": bson::DateTime::from_chrono(from) } },
        ] }
    );
}

// ---------------------------------------------------------------------------
// Ordering and parity
// ---------------------------------------------------------------------------

/// Conditions come out in flattening traversal order, depth-first.
#[test]
fn conditions_preserve_traversal_order() {
    let fragment = build_filter_json(&json!({
        "profile": { "city": "NYC", "zip": "10001" },
        "age": 30,
    }))
    .unwrap();

    let paths: Vec<&str> = fragment
        .conditions()
        .iter()
        .map(|c| c.path.as_str())
        .collect();
    assert_eq!(paths, vec!["profile.city", "profile.zip", "age"]);
}

/// The typed API and the JSON path render identical filters for the same
/// criteria.
#[test]
fn typed_and_json_paths_agree() {
    let profile = SearchDoc::new();
    profile.insert("city", SearchValue::from("NYC"));
    let typed = SearchDoc::new();
    typed.insert("name", SearchValue::from("José"));
    typed.insert("profile", SearchValue::Object(profile));
    typed.insert("tags", SearchValue::Array(vec![
        SearchValue::from("a"),
        SearchValue::from("b"),
    ]));

    let from_typed = build_filter(&typed).unwrap().to_document();
    let from_json = build_filter_json(&json!({
        "name": "José",
        "profile": { "city": "NYC" },
        "tags": ["a", "b"],
    }))
    .unwrap()
    .to_document();

    assert_eq!(from_typed, from_json);
}
