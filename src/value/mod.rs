//! Input value model
//!
//! The search input is modelled as a closed union over the recognized value
//! shapes ([`SearchValue`]) instead of runtime type inspection. Criteria
//! maps ([`SearchDoc`]) are shared `Arc` handles with interior mutability so
//! that aliased and self-referential inputs are constructible; the
//! flattening pass guards against them by identity.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use bson::oid::ObjectId;
use bson::{Bson, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A search value in one of the recognized shapes.
///
/// `Bool` and `Null` round out JSON coverage; both are unmatched shapes at
/// dispatch and never produce a condition.
#[derive(Debug, Clone)]
pub enum SearchValue {
    /// Free-text criterion, matched as a case-insensitive substring.
    Str(String),
    /// Integral number, matched by equality.
    Int(i64),
    /// Floating-point number, matched by equality.
    Float(f64),
    /// Boolean; yields no condition.
    Bool(bool),
    /// Explicit null; yields no condition.
    Null,
    /// Timestamp, matched by equality.
    Date(DateTime<Utc>),
    /// Database-native identifier, matched by equality.
    Id(ObjectId),
    /// Array criterion; treated as terminal by flattening.
    Array(Vec<SearchValue>),
    /// Bounded date range; treated as terminal by flattening.
    Range(DateRange),
    /// Nested criteria map; flattening descends into it.
    Object(Arc<SearchDoc>),
}

/// Optional inclusive date bounds, replacing the duck-typed `from`/`to`
/// object detection of loosely-typed callers.
///
/// Bounds are kept as raw strings and parsed as dates at build time; an
/// unparseable bound degrades to an open-ended range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive lower bound, if any.
    pub from: Option<String>,
    /// Inclusive upper bound, if any.
    pub to: Option<String>,
}

impl DateRange {
    /// Create a range from optional bound strings
    pub fn new(from: Option<String>, to: Option<String>) -> Self {
        Self { from, to }
    }

    /// True when neither bound is present
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Render the raw bounds as a BSON document
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(from) = &self.from {
            doc.insert("from", Bson::String(from.clone()));
        }
        if let Some(to) = &self.to {
            doc.insert("to", Bson::String(to.clone()));
        }
        doc
    }
}

/// An order-preserving criteria map, shared by handle.
///
/// Insertion replaces an existing key in place, otherwise appends, so
/// iteration order is first-insertion order. The `Arc` handle doubles as
/// the identity the cycle guard tracks.
#[derive(Default)]
pub struct SearchDoc {
    entries: RwLock<Vec<(String, SearchValue)>>,
}

impl SearchDoc {
    /// Create an empty criteria map
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Insert or replace a criterion
    pub fn insert(&self, key: impl Into<String>, value: SearchValue) {
        let key = key.into();
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => entries.push((key, value)),
        }
    }

    /// Snapshot of the entries in insertion order
    pub fn entries(&self) -> Vec<(String, SearchValue)> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of criteria
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when the map holds no criteria
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the map as a BSON document (for `$elemMatch` patterns).
    ///
    /// A doc revisited during the conversion renders as `Bson::Null`, the
    /// same silent truncation the flattening pass applies.
    pub fn to_document(self: &Arc<Self>) -> Document {
        match SearchValue::Object(Arc::clone(self)).to_bson() {
            Bson::Document(doc) => doc,
            _ => Document::new(),
        }
    }
}

// Keys only: a derived Debug would recurse forever on cyclic docs.
impl fmt::Debug for SearchDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_tuple("SearchDoc").field(&keys).finish()
    }
}

impl SearchValue {
    /// Map a JSON value into the closed union.
    ///
    /// Objects carrying a `from` or `to` key become a [`DateRange`]
    /// (non-string bounds are ignored); every other object becomes a nested
    /// [`SearchDoc`]. JSON values cannot alias, so inputs built this way
    /// never trip the cycle guard.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Self::Str(s.clone()),
            JsonValue::Array(items) => {
                Self::Array(items.iter().map(Self::from_json).collect())
            }
            JsonValue::Object(map) => {
                if map.contains_key("from") || map.contains_key("to") {
                    let bound = |key: &str| {
                        map.get(key).and_then(JsonValue::as_str).map(str::to_string)
                    };
                    Self::Range(DateRange::new(bound("from"), bound("to")))
                } else {
                    let doc = SearchDoc::new();
                    for (key, value) in map {
                        doc.insert(key.clone(), Self::from_json(value));
                    }
                    Self::Object(doc)
                }
            }
        }
    }

    /// Convert to a BSON value (used for `$in` lists and `$elemMatch`
    /// patterns). Nested docs convert recursively under an identity guard;
    /// a revisited doc becomes `Bson::Null`.
    pub fn to_bson(&self) -> Bson {
        let mut seen = HashSet::new();
        self.to_bson_guarded(&mut seen)
    }

    fn to_bson_guarded(&self, seen: &mut HashSet<*const SearchDoc>) -> Bson {
        match self {
            Self::Str(s) => Bson::String(s.clone()),
            Self::Int(i) => Bson::Int64(*i),
            Self::Float(f) => Bson::Double(*f),
            Self::Bool(b) => Bson::Boolean(*b),
            Self::Null => Bson::Null,
            Self::Date(d) => Bson::DateTime(bson::DateTime::from_chrono(*d)),
            Self::Id(oid) => Bson::ObjectId(*oid),
            Self::Array(items) => Bson::Array(
                items.iter().map(|item| item.to_bson_guarded(seen)).collect(),
            ),
            Self::Range(range) => Bson::Document(range.to_document()),
            Self::Object(inner) => {
                if !seen.insert(Arc::as_ptr(inner)) {
                    return Bson::Null;
                }
                let mut doc = Document::new();
                for (key, value) in inner.entries() {
                    doc.insert(key, value.to_bson_guarded(seen));
                }
                Bson::Document(doc)
            }
        }
    }
}

// Object handles compare by identity, everything else by value.
impl PartialEq for SearchValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Null, Self::Null) => true,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Id(a), Self::Id(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Range(a), Self::Range(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for SearchValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for SearchValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for SearchValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for SearchValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for SearchValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for SearchValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<ObjectId> for SearchValue {
    fn from(value: ObjectId) -> Self {
        Self::Id(value)
    }
}

impl From<DateRange> for SearchValue {
    fn from(value: DateRange) -> Self {
        Self::Range(value)
    }
}

impl From<Arc<SearchDoc>> for SearchValue {
    fn from(value: Arc<SearchDoc>) -> Self {
        Self::Object(value)
    }
}

impl From<Vec<SearchValue>> for SearchValue {
    fn from(value: Vec<SearchValue>) -> Self {
        Self::Array(value)
    }
}
