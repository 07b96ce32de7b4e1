//! Filter output model
//!
//! The five operator shapes the database layer must support, plus the
//! per-field and whole-filter containers that render them into MongoDB
//! query documents.

use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Options flag attached to every pattern match
const REGEX_OPTIONS: &str = "i";

/// A single-field filter operator.
///
/// This enum is the complete external contract: equality, case-insensitive
/// substring regex, set membership, element match, and inclusive range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldCondition {
    /// Exact equality against a BSON value
    Eq(Bson),
    /// Case-insensitive substring match against an escaped literal
    Regex {
        /// Escaped, diacritic-stripped literal
        pattern: String,
    },
    /// Membership in the listed values (`$in`)
    In(Vec<Bson>),
    /// At least one array element matches the sub-pattern (`$elemMatch`)
    ElemMatch(Document),
    /// Inclusive date bounds (`$gte`/`$lte`); at least one side is present
    Between {
        /// Inclusive lower bound
        from: Option<DateTime<Utc>>,
        /// Inclusive upper bound
        to: Option<DateTime<Utc>>,
    },
}

impl FieldCondition {
    /// Render the operator as the BSON value placed under the field key
    pub fn to_bson(&self) -> Bson {
        match self {
            Self::Eq(value) => value.clone(),
            Self::Regex { pattern } => {
                Bson::Document(doc! { "$regex": pattern, "$options": REGEX_OPTIONS })
            }
            Self::In(values) => Bson::Document(doc! { "$in": values.clone() }),
            Self::ElemMatch(pattern) => {
                Bson::Document(doc! { "$elemMatch": pattern.clone() })
            }
            Self::Between { from, to } => {
                let mut range = Document::new();
                if let Some(from) = from {
                    range.insert("$gte", Bson::DateTime(bson::DateTime::from_chrono(*from)));
                }
                if let Some(to) = to {
                    range.insert("$lte", Bson::DateTime(bson::DateTime::from_chrono(*to)));
                }
                Bson::Document(range)
            }
        }
    }
}

/// One flattened field paired with its operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCondition {
    /// Dot-addressed field path
    pub path: String,
    /// Operator applied to the field
    pub condition: FieldCondition,
}

impl MatchCondition {
    /// Pair a field path with an operator
    pub fn new(path: impl Into<String>, condition: FieldCondition) -> Self {
        Self {
            path: path.into(),
            condition,
        }
    }

    /// Render as `{ <path>: <operator> }`
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(self.path.clone(), self.condition.to_bson());
        doc
    }
}

/// A non-empty conjunction of per-field conditions, in traversal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterFragment {
    conditions: Vec<MatchCondition>,
}

impl FilterFragment {
    /// Wrap the collected conditions; `None` when there are none
    pub fn new(conditions: Vec<MatchCondition>) -> Option<Self> {
        if conditions.is_empty() {
            None
        } else {
            Some(Self { conditions })
        }
    }

    /// The conditions in traversal order
    pub fn conditions(&self) -> &[MatchCondition] {
        &self.conditions
    }

    /// Render as `{ "$and": [...] }`
    pub fn to_document(&self) -> Document {
        let clauses: Vec<Document> = self
            .conditions
            .iter()
            .map(MatchCondition::to_document)
            .collect();
        doc! { "$and": clauses }
    }

    /// Render as the aggregation stage `{ "$match": { "$and": [...] } }`
    pub fn to_match_stage(&self) -> Document {
        doc! { "$match": self.to_document() }
    }
}
