//! Clauses and the boolean filter set they accumulate into

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};

/// The DSL keyword a clause is emitted under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    Term,
    Terms,
    Range,
    Match,
    MultiMatch,
    Exists,
    Script,
}

impl ClauseKind {
    /// The wire keyword for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ClauseKind::Term => "term",
            ClauseKind::Terms => "terms",
            ClauseKind::Range => "range",
            ClauseKind::Match => "match",
            ClauseKind::MultiMatch => "multi_match",
            ClauseKind::Exists => "exists",
            ClauseKind::Script => "script",
        }
    }

    /// Whether clauses of this kind contribute to relevance scoring
    pub fn is_scoring(&self) -> bool {
        matches!(self, ClauseKind::Match | ClauseKind::MultiMatch)
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single filter expression: `{ "<kind>": <body> }`
///
/// The body is stored as given. Its shape is not checked against the kind;
/// a malformed body surfaces only when the engine rejects the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub kind: ClauseKind,
    pub body: Value,
}

impl Clause {
    pub fn new(kind: ClauseKind, body: Value) -> Self {
        Self { kind, body }
    }

    /// Convert the clause to its wire form
    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert(self.kind.as_str().to_string(), self.body.clone());
        Value::Object(object)
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.kind.as_str(), &self.body)?;
        map.end()
    }
}

/// Positive and negated clauses of one boolean query, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterSet {
    pub must: Vec<Clause>,
    pub must_not: Vec<Clause>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positive clause
    pub fn push_must(&mut self, clause: Clause) {
        self.must.push(clause);
    }

    /// Append a negated clause
    pub fn push_must_not(&mut self, clause: Clause) {
        self.must_not.push(clause);
    }

    /// Total number of clauses in both lists
    pub fn len(&self) -> usize {
        self.must.len() + self.must_not.len()
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty()
    }

    /// Whether any positive clause affects `_score`
    pub fn has_scoring_clauses(&self) -> bool {
        self.must.iter().any(|c| c.kind.is_scoring())
    }

    pub fn clear(&mut self) {
        self.must.clear();
        self.must_not.clear();
    }

    /// Build `{"bool": {"must": [...], "must_not": [...]}}`
    ///
    /// Both arrays are always present so the emitted document does not
    /// depend on which lists happen to be empty.
    pub fn to_bool_query(&self) -> Value {
        let must: Vec<Value> = self.must.iter().map(Clause::to_json).collect();
        let must_not: Vec<Value> = self.must_not.iter().map(Clause::to_json).collect();
        json!({
            "bool": {
                "must": must,
                "must_not": must_not,
            }
        })
    }
}
