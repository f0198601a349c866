//! Field-scoped conditions
//!
//! `Where` is what `SearchQuery::where_field` hands back. Each condition
//! method turns the field and its arguments into one clause, appends it to
//! the query and returns the query, so calls chain:
//!
//! ```rust,ignore
//! query
//!     .where_field("channel").is_in([1, 2, 3])
//!     .where_field("publicDate").greater_or_equal("2017-01-01", Some("yyyy-MM-dd"))
//!     .where_field(["title", "body"]).match_text("alice");
//! ```

use quarry_core::{dense_values, ClauseKind, FieldRef, RangeBounds};
use serde_json::{json, Value};

use crate::query::SearchQuery;

/// A condition builder bound to one field (or field group) of a query
#[derive(Debug)]
pub struct Where<'a> {
    field: FieldRef,
    query: &'a mut SearchQuery,
}

impl<'a> Where<'a> {
    pub(crate) fn new(query: &'a mut SearchQuery, field: FieldRef) -> Self {
        Self { field, query }
    }

    /// The field this condition is scoped to
    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    /// Exact value match (`term`)
    pub fn equal(self, value: impl Into<Value>) -> &'a mut SearchQuery {
        let body = keyed(&self.field, value.into());
        self.query.add_filter(ClauseKind::Term, body)
    }

    /// Match any of the values (`terms`). Does not affect `_score`.
    pub fn is_in<I, V>(self, values: I) -> &'a mut SearchQuery
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let body = keyed(&self.field, Value::Array(dense_values(values)));
        self.query.add_filter(ClauseKind::Terms, body)
    }

    /// Inclusive range `[min, max]`; works for dates when `date_format` is set
    pub fn between(
        self,
        min: impl Into<Value>,
        max: impl Into<Value>,
        date_format: Option<&str>,
    ) -> &'a mut SearchQuery {
        let bounds = RangeBounds::between(min, max).with_format(date_format);
        self.range(bounds, false)
    }

    pub fn greater_or_equal(
        self,
        value: impl Into<Value>,
        date_format: Option<&str>,
    ) -> &'a mut SearchQuery {
        let bounds = RangeBounds::new().gte(value).with_format(date_format);
        self.range(bounds, false)
    }

    pub fn greater(self, value: impl Into<Value>, date_format: Option<&str>) -> &'a mut SearchQuery {
        let bounds = RangeBounds::new().gt(value).with_format(date_format);
        self.range(bounds, false)
    }

    pub fn less_or_equal(
        self,
        value: impl Into<Value>,
        date_format: Option<&str>,
    ) -> &'a mut SearchQuery {
        let bounds = RangeBounds::new().lte(value).with_format(date_format);
        self.range(bounds, false)
    }

    pub fn less(self, value: impl Into<Value>, date_format: Option<&str>) -> &'a mut SearchQuery {
        let bounds = RangeBounds::new().lt(value).with_format(date_format);
        self.range(bounds, false)
    }

    /// Full-text match. Affects `_score`.
    ///
    /// A field group produces a `multi_match` over all of its fields.
    pub fn match_text(self, text: impl Into<String>) -> &'a mut SearchQuery {
        let (kind, body) = text_match(&self.field, text.into());
        self.query.add_filter(kind, body)
    }

    /// The field has a non-null value
    pub fn exists(self) -> &'a mut SearchQuery {
        let body = json!({ "field": self.field.key() });
        self.query.add_filter(ClauseKind::Exists, body)
    }

    /// Negated `equal`
    pub fn not(self, value: impl Into<Value>) -> &'a mut SearchQuery {
        let body = keyed(&self.field, value.into());
        self.query.add_not_filter(ClauseKind::Term, body)
    }

    /// Negated `is_in`
    pub fn not_in<I, V>(self, values: I) -> &'a mut SearchQuery
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let body = keyed(&self.field, Value::Array(dense_values(values)));
        self.query.add_not_filter(ClauseKind::Terms, body)
    }

    /// Negated `between`: the value lies outside `[min, max]`
    pub fn not_between(
        self,
        min: impl Into<Value>,
        max: impl Into<Value>,
        date_format: Option<&str>,
    ) -> &'a mut SearchQuery {
        let bounds = RangeBounds::between(min, max).with_format(date_format);
        self.range(bounds, true)
    }

    /// Negated `match_text`
    pub fn not_match(self, text: impl Into<String>) -> &'a mut SearchQuery {
        let (kind, body) = text_match(&self.field, text.into());
        self.query.add_not_filter(kind, body)
    }

    /// Negated `exists`: the field is missing or null
    pub fn not_exists(self) -> &'a mut SearchQuery {
        let body = json!({ "field": self.field.key() });
        self.query.add_not_filter(ClauseKind::Exists, body)
    }

    fn range(self, bounds: RangeBounds, negate: bool) -> &'a mut SearchQuery {
        let body = keyed(&self.field, bounds.to_json());
        if negate {
            self.query.add_not_filter(ClauseKind::Range, body)
        } else {
            self.query.add_filter(ClauseKind::Range, body)
        }
    }
}

/// `{field: payload}`
fn keyed(field: &FieldRef, payload: Value) -> Value {
    let mut object = serde_json::Map::new();
    object.insert(field.key(), payload);
    Value::Object(object)
}

fn text_match(field: &FieldRef, text: String) -> (ClauseKind, Value) {
    match field {
        FieldRef::Group(_) => (
            ClauseKind::MultiMatch,
            json!({ "query": text, "fields": field.to_json() }),
        ),
        FieldRef::Single(_) => (ClauseKind::Match, keyed(field, Value::String(text))),
    }
}
