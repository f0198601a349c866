//! Value normalization: range bounds, dense term lists, date values

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};

/// Bounds of a `range` clause.
///
/// Unset bounds and an unset `format` are omitted from the wire form
/// entirely; the engine treats a missing `format` differently from `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,

    /// Date format of the bound values (e.g. `yyyy-MM-dd`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl RangeBounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both bounds inclusive
    pub fn between(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self::new().gte(min).lte(max)
    }

    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    /// Attach a date format; `None` or an empty string leaves the key out
    pub fn with_format(mut self, format: Option<&str>) -> Self {
        self.format = format.filter(|f| !f.is_empty()).map(str::to_string);
        self
    }

    /// Wire form, e.g. `{"gte": 1, "lte": 10}`
    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();
        if let Some(v) = &self.gte {
            object.insert("gte".to_string(), v.clone());
        }
        if let Some(v) = &self.gt {
            object.insert("gt".to_string(), v.clone());
        }
        if let Some(v) = &self.lte {
            object.insert("lte".to_string(), v.clone());
        }
        if let Some(v) = &self.lt {
            object.insert("lt".to_string(), v.clone());
        }
        if let Some(format) = &self.format {
            object.insert("format".to_string(), Value::String(format.clone()));
        }
        Value::Object(object)
    }
}

/// Collect values into a contiguous, order-preserving array.
///
/// Callers holding keyed values with gaps (e.g. a `BTreeMap<usize, _>` with
/// keys 0 and 5) pass the values in key order; the result is indexed 0..n.
/// The engine only accepts a dense JSON array for `terms`.
pub fn dense_values<I, V>(values: I) -> Vec<Value>
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    values.into_iter().map(Into::into).collect()
}

/// A date used as a range bound or term value.
///
/// Rendered as RFC 3339 unless a chrono pattern is supplied. The pattern
/// controls how the value is written; the engine-side `format` key passed to
/// range conditions must describe the same layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateValue {
    rendered: String,
}

impl DateValue {
    /// RFC 3339 with the original offset, e.g. `2017-01-01T00:00:00+03:00`
    pub fn rfc3339<Tz>(datetime: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            rendered: datetime.to_rfc3339_opts(SecondsFormat::Secs, false),
        }
    }

    /// Render with a chrono pattern such as `%Y-%m-%d`.
    ///
    /// Fails on patterns chrono cannot render (e.g. an unknown `%Q`).
    pub fn with_pattern<Tz>(datetime: &DateTime<Tz>, pattern: &str) -> Result<Self>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut rendered = String::new();
        write!(rendered, "{}", datetime.format(pattern))
            .map_err(|_| CoreError::InvalidDatePattern(pattern.to_string()))?;
        Ok(Self { rendered })
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl From<DateValue> for Value {
    fn from(date: DateValue) -> Self {
        Value::String(date.rendered)
    }
}
