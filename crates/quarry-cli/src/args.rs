//! Command-line query options

use anyhow::{anyhow, bail, Context, Result};
use quarry_core::{FieldRef, SortOrder};
use quarry_query::SearchQuery;
use serde_json::Value;

/// Condition operators accepted by `--where`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Not,
    In,
    NotIn,
    Between,
    NotBetween,
    Gte,
    Gt,
    Lte,
    Lt,
    Match,
    NotMatch,
    Exists,
    NotExists,
}

impl Op {
    fn parse(s: &str) -> Result<Self> {
        let op = match s {
            "eq" => Op::Eq,
            "not" => Op::Not,
            "in" => Op::In,
            "not-in" => Op::NotIn,
            "between" => Op::Between,
            "not-between" => Op::NotBetween,
            "gte" => Op::Gte,
            "gt" => Op::Gt,
            "lte" => Op::Lte,
            "lt" => Op::Lt,
            "match" => Op::Match,
            "not-match" => Op::NotMatch,
            "exists" => Op::Exists,
            "not-exists" => Op::NotExists,
            other => bail!("Unknown operator: {}", other),
        };
        Ok(op)
    }

    fn takes_value(&self) -> bool {
        !matches!(self, Op::Exists | Op::NotExists)
    }
}

/// One `--where FIELD OP [VALUE]` condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: FieldRef,
    pub op: Op,
    pub value: Option<String>,
}

impl Condition {
    fn apply(&self, query: &mut SearchQuery) -> Result<()> {
        let condition = query.where_field(self.field.clone());
        let value = self.value.as_deref().unwrap_or_default();

        match self.op {
            Op::Eq => condition.equal(parse_value(value)),
            Op::Not => condition.not(parse_value(value)),
            Op::In => condition.is_in(parse_list(value)),
            Op::NotIn => condition.not_in(parse_list(value)),
            Op::Between => {
                let (min, max) = parse_range(value)?;
                condition.between(min, max, None)
            }
            Op::NotBetween => {
                let (min, max) = parse_range(value)?;
                condition.not_between(min, max, None)
            }
            Op::Gte => condition.greater_or_equal(parse_value(value), None),
            Op::Gt => condition.greater(parse_value(value), None),
            Op::Lte => condition.less_or_equal(parse_value(value), None),
            Op::Lt => condition.less(parse_value(value), None),
            Op::Match => condition.match_text(value),
            Op::NotMatch => condition.not_match(value),
            Op::Exists => condition.exists(),
            Op::NotExists => condition.not_exists(),
        };
        Ok(())
    }
}

/// Everything after the command name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryArgs {
    pub index: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Vec<(String, SortOrder)>,
    pub select: Vec<String>,
    pub exclude: Vec<String>,
    pub conditions: Vec<Condition>,
}

impl QueryArgs {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut parsed = QueryArgs::default();
        let mut rest = args.iter();

        while let Some(flag) = rest.next() {
            let mut next = |what: &str| {
                rest.next()
                    .cloned()
                    .ok_or_else(|| anyhow!("{} expects {}", flag, what))
            };

            match flag.as_str() {
                "--index" => parsed.index = Some(next("an index name")?),
                "--limit" => {
                    parsed.limit = Some(next("a number")?.parse::<usize>().context("--limit")?);
                }
                "--offset" => {
                    parsed.offset = Some(next("a number")?.parse::<usize>().context("--offset")?);
                }
                "--sort" => {
                    let spec = next("FIELD[:asc|desc]")?;
                    let (field, order) = match spec.split_once(':') {
                        Some((field, order)) => (field.to_string(), order.parse::<SortOrder>()?),
                        None => (spec, SortOrder::Asc),
                    };
                    parsed.sort.push((field, order));
                }
                "--select" => parsed.select = split_list(&next("a field list")?),
                "--exclude" => parsed.exclude = split_list(&next("a field list")?),
                "--where" => {
                    let field = parse_field(&next("a field")?);
                    let op = Op::parse(&next("an operator")?)?;
                    let value = if op.takes_value() {
                        Some(next("a value")?)
                    } else {
                        None
                    };
                    parsed.conditions.push(Condition { field, op, value });
                }
                other => bail!("Unknown option: {}", other),
            }
        }

        Ok(parsed)
    }

    pub fn apply(&self, query: &mut SearchQuery) -> Result<()> {
        if let Some(index) = &self.index {
            query.set_index(index.clone());
        }
        if let Some(limit) = self.limit {
            query.limit(limit);
        }
        if let Some(offset) = self.offset {
            query.offset(offset);
        }
        for (field, order) in &self.sort {
            query.add_order_by(field.clone(), *order);
        }
        if !self.select.is_empty() {
            query.select(self.select.iter().cloned());
        }
        if !self.exclude.is_empty() {
            query.exclude(self.exclude.iter().cloned());
        }
        for condition in &self.conditions {
            condition.apply(query)?;
        }
        Ok(())
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_field(s: &str) -> FieldRef {
    let mut names = split_list(s);
    match names.len() {
        0 => FieldRef::Single(s.trim().to_string()),
        1 => FieldRef::Single(names.remove(0)),
        _ => FieldRef::Group(names),
    }
}

/// JSON scalars stay typed (`5`, `true`); anything else is a string
fn parse_value(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

fn parse_list(s: &str) -> Vec<Value> {
    split_list(s).iter().map(|part| parse_value(part)).collect()
}

fn parse_range(s: &str) -> Result<(Value, Value)> {
    let (min, max) = s
        .split_once("..")
        .ok_or_else(|| anyhow!("Expected MIN..MAX, got '{}'", s))?;
    Ok((parse_value(min), parse_value(max)))
}
