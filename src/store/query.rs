// src/store/query.rs
//! Table query description shared by every backend.
//!
//! A [`Query`] renders to PostgREST parameters for the REST backend and is
//! evaluated directly over rows by the in-memory backend.

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// One table row as the store returns it.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    /// Case-insensitive match; `%` is the wildcard.
    ILike(String, String),
    In(String, Vec<Value>),
    /// Anything but an explicit `false`; missing and null values pass.
    NotFalse(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: &str) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn neq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters
            .push(Filter::Neq(column.to_string(), value.into()));
        self
    }

    pub fn gt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gt(column.to_string(), value.into()));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters
            .push(Filter::Gte(column.to_string(), value.into()));
        self
    }

    pub fn lt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lt(column.to_string(), value.into()));
        self
    }

    pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters
            .push(Filter::Lte(column.to_string(), value.into()));
        self
    }

    pub fn ilike(mut self, column: &str, pattern: impl Into<String>) -> Self {
        self.filters
            .push(Filter::ILike(column.to_string(), pattern.into()));
        self
    }

    pub fn not_false(mut self, column: &str) -> Self {
        self.filters.push(Filter::NotFalse(column.to_string()));
        self
    }

    pub fn is_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }

    /// PostgREST query string parameters (`col=op.value`, `order`, `limit`, `offset`).
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut out = vec![("select".to_string(), "*".to_string())];
        for filter in &self.filters {
            let (column, expr) = match filter {
                Filter::Eq(c, v) => (c, format!("eq.{}", literal(v))),
                Filter::Neq(c, v) => (c, format!("neq.{}", literal(v))),
                Filter::Gt(c, v) => (c, format!("gt.{}", literal(v))),
                Filter::Gte(c, v) => (c, format!("gte.{}", literal(v))),
                Filter::Lt(c, v) => (c, format!("lt.{}", literal(v))),
                Filter::Lte(c, v) => (c, format!("lte.{}", literal(v))),
                // PostgREST accepts `*` in place of `%` inside URLs.
                Filter::ILike(c, p) => (c, format!("ilike.{}", p.replace('%', "*"))),
                Filter::In(c, vs) => {
                    let items = vs.iter().map(literal).collect::<Vec<_>>().join(",");
                    (c, format!("in.({items})"))
                }
                Filter::NotFalse(c) => {
                    // `neq.false` would drop NULLs in SQL.
                    out.push(("or".to_string(), format!("({c}.is.null,{c}.eq.true)")));
                    continue;
                }
            };
            out.push((column.clone(), expr));
        }
        if let Some((column, direction)) = &self.order {
            let dir = match direction {
                Direction::Asc => "asc",
                Direction::Desc => "desc",
            };
            out.push(("order".to_string(), format!("{column}.{dir}")));
        }
        if let Some(limit) = self.limit {
            out.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            out.push(("offset".to_string(), offset.to_string()));
        }
        out
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Filter, order and paginate rows in process.
    pub fn apply<I>(&self, rows: I) -> Vec<Row>
    where
        I: IntoIterator<Item = Row>,
    {
        let mut out: Vec<Row> = rows.into_iter().filter(|r| self.matches(r)).collect();
        if let Some((column, direction)) = &self.order {
            out.sort_by(|a, b| {
                let ord = compare_values(a.get(column), b.get(column));
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }
        let rest = out.into_iter().skip(self.offset.unwrap_or(0));
        match self.limit {
            Some(n) => rest.take(n).collect(),
            None => rest.collect(),
        }
    }
}

impl Filter {
    fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Eq(c, v) => row.get(c).is_some_and(|x| loosely_equal(x, v)),
            Filter::Neq(c, v) => !row.get(c).is_some_and(|x| loosely_equal(x, v)),
            Filter::Gt(c, v) => compare_present(row.get(c), v) == Some(Ordering::Greater),
            Filter::Gte(c, v) => matches!(
                compare_present(row.get(c), v),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::Lt(c, v) => compare_present(row.get(c), v) == Some(Ordering::Less),
            Filter::Lte(c, v) => matches!(
                compare_present(row.get(c), v),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Filter::ILike(c, p) => row
                .get(c)
                .and_then(Value::as_str)
                .is_some_and(|s| ilike(s, p)),
            Filter::In(c, vs) => row
                .get(c)
                .is_some_and(|x| vs.iter().any(|v| loosely_equal(x, v))),
            Filter::NotFalse(c) => row.get(c) != Some(&Value::Bool(false)),
        }
    }
}

fn literal(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        // Path ids are text; bigint columns compare by their decimal form.
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => n.to_string() == *s,
        _ => a == b,
    }
}

/// Null or missing columns never satisfy a range filter.
fn compare_present(a: Option<&Value>, b: &Value) -> Option<Ordering> {
    match a {
        None | Some(Value::Null) => None,
        Some(x) => Some(compare_values(Some(x), Some(b))),
    }
}

/// Nulls sort first; mixed types fall back to their JSON text.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn ilike(haystack: &str, pattern: &str) -> bool {
    let hay = haystack.to_lowercase();
    let pat = pattern.to_lowercase();
    let parts: Vec<&str> = pat.split('%').collect();
    if parts.len() == 1 {
        return hay == pat;
    }

    let last = parts.len() - 1;
    let mut pos = 0usize;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !hay.starts_with(part) {
                return false;
            }
            pos = part.len();
        } else if i == last {
            return hay[pos..].ends_with(part);
        } else {
            match hay[pos..].find(part) {
                Some(idx) => pos += idx + part.len(),
                None => return false,
            }
        }
    }
    true
}
