//! Table queries in the shape PostgREST understands.
//!
//! A [`Query`] names a table, a column projection, a conjunction of
//! [`Filter`]s, an optional single-column order and an optional inclusive
//! row range. The REST store renders it as URL parameters; the in-memory
//! store evaluates it directly with [`Query::matches`] and
//! [`compare_values`].

use std::cmp::Ordering;

use regex::Regex;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(String, Value),
    /// `column IN (values)`
    In(String, Vec<Value>),
    /// Case-insensitive `LIKE`; `%` matches any run, `_` one character.
    ILike(String, String),
    /// `column IS NULL`
    IsNull(String),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::In(c, _) | Filter::ILike(c, _) | Filter::IsNull(c) => c,
        }
    }

    /// PostgREST `column=op.value` pair.
    pub fn to_param(&self) -> (String, String) {
        let value = match self {
            Filter::Eq(_, v) => format!("eq.{}", literal(v)),
            Filter::In(_, values) => {
                let items: Vec<String> = values.iter().map(quoted_literal).collect();
                format!("in.({})", items.join(","))
            }
            Filter::ILike(_, pattern) => format!("ilike.{}", pattern.replace('%', "*")),
            Filter::IsNull(_) => "is.null".to_string(),
        };
        (self.column().to_string(), value)
    }

    /// Evaluate the filter against a row. Missing columns read as null.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        let field = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Filter::Eq(_, v) => values_equal(field, v),
            Filter::In(_, values) => values.iter().any(|v| values_equal(field, v)),
            Filter::ILike(_, pattern) => field
                .as_str()
                .map(|s| like_matches(pattern, s))
                .unwrap_or(false),
            Filter::IsNull(_) => field.is_null(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    /// Inclusive `(first, last)` row indices.
    pub range: Option<(u64, u64)>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            range: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    pub fn in_list<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.filters.push(Filter::In(column.into(), values));
        self
    }

    pub fn ilike(mut self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filters.push(Filter::ILike(column.into(), pattern.into()));
        self
    }

    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.filters.push(Filter::IsNull(column.into()));
        self
    }

    pub fn order(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            descending,
        });
        self
    }

    /// Restrict to rows `first..=last` of the ordered result.
    pub fn range(mut self, first: u64, last: u64) -> Self {
        self.range = Some((first, last.max(first)));
        self
    }

    /// 1-based page of `limit` rows: offset = (page - 1) * limit.
    pub fn page(self, page: u32, limit: u32) -> Self {
        let limit = u64::from(limit.max(1));
        let offset = u64::from(page.saturating_sub(1)) * limit;
        self.range(offset, offset + limit - 1)
    }

    /// Filter parameters only, as used by update and delete.
    pub fn filter_params(&self) -> Vec<(String, String)> {
        self.filters.iter().map(Filter::to_param).collect()
    }

    /// Full PostgREST parameter list for a read.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.columns.clone())];
        params.extend(self.filter_params());
        if let Some(order) = &self.order {
            let direction = if order.descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }
        if let Some((first, last)) = self.range {
            params.push(("offset".to_string(), first.to_string()));
            params.push(("limit".to_string(), (last - first + 1).to_string()));
        }
        params
    }

    /// `true` when every filter accepts the row.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }
}

/// Total order used for sorting rows: numbers numerically, strings
/// lexicographically, nulls after everything else (as Postgres does).
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn like_matches(pattern: &str, text: &str) -> bool {
    let mut re = String::from("(?is)^");
    for c in pattern.chars() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map(|r| r.is_match(text)).unwrap_or(false)
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn quoted_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => literal(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_params_rendering() {
        let q = Query::table("articles")
            .select("id, title")
            .eq("status", "published")
            .in_list("id", vec!["a", "b,c"])
            .ilike("title", "%rust%")
            .order("created_at", true)
            .page(3, 10);

        let params = q.to_params();
        assert_eq!(
            params,
            vec![
                ("select".into(), "id, title".into()),
                ("status".into(), "eq.published".into()),
                ("id".into(), "in.(\"a\",\"b,c\")".into()),
                ("title".into(), "ilike.*rust*".into()),
                ("order".into(), "created_at.desc".into()),
                ("offset".into(), "20".into()),
                ("limit".into(), "10".into()),
            ]
        );
    }

    #[test]
    fn test_page_offsets() {
        assert_eq!(Query::table("t").page(1, 10).range, Some((0, 9)));
        assert_eq!(Query::table("t").page(2, 10).range, Some((10, 19)));
        assert_eq!(Query::table("t").page(4, 25).range, Some((75, 99)));
    }

    #[test]
    fn test_numeric_eq_and_in() {
        let r = row(json!({ "channel_id": 3, "user_id": null }));
        assert!(Filter::Eq("channel_id".into(), json!(3)).matches(&r));
        assert!(Filter::Eq("channel_id".into(), json!(3.0)).matches(&r));
        assert!(!Filter::Eq("channel_id".into(), json!("3")).matches(&r));
        assert!(Filter::In("channel_id".into(), vec![json!(1), json!(3)]).matches(&r));
        assert!(Filter::IsNull("user_id".into()).matches(&r));
        assert!(Filter::IsNull("missing".into()).matches(&r));
    }

    #[test]
    fn test_ilike_is_case_insensitive_substring() {
        let r = row(json!({ "title": "Rust 2.0 Released" }));
        assert!(Filter::ILike("title".into(), "%rust%".into()).matches(&r));
        assert!(Filter::ILike("title".into(), "%RELEASED".into()).matches(&r));
        assert!(!Filter::ILike("title".into(), "rust".into()).matches(&r));
        assert!(Filter::ILike("title".into(), "%2.0%".into()).matches(&r));
        assert!(!Filter::ILike("title".into(), "%2x0%".into()).matches(&r));
    }

    #[test]
    fn test_nulls_sort_last() {
        assert_eq!(compare_values(&Value::Null, &json!(1)), Ordering::Greater);
        assert_eq!(compare_values(&json!("a"), &json!("b")), Ordering::Less);
        assert_eq!(compare_values(&json!(10), &json!(9)), Ordering::Greater);
    }
}
