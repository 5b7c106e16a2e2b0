//! Values bound to and read from SQL statements.
//!
//! # Responsibilities
//! - Represent one column value independent of the driver
//! - Convert to and from `rusqlite` storage classes
//! - Carry ordered field sets for INSERT/UPDATE and named parameter lists
//!
//! # Design Decisions
//! - Records are keyed maps (column name → value); column order is not kept
//! - Field sets keep insertion order so generated SQL is deterministic
//! - Leading `:` on field keys is accepted and stripped

use std::collections::BTreeMap;
use std::fmt;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

/// One row returned by a query: column name → value.
pub type Record = BTreeMap<String, Value>;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Interpret the value as a flag (non-zero integers and "1"/"true" text).
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Integer(i) => *i != 0,
            Value::Real(r) => *r != 0.0,
            Value::Text(s) => matches!(s.as_str(), "1" | "true"),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(r) => ValueRef::Real(*r),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        })
    }
}

/// Ordered column → value set used for INSERT and UPDATE.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Fields::set`].
    pub fn with(mut self, column: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column, replacing an earlier value for the same column.
    pub fn set(&mut self, column: impl AsRef<str>, value: impl Into<Value>) {
        let column = column.as_ref().trim_start_matches(':').to_string();
        let value = value.into();
        match self.0.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The same data as a [`Record`], for comparing against query results.
    pub fn to_record(&self) -> Record {
        self.0.iter().cloned().collect()
    }
}

/// Parameters bound to a prepared statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    /// `?` placeholders, bound in order.
    Positional(Vec<Value>),
    /// `:name` placeholders. Names are stored with their `:` prefix.
    Named(Vec<(String, Value)>),
}

impl Params {
    pub fn named() -> Self {
        Params::Named(Vec::new())
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Add a named parameter. Converts `None`/positional sets into a named set.
    pub fn bind(self, name: impl AsRef<str>, value: impl Into<Value>) -> Self {
        let mut pairs = match self {
            Params::Named(pairs) => pairs,
            _ => Vec::new(),
        };
        pairs.push((placeholder_name(name.as_ref()), value.into()));
        Params::Named(pairs)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Params::None => true,
            Params::Positional(v) => v.is_empty(),
            Params::Named(v) => v.is_empty(),
        }
    }
}

/// Normalize a parameter name to carry exactly one leading `:`.
pub(crate) fn placeholder_name(name: &str) -> String {
    if name.starts_with([':', '@', '$']) {
        name.to_string()
    } else {
        format!(":{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_keep_order_and_strip_colons() {
        let fields = Fields::new()
            .with(":name", "Bob")
            .with("age", 30)
            .with("name", "Alice");

        let columns: Vec<&str> = fields.iter().map(|(c, _)| c).collect();
        assert_eq!(columns, vec!["name", "age"]);
        assert_eq!(fields.get("name"), Some(&Value::Text("Alice".into())));
    }

    #[test]
    fn test_params_bind_normalizes_names() {
        let params = Params::named().bind("id", 5).bind(":other", "x");
        assert_eq!(
            params,
            Params::Named(vec![
                (":id".into(), Value::Integer(5)),
                (":other".into(), Value::Text("x".into())),
            ])
        );
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(true), Value::Integer(1));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert!(Value::Text("true".into()).as_bool());
        assert!(!Value::Null.as_bool());
        assert_eq!(Value::Integer(7).to_string(), "7");
    }
}
