//! Condition sets used by `find`/`count`/`update`/`remove`.
//!
//! A [`Conditions`] value is an ordered list of `column -> Match` pairs. A
//! plain value means equality (`NULL` turns into `IS NULL`); the other
//! [`Match`] variants carry a comparison operator.
//!
//! # Example
//! ```ignore
//! use myorm::{Conditions, Match};
//!
//! let cond = Conditions::new()
//!     .eq("status", "active")
//!     .add("age", Match::gte(18))
//!     .add("role", vec!["admin", "editor"]); // IN (...)
//! ```

use crate::error::OrmError;
use crate::value::Value;
use std::str::FromStr;

/// How a single column is matched.
#[derive(Debug, Clone, PartialEq)]
pub enum Match {
    /// column = value (`IS NULL` for `Value::Null`)
    Eq(Value),
    /// column <> value (`IS NOT NULL` for `Value::Null`)
    Ne(Value),
    /// column > value
    Gt(Value),
    /// column >= value
    Gte(Value),
    /// column < value
    Lt(Value),
    /// column <= value
    Lte(Value),
    /// column LIKE pattern
    Like(Value),
    /// column NOT LIKE pattern
    NotLike(Value),
    /// column BETWEEN a AND b
    Between(Value, Value),
    /// column NOT BETWEEN a AND b
    NotBetween(Value, Value),
    /// column IN (list)
    In(Vec<Value>),
    /// column NOT IN (list)
    NotIn(Vec<Value>),
}

impl Match {
    pub fn eq(v: impl Into<Value>) -> Self {
        Match::Eq(v.into())
    }

    pub fn ne(v: impl Into<Value>) -> Self {
        Match::Ne(v.into())
    }

    pub fn gt(v: impl Into<Value>) -> Self {
        Match::Gt(v.into())
    }

    pub fn gte(v: impl Into<Value>) -> Self {
        Match::Gte(v.into())
    }

    pub fn lt(v: impl Into<Value>) -> Self {
        Match::Lt(v.into())
    }

    pub fn lte(v: impl Into<Value>) -> Self {
        Match::Lte(v.into())
    }

    pub fn like(pattern: impl Into<Value>) -> Self {
        Match::Like(pattern.into())
    }

    pub fn not_like(pattern: impl Into<Value>) -> Self {
        Match::NotLike(pattern.into())
    }

    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Match::Between(from.into(), to.into())
    }

    pub fn not_between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Match::NotBetween(from.into(), to.into())
    }

    pub fn in_list<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Self {
        Match::In(values.into_iter().map(Into::into).collect())
    }

    pub fn not_in<T: Into<Value>>(values: impl IntoIterator<Item = T>) -> Self {
        Match::NotIn(values.into_iter().map(Into::into).collect())
    }
}

macro_rules! impl_match_from_scalar {
    ($($t:ty),*) => {
        $(impl From<$t> for Match {
            fn from(v: $t) -> Self {
                Match::Eq(v.into())
            }
        })*
    };
}

impl_match_from_scalar!(
    Value, bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, &str, String,
    serde_json::Value
);

impl<T: Into<Value>> From<Option<T>> for Match {
    fn from(v: Option<T>) -> Self {
        Match::Eq(v.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Match {
    fn from(values: Vec<T>) -> Self {
        Match::in_list(values)
    }
}

/// Ordered `column -> Match` mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Conditions {
    entries: Vec<(String, Match)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a condition, keeping insertion order.
    pub fn add(mut self, column: impl Into<String>, m: impl Into<Match>) -> Self {
        self.push(column, m);
        self
    }

    /// Append an equality condition.
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(column, Match::Eq(value.into()))
    }

    pub fn push(&mut self, column: impl Into<String>, m: impl Into<Match>) {
        self.entries.push((column.into(), m.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Match)> {
        self.entries.iter().map(|(c, m)| (c.as_str(), m))
    }
}

impl<K: Into<String>, M: Into<Match>> FromIterator<(K, M)> for Conditions {
    fn from_iter<I: IntoIterator<Item = (K, M)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, m)| (k.into(), m.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Conditions {
    type Item = (String, Match);
    type IntoIter = std::vec::IntoIter<(String, Match)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Logical operator joining the conditions of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CondMethod {
    #[default]
    And,
    Or,
}

impl CondMethod {
    pub fn as_sql(self) -> &'static str {
        match self {
            CondMethod::And => "AND",
            CondMethod::Or => "OR",
        }
    }
}

impl FromStr for CondMethod {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("and") {
            Ok(CondMethod::And)
        } else if s.eq_ignore_ascii_case("or") {
            Ok(CondMethod::Or)
        } else {
            Err(OrmError::validation(format!(
                "unknown condition method '{s}' (expected 'and' or 'or')"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let cond = Conditions::new()
            .eq("b", 1)
            .eq("a", 2)
            .add("c", Match::gt(3));
        let cols: Vec<&str> = cond.iter().map(|(c, _)| c).collect();
        assert_eq!(cols, ["b", "a", "c"]);
    }

    #[test]
    fn vec_becomes_in_list() {
        let m: Match = vec![1, 2].into();
        assert_eq!(m, Match::In(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn none_becomes_null_equality() {
        let m: Match = None::<i32>.into();
        assert_eq!(m, Match::Eq(Value::Null));
    }

    #[test]
    fn cond_method_parse() {
        assert_eq!("OR".parse::<CondMethod>().unwrap(), CondMethod::Or);
        assert_eq!("and".parse::<CondMethod>().unwrap(), CondMethod::And);
        assert!("xor".parse::<CondMethod>().is_err());
    }

    #[test]
    fn collect_from_pairs() {
        let cond: Conditions = [("id", 1), ("owner_id", 2)].into_iter().collect();
        assert_eq!(cond.len(), 2);
    }
}
