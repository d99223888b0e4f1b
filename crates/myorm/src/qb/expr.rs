//! Expression layer for WHERE clauses.
//!
//! [`Expr`] is a small boolean expression tree; [`ExprGroup`] is the flat list
//! of top-level conditions a builder accumulates, joined by its
//! [`CondMethod`]. Values are always bound as `?` parameters and identifiers
//! are escaped at build time, so nothing user-supplied is spliced into SQL.

use crate::condition::{CondMethod, Match};
use crate::ident::write_escaped_id;
use crate::qb::param::ParamList;
use crate::value::Value;

/// Expression node for building WHERE clauses.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// AND group: all conditions must be true.
    And(Vec<Expr>),

    /// OR group: at least one condition must be true.
    Or(Vec<Expr>),

    /// NOT: negate the inner expression.
    Not(Box<Expr>),

    /// Simple comparison: column op ?
    Compare {
        column: String,
        op: &'static str,
        value: Value,
    },

    /// NULL check: column IS NULL or column IS NOT NULL
    NullCheck { column: String, is_null: bool },

    /// IN list: column IN (?, ?, ...) or column NOT IN (...)
    InList {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },

    /// BETWEEN: column BETWEEN ? AND ?
    Between {
        column: String,
        from: Value,
        to: Value,
        negated: bool,
    },

    /// Raw SQL fragment without parameters.
    Raw(String),

    /// Always true (used for empty NOT IN lists).
    True,

    /// Always false (used for empty IN lists).
    False,
}

impl Expr {
    /// Create an AND expression from a list of expressions.
    pub fn and(exprs: Vec<Expr>) -> Self {
        Expr::And(exprs)
    }

    /// Create an OR expression from a list of expressions.
    pub fn or(exprs: Vec<Expr>) -> Self {
        Expr::Or(exprs)
    }

    /// Create a NOT expression.
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    /// Create a raw SQL fragment.
    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    /// Translate one `column -> Match` condition.
    pub fn from_match(column: impl Into<String>, m: Match) -> Self {
        let column = column.into();
        let compare = |column, op, value| Expr::Compare { column, op, value };
        match m {
            Match::Eq(Value::Null) => Expr::NullCheck {
                column,
                is_null: true,
            },
            Match::Ne(Value::Null) => Expr::NullCheck {
                column,
                is_null: false,
            },
            Match::Eq(v) => compare(column, "=", v),
            Match::Ne(v) => compare(column, "<>", v),
            Match::Gt(v) => compare(column, ">", v),
            Match::Gte(v) => compare(column, ">=", v),
            Match::Lt(v) => compare(column, "<", v),
            Match::Lte(v) => compare(column, "<=", v),
            Match::Like(v) => compare(column, "LIKE", v),
            Match::NotLike(v) => compare(column, "NOT LIKE", v),
            Match::Between(from, to) => Expr::Between {
                column,
                from,
                to,
                negated: false,
            },
            Match::NotBetween(from, to) => Expr::Between {
                column,
                from,
                to,
                negated: true,
            },
            Match::In(values) if values.is_empty() => Expr::False,
            Match::NotIn(values) if values.is_empty() => Expr::True,
            Match::In(values) => Expr::InList {
                column,
                values,
                negated: false,
            },
            Match::NotIn(values) => Expr::InList {
                column,
                values,
                negated: true,
            },
        }
    }

    /// Check if this expression is empty (contains no conditions).
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => exprs.iter().all(|e| e.is_empty()),
            Expr::Not(inner) => inner.is_empty(),
            _ => false,
        }
    }

    /// Build the SQL fragment, pushing bound values into `params`.
    pub fn build(&self, params: &mut ParamList) -> String {
        match self {
            Expr::And(exprs) => build_joined(exprs, "AND", params),
            Expr::Or(exprs) => build_joined(exprs, "OR", params),
            Expr::Not(inner) => {
                let sql = inner.build(params);
                if sql.is_empty() {
                    String::new()
                } else {
                    format!("NOT ({sql})")
                }
            }
            Expr::Compare { column, op, value } => {
                params.push(value.clone());
                let mut sql = column_sql(column);
                sql.push(' ');
                sql.push_str(op);
                sql.push_str(" ?");
                sql
            }
            Expr::NullCheck { column, is_null } => {
                let mut sql = column_sql(column);
                sql.push_str(if *is_null { " IS NULL" } else { " IS NOT NULL" });
                sql
            }
            Expr::InList {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return if *negated { "1=1" } else { "1=0" }.to_string();
                }
                for v in values {
                    params.push(v.clone());
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", column_sql(column), op, placeholders)
            }
            Expr::Between {
                column,
                from,
                to,
                negated,
            } => {
                params.push(from.clone());
                params.push(to.clone());
                let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                format!("{} {} ? AND ?", column_sql(column), op)
            }
            Expr::Raw(sql) => sql.clone(),
            Expr::True => "1=1".to_string(),
            Expr::False => "1=0".to_string(),
        }
    }
}

fn column_sql(column: &str) -> String {
    let mut out = String::with_capacity(column.len() + 2);
    write_escaped_id(column, &mut out);
    out
}

fn build_joined(exprs: &[Expr], joiner: &str, params: &mut ParamList) -> String {
    let parts: Vec<String> = exprs
        .iter()
        .filter(|e| !e.is_empty())
        .map(|e| {
            let sql = e.build(params);
            // Nested groups keep their own precedence.
            if matches!(e, Expr::And(_) | Expr::Or(_)) && !sql.is_empty() {
                format!("({sql})")
            } else {
                sql
            }
        })
        .filter(|s| !s.is_empty())
        .collect();
    parts.join(&format!(" {joiner} "))
}

/// Top-level WHERE conditions of one query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExprGroup {
    exprs: Vec<Expr>,
    method: CondMethod,
}

impl ExprGroup {
    /// Create a new empty expression group (joined with AND).
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the group is empty.
    pub fn is_empty(&self) -> bool {
        self.exprs.iter().all(Expr::is_empty)
    }

    /// Set the operator joining top-level conditions.
    pub fn set_method(&mut self, method: CondMethod) {
        self.method = method;
    }

    pub fn method(&self) -> CondMethod {
        self.method
    }

    /// Add an expression.
    pub fn push(&mut self, expr: Expr) {
        self.exprs.push(expr);
    }

    /// Add a `column -> Match` condition.
    pub fn push_match(&mut self, column: impl Into<String>, m: Match) {
        self.exprs.push(Expr::from_match(column, m));
    }

    /// Get all expressions.
    pub fn exprs(&self) -> &[Expr] {
        &self.exprs
    }

    /// Build the clause content (without the `WHERE` keyword).
    pub fn build(&self, params: &mut ParamList) -> String {
        if self.exprs.is_empty() {
            return String::new();
        }
        build_joined(&self.exprs, self.method.as_sql(), params)
    }
}
