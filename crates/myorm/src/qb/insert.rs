//! INSERT query builder.

use crate::ident::escape_id;
use crate::qb::param::ParamList;
use crate::qb::traits::{BuiltQuery, MutationQb, SqlQb};
use crate::value::Value;

/// INSERT query builder for a single row.
#[derive(Clone, Debug, PartialEq)]
pub struct InsertQb {
    table: String,
    columns: Vec<String>,
    values: Vec<Value>,
}

impl InsertQb {
    /// Create a new INSERT query builder.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Set a column value.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.columns.push(column.to_string());
        self.values.push(value.into());
        self
    }

    /// Set an optional column value (None => skip).
    pub fn set_opt<T: Into<Value>>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl SqlQb for InsertQb {
    fn build(&self) -> BuiltQuery {
        let mut params = ParamList::new();
        let cols: Vec<String> = self.columns.iter().map(|c| escape_id(c)).collect();
        for v in &self.values {
            params.push(v.clone());
        }
        let placeholders = vec!["?"; self.values.len()].join(", ");

        // An empty row inserts all column defaults.
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            escape_id(&self.table),
            cols.join(", "),
            placeholders
        );
        BuiltQuery::new(sql, params)
    }
}

impl MutationQb for InsertQb {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_binds_values_in_column_order() {
        let q = InsertQb::new("users")
            .set("name", "alice")
            .set("age", 30)
            .set_opt("nickname", None::<String>)
            .build();
        assert_eq!(q.sql, "INSERT INTO `users` (`name`, `age`) VALUES (?, ?)");
        assert_eq!(q.params.as_slice(), &[Value::from("alice"), Value::Int(30)]);
    }

    #[test]
    fn empty_insert_uses_defaults() {
        assert_eq!(
            InsertQb::new("log").to_sql(),
            "INSERT INTO `log` () VALUES ()"
        );
    }
}
