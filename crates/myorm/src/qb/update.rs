//! UPDATE query builder.

use crate::condition::Match;
use crate::error::{OrmError, OrmResult};
use crate::ident::escape_id;
use crate::qb::expr::{Expr, ExprGroup};
use crate::qb::param::ParamList;
use crate::qb::traits::{BuiltQuery, MutationQb, SqlQb};
use crate::value::Value;

/// UPDATE query builder with expression-based WHERE.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateQb {
    table: String,
    set_fields: Vec<(String, Value)>,
    where_group: ExprGroup,
}

impl UpdateQb {
    /// Create a new UPDATE query builder.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            set_fields: Vec::new(),
            where_group: ExprGroup::new(),
        }
    }

    /// Set a column value.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set_fields.push((column.to_string(), value.into()));
        self
    }

    /// Add a `column -> Match` condition.
    pub fn where_match(mut self, column: &str, m: impl Into<Match>) -> Self {
        self.where_group.push_match(column, m.into());
        self
    }

    /// Add a custom expression.
    pub fn and_expr(mut self, expr: Expr) -> Self {
        self.where_group.push(expr);
        self
    }
}

impl SqlQb for UpdateQb {
    fn build(&self) -> BuiltQuery {
        let mut params = ParamList::new();
        let mut sql = format!("UPDATE {} SET ", escape_id(&self.table));

        let sets: Vec<String> = self
            .set_fields
            .iter()
            .map(|(col, value)| {
                params.push(value.clone());
                format!("{} = ?", escape_id(col))
            })
            .collect();
        sql.push_str(&sets.join(", "));

        let where_sql = self.where_group.build(&mut params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        BuiltQuery::new(sql, params)
    }

    fn validate(&self) -> OrmResult<()> {
        if self.set_fields.is_empty() {
            return Err(OrmError::validation(format!(
                "UPDATE {} has no SET clauses",
                self.table
            )));
        }
        Ok(())
    }
}

impl MutationQb for UpdateQb {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_params_precede_where_params() {
        let q = UpdateQb::new("users")
            .where_match("id", 7)
            .set("name", "bob")
            .set("active", false)
            .build();
        assert_eq!(
            q.sql,
            "UPDATE `users` SET `name` = ?, `active` = ? WHERE `id` = ?"
        );
        assert_eq!(
            q.params.as_slice(),
            &[Value::from("bob"), Value::Bool(false), Value::Int(7)]
        );
    }

    #[test]
    fn update_without_set_is_rejected() {
        let err = UpdateQb::new("users").where_match("id", 1).try_build();
        assert!(matches!(err, Err(OrmError::Validation(_))));
    }
}
