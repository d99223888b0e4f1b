//! DELETE query builder.

use crate::condition::Match;
use crate::ident::escape_id;
use crate::qb::expr::{Expr, ExprGroup};
use crate::qb::param::ParamList;
use crate::qb::traits::{BuiltQuery, MutationQb, SqlQb};

/// DELETE query builder.
///
/// Without conditions every row of the table is deleted.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoveQb {
    table: String,
    where_group: ExprGroup,
}

impl RemoveQb {
    /// Create a new DELETE query builder.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            where_group: ExprGroup::new(),
        }
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

impl SqlQb for RemoveQb {
    fn build(&self) -> BuiltQuery {
        let mut params = ParamList::new();
        let mut sql = format!("DELETE FROM {}", escape_id(&self.table));

        let where_sql = self.where_group.build(&mut params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        BuiltQuery::new(sql, params)
    }
}

impl MutationQb for RemoveQb {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_with_conditions() {
        let q = RemoveQb::new("users")
            .where_match("id", Match::in_list([1, 2]))
            .build();
        assert_eq!(q.sql, "DELETE FROM `users` WHERE `id` IN (?, ?)");
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn delete_without_conditions_hits_whole_table() {
        assert_eq!(RemoveQb::new("users").to_sql(), "DELETE FROM `users`");
    }
}
