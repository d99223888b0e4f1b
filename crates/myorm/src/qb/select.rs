//! SELECT query builder.

use crate::condition::{CondMethod, Match};
use crate::error::OrmError;
use crate::ident::escape_id;
use crate::qb::expr::{Expr, ExprGroup};
use crate::qb::param::ParamList;
use crate::qb::traits::{BuiltQuery, SqlQb};
use std::str::FromStr;

/// `LIMIT` rendered when only an offset is requested (2^64 - 1).
///
/// MySQL rejects `OFFSET` without `LIMIT`, so the largest `BIGINT UNSIGNED`
/// stands in for "no limit".
pub const MAX_LIMIT: u64 = u64::MAX;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = OrmError;

    /// Accepts `asc`/`desc` as well as the ORM's `A`/`Z` shorthands.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "a" => Ok(Direction::Asc),
            "desc" | "z" => Ok(Direction::Desc),
            _ => Err(OrmError::validation(format!("unknown sort direction '{s}'"))),
        }
    }
}

/// `ORDER BY column direction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

impl Order {
    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Desc)
    }
}

/// One side of a [`Merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSide {
    pub table: String,
    pub field: String,
}

impl MergeSide {
    pub fn new(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
        }
    }
}

/// Join two tables for association lookups.
///
/// Renders `FROM from.table JOIN to.table ON from.table.from.field =
/// to.table.to.field`; unqualified projected fields are qualified with
/// `to.table`, since that is the table whose rows are being loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merge {
    pub from: MergeSide,
    pub to: MergeSide,
}

impl Merge {
    pub fn new(from: MergeSide, to: MergeSide) -> Self {
        Self { from, to }
    }
}

/// SELECT query builder.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectQb {
    table: String,
    /// Projected fields; empty means `*`.
    fields: Vec<String>,
    merge: Option<Merge>,
    count: bool,
    where_group: ExprGroup,
    order: Vec<Order>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectQb {
    /// Create a new SELECT query builder for a table.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            fields: Vec::new(),
            merge: None,
            count: false,
            where_group: ExprGroup::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    // ==================== Projection ====================

    /// Replace the projected fields.
    pub fn fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.fields = fields.iter().map(|f| f.as_ref().to_string()).collect();
        self
    }

    /// Append one projected field.
    pub fn add_field(mut self, field: &str) -> Self {
        self.fields.push(field.to_string());
        self
    }

    /// Project `COUNT(*) AS c` instead of the field list.
    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    /// Join through another table (see [`Merge`]).
    pub fn merge(mut self, merge: Merge) -> Self {
        self.merge = Some(merge);
        self
    }

    // ==================== WHERE ====================

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

    /// Set how top-level conditions are combined (default AND).
    pub fn cond_method(mut self, method: CondMethod) -> Self {
        self.where_group.set_method(method);
        self
    }

    // ==================== Ordering & pagination ====================

    /// Add an ORDER BY term.
    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push(Order::new(column, direction));
        self
    }

    /// Set LIMIT.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Set OFFSET. Without an explicit limit, [`MAX_LIMIT`] is rendered.
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    // ==================== Build helpers ====================

    fn write_projection(&self, sql: &mut String) {
        if self.count {
            sql.push_str("COUNT(*) AS `c`");
            return;
        }

        let qualifier = self.merge.as_ref().map(|m| m.to.table.as_str());
        if self.fields.is_empty() {
            match qualifier {
                Some(table) => sql.push_str(&escape_id(&format!("{table}.*"))),
                None => sql.push('*'),
            }
            return;
        }

        let cols: Vec<String> = self
            .fields
            .iter()
            .map(|f| match qualifier {
                Some(table) if !f.contains('.') => escape_id(&format!("{table}.{f}")),
                _ if f == "*" => "*".to_string(),
                _ => escape_id(f),
            })
            .collect();
        sql.push_str(&cols.join(", "));
    }

    fn write_from(&self, sql: &mut String) {
        sql.push_str(" FROM ");
        match &self.merge {
            Some(m) => {
                sql.push_str(&escape_id(&m.from.table));
                sql.push_str(" JOIN ");
                sql.push_str(&escape_id(&m.to.table));
                sql.push_str(" ON ");
                sql.push_str(&escape_id(&format!("{}.{}", m.from.table, m.from.field)));
                sql.push_str(" = ");
                sql.push_str(&escape_id(&format!("{}.{}", m.to.table, m.to.field)));
            }
            None => sql.push_str(&escape_id(&self.table)),
        }
    }
}

impl SqlQb for SelectQb {
    fn build(&self) -> BuiltQuery {
        let mut params = ParamList::new();
        let mut sql = String::from("SELECT ");

        self.write_projection(&mut sql);
        self.write_from(&mut sql);

        let where_sql = self.where_group.build(&mut params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if !self.count {
            if !self.order.is_empty() {
                let terms: Vec<String> = self
                    .order
                    .iter()
                    .map(|o| format!("{} {}", escape_id(&o.column), o.direction.as_sql()))
                    .collect();
                sql.push_str(" ORDER BY ");
                sql.push_str(&terms.join(", "));
            }

            let limit = match (self.limit, self.offset) {
                (Some(limit), _) => Some(limit),
                (None, Some(_)) => Some(MAX_LIMIT),
                (None, None) => None,
            };
            if let Some(limit) = limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        BuiltQuery::new(sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn simple_select() {
        let qb = SelectQb::new("users");
        assert_eq!(qb.to_sql(), "SELECT * FROM `users`");
    }

    #[test]
    fn select_fields_and_where() {
        let q = SelectQb::new("users")
            .fields(&["id", "name"])
            .where_match("status", "active")
            .where_match("age", Match::gt(18))
            .build();
        assert_eq!(
            q.sql,
            "SELECT `id`, `name` FROM `users` WHERE `status` = ? AND `age` > ?"
        );
        assert_eq!(
            q.params.as_slice(),
            &[Value::from("active"), Value::from(18)]
        );
    }

    #[test]
    fn order_limit_offset() {
        let qb = SelectQb::new("users")
            .order("created_at", Direction::Desc)
            .limit(10)
            .offset(20);
        assert_eq!(
            qb.to_sql(),
            "SELECT * FROM `users` ORDER BY `created_at` DESC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn offset_without_limit_uses_max_limit() {
        let qb = SelectQb::new("users").offset(5);
        assert_eq!(
            qb.to_sql(),
            "SELECT * FROM `users` LIMIT 18446744073709551615 OFFSET 5"
        );
    }

    #[test]
    fn count_ignores_order_and_limit() {
        let qb = SelectQb::new("users")
            .count()
            .where_match("status", "active")
            .order("id", Direction::Asc)
            .limit(3);
        assert_eq!(
            qb.to_sql(),
            "SELECT COUNT(*) AS `c` FROM `users` WHERE `status` = ?"
        );
    }

    #[test]
    fn cond_method_or() {
        let qb = SelectQb::new("users")
            .where_match("a", 1)
            .where_match("b", 2)
            .cond_method(CondMethod::Or);
        assert_eq!(qb.to_sql(), "SELECT * FROM `users` WHERE `a` = ? OR `b` = ?");
    }

    #[test]
    fn merge_joins_and_qualifies() {
        let qb = SelectQb::new("pets")
            .fields(&["id", "name"])
            .merge(Merge::new(
                MergeSide::new("person_pets", "pets_id"),
                MergeSide::new("pets", "id"),
            ))
            .where_match("person_pets.person_id", 1);
        assert_eq!(
            qb.to_sql(),
            "SELECT `pets`.`id`, `pets`.`name` FROM `person_pets` JOIN `pets` \
             ON `person_pets`.`pets_id` = `pets`.`id` WHERE `person_pets`.`person_id` = ?"
        );
    }

    #[test]
    fn merge_without_fields_selects_target_wildcard() {
        let qb = SelectQb::new("pets").merge(Merge::new(
            MergeSide::new("person_pets", "pets_id"),
            MergeSide::new("pets", "id"),
        ));
        assert!(qb.to_sql().starts_with("SELECT `pets`.* FROM `person_pets` JOIN `pets`"));
    }

    #[test]
    fn direction_parse() {
        assert_eq!("Z".parse::<Direction>().unwrap(), Direction::Desc);
        assert_eq!("asc".parse::<Direction>().unwrap(), Direction::Asc);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
