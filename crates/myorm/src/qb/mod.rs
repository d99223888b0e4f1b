//! Per-call query builders for MySQL.
//!
//! Every driver call constructs a fresh builder value, renders it into
//! [`BuiltQuery`] (SQL text with `?` placeholders plus a [`ParamList`]) and
//! submits it. Builders are plain values, so concurrent calls never share
//! state.
//!
//! # Usage
//!
//! ```ignore
//! use myorm::qb::{self, Direction, SqlQb};
//! use myorm::Match;
//!
//! let q = qb::select("users")
//!     .fields(&["id", "name"])
//!     .where_match("age", Match::gte(18))
//!     .order("name", Direction::Asc)
//!     .limit(20)
//!     .build();
//! assert_eq!(
//!     q.sql,
//!     "SELECT `id`, `name` FROM `users` WHERE `age` >= ? ORDER BY `name` ASC LIMIT 20"
//! );
//!
//! qb::update("users")
//!     .set("status", "inactive")
//!     .where_match("id", 7)
//!     .execute(&mut conn)
//!     .await?;
//! ```

mod create_table;
mod expr;
mod insert;
mod param;
mod remove;
mod select;
mod traits;
mod update;

pub use create_table::{CreateTableQb, FieldDefinition, FieldType};
pub use expr::{Expr, ExprGroup};
pub use insert::InsertQb;
pub use param::ParamList;
pub use remove::RemoveQb;
pub use select::{Direction, MAX_LIMIT, Merge, MergeSide, Order, SelectQb};
pub use traits::{BuiltQuery, MutationQb, SqlQb};
pub use update::UpdateQb;

/// Create a SELECT query builder for the given table.
pub fn select(table: &str) -> SelectQb {
    SelectQb::new(table)
}

/// Create an INSERT query builder for the given table.
pub fn insert(table: &str) -> InsertQb {
    InsertQb::new(table)
}

/// Create an UPDATE query builder for the given table.
pub fn update(table: &str) -> UpdateQb {
    UpdateQb::new(table)
}

/// Create a DELETE query builder for the given table.
pub fn remove(table: &str) -> RemoveQb {
    RemoveQb::new(table)
}

/// Create a CREATE TABLE builder for the given table.
pub fn create_table(table: &str) -> CreateTableQb {
    CreateTableQb::new(table)
}

#[cfg(test)]
mod tests;
