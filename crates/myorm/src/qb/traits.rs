//! Trait definitions for query builders.

use crate::client::Connection;
use crate::error::OrmResult;
use crate::qb::param::ParamList;
use crate::value::{ExecResult, Row};

/// SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: ParamList,
}

impl BuiltQuery {
    /// Create a new built query.
    pub fn new(sql: String, params: ParamList) -> Self {
        Self { sql, params }
    }

    /// A statement without parameters.
    pub fn text(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: ParamList::new(),
        }
    }
}

/// Base trait for all query builders.
pub trait SqlQb: Sync {
    /// Render SQL and collect parameters.
    fn build(&self) -> BuiltQuery;

    /// Validate builder state before execution.
    fn validate(&self) -> OrmResult<()> {
        Ok(())
    }

    /// Validate, then build.
    fn try_build(&self) -> OrmResult<BuiltQuery> {
        self.validate()?;
        Ok(self.build())
    }

    /// Debug helper to get the SQL string.
    fn to_sql(&self) -> String {
        self.build().sql
    }

    /// Execute query and return all rows.
    fn fetch_all<C: Connection>(
        &self,
        conn: &mut C,
    ) -> impl std::future::Future<Output = OrmResult<Vec<Row>>> + Send {
        async move {
            let q = self.try_build()?;
            conn.query(&q.sql, q.params.as_slice()).await
        }
    }
}

/// Trait for mutation builders (INSERT/UPDATE/DELETE/DDL).
pub trait MutationQb: SqlQb {
    /// Execute and return the affected-row count and last insert id.
    fn execute<C: Connection>(
        &self,
        conn: &mut C,
    ) -> impl std::future::Future<Output = OrmResult<ExecResult>> + Send {
        async move {
            let q = self.try_build()?;
            conn.execute(&q.sql, q.params.as_slice()).await
        }
    }
}
