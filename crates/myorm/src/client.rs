//! Client seam between the driver and the MySQL wire client.
//!
//! The driver never talks to a socket directly: a [`Connector`] opens
//! [`Connection`]s from a [`ConnectionConfig`], and the connection runs
//! already-rendered SQL. The production implementation lives in
//! [`crate::mysql`]; tests plug in an in-memory connector.

use crate::config::ConnectionConfig;
use crate::error::OrmResult;
use crate::value::{ExecResult, Row, Value};

/// A single open database session.
pub trait Connection: Send + 'static {
    /// Execute a statement and return all rows.
    fn query(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Execute a statement and return the affected-row count and insert id.
    fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<ExecResult>> + Send;

    /// End the session gracefully.
    fn close(self) -> impl std::future::Future<Output = OrmResult<()>> + Send
    where
        Self: Sized;
}

/// Opens connections. Called once on `connect` and again on every
/// reconnect attempt.
pub trait Connector: Send + Sync + 'static {
    type Conn: Connection;

    fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> impl std::future::Future<Output = OrmResult<Self::Conn>> + Send;
}
