//! CRUD entry points used by the ORM core.

use crate::client::Connector;
use crate::codec::{self, Property};
use crate::condition::{CondMethod, Conditions};
use crate::config::{ConnectionConfig, DriverOptions};
use crate::connection::{ConnectionManager, ConnectionState, ConnectionStats};
use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::monitor::{SqlSink, TracingSqlSink};
use crate::qb::{self, BuiltQuery, Direction, FieldDefinition, Merge, Order, SqlQb};
use crate::value::{ExecResult, InsertId, Row, Value};
use std::sync::Arc;

/// Dialect name reported to the SQL sink.
pub const DIALECT: &str = "mysql";

/// Per-call options for [`Driver::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Overrides the projected fields.
    pub fields: Option<Vec<String>>,
    pub merge: Option<Merge>,
    /// Rows to skip; `0` is the same as unset.
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub order: Vec<Order>,
    pub cond_method: Option<CondMethod>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.as_ref().to_string()).collect());
        self
    }

    pub fn merge(mut self, merge: Merge) -> Self {
        self.merge = Some(merge);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push(Order::new(column, direction));
        self
    }

    pub fn cond_method(mut self, method: CondMethod) -> Self {
        self.cond_method = Some(method);
        self
    }
}

/// MySQL driver: one connection, one method per CRUD verb.
///
/// Every call builds a fresh query, so a shared `Driver` can be used from
/// several tasks; statements serialize on the connection.
pub struct Driver<C: Connector> {
    conn: ConnectionManager<C>,
    debug: bool,
    sink: Arc<dyn SqlSink>,
}

#[cfg(feature = "mysql")]
impl Driver<crate::mysql::MySqlConnector> {
    /// Driver backed by `sqlx`'s MySQL client.
    pub fn mysql(config: ConnectionConfig, options: DriverOptions) -> Self {
        Self::new(crate::mysql::MySqlConnector::new(), config, options)
    }
}

impl<C: Connector> Driver<C> {
    pub fn new(connector: C, config: ConnectionConfig, options: DriverOptions) -> Self {
        let sink = options
            .sink
            .unwrap_or_else(|| Arc::new(TracingSqlSink::default()) as Arc<dyn SqlSink>);
        Self {
            conn: ConnectionManager::new(connector, config, options.reconnect),
            debug: options.debug,
            sink,
        }
    }

    /// The underlying connection manager.
    pub fn connection(&self) -> &ConnectionManager<C> {
        &self.conn
    }

    pub async fn connect(&self) -> OrmResult<()> {
        self.conn.connect().await
    }

    pub async fn close(&self) -> OrmResult<()> {
        self.conn.close().await
    }

    /// Register an event observer; only `"error"` is recognised.
    pub fn on<F>(&self, name: &str, handler: F) -> &Self
    where
        F: Fn(&OrmError) + Send + Sync + 'static,
    {
        self.conn.on(name, handler);
        self
    }

    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&OrmError) + Send + Sync + 'static,
    {
        self.conn.on_error(handler);
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.conn.stats()
    }

    // ==================== CRUD ====================

    /// `SELECT fields FROM table WHERE conditions ...`.
    pub async fn find<S: AsRef<str>>(
        &self,
        fields: &[S],
        table: &str,
        conditions: &Conditions,
        opts: &FindOptions,
    ) -> OrmResult<Vec<Row>> {
        let mut q = qb::select(table).fields(fields);
        if let Some(fields) = &opts.fields {
            q = q.fields(fields);
        }
        if let Some(merge) = &opts.merge {
            q = q.merge(merge.clone());
        }
        if let Some(offset) = opts.offset.filter(|&n| n > 0) {
            q = q.offset(offset);
        }
        if let Some(limit) = opts.limit {
            q = q.limit(limit);
        }
        for order in &opts.order {
            q = q.order(&order.column, order.direction);
        }
        for (column, m) in conditions.iter() {
            q = q.where_match(column, m.clone());
        }
        if let Some(method) = opts.cond_method {
            q = q.cond_method(method);
        }

        self.fetch(&q).await
    }

    /// `SELECT COUNT(*) AS c FROM table WHERE conditions`.
    ///
    /// Conditions are always combined with AND.
    pub async fn count(&self, table: &str, conditions: &Conditions) -> OrmResult<Vec<Row>> {
        let mut q = qb::select(table).count();
        for (column, m) in conditions.iter() {
            q = q.where_match(column, m.clone());
        }
        self.fetch(&q).await
    }

    /// Insert one row and return its generated id.
    pub async fn insert<I, K, V>(&self, table: &str, data: I) -> OrmResult<InsertId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let q = data
            .into_iter()
            .fold(qb::insert(table), |q, (k, v)| q.set(k.as_ref(), v));
        Ok(self.exec(&q).await?.into())
    }

    pub async fn update<I, K, V>(
        &self,
        table: &str,
        changes: I,
        conditions: &Conditions,
    ) -> OrmResult<ExecResult>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut q = qb::update(table);
        for (column, m) in conditions.iter() {
            q = q.where_match(column, m.clone());
        }
        for (k, v) in changes {
            q = q.set(k.as_ref(), v);
        }
        self.exec(&q).await
    }

    /// Delete matching rows; empty conditions delete every row.
    pub async fn remove(&self, table: &str, conditions: &Conditions) -> OrmResult<ExecResult> {
        let q = conditions
            .iter()
            .fold(qb::remove(table), |q, (column, m)| q.where_match(column, m.clone()));
        self.exec(&q).await
    }

    /// `TRUNCATE TABLE table`.
    pub async fn clear(&self, table: &str) -> OrmResult<ExecResult> {
        let q = BuiltQuery::text(format!("TRUNCATE TABLE {}", ident::escape_id(table)));
        self.exec_built(q).await
    }

    // ==================== DDL ====================

    /// Render the `CREATE TABLE` statement without executing it.
    pub fn create_table<I, K, D>(&self, table: &str, fields: I) -> OrmResult<String>
    where
        I: IntoIterator<Item = (K, D)>,
        K: AsRef<str>,
        D: Into<FieldDefinition>,
    {
        let q = fields
            .into_iter()
            .fold(qb::create_table(table), |q, (name, def)| q.add_field(name.as_ref(), def));
        q.sql()
    }

    /// Create the table if it does not exist.
    pub async fn sync<I, K, D>(&self, table: &str, fields: I) -> OrmResult<ExecResult>
    where
        I: IntoIterator<Item = (K, D)>,
        K: AsRef<str>,
        D: Into<FieldDefinition>,
    {
        let sql = self.create_table(table, fields)?;
        self.exec_built(BuiltQuery::text(sql)).await
    }

    /// `DROP TABLE IF EXISTS table`.
    pub async fn drop(&self, table: &str) -> OrmResult<ExecResult> {
        let q = BuiltQuery::text(format!("DROP TABLE IF EXISTS {}", ident::escape_id(table)));
        self.exec_built(q).await
    }

    // ==================== Codec ====================

    pub fn value_to_property(&self, value: Value, property: &Property) -> Value {
        codec::value_to_property(value, property)
    }

    pub fn property_to_value(&self, value: Value, property: &Property) -> OrmResult<Value> {
        codec::property_to_value(value, property)
    }

    pub fn escape_id(&self, id: &str) -> String {
        ident::escape_id(id)
    }

    // ==================== Dispatch ====================

    fn trace(&self, q: &BuiltQuery) {
        if self.debug {
            self.sink.sql(DIALECT, &q.sql);
        }
    }

    async fn fetch<Q: SqlQb>(&self, q: &Q) -> OrmResult<Vec<Row>> {
        let q = q.try_build()?;
        self.trace(&q);
        self.conn.query(&q.sql, q.params.as_slice()).await
    }

    async fn exec<Q: SqlQb>(&self, q: &Q) -> OrmResult<ExecResult> {
        self.exec_built(q.try_build()?).await
    }

    async fn exec_built(&self, q: BuiltQuery) -> OrmResult<ExecResult> {
        self.trace(&q);
        self.conn.execute(&q.sql, q.params.as_slice()).await
    }
}
