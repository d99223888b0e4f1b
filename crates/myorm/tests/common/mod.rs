//! In-memory connector shared by the integration tests.

#![allow(dead_code)]

use myorm::{
    Connection, ConnectionConfig, Connector, ExecResult, OrmError, OrmResult, Row, SqlSink, Value,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

#[derive(Default)]
struct MockState {
    statements: Vec<(String, Vec<Value>)>,
    connects: Vec<Instant>,
    failing_connects: usize,
    hanging_connects: bool,
    statement_errors: VecDeque<OrmError>,
    rows: VecDeque<Vec<Row>>,
    last_insert_id: u64,
    closed: usize,
}

/// Shared handle to the fake server; clones observe the same state.
#[derive(Clone, Default)]
pub struct MockDb {
    state: Arc<Mutex<MockState>>,
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector { db: self.clone() }
    }

    /// SQL of every statement received so far.
    pub fn sql(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .statements
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    pub fn last(&self) -> Option<(String, Vec<Value>)> {
        self.state.lock().unwrap().statements.last().cloned()
    }

    /// Make the next statement fail with `err`.
    pub fn fail_next_statement(&self, err: OrmError) {
        self.state.lock().unwrap().statement_errors.push_back(err);
    }

    /// Make the next `n` connect attempts fail.
    pub fn fail_connects(&self, n: usize) {
        self.state.lock().unwrap().failing_connects = n;
    }

    /// Make every later connect attempt hang forever, like a host that
    /// silently drops packets.
    pub fn hang_connects(&self) {
        self.state.lock().unwrap().hanging_connects = true;
    }

    /// Queue rows for the next query.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state.lock().unwrap().rows.push_back(rows);
    }

    /// Instants of every connect attempt, successful or not.
    pub fn connect_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().connects.clone()
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    fn record(&self, sql: &str, params: &[Value]) -> OrmResult<()> {
        let mut state = self.state.lock().unwrap();
        state.statements.push((sql.to_string(), params.to_vec()));
        match state.statement_errors.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub struct MockConnector {
    db: MockDb,
}

impl Connector for MockConnector {
    type Conn = MockConn;

    async fn connect(&self, _config: &ConnectionConfig) -> OrmResult<MockConn> {
        let hang = {
            let mut state = self.db.state.lock().unwrap();
            state.connects.push(Instant::now());
            if state.failing_connects > 0 {
                state.failing_connects -= 1;
                return Err(OrmError::ConnectionFatal {
                    code: Some("ECONNREFUSED".to_string()),
                    message: "connection refused".to_string(),
                });
            }
            state.hanging_connects
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(MockConn {
            db: self.db.clone(),
        })
    }
}

pub struct MockConn {
    db: MockDb,
}

impl Connection for MockConn {
    async fn query(&mut self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.db.record(sql, params)?;
        Ok(self
            .db
            .state
            .lock()
            .unwrap()
            .rows
            .pop_front()
            .unwrap_or_default())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
        self.db.record(sql, params)?;
        let mut state = self.db.state.lock().unwrap();
        state.last_insert_id += 1;
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: state.last_insert_id,
        })
    }

    async fn close(self) -> OrmResult<()> {
        self.db.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// Collects `(dialect, sql)` pairs mirrored by the driver.
#[derive(Clone, Default)]
pub struct CaptureSink {
    pub seen: Arc<Mutex<Vec<(String, String)>>>,
}

impl CaptureSink {
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }
}

impl SqlSink for CaptureSink {
    fn sql(&self, dialect: &str, sql: &str) {
        self.seen
            .lock()
            .unwrap()
            .push((dialect.to_string(), sql.to_string()));
    }
}

pub fn fatal(message: &str) -> OrmError {
    OrmError::ConnectionFatal {
        code: Some("PROTOCOL_CONNECTION_LOST".to_string()),
        message: message.to_string(),
    }
}
