//! Single-connection manager with supervised reconnection.
//!
//! The manager owns one [`Connection`] behind an async mutex. Statements run
//! through [`ConnectionManager::query`] / [`ConnectionManager::execute`]; when
//! one of them fails with a fatal connection error the broken handle is
//! dropped, registered observers are notified and a background supervisor
//! re-creates the connection according to the [`ReconnectPolicy`].
//!
//! State machine:
//!
//! ```text
//! Disconnected --connect--> Connected --fatal--> Recovering --ok--> Connected
//!                                                     |
//!            any state --close--> Closed              +--gave up--> Disconnected
//! ```
//!
//! At most one recovery runs at a time and it has at most one pending timer;
//! fatal errors reported while recovering are coalesced into it. Queries
//! issued while recovering fail fast with [`OrmError::NotConnected`].

use crate::client::{Connection, Connector};
use crate::config::{ConnectionConfig, ReconnectPolicy};
use crate::error::{OrmError, OrmResult};
use crate::value::{ExecResult, Row, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const COMMAND_QUEUE_CAPACITY: usize = 8;

/// Error observer registered through [`ConnectionManager::on`].
pub type ErrorHandler = Arc<dyn Fn(&OrmError) + Send + Sync>;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected, or recovery gave up.
    Disconnected,
    Connected,
    /// A fatal error occurred; the supervisor is re-creating the connection.
    Recovering,
    Closed,
}

/// Reconnection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Fatal errors observed.
    pub fatal_errors: u64,
    /// Reconnect attempts made (successful or not).
    pub reconnect_attempts: u64,
    /// Successful reconnects.
    pub reconnect_count: u64,
}

struct Shared {
    state: watch::Sender<ConnectionState>,
    fatal_errors: AtomicU64,
    reconnect_attempts: AtomicU64,
    reconnect_count: AtomicU64,
    observers: RwLock<Vec<ErrorHandler>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: watch::Sender::new(ConnectionState::Disconnected),
            fatal_errors: AtomicU64::new(0),
            reconnect_attempts: AtomicU64::new(0),
            reconnect_count: AtomicU64::new(0),
            observers: RwLock::new(Vec::new()),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Move `Connected -> Recovering`; false if already recovering or closed.
    fn begin_recovery(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Connected {
                *state = ConnectionState::Recovering;
                true
            } else {
                false
            }
        })
    }

    fn notify(&self, err: &OrmError) {
        let observers: Vec<ErrorHandler> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer(err);
        }
    }

    fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            fatal_errors: self.fatal_errors.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            reconnect_count: self.reconnect_count.load(Ordering::Relaxed),
        }
    }
}

enum SupervisorCommand {
    Recover,
    Close { resp: oneshot::Sender<()> },
}

struct Supervisor {
    cmd_tx: mpsc::Sender<SupervisorCommand>,
    worker: JoinHandle<()>,
}

impl Supervisor {
    async fn shutdown(self) {
        let (resp_tx, resp_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SupervisorCommand::Close { resp: resp_tx })
            .await
            .is_ok()
        {
            let _ = resp_rx.await;
        }
        let _ = self.worker.await;
    }
}

/// Owns the driver's single connection.
pub struct ConnectionManager<C: Connector> {
    connector: Arc<C>,
    config: Arc<ConnectionConfig>,
    policy: ReconnectPolicy,
    conn: Arc<Mutex<Option<C::Conn>>>,
    shared: Arc<Shared>,
    supervisor: std::sync::Mutex<Option<Supervisor>>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager; no connection is opened until [`connect`](Self::connect).
    pub fn new(connector: C, config: ConnectionConfig, policy: ReconnectPolicy) -> Self {
        Self {
            connector: Arc::new(connector),
            config: Arc::new(config),
            policy,
            conn: Arc::new(Mutex::new(None)),
            shared: Arc::new(Shared::new()),
            supervisor: std::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.shared.stats()
    }

    /// Open the connection and start the reconnect supervisor.
    ///
    /// Calling this while connected is a no-op.
    pub async fn connect(&self) -> OrmResult<()> {
        let mut slot = self.conn.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        let conn = self.connector.connect(&self.config).await?;
        *slot = Some(conn);
        self.shared.set_state(ConnectionState::Connected);
        drop(slot);

        self.ensure_supervisor();
        tracing::debug!(
            target: "myorm.connection",
            host = %self.config.host,
            port = self.config.port,
            "connected"
        );
        Ok(())
    }

    /// Stop the supervisor, then end the connection gracefully.
    pub async fn close(&self) -> OrmResult<()> {
        let supervisor = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(supervisor) = supervisor {
            supervisor.shutdown().await;
        }

        self.shared.set_state(ConnectionState::Closed);
        let conn = self.conn.lock().await.take();
        if let Some(conn) = conn {
            conn.close().await?;
        }
        tracing::debug!(target: "myorm.connection", "closed");
        Ok(())
    }

    /// Register an observer for event `name`.
    ///
    /// Only `"error"` is recognised; other names are ignored.
    pub fn on<F>(&self, name: &str, handler: F) -> &Self
    where
        F: Fn(&OrmError) + Send + Sync + 'static,
    {
        if name == "error" {
            self.on_error(handler);
        }
        self
    }

    /// Register an observer for connection errors (fatal and transient).
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&OrmError) + Send + Sync + 'static,
    {
        self.shared
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    /// Run a statement that returns rows.
    pub async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let mut slot = self.conn.lock().await;
        let conn = slot.as_mut().ok_or_else(|| self.not_connected())?;
        let result = conn.query(sql, params).await;
        self.check(&mut slot, result)
    }

    /// Run a statement that does not return rows.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
        let mut slot = self.conn.lock().await;
        let conn = slot.as_mut().ok_or_else(|| self.not_connected())?;
        let result = conn.execute(sql, params).await;
        self.check(&mut slot, result)
    }

    /// Report a connection error raised outside of [`query`](Self::query) /
    /// [`execute`](Self::execute).
    ///
    /// Observers are notified of every connection error; only fatal errors
    /// start a recovery.
    pub async fn report_error(&self, err: &OrmError) {
        if err.is_fatal() {
            self.conn.lock().await.take();
        }
        self.handle_failure(err);
    }

    fn check<T>(&self, slot: &mut Option<C::Conn>, result: OrmResult<T>) -> OrmResult<T> {
        if let Err(err) = &result {
            if err.is_fatal() {
                slot.take();
            }
            self.handle_failure(err);
        }
        result
    }

    fn handle_failure(&self, err: &OrmError) {
        if !err.is_connection_error() || matches!(err, OrmError::NotConnected(_)) {
            return;
        }
        self.shared.notify(err);
        if !err.is_fatal() {
            return;
        }

        self.shared.fatal_errors.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            target: "myorm.connection",
            code = err.code().unwrap_or("-"),
            error = %err,
            "fatal connection error"
        );

        if !self.policy.enabled {
            self.shared.state.send_if_modified(|state| {
                let modified = *state == ConnectionState::Connected;
                if modified {
                    *state = ConnectionState::Disconnected;
                }
                modified
            });
            return;
        }

        if !self.shared.begin_recovery() {
            tracing::debug!(target: "myorm.connection", "recovery already in progress");
            return;
        }

        let sent = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.cmd_tx.try_send(SupervisorCommand::Recover).is_ok())
            .unwrap_or(false);
        if !sent {
            tracing::warn!(target: "myorm.connection", "reconnect supervisor unavailable");
            self.shared.set_state(ConnectionState::Disconnected);
        }
    }

    fn not_connected(&self) -> OrmError {
        let reason = match self.shared.state() {
            ConnectionState::Recovering => "connection is being re-established",
            ConnectionState::Closed => "connection closed",
            ConnectionState::Disconnected | ConnectionState::Connected => "not connected",
        };
        OrmError::NotConnected(reason.to_string())
    }

    fn ensure_supervisor(&self) {
        let mut supervisor = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if supervisor.as_ref().is_some_and(|s| !s.worker.is_finished()) {
            return;
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let worker = tokio::spawn(supervise(
            Arc::clone(&self.connector),
            Arc::clone(&self.config),
            self.policy.clone(),
            Arc::clone(&self.conn),
            Arc::clone(&self.shared),
            cmd_rx,
        ));
        *supervisor = Some(Supervisor { cmd_tx, worker });
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        let supervisor = self
            .supervisor
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(supervisor) = supervisor {
            supervisor.worker.abort();
        }
    }
}

enum Recovery {
    Reconnected,
    GaveUp,
    Closed,
}

async fn supervise<C: Connector>(
    connector: Arc<C>,
    config: Arc<ConnectionConfig>,
    policy: ReconnectPolicy,
    conn: Arc<Mutex<Option<C::Conn>>>,
    shared: Arc<Shared>,
    mut cmd_rx: mpsc::Receiver<SupervisorCommand>,
) {
    loop {
        match cmd_rx.recv().await {
            None => return,
            Some(SupervisorCommand::Close { resp }) => {
                let _ = resp.send(());
                return;
            }
            Some(SupervisorCommand::Recover) => {}
        }

        match recover(&*connector, &config, &policy, &conn, &shared, &mut cmd_rx).await {
            Recovery::Reconnected => {}
            Recovery::GaveUp => shared.set_state(ConnectionState::Disconnected),
            Recovery::Closed => return,
        }
    }
}

async fn recover<C: Connector>(
    connector: &C,
    config: &ConnectionConfig,
    policy: &ReconnectPolicy,
    conn: &Mutex<Option<C::Conn>>,
    shared: &Shared,
    cmd_rx: &mut mpsc::Receiver<SupervisorCommand>,
) -> Recovery {
    let mut delay = policy.delay;
    let mut failures: u32 = 0;

    loop {
        if !policy.allows_attempt(failures) {
            tracing::error!(
                target: "myorm.connection",
                attempts = failures,
                "giving up on reconnecting"
            );
            return Recovery::GaveUp;
        }

        let sleep = tokio::time::sleep(policy.jittered(delay));
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => if stop_requested(cmd) {
                    return Recovery::Closed;
                },
                _ = &mut sleep => break,
            }
        }

        if conn.lock().await.is_some() {
            tracing::debug!(target: "myorm.connection", "connection re-opened by caller");
            return Recovery::Reconnected;
        }

        shared.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(target: "myorm.connection", attempt = failures + 1, "connection lost, reconnecting");

        let attempt = connector.connect(config);
        tokio::pin!(attempt);
        let result = loop {
            tokio::select! {
                cmd = cmd_rx.recv() => if stop_requested(cmd) {
                    return Recovery::Closed;
                },
                res = &mut attempt => break res,
            }
        };

        match result {
            Ok(new_conn) => {
                let mut slot = conn.lock().await;
                if slot.is_some() {
                    drop(slot);
                    tracing::debug!(target: "myorm.connection", "connection re-opened by caller");
                    if let Err(err) = new_conn.close().await {
                        tracing::debug!(target: "myorm.connection", error = %err, "closing surplus connection failed");
                    }
                    return Recovery::Reconnected;
                }
                *slot = Some(new_conn);
                drop(slot);
                shared.reconnect_count.fetch_add(1, Ordering::Relaxed);
                shared.set_state(ConnectionState::Connected);
                tracing::info!(target: "myorm.connection", "reconnected");
                return Recovery::Reconnected;
            }
            Err(err) => {
                failures = failures.saturating_add(1);
                tracing::error!(
                    target: "myorm.connection",
                    attempt = failures,
                    error = %err,
                    "reconnect failed"
                );
                delay = policy.next_delay(delay);
            }
        }
    }
}

/// Handle a command received mid-recovery; `true` when the supervisor must stop.
fn stop_requested(cmd: Option<SupervisorCommand>) -> bool {
    match cmd {
        None => true,
        Some(SupervisorCommand::Close { resp }) => {
            let _ = resp.send(());
            true
        }
        // Already recovering.
        Some(SupervisorCommand::Recover) => false,
    }
}
