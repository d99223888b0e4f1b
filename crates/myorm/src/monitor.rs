//! Debug SQL sink.
//!
//! When [`DriverOptions::debug`](crate::DriverOptions) is set, every
//! statement the driver submits is mirrored to a [`SqlSink`] as
//! `(dialect, sql)`. The default sink emits a `tracing` event on target
//! `myorm.sql`.

use tracing::Level;

/// Receives statements mirrored by the driver in debug mode.
pub trait SqlSink: Send + Sync {
    fn sql(&self, dialect: &str, sql: &str);
}

impl<F> SqlSink for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn sql(&self, dialect: &str, sql: &str) {
        self(dialect, sql)
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// A `tracing`-based sink that emits the SQL as it will be executed.
#[derive(Debug, Clone)]
pub struct TracingSqlSink {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingSqlSink {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: None,
        }
    }
}

impl TracingSqlSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    fn truncate_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }
}

impl SqlSink for TracingSqlSink {
    fn sql(&self, dialect: &str, sql: &str) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(sql);
        emit_at_level!(self.level, target: "myorm.sql", dialect, sql = %sql);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_sql_bytes("héllo", 2), "h");
        assert_eq!(truncate_sql_bytes("abc", 10), "abc");

        let sink = TracingSqlSink::new().max_sql_length(6);
        assert_eq!(sink.truncate_sql("SELECT 1"), "SELECT...");
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Mutex::new(Vec::new());
        let sink = |dialect: &str, sql: &str| {
            seen.lock().unwrap().push(format!("{dialect}: {sql}"));
        };
        sink.sql("mysql", "SELECT 1");
        TracingSqlSink::default().sql("mysql", "SELECT 2");
        assert_eq!(seen.into_inner().unwrap(), ["mysql: SELECT 1"]);
    }
}
