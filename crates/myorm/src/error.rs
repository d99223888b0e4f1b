//! Error types for myorm

use thiserror::Error;

/// Result type alias for myorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Coarse classification of an [`OrmError`].
///
/// The connection manager only reacts to [`ErrorKind::ConnectionFatal`];
/// everything else is returned to the caller untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The connection is unusable and has to be re-created.
    ConnectionFatal,
    /// A connection-level hiccup that does not require a new connection.
    ConnectionTransient,
    /// The server rejected or failed a statement.
    QueryFailed,
    /// A stored value could not be decoded into a property.
    DecodeFailed,
    /// Invalid input or configuration supplied by the caller.
    Usage,
}

/// Error types for driver operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// The connection was lost or broken
    #[error("Fatal connection error{}: {message}", fmt_code(.code))]
    ConnectionFatal {
        code: Option<String>,
        message: String,
    },

    /// Recoverable connection error (timeout, interrupted I/O)
    #[error("Connection error{}: {message}", fmt_code(.code))]
    ConnectionTransient {
        code: Option<String>,
        message: String,
    },

    /// No usable connection (never connected, recovering or closed)
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// Query execution error reported by the server
    #[error("Query error{}: {message}", fmt_code(.code))]
    QueryFailed {
        code: Option<String>,
        message: String,
    },

    /// Stored value could not be decoded
    #[error("Decode error: {0}")]
    DecodeFailed(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

fn fmt_code(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(" [{code}]"),
        None => String::new(),
    }
}

impl OrmError {
    /// Create a fatal connection error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::ConnectionFatal {
            code: None,
            message: message.into(),
        }
    }

    /// Create a transient connection error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::ConnectionTransient {
            code: None,
            message: message.into(),
        }
    }

    /// Create a query error with an optional server error code.
    pub fn query(code: Option<String>, message: impl Into<String>) -> Self {
        Self::QueryFailed {
            code,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeFailed(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFatal { .. } => ErrorKind::ConnectionFatal,
            Self::ConnectionTransient { .. } | Self::NotConnected(_) => {
                ErrorKind::ConnectionTransient
            }
            Self::QueryFailed { .. } => ErrorKind::QueryFailed,
            Self::DecodeFailed(_) => ErrorKind::DecodeFailed,
            Self::Validation(_) | Self::Config(_) | Self::Serialization(_) | Self::Other(_) => {
                ErrorKind::Usage
            }
        }
    }

    /// Check if this error requires the connection to be re-created.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::ConnectionFatal
    }

    /// Check if this is a connection-level error (fatal or not).
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConnectionFatal | ErrorKind::ConnectionTransient
        )
    }

    /// Server error code (e.g. `ER_DUP_ENTRY` number) when one is known.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::ConnectionFatal { code, .. }
            | Self::ConnectionTransient { code, .. }
            | Self::QueryFailed { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Classify a sqlx error.
    ///
    /// Broken transports are fatal, timeouts are transient and anything the
    /// server reported is a query failure carrying the MySQL error code.
    #[cfg(feature = "mysql")]
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        use std::io::ErrorKind as IoKind;

        match err {
            sqlx::Error::Database(db_err) => Self::QueryFailed {
                code: db_err.code().map(|c| c.into_owned()),
                message: db_err.message().to_string(),
            },
            sqlx::Error::Io(io_err) => match io_err.kind() {
                IoKind::TimedOut | IoKind::Interrupted | IoKind::WouldBlock => {
                    Self::ConnectionTransient {
                        code: Some(format!("{:?}", io_err.kind())),
                        message: io_err.to_string(),
                    }
                }
                kind => Self::ConnectionFatal {
                    code: Some(format!("{kind:?}")),
                    message: io_err.to_string(),
                },
            },
            sqlx::Error::Tls(e) => Self::ConnectionFatal {
                code: Some("TLS".to_string()),
                message: e.to_string(),
            },
            sqlx::Error::Protocol(message) => Self::ConnectionFatal {
                code: Some("PROTOCOL".to_string()),
                message,
            },
            sqlx::Error::WorkerCrashed => Self::fatal("connection worker crashed"),
            sqlx::Error::PoolTimedOut => Self::transient("timed out acquiring connection"),
            sqlx::Error::PoolClosed => Self::fatal("connection closed"),
            sqlx::Error::Configuration(e) => Self::Config(e.to_string()),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::DecodeFailed(format!("column {index}: {source}"))
            }
            sqlx::Error::Decode(e) => Self::DecodeFailed(e.to_string()),
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        Self::from_sqlx(err)
    }
}
