//! Production [`Connector`] on top of `sqlx`'s MySQL driver.

use crate::client::{Connection, Connector};
use crate::config::ConnectionConfig;
use crate::error::OrmResult;
use crate::value::{ExecResult, Row, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column as _, ConnectOptions as _, Connection as _, Row as _, TypeInfo as _};
use std::str::FromStr;

type MySqlQuery<'q> = Query<'q, sqlx::MySql, MySqlArguments>;

/// Opens plain `sqlx` MySQL connections.
#[derive(Debug, Clone, Default)]
pub struct MySqlConnector;

impl MySqlConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Translate a [`ConnectionConfig`] into sqlx connect options.
pub fn connect_options(config: &ConnectionConfig) -> OrmResult<MySqlConnectOptions> {
    let options = match &config.url {
        Some(url) => MySqlConnectOptions::from_str(url)?,
        None => {
            let mut options = MySqlConnectOptions::new()
                .host(&config.host)
                .port(config.port);
            if let Some(user) = &config.user {
                options = options.username(user);
            }
            if let Some(password) = &config.password {
                options = options.password(password);
            }
            if let Some(database) = &config.database {
                options = options.database(database);
            }
            options
        }
    };
    Ok(options.timezone(config.session_time_zone()))
}

impl Connector for MySqlConnector {
    type Conn = MySqlConn;

    async fn connect(&self, config: &ConnectionConfig) -> OrmResult<MySqlConn> {
        let options = connect_options(config)?;
        let inner = options.connect().await?;
        Ok(MySqlConn { inner })
    }
}

/// One open MySQL session.
#[derive(Debug)]
pub struct MySqlConn {
    inner: MySqlConnection,
}

impl MySqlConn {
    /// Wrap an already established sqlx connection.
    pub fn from_sqlx(inner: MySqlConnection) -> Self {
        Self { inner }
    }
}

impl Connection for MySqlConn {
    async fn query(&mut self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&mut self.inner)
            .await?;
        rows.iter().map(convert_row).collect()
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
        let res = bind_all(sqlx::query(sql), params)
            .execute(&mut self.inner)
            .await?;
        Ok(res.into())
    }

    async fn close(self) -> OrmResult<()> {
        self.inner.close().await?;
        Ok(())
    }
}

fn bind_all<'q>(mut query: MySqlQuery<'q>, params: &[Value]) -> MySqlQuery<'q> {
    for param in params {
        query = bind_param(query, param);
    }
    query
}

fn bind_param<'q>(query: MySqlQuery<'q>, value: &Value) -> MySqlQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(n) => query.bind(*n),
        Value::UInt(n) => query.bind(*n),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
        Value::Json(v) => query.bind(sqlx::types::Json(v.clone())),
        Value::Timestamp(ts) => query.bind(*ts),
    }
}

fn convert_row(row: &MySqlRow) -> OrmResult<Row> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        columns.push(column.name().to_string());
        values.push(convert_value(row, i)?);
    }
    Ok(Row::new(columns, values))
}

fn get<'r, T>(row: &'r MySqlRow, index: usize) -> OrmResult<Option<T>>
where
    T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql>,
{
    Ok(row.try_get::<Option<T>, _>(index)?)
}

/// Decode without the column type check (DECIMAL arrives as text).
fn get_unchecked<'r, T>(row: &'r MySqlRow, index: usize) -> OrmResult<Option<T>>
where
    T: sqlx::Decode<'r, sqlx::MySql>,
{
    Ok(row.try_get_unchecked::<Option<T>, _>(index)?)
}

fn convert_value(row: &MySqlRow, index: usize) -> OrmResult<Value> {
    let type_name = row.columns()[index].type_info().name();

    let value = match type_name {
        "BOOLEAN" => get::<bool>(row, index)?.map(Value::Bool),
        "TINYINT" | "SMALLINT" | "INT" | "MEDIUMINT" | "BIGINT" | "YEAR" => {
            get::<i64>(row, index)?.map(Value::Int)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "INT UNSIGNED" | "MEDIUMINT UNSIGNED"
        | "BIGINT UNSIGNED" => get::<u64>(row, index)?.map(Value::UInt),
        "FLOAT" | "DOUBLE" => get::<f64>(row, index)?.map(Value::Float),
        "DECIMAL" => get_unchecked::<String>(row, index)?.map(|s| match s.parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => Value::Text(s),
        }),
        "TIMESTAMP" => get::<DateTime<Utc>>(row, index)?.map(Value::Timestamp),
        "DATETIME" => get::<NaiveDateTime>(row, index)?.map(|dt| Value::Timestamp(dt.and_utc())),
        "DATE" => get::<NaiveDate>(row, index)?.map(|d| Value::Text(d.to_string())),
        "TIME" => get::<NaiveTime>(row, index)?.map(|t| Value::Text(t.to_string())),
        "JSON" => get::<serde_json::Value>(row, index)?.map(Value::Json),
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            get::<Vec<u8>>(row, index)?.map(Value::Bytes)
        }
        "NULL" => None,
        _ => match get::<String>(row, index) {
            Ok(text) => text.map(Value::Text),
            Err(_) => get_unchecked::<Vec<u8>>(row, index)?.map(Value::Bytes),
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

impl From<sqlx::mysql::MySqlQueryResult> for ExecResult {
    fn from(res: sqlx::mysql::MySqlQueryResult) -> Self {
        Self {
            rows_affected: res.rows_affected(),
            last_insert_id: res.last_insert_id(),
        }
    }
}
