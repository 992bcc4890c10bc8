//! MySQL wire protocol client.
//!
//! Provides the `MySqlClient` struct that implements the `DatabaseClient` trait
//! over a single-connection sqlx pool. Databend exposes this protocol through
//! its MySQL handler.

use crate::config::ConnectionConfig;
use crate::db::{DatabaseClient, Row, Value};
use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::TryStreamExt;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout for establishing the session.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// MySQL-protocol database client.
///
/// The pool never holds more than one connection, so every statement runs in
/// the same server session. If that connection is replaced, the database last
/// selected with `use_database` is selected again before it is handed out.
#[derive(Debug)]
pub struct MySqlClient {
    pool: MySqlPool,
    selected: Arc<Mutex<Option<String>>>,
    query_timeout: Duration,
}

impl MySqlClient {
    /// Opens a session. Failures are not retried.
    pub async fn connect(config: &ConnectionConfig) -> DbResult<Self> {
        let conn_str = config.to_connection_string();
        debug!("Connecting to {}", config.display_string());

        let selected: Arc<Mutex<Option<String>>> = Arc::default();
        let reselect = Arc::clone(&selected);

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .idle_timeout(None)
            .max_lifetime(None)
            .after_connect(move |conn, _meta| {
                let statement = lock(&reselect)
                    .as_ref()
                    .map(|database| format!("USE {database}"));
                Box::pin(async move {
                    if let Some(statement) = statement {
                        debug!("Reconnected; running {statement}");
                        conn.execute(statement.as_str()).await?;
                    }
                    Ok(())
                })
            })
            .connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Successfully connected to database");
        Ok(Self {
            pool,
            selected,
            query_timeout: config.query_timeout,
        })
    }
}

fn lock(selected: &Mutex<Option<String>>) -> std::sync::MutexGuard<'_, Option<String>> {
    selected.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    async fn execute(&mut self, sql: &str) -> DbResult<()> {
        let timeout = self.query_timeout;
        // raw_sql goes through the text protocol, which DDL and USE require
        let result = tokio::time::timeout(timeout, sqlx::raw_sql(sql).execute(&self.pool))
            .await
            .map_err(|_| DbError::Timeout(timeout))?
            .map_err(|e| DbError::execute(format_query_error(e)))?;

        debug!("Statement affected {} rows", result.rows_affected());
        Ok(())
    }

    async fn use_database(&mut self, database: &str) -> DbResult<()> {
        self.execute(&format!("USE {database}")).await?;
        *lock(&self.selected) = Some(database.to_string());
        Ok(())
    }

    async fn query_rows(&mut self, sql: &str) -> DbResult<Vec<Row>> {
        let timeout = self.query_timeout;
        let pool = &self.pool;

        let fetch = async move {
            let mut stream = sqlx::raw_sql(sql).fetch(pool);
            let mut rows = Vec::new();
            while let Some(row) = stream.try_next().await? {
                rows.push(convert_row(&row));
            }
            Ok::<_, sqlx::Error>(rows)
        };

        let rows = tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| DbError::Timeout(timeout))?
            .map_err(|e| DbError::execute(format_query_error(e)))?;

        debug!("Query returned {} rows", rows.len());
        Ok(rows)
    }

    async fn close(self: Box<Self>) -> DbResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx MySqlRow to our Row type.
fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value by its declared type.
///
/// Anything the typed decode rejects falls back to the value's text form so a
/// difference between the two sides is never hidden behind a NULL.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let decoded = match type_name.to_uppercase().as_str() {
        "BOOLEAN" => row.try_get::<Option<bool>, _>(index).map(Value::from),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get::<Option<i64>, _>(index).map(Value::from)
        }

        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row.try_get::<Option<u64>, _>(index).map(Value::from),

        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| v.map(|f| Value::Float(f as f64)).unwrap_or(Value::Null)),

        "DOUBLE" => row.try_get::<Option<f64>, _>(index).map(Value::from),

        "DECIMAL" => row
            .try_get_unchecked::<Option<String>, _>(index)
            .map(|v| v.map(Value::Decimal).unwrap_or(Value::Null)),

        "DATE" => row.try_get::<Option<NaiveDate>, _>(index).map(Value::from),

        "TIME" => row.try_get::<Option<NaiveTime>, _>(index).map(Value::from),

        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .map(Value::from),

        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            row.try_get::<Option<Vec<u8>>, _>(index).map(Value::from)
        }

        "NULL" => Ok(Value::Null),

        // For all other types, try to get as string
        _ => row.try_get::<Option<String>, _>(index).map(Value::from),
    };

    match decoded {
        Ok(value) => value,
        Err(e) => decode_as_text(row, index, type_name, e),
    }
}

/// Falls back to the raw text (or bytes) of a column.
fn decode_as_text(row: &MySqlRow, index: usize, type_name: &str, error: sqlx::Error) -> Value {
    debug!("Decoding column {index} ({type_name}) as text: {error}");

    if let Ok(text) = row.try_get_unchecked::<Option<String>, _>(index) {
        return Value::from(text);
    }
    if let Ok(bytes) = row.try_get_unchecked::<Option<Vec<u8>>, _>(index) {
        return Value::from(bytes);
    }

    warn!("Column {index} ({type_name}) could not be decoded; treating as NULL");
    Value::Null
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> DbError {
    let host = &config.host;
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("anonymous");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        DbError::connect(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("access denied") || error_str.contains("authentication") {
        DbError::connect(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        DbError::connect(
            "TLS negotiation failed. Add '?sslmode=disable' or '?sslmode=require' to the DSN."
                .to_string(),
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        DbError::connect(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        DbError::connect(error.to_string())
    }
}

/// Formats a statement error, keeping the server's code when available.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => match db_error.code() {
            Some(code) => format!("ERROR {code}: {}", db_error.message()),
            None => format!("ERROR: {}", db_error.message()),
        },
        None => error.to_string(),
    }
}
