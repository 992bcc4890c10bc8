//! Database abstraction layer for double-check.
//!
//! Provides a trait-based interface over one live database session, so the
//! comparison core can run against real servers or in-memory mocks.

mod mock;
mod mysql;
mod types;

pub use mock::{MockDatabaseClient, MockHandle};
pub use mysql::MySqlClient;
pub use types::{format_row, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::DbResult;
use async_trait::async_trait;

/// Supported wire protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseBackend {
    /// MySQL wire protocol, as served by Databend's MySQL handler.
    #[default]
    MySql,
}

impl DatabaseBackend {
    /// Parses a backend from a DSN scheme.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_lowercase().as_str() {
            "mysql" => Some(Self::MySql),
            _ => None,
        }
    }

    /// Port used when the DSN names none; Databend's MySQL handler listens on 3307.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::MySql => 3307,
        }
    }

    /// Returns the URL scheme the driver expects.
    pub fn url_scheme(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
        }
    }
}

/// Opens a database session for the given configuration.
///
/// This is the central factory function for database connections.
pub async fn connect(config: &ConnectionConfig) -> DbResult<Box<dyn DatabaseClient>> {
    match config.backend {
        DatabaseBackend::MySql => {
            let client = MySqlClient::connect(config).await?;
            Ok(Box::new(client))
        }
    }
}

/// One live database session.
///
/// Session state such as the current database is kept between calls, so
/// implementations must run every statement on the same server session.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Executes a statement, discarding any rows it returns.
    async fn execute(&mut self, sql: &str) -> DbResult<()>;

    /// Makes `database` the current database with `USE`.
    async fn use_database(&mut self, database: &str) -> DbResult<()> {
        self.execute(&format!("USE {database}")).await
    }

    /// Executes a query and collects every row into memory.
    async fn query_rows(&mut self, sql: &str) -> DbResult<Vec<Row>>;

    /// Closes the session.
    async fn close(self: Box<Self>) -> DbResult<()>;
}
