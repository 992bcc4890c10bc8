//! Connection providers.
//!
//! The session asks a provider for each side's connection, which lets tests
//! substitute in-memory mocks for live servers.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::{ConnectionConfig, Side};
use crate::db::{self, DatabaseClient, MockDatabaseClient};
use crate::error::{CheckError, DbError, Result};

/// Opens the connection for one side.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Opens a new session for `side`.
    async fn open(&self, side: Side) -> Result<Box<dyn DatabaseClient>>;
}

/// Opens real connections from the DSN configured for each side.
#[derive(Debug, Clone)]
pub struct DsnConnectionProvider {
    dsn_v1: String,
    dsn_v2: String,
    query_timeout: Duration,
}

impl DsnConnectionProvider {
    /// Creates a provider for the two DSNs.
    pub fn new(
        dsn_v1: impl Into<String>,
        dsn_v2: impl Into<String>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            dsn_v1: dsn_v1.into(),
            dsn_v2: dsn_v2.into(),
            query_timeout,
        }
    }

    /// DSN configured for a side.
    pub fn dsn(&self, side: Side) -> &str {
        match side {
            Side::V1 => &self.dsn_v1,
            Side::V2 => &self.dsn_v2,
        }
    }

    /// Parses the DSN for a side.
    ///
    /// A DSN still set to its placeholder is a configuration error; anything
    /// else that fails to parse is a connection error for that side.
    pub fn connection_config(&self, side: Side) -> Result<ConnectionConfig> {
        let dsn = self.dsn(side);
        if dsn.trim().is_empty() || dsn == side.placeholder_dsn() {
            return Err(CheckError::config(format!(
                "No DSN configured for {side}. Set {} or pass --dsn-{}",
                side.env_var(),
                side.config_key()
            )));
        }

        ConnectionConfig::from_dsn(dsn)
            .map(|config| config.with_query_timeout(self.query_timeout))
            .map_err(|source| CheckError::Connection { side, source })
    }
}

#[async_trait]
impl ConnectionProvider for DsnConnectionProvider {
    async fn open(&self, side: Side) -> Result<Box<dyn DatabaseClient>> {
        let config = self.connection_config(side)?;
        info!("Connecting {side} to {}", config.display_string());

        db::connect(&config)
            .await
            .map_err(|source| CheckError::Connection { side, source })
    }
}

/// Hands out pre-built mock clients, at most once per side.
#[derive(Debug, Default)]
pub struct MockConnectionProvider {
    clients: Mutex<HashMap<Side, MockDatabaseClient>>,
    refused: HashSet<Side>,
    opened: Mutex<Vec<Side>>,
}

impl MockConnectionProvider {
    /// Creates a provider with no clients.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the client returned for `side`.
    pub fn with_client(self, side: Side, client: MockDatabaseClient) -> Self {
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(side, client);
        self
    }

    /// Makes opening `side` fail as an unreachable server would.
    pub fn refusing(mut self, side: Side) -> Self {
        self.refused.insert(side);
        self
    }

    /// Sides opened so far, in order.
    pub fn opened(&self) -> Vec<Side> {
        self.opened
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ConnectionProvider for MockConnectionProvider {
    async fn open(&self, side: Side) -> Result<Box<dyn DatabaseClient>> {
        self.opened
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(side);

        if self.refused.contains(&side) {
            return Err(CheckError::Connection {
                side,
                source: DbError::connect("Connection refused"),
            });
        }

        let client = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&side)
            .ok_or_else(|| CheckError::Connection {
                side,
                source: DbError::connect("no mock client registered"),
            })?;
        Ok(Box::new(client))
    }
}
