//! Error types for double-check.
//!
//! `DbError` is what a connection reports; `CheckError` is what the session
//! reports, carrying enough context to locate the offending statement.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::compare::RowDiff;
use crate::config::Side;

/// Errors raised by a database connection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    /// The DSN could not be parsed or uses an unsupported scheme.
    #[error("Invalid DSN: {0}")]
    InvalidDsn(String),

    /// The server could not be reached or rejected the session.
    #[error("{0}")]
    Connect(String),

    /// A statement or query was rejected by the server.
    #[error("{0}")]
    Execute(String),

    /// The server did not answer within the configured timeout.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl DbError {
    /// Creates an execution error with the given message.
    pub fn execute(msg: impl Into<String>) -> Self {
        Self::Execute(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connect(msg: impl Into<String>) -> Self {
        Self::Connect(msg.into())
    }
}

/// Main error type for a double-check run.
#[derive(Error, Debug)]
pub enum CheckError {
    /// Invalid or missing configuration (placeholder DSN, bad database name, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A setup or check script could not be read.
    #[error("Cannot read script {}: {source}", path.display())]
    Script {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// DSN invalid or server unreachable.
    #[error("Connection error on {side}: {source}")]
    Connection {
        side: Side,
        #[source]
        source: DbError,
    },

    /// Dropping or creating the target database failed.
    #[error("Failed to provision database '{database}' ({statement}): {source}")]
    Provision {
        database: String,
        statement: String,
        #[source]
        source: DbError,
    },

    /// A setup statement failed. Index 0 denotes the `USE` that precedes the script.
    #[error("Statement #{index} failed: {source}\n{statement}")]
    ScriptExecution {
        index: usize,
        statement: String,
        #[source]
        source: DbError,
    },

    /// A check query failed on one side. Index 0 denotes the `USE` that precedes the script.
    #[error("Query #{index} failed on {side}: {source}\n{query}")]
    QueryExecution {
        side: Side,
        index: usize,
        query: String,
        #[source]
        source: DbError,
    },

    /// The two sides returned different result sets.
    #[error("Results differ at query #{index}: {query}")]
    ResultMismatch {
        index: usize,
        query: String,
        diff: RowDiff,
    },
}

impl CheckError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Script { .. } => "Script Error",
            Self::Connection { .. } => "Connection Error",
            Self::Provision { .. } => "Provision Error",
            Self::ScriptExecution { .. } => "Script Execution Error",
            Self::QueryExecution { .. } => "Query Execution Error",
            Self::ResultMismatch { .. } => "Result Mismatch",
        }
    }

    /// One-line message printed on stderr when a run fails.
    ///
    /// A mismatch names only the query index; its text and diff are already
    /// on stdout.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::ResultMismatch { index, .. } => format!("{}: query #{index}", self.category()),
            _ => format!("{}: {self}", self.category()),
        }
    }

    /// Process exit code for this failure.
    ///
    /// A divergence between the two sides exits with 2 so callers can tell it
    /// apart from an environment or script problem (1).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ResultMismatch { .. } => 2,
            _ => 1,
        }
    }
}

/// Result type alias using CheckError.
pub type Result<T> = std::result::Result<T, CheckError>;

/// Result type alias for connection-level operations.
pub type DbResult<T> = std::result::Result<T, DbError>;
