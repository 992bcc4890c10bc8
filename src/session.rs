//! Comparison session: the top-level orchestrator.
//!
//! A session resolves the database name, then either provisions side V1 from
//! the setup script or compares both sides query by query over the check
//! script, stopping at the first failure of any kind.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::compare::{compare_query, Verdict};
use crate::config::{DatabaseName, Side, DEFAULT_CHECK_SCRIPT, DEFAULT_SETUP_SCRIPT};
use crate::connection::ConnectionProvider;
use crate::db::DatabaseClient;
use crate::error::{CheckError, Result};
use crate::provision::provision_database;
use crate::report::Reporter;
use crate::runner::run_script;
use crate::script::{Script, DEFAULT_DELIMITER};

/// Which flow a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Recreate the database on V1 and run the setup script.
    Provision,
    /// Run the check script on both sides and compare.
    Compare,
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not yet run.
    Idle,
    /// Resolving the database name.
    ResolveConfig,
    /// Recreating the database and running the setup script on V1.
    Provisioning,
    /// Running the check script on both sides.
    Comparing,
    /// Every statement or query completed.
    Done,
    /// Stopped at the first error.
    Failed,
}

/// Inputs of a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Explicit database name; derived from the date when absent.
    pub database: Option<String>,

    /// Run the provisioning flow instead of the comparison.
    pub setup: bool,

    /// Setup script location.
    pub setup_script: PathBuf,

    /// Check script location.
    pub check_script: PathBuf,

    /// Statement delimiter.
    pub delimiter: char,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            database: None,
            setup: false,
            setup_script: PathBuf::from(DEFAULT_SETUP_SCRIPT),
            check_script: PathBuf::from(DEFAULT_CHECK_SCRIPT),
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl SessionSettings {
    /// The flow these settings select.
    pub fn mode(&self) -> SessionMode {
        if self.setup {
            SessionMode::Provision
        } else {
            SessionMode::Compare
        }
    }
}

/// What a successful session did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Flow that ran.
    pub mode: SessionMode,

    /// Database both sides used.
    pub database: DatabaseName,

    /// Setup statements executed, or check queries compared.
    pub statements: usize,
}

/// Drives one run against the connections handed out by `P`.
pub struct ComparisonSession<P, R> {
    settings: SessionSettings,
    provider: P,
    reporter: R,
    state: SessionState,
    today: NaiveDate,
}

impl<P: ConnectionProvider, R: Reporter> ComparisonSession<P, R> {
    /// Creates a session dated today (local time).
    pub fn new(settings: SessionSettings, provider: P, reporter: R) -> Self {
        Self {
            settings,
            provider,
            reporter,
            state: SessionState::Idle,
            today: Local::now().date_naive(),
        }
    }

    /// Overrides the date used to derive the database name.
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The connection provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The reporter.
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Runs the selected flow to completion or to the first error.
    pub async fn run(&mut self) -> Result<SessionSummary> {
        self.reporter.run_started();

        let result = self.run_flow().await;
        match &result {
            Ok(summary) => {
                info!(
                    "{:?} run on {} finished: {} statements",
                    summary.mode, summary.database, summary.statements
                );
                self.transition(SessionState::Done);
            }
            Err(e) => {
                warn!("Run failed: {}", e.category());
                self.transition(SessionState::Failed);
            }
        }

        self.reporter.run_finished();
        result
    }

    async fn run_flow(&mut self) -> Result<SessionSummary> {
        self.transition(SessionState::ResolveConfig);
        let database = DatabaseName::resolve(self.settings.database.as_deref(), self.today)?;
        let mode = self.settings.mode();
        info!("Using database {database} ({mode:?})");

        let statements = match mode {
            SessionMode::Provision => {
                self.transition(SessionState::Provisioning);
                self.provision_flow(&database).await?
            }
            SessionMode::Compare => {
                self.transition(SessionState::Comparing);
                self.compare_flow(&database).await?
            }
        };

        Ok(SessionSummary {
            mode,
            database,
            statements,
        })
    }

    /// Recreates the database on V1 and runs the setup script there.
    /// V2 is never opened.
    async fn provision_flow(&mut self, database: &DatabaseName) -> Result<usize> {
        let mut conn = self.provider.open(Side::V1).await?;

        let result = self.provision_on(conn.as_mut(), database).await;
        close_connection(conn, Side::V1).await;
        result
    }

    async fn provision_on(
        &mut self,
        conn: &mut dyn DatabaseClient,
        database: &DatabaseName,
    ) -> Result<usize> {
        self.reporter.provisioning(database);
        provision_database(conn, database).await?;

        let script = Script::load(&self.settings.setup_script, self.settings.delimiter)?;
        run_script(conn, &script, database, &mut self.reporter).await
    }

    /// Compares every check query on both sides, stopping at the first mismatch.
    async fn compare_flow(&mut self, database: &DatabaseName) -> Result<usize> {
        let mut conn_a = self.provider.open(Side::V1).await?;
        let mut conn_b = match self.provider.open(Side::V2).await {
            Ok(conn) => conn,
            Err(e) => {
                close_connection(conn_a, Side::V1).await;
                return Err(e);
            }
        };

        let result = self
            .compare_on(conn_a.as_mut(), conn_b.as_mut(), database)
            .await;
        close_connection(conn_a, Side::V1).await;
        close_connection(conn_b, Side::V2).await;
        result
    }

    async fn compare_on(
        &mut self,
        conn_a: &mut dyn DatabaseClient,
        conn_b: &mut dyn DatabaseClient,
        database: &DatabaseName,
    ) -> Result<usize> {
        select_database(conn_a, Side::V1, database).await?;
        select_database(conn_b, Side::V2, database).await?;

        let script = Script::load(&self.settings.check_script, self.settings.delimiter)?;
        info!("Comparing {} queries from {}", script.len(), script.label());
        self.reporter.check_started(&script);

        for statement in script.statements() {
            self.reporter.query_started(statement);

            let outcome = compare_query(conn_a, conn_b, statement).await?;
            match &outcome.verdict {
                Verdict::Match => self.reporter.query_matched(statement),
                Verdict::Mismatch(diff) => self.reporter.query_mismatched(statement, diff),
            }
            outcome.into_result()?;
        }

        Ok(script.len())
    }
}

/// Runs `USE <database>` on one side of a comparison.
async fn select_database(
    conn: &mut dyn DatabaseClient,
    side: Side,
    database: &DatabaseName,
) -> Result<()> {
    conn.use_database(database.as_str())
        .await
        .map_err(|source| CheckError::QueryExecution {
            side,
            index: 0,
            query: format!("USE {database}"),
            source,
        })
}

/// Closes a connection. Failures are logged, never returned.
async fn close_connection(conn: Box<dyn DatabaseClient>, side: Side) {
    match conn.close().await {
        Ok(()) => debug!("Closed {side} connection"),
        Err(e) => warn!("Failed to close {side} connection: {e}"),
    }
}
