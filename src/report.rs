//! Human-facing progress and diff output.
//!
//! The session reports what it does through the `Reporter` trait; the console
//! implementation prints to stdout, the recording one keeps events for tests.

use crate::compare::{DiffLine, RowDiff};
use crate::config::DatabaseName;
use crate::script::{Script, Statement};
use crossterm::style::Stylize;
use std::io::{self, Write};

/// Receives session progress events.
pub trait Reporter: Send {
    /// The run is starting.
    fn run_started(&mut self);

    /// The target database is about to be dropped and recreated.
    fn provisioning(&mut self, database: &DatabaseName);

    /// A script is about to run.
    fn script_started(&mut self, script: &Script);

    /// A setup statement is about to execute.
    fn statement_started(&mut self, statement: &Statement);

    /// Every statement of the setup script succeeded.
    fn script_completed(&mut self, script: &Script);

    /// The check script is loaded and its queries are about to be compared.
    fn check_started(&mut self, script: &Script);

    /// A check query is about to run on both sides.
    fn query_started(&mut self, statement: &Statement);

    /// Both sides agreed on a query.
    fn query_matched(&mut self, statement: &Statement);

    /// The sides disagreed on a query.
    fn query_mismatched(&mut self, statement: &Statement, diff: &RowDiff);

    /// The run is over, successfully or not.
    fn run_finished(&mut self);
}

/// Prints progress to a writer, stdout by default.
pub struct ConsoleReporter<W: Write + Send> {
    out: W,
    color: bool,
}

impl ConsoleReporter<io::Stdout> {
    /// Creates a reporter writing to stdout.
    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), color)
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    /// Creates a reporter writing to `out`.
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    /// Consumes the reporter, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn green(&self, text: String) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text
        }
    }

    fn red(&self, text: String) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text
        }
    }

    // Write errors are ignored; stdout may already be closed by the caller
    fn line(&mut self, text: impl AsRef<str>) {
        let _ = writeln!(self.out, "{}", text.as_ref());
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn run_started(&mut self) {
        self.line("Starting script execution.");
    }

    fn provisioning(&mut self, database: &DatabaseName) {
        self.line(format!("Creating database: {database}"));
    }

    fn script_started(&mut self, script: &Script) {
        self.line(format!("Executing SQL file: {}", script.label()));
    }

    fn statement_started(&mut self, statement: &Statement) {
        self.line(format!(
            "Executing command #{}:\n{}",
            statement.index, statement.sql
        ));
    }

    fn script_completed(&mut self, _script: &Script) {
        self.line("SQL file executed successfully.");
    }

    fn check_started(&mut self, script: &Script) {
        self.line(format!(
            "Executing and comparing queries from file: {}",
            script.label()
        ));
    }

    fn query_started(&mut self, statement: &Statement) {
        let header = self.green(format!("Executing query #{}:", statement.index));
        self.line(header);
        self.line(&statement.sql);
    }

    fn query_matched(&mut self, statement: &Statement) {
        let text = self.green(format!(
            "Query #{} results are the same.\n",
            statement.index
        ));
        self.line(text);
    }

    fn query_mismatched(&mut self, statement: &Statement, diff: &RowDiff) {
        self.line(format!(
            "Results differ at query #{}: {}",
            statement.index, statement.sql
        ));
        for line in diff.lines() {
            let text = match line {
                DiffLine::Removed(_) => self.red(line.to_string()),
                DiffLine::Added(_) => self.green(line.to_string()),
            };
            self.line(text);
        }
    }

    fn run_finished(&mut self) {
        self.line("Script execution completed.");
        let _ = self.out.flush();
    }
}

/// A reported event, as captured by `RecordingReporter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// The run started.
    RunStarted,
    /// Provisioning the named database.
    Provisioning(String),
    /// Setup script started, by label.
    ScriptStarted(String),
    /// Setup statement about to execute, by index.
    StatementStarted(usize),
    /// Setup script finished.
    ScriptCompleted,
    /// Check script started, by label.
    CheckStarted(String),
    /// Check query about to run, by index.
    QueryStarted(usize),
    /// Check query matched, by index.
    QueryMatched(usize),
    /// Check query diverged.
    QueryMismatched { index: usize, diff: RowDiff },
    /// The run ended.
    RunFinished,
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Vec<ReportEvent>,
}

impl RecordingReporter {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events in the order they were reported.
    pub fn events(&self) -> &[ReportEvent] {
        &self.events
    }
}

impl Reporter for RecordingReporter {
    fn run_started(&mut self) {
        self.events.push(ReportEvent::RunStarted);
    }

    fn provisioning(&mut self, database: &DatabaseName) {
        self.events
            .push(ReportEvent::Provisioning(database.to_string()));
    }

    fn script_started(&mut self, script: &Script) {
        self.events.push(ReportEvent::ScriptStarted(script.label()));
    }

    fn statement_started(&mut self, statement: &Statement) {
        self.events
            .push(ReportEvent::StatementStarted(statement.index));
    }

    fn script_completed(&mut self, _script: &Script) {
        self.events.push(ReportEvent::ScriptCompleted);
    }

    fn check_started(&mut self, script: &Script) {
        self.events.push(ReportEvent::CheckStarted(script.label()));
    }

    fn query_started(&mut self, statement: &Statement) {
        self.events.push(ReportEvent::QueryStarted(statement.index));
    }

    fn query_matched(&mut self, statement: &Statement) {
        self.events.push(ReportEvent::QueryMatched(statement.index));
    }

    fn query_mismatched(&mut self, statement: &Statement, diff: &RowDiff) {
        self.events.push(ReportEvent::QueryMismatched {
            index: statement.index,
            diff: diff.clone(),
        });
    }

    fn run_finished(&mut self) {
        self.events.push(ReportEvent::RunFinished);
    }
}
