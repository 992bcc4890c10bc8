//! Mock database client for testing.
//!
//! Keeps a tiny in-memory catalog (databases and their tables), returns canned
//! query results, and records every statement it receives so tests can assert
//! on exactly what reached the server.

use super::{DatabaseClient, Row};
use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// State shared between a mock client and the handles given to tests.
#[derive(Debug, Default)]
struct MockState {
    statements: Vec<String>,
    databases: BTreeMap<String, BTreeSet<String>>,
    current: Option<String>,
    closed: bool,
}

/// Read access to a mock client's state after it has been moved elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the journal from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every statement and query received, in order.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns true if the database exists in the catalog.
    pub fn has_database(&self, name: &str) -> bool {
        self.lock().databases.contains_key(name)
    }

    /// Tables of a database, sorted, or None if the database does not exist.
    pub fn tables(&self, database: &str) -> Option<Vec<String>> {
        self.lock()
            .databases
            .get(database)
            .map(|tables| tables.iter().cloned().collect())
    }

    /// Database selected with `USE`, if any.
    pub fn current_database(&self) -> Option<String> {
        self.lock().current.clone()
    }
}

/// A mock database client with scripted results and failures.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    handle: MockHandle,
    results: HashMap<String, Vec<Row>>,
    failures: Vec<(String, String)>,
}

impl MockDatabaseClient {
    /// Creates a mock with an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an existing, empty database to the catalog.
    pub fn with_database(self, name: &str) -> Self {
        self.handle
            .lock()
            .databases
            .insert(name.to_string(), BTreeSet::new());
        self
    }

    /// Returns `rows` whenever exactly `query` (after trimming) is run.
    pub fn with_rows(mut self, query: &str, rows: Vec<Row>) -> Self {
        self.results.insert(query.trim().to_string(), rows);
        self
    }

    /// Fails any statement containing `pattern` with `message`.
    pub fn failing_on(mut self, pattern: &str, message: &str) -> Self {
        self.failures
            .push((pattern.to_string(), message.to_string()));
        self
    }

    /// Handle for inspecting this mock after it has been handed off.
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }

    /// Records the statement and applies injected failures.
    fn receive(&self, sql: &str) -> DbResult<MutexGuard<'_, MockState>> {
        let mut state = self.handle.lock();
        if state.closed {
            return Err(DbError::connect("connection is closed"));
        }
        state.statements.push(sql.to_string());

        match self.failures.iter().find(|(pattern, _)| sql.contains(pattern.as_str())) {
            Some((_, message)) => Err(DbError::execute(message.clone())),
            None => Ok(state),
        }
    }
}

/// Applies the catalog effect of a statement.
fn apply(state: &mut MockState, sql: &str) -> DbResult<()> {
    let upper = sql.to_uppercase();
    let words: Vec<&str> = sql.split_whitespace().collect();
    let upper_words: Vec<&str> = upper.split_whitespace().collect();
    let name_at = |i: usize| -> DbResult<String> {
        words
            .get(i)
            .map(|w| {
                w.split('(')
                    .next()
                    .unwrap_or_default()
                    .trim_end_matches(';')
                    .to_string()
            })
            .filter(|w| !w.is_empty())
            .ok_or_else(|| DbError::execute(format!("syntax error near '{sql}'")))
    };

    match upper_words.as_slice() {
        ["DROP", "DATABASE", "IF", "EXISTS", ..] => {
            let name = name_at(4)?;
            state.databases.remove(&name);
            if state.current.as_deref() == Some(name.as_str()) {
                state.current = None;
            }
        }
        ["CREATE", "DATABASE", ..] => {
            let name = name_at(2)?;
            if state.databases.contains_key(&name) {
                return Err(DbError::execute(format!("database {name} already exists")));
            }
            state.databases.insert(name, BTreeSet::new());
        }
        ["USE", ..] => {
            let name = name_at(1)?;
            if !state.databases.contains_key(&name) {
                return Err(DbError::execute(format!("unknown database {name}")));
            }
            state.current = Some(name);
        }
        ["CREATE", "TABLE", ..] => {
            let name = name_at(2)?;
            let tables = current_tables(state)?;
            if !tables.insert(name.clone()) {
                return Err(DbError::execute(format!("table {name} already exists")));
            }
        }
        ["DROP", "TABLE", "IF", "EXISTS", ..] => {
            let name = name_at(4)?;
            current_tables(state)?.remove(&name);
        }
        ["DROP", "TABLE", ..] => {
            let name = name_at(2)?;
            if !current_tables(state)?.remove(&name) {
                return Err(DbError::execute(format!("unknown table {name}")));
            }
        }
        _ => {}
    }
    Ok(())
}

fn current_tables(state: &mut MockState) -> DbResult<&mut BTreeSet<String>> {
    let current = state
        .current
        .clone()
        .ok_or_else(|| DbError::execute("no database selected"))?;
    state
        .databases
        .get_mut(&current)
        .ok_or_else(|| DbError::execute(format!("unknown database {current}")))
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute(&mut self, sql: &str) -> DbResult<()> {
        let mut state = self.receive(sql)?;
        apply(&mut state, sql)
    }

    async fn query_rows(&mut self, sql: &str) -> DbResult<Vec<Row>> {
        let _state = self.receive(sql)?;
        Ok(self.results.get(sql.trim()).cloned().unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> DbResult<()> {
        self.handle.lock().closed = true;
        Ok(())
    }
}
