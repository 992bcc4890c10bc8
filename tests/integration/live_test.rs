//! End-to-end runs against a live server.
//!
//! Both sides point at the same DSN, so every comparison must match.
//! Skipped unless DOUBLE_CHECK_TEST_DSN is set.

use super::common::write_script;
use double_check::connection::DsnConnectionProvider;
use double_check::report::RecordingReporter;
use double_check::session::{ComparisonSession, SessionSettings, SessionState};
use std::time::Duration;

fn test_dsn() -> Option<String> {
    std::env::var("DOUBLE_CHECK_TEST_DSN").ok()
}

fn provider(dsn: &str) -> DsnConnectionProvider {
    DsnConnectionProvider::new(dsn, dsn, Duration::from_secs(60))
}

#[tokio::test]
async fn test_live_setup_then_compare() {
    let Some(dsn) = test_dsn() else {
        eprintln!("Skipping test: DOUBLE_CHECK_TEST_DSN not set");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let database = "double_check_live_test";

    let setup = SessionSettings {
        setup: true,
        database: Some(database.to_string()),
        setup_script: write_script(
            dir.path(),
            "setup.sql",
            "CREATE TABLE t (id INT, name VARCHAR(32));
             INSERT INTO t VALUES (1, 'a'), (2, 'b'), (2, 'b');",
        ),
        ..Default::default()
    };
    let mut session = ComparisonSession::new(setup, provider(&dsn), RecordingReporter::new());
    let summary = session.run().await.unwrap();
    assert_eq!(summary.statements, 2);

    let check = SessionSettings {
        database: Some(database.to_string()),
        check_script: write_script(
            dir.path(),
            "check.sql",
            "SELECT id, name FROM t;
             SELECT count(*) FROM t;
             SELECT name FROM t WHERE id = 2;",
        ),
        ..Default::default()
    };
    let mut session = ComparisonSession::new(check, provider(&dsn), RecordingReporter::new());
    let summary = session.run().await.unwrap();
    assert_eq!(summary.statements, 3);
    assert_eq!(session.state(), SessionState::Done);
}

#[tokio::test]
async fn test_live_failing_query() {
    let Some(dsn) = test_dsn() else {
        eprintln!("Skipping test: DOUBLE_CHECK_TEST_DSN not set");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let database = "double_check_live_failure";

    let setup = SessionSettings {
        setup: true,
        database: Some(database.to_string()),
        setup_script: write_script(dir.path(), "setup.sql", "CREATE TABLE t (id INT)"),
        ..Default::default()
    };
    let mut session = ComparisonSession::new(setup, provider(&dsn), RecordingReporter::new());
    session.run().await.unwrap();

    let check = SessionSettings {
        database: Some(database.to_string()),
        check_script: write_script(dir.path(), "check.sql", "SELECT missing_column FROM t"),
        ..Default::default()
    };
    let mut session = ComparisonSession::new(check, provider(&dsn), RecordingReporter::new());
    let err = session.run().await.unwrap_err();
    assert_eq!(err.category(), "Query Execution Error");
    assert_eq!(err.exit_code(), 1);
}
