//! Provisioning flow tests.

use super::common::{run_date, write_script, DATABASE};
use double_check::config::Side;
use double_check::connection::MockConnectionProvider;
use double_check::db::MockDatabaseClient;
use double_check::error::CheckError;
use double_check::report::{RecordingReporter, ReportEvent};
use double_check::session::{ComparisonSession, SessionMode, SessionSettings, SessionState};
use pretty_assertions::assert_eq;
use std::path::Path;

const SETUP: &str = "
CREATE TABLE users (id INT, name VARCHAR);
INSERT INTO users VALUES (1, 'a'), (2, 'b');
CREATE TABLE orders (id INT, user_id INT);
";

fn setup_session(
    dir: &Path,
    setup: &str,
    database: Option<&str>,
    v1: MockDatabaseClient,
) -> ComparisonSession<MockConnectionProvider, RecordingReporter> {
    let settings = SessionSettings {
        setup: true,
        database: database.map(String::from),
        setup_script: write_script(dir, "setup.sql", setup),
        ..Default::default()
    };
    let provider = MockConnectionProvider::new()
        .with_client(Side::V1, v1)
        .with_client(Side::V2, MockDatabaseClient::new());

    ComparisonSession::new(settings, provider, RecordingReporter::new()).with_date(run_date())
}

#[tokio::test]
async fn test_setup_provisions_v1_only() {
    let dir = tempfile::tempdir().unwrap();
    let v1 = MockDatabaseClient::new();
    let handle = v1.handle();

    let mut session = setup_session(dir.path(), SETUP, None, v1);
    let summary = session.run().await.unwrap();

    assert_eq!(summary.mode, SessionMode::Provision);
    assert_eq!(summary.statements, 3);
    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(session.provider().opened(), vec![Side::V1]);

    assert_eq!(
        handle.statements(),
        vec![
            format!("DROP DATABASE IF EXISTS {DATABASE}"),
            format!("CREATE DATABASE {DATABASE}"),
            format!("USE {DATABASE}"),
            "CREATE TABLE users (id INT, name VARCHAR)".to_string(),
            "INSERT INTO users VALUES (1, 'a'), (2, 'b')".to_string(),
            "CREATE TABLE orders (id INT, user_id INT)".to_string(),
        ]
    );
    assert_eq!(
        handle.tables(DATABASE),
        Some(vec!["orders".to_string(), "users".to_string()])
    );
    assert!(handle.is_closed());

    let events = session.reporter().events();
    assert_eq!(events[1], ReportEvent::Provisioning(DATABASE.to_string()));
    assert!(events.contains(&ReportEvent::ScriptCompleted));
}

#[tokio::test]
async fn test_explicit_database_name() {
    let dir = tempfile::tempdir().unwrap();
    let v1 = MockDatabaseClient::new();
    let handle = v1.handle();

    let mut session = setup_session(dir.path(), SETUP, Some("manual_run"), v1);
    let summary = session.run().await.unwrap();

    assert_eq!(summary.database.as_str(), "manual_run");
    assert!(handle.has_database("manual_run"));
    assert!(!handle.has_database(DATABASE));
}

#[tokio::test]
async fn test_rerun_replaces_previous_database() {
    let dir = tempfile::tempdir().unwrap();
    let v1 = MockDatabaseClient::new()
        .with_database(DATABASE)
        .with_database("other");
    let handle = v1.handle();

    let mut session = setup_session(dir.path(), "CREATE TABLE fresh (a INT)", None, v1);
    session.run().await.unwrap();

    assert_eq!(handle.tables(DATABASE), Some(vec!["fresh".to_string()]));
    assert!(handle.has_database("other"));
}

#[tokio::test]
async fn test_failing_statement_stops_setup() {
    let dir = tempfile::tempdir().unwrap();
    let v1 = MockDatabaseClient::new().failing_on("INSERT INTO users", "column count mismatch");
    let handle = v1.handle();

    let mut session = setup_session(dir.path(), SETUP, None, v1);
    let err = session.run().await.unwrap_err();

    match err {
        CheckError::ScriptExecution {
            index, statement, ..
        } => {
            assert_eq!(index, 2);
            assert!(statement.starts_with("INSERT INTO users"));
        }
        other => panic!("Expected ScriptExecution, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(handle.tables(DATABASE), Some(vec!["users".to_string()]));
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_provision_failure_skips_script() {
    let dir = tempfile::tempdir().unwrap();
    let v1 = MockDatabaseClient::new().failing_on("CREATE DATABASE", "access denied");
    let handle = v1.handle();

    let mut session = setup_session(dir.path(), SETUP, None, v1);
    let err = session.run().await.unwrap_err();

    assert_eq!(err.category(), "Provision Error");
    assert_eq!(handle.statements().len(), 2);
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_unreachable_v1() {
    let dir = tempfile::tempdir().unwrap();
    let settings = SessionSettings {
        setup: true,
        setup_script: write_script(dir.path(), "setup.sql", SETUP),
        ..Default::default()
    };
    let provider = MockConnectionProvider::new().refusing(Side::V1);

    let mut session = ComparisonSession::new(settings, provider, RecordingReporter::new());
    let err = session.run().await.unwrap_err();

    assert!(matches!(err, CheckError::Connection { side: Side::V1, .. }));
    assert_eq!(err.exit_code(), 1);
}
