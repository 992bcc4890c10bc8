//! Comparison flow tests.

use super::common::{compare_session, provisioned, row, DATABASE};
use double_check::config::Side;
use double_check::error::{CheckError, DbError};
use double_check::report::ReportEvent;
use double_check::session::{SessionMode, SessionState};
use pretty_assertions::assert_eq;

const CHECK: &str = "
SELECT id, name FROM users;
SELECT count(*) FROM users;

SELECT name FROM users WHERE id = 2;
";

#[tokio::test]
async fn test_all_queries_match() {
    let dir = tempfile::tempdir().unwrap();
    let v1 = provisioned()
        .with_rows("SELECT id, name FROM users", vec![row(1, "a"), row(2, "b")])
        .with_rows("SELECT count(*) FROM users", vec![vec![2i64.into()]]);
    let v2 = provisioned()
        .with_rows("SELECT id, name FROM users", vec![row(2, "b"), row(1, "a")])
        .with_rows("SELECT count(*) FROM users", vec![vec![2i64.into()]]);
    let (handle_a, handle_b) = (v1.handle(), v2.handle());

    let mut session = compare_session(dir.path(), CHECK, v1, v2);
    let summary = session.run().await.unwrap();
    let check_label = dir.path().join("check.sql").display().to_string();

    assert_eq!(summary.mode, SessionMode::Compare);
    assert_eq!(summary.database.as_str(), DATABASE);
    assert_eq!(summary.statements, 3);
    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(session.provider().opened(), vec![Side::V1, Side::V2]);

    let expected = vec![
        format!("USE {DATABASE}"),
        "SELECT id, name FROM users".to_string(),
        "SELECT count(*) FROM users".to_string(),
        "SELECT name FROM users WHERE id = 2".to_string(),
    ];
    assert_eq!(handle_a.statements(), expected);
    assert_eq!(handle_b.statements(), expected);
    assert!(handle_a.is_closed());
    assert!(handle_b.is_closed());

    assert_eq!(
        session.reporter().events(),
        &[
            ReportEvent::RunStarted,
            ReportEvent::CheckStarted(check_label),
            ReportEvent::QueryStarted(1),
            ReportEvent::QueryMatched(1),
            ReportEvent::QueryStarted(2),
            ReportEvent::QueryMatched(2),
            ReportEvent::QueryStarted(3),
            ReportEvent::QueryMatched(3),
            ReportEvent::RunFinished,
        ]
    );
}

#[tokio::test]
async fn test_duplicate_rows_collapse() {
    let dir = tempfile::tempdir().unwrap();
    let query = "SELECT id, name FROM users";
    let v1 = provisioned().with_rows(query, vec![row(1, "x"), row(1, "x"), row(2, "y")]);
    let v2 = provisioned().with_rows(query, vec![row(1, "x"), row(2, "y")]);

    let mut session = compare_session(dir.path(), query, v1, v2);
    assert!(session.run().await.is_ok());
}

#[tokio::test]
async fn test_stops_at_first_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let v1 = provisioned().with_rows("SELECT count(*) FROM users", vec![vec![2i64.into()]]);
    let v2 = provisioned().with_rows("SELECT count(*) FROM users", vec![vec![3i64.into()]]);
    let (handle_a, handle_b) = (v1.handle(), v2.handle());

    let mut session = compare_session(dir.path(), CHECK, v1, v2);
    let err = session.run().await.unwrap_err();

    match &err {
        CheckError::ResultMismatch { index, query, diff } => {
            assert_eq!(*index, 2);
            assert_eq!(query, "SELECT count(*) FROM users");
            assert_eq!(diff.render(), vec!["- (2)", "+ (3)"]);
        }
        other => panic!("Expected ResultMismatch, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 2);
    assert_eq!(session.state(), SessionState::Failed);

    for handle in [&handle_a, &handle_b] {
        assert!(!handle
            .statements()
            .iter()
            .any(|s| s.contains("WHERE id = 2")));
        assert!(handle.is_closed());
    }
}

#[tokio::test]
async fn test_mismatch_diff_is_symmetric_across_sessions() {
    let query = "SELECT id, name FROM users";
    let left = vec![row(1, "x"), row(3, "z")];
    let right = vec![row(1, "x"), row(2, "y")];

    let dir = tempfile::tempdir().unwrap();
    let mut forward_session = compare_session(
        dir.path(),
        query,
        provisioned().with_rows(query, left.clone()),
        provisioned().with_rows(query, right.clone()),
    );
    let mut backward_session = compare_session(
        dir.path(),
        query,
        provisioned().with_rows(query, right),
        provisioned().with_rows(query, left),
    );

    let (
        Err(CheckError::ResultMismatch { diff: forward, .. }),
        Err(CheckError::ResultMismatch { diff: backward, .. }),
    ) = (forward_session.run().await, backward_session.run().await)
    else {
        panic!("Expected mismatches in both directions");
    };
    assert_eq!(forward.removed, backward.added);
    assert_eq!(forward.added, backward.removed);
    assert_eq!(forward.removed, vec![row(3, "z")]);
}

#[tokio::test]
async fn test_query_failure_aborts_without_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let v1 = provisioned();
    let v2 = provisioned().failing_on("count(*)", "function count is not supported");
    let handle_b = v2.handle();

    let mut session = compare_session(dir.path(), CHECK, v1, v2);
    let err = session.run().await.unwrap_err();

    match err {
        CheckError::QueryExecution {
            side,
            index,
            query,
            source,
        } => {
            assert_eq!(side, Side::V2);
            assert_eq!(index, 2);
            assert_eq!(query, "SELECT count(*) FROM users");
            assert_eq!(source, DbError::execute("function count is not supported"));
        }
        other => panic!("Expected QueryExecution, got {other:?}"),
    }
    assert!(!session
        .reporter()
        .events()
        .iter()
        .any(|e| matches!(e, ReportEvent::QueryMismatched { .. })));
    assert!(handle_b.is_closed());
}

#[tokio::test]
async fn test_missing_check_script_closes_connections() {
    let v1 = provisioned();
    let v2 = provisioned();
    let (handle_a, handle_b) = (v1.handle(), v2.handle());

    let dir = tempfile::tempdir().unwrap();
    let mut session = compare_session(dir.path(), "SELECT 1", v1, v2);
    std::fs::remove_file(dir.path().join("check.sql")).unwrap();

    let err = session.run().await.unwrap_err();
    assert_eq!(err.category(), "Script Error");
    assert!(handle_a.is_closed());
    assert!(handle_b.is_closed());
}
