//! Result comparison between the two sides.
//!
//! Results are compared as sets of rows: ordering is ignored and duplicate
//! rows collapse to one instance.

mod diff;

pub use diff::{DiffLine, RowDiff};

use crate::config::Side;
use crate::db::{DatabaseClient, Row};
use crate::error::{CheckError, Result};
use crate::script::Statement;
use std::collections::BTreeSet;
use tracing::debug;

/// A result set in comparable form.
pub type ResultSet = BTreeSet<Row>;

/// Collapses rows into a set.
pub fn normalize(rows: Vec<Row>) -> ResultSet {
    rows.into_iter().collect()
}

/// Verdict for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Both sides returned the same set of rows.
    Match,
    /// The sets differ.
    Mismatch(RowDiff),
}

impl Verdict {
    /// Returns true for a match.
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match)
    }
}

/// Outcome of comparing one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonOutcome {
    /// Position of the query in the check script.
    pub index: usize,

    /// Query text.
    pub query: String,

    /// Match or mismatch with the row-level diff.
    pub verdict: Verdict,
}

impl ComparisonOutcome {
    /// Converts a mismatch into the error that ends the session.
    pub fn into_result(self) -> Result<()> {
        match self.verdict {
            Verdict::Match => Ok(()),
            Verdict::Mismatch(diff) => Err(CheckError::ResultMismatch {
                index: self.index,
                query: self.query,
                diff,
            }),
        }
    }
}

/// Compares two materialized results.
pub fn compare_results(a: Vec<Row>, b: Vec<Row>) -> Verdict {
    let a = normalize(a);
    let b = normalize(b);

    if a == b {
        Verdict::Match
    } else {
        Verdict::Mismatch(RowDiff::between(&a, &b))
    }
}

/// Runs `statement` on both sides, V1 first, and compares the results.
///
/// A failing query on either side aborts the comparison with
/// `QueryExecution`; it is never reported as a mismatch.
pub async fn compare_query(
    conn_a: &mut dyn DatabaseClient,
    conn_b: &mut dyn DatabaseClient,
    statement: &Statement,
) -> Result<ComparisonOutcome> {
    let rows_a = fetch(conn_a, Side::V1, statement).await?;
    let rows_b = fetch(conn_b, Side::V2, statement).await?;
    debug!(
        "Query #{} returned {} rows on V1 and {} rows on V2",
        statement.index,
        rows_a.len(),
        rows_b.len()
    );

    Ok(ComparisonOutcome {
        index: statement.index,
        query: statement.sql.clone(),
        verdict: compare_results(rows_a, rows_b),
    })
}

async fn fetch(
    conn: &mut dyn DatabaseClient,
    side: Side,
    statement: &Statement,
) -> Result<Vec<Row>> {
    conn.query_rows(&statement.sql)
        .await
        .map_err(|source| CheckError::QueryExecution {
            side,
            index: statement.index,
            query: statement.sql.clone(),
            source,
        })
}
