//! Row-level differences between two result sets.

use super::ResultSet;
use crate::db::{format_row, Row};
use std::fmt;

/// Rows present on only one side of a comparison.
///
/// Both groups are in ascending row order, so rendering is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowDiff {
    /// Rows returned by the first side only.
    pub removed: Vec<Row>,

    /// Rows returned by the second side only.
    pub added: Vec<Row>,
}

impl RowDiff {
    /// Computes `a - b` (removed) and `b - a` (added).
    pub fn between(a: &ResultSet, b: &ResultSet) -> Self {
        Self {
            removed: a.difference(b).cloned().collect(),
            added: b.difference(a).cloned().collect(),
        }
    }

    /// Returns true if both sides hold the same rows.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    /// The diff seen from the other side.
    pub fn swap(self) -> Self {
        Self {
            removed: self.added,
            added: self.removed,
        }
    }

    /// Removed rows first, then added rows.
    pub fn lines(&self) -> impl Iterator<Item = DiffLine<'_>> {
        self.removed
            .iter()
            .map(DiffLine::Removed)
            .chain(self.added.iter().map(DiffLine::Added))
    }

    /// Rendered display lines.
    pub fn render(&self) -> Vec<String> {
        self.lines().map(|line| line.to_string()).collect()
    }
}

/// One line of a rendered diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLine<'a> {
    /// Row only on the first side.
    Removed(&'a Row),
    /// Row only on the second side.
    Added(&'a Row),
}

impl DiffLine<'_> {
    /// Marker printed before the row.
    pub fn marker(&self) -> char {
        match self {
            Self::Removed(_) => '-',
            Self::Added(_) => '+',
        }
    }

    /// The row on this line.
    pub fn row(&self) -> &Row {
        match self {
            Self::Removed(row) | Self::Added(row) => row,
        }
    }
}

impl fmt::Display for DiffLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.marker(), format_row(self.row()))
    }
}
