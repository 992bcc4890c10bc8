//! SQL scripts and statement splitting.
//!
//! Splitting is purely lexical: every delimiter ends a statement, including one
//! inside a string literal or comment.

use crate::error::{CheckError, Result};
use std::path::{Path, PathBuf};

/// Statement delimiter used by setup and check scripts.
pub const DEFAULT_DELIMITER: char = ';';

/// Splits a script into trimmed, non-empty statements in source order.
pub fn split_statements(script: &str, delimiter: char) -> Vec<String> {
    pieces(script, delimiter)
        .map(|(_, sql)| sql.to_string())
        .collect()
}

/// Trimmed, non-empty pieces with their 1-based ordinal in the raw split.
fn pieces(script: &str, delimiter: char) -> impl Iterator<Item = (usize, &str)> {
    script
        .split(delimiter)
        .map(str::trim)
        .enumerate()
        .filter(|(_, piece)| !piece.is_empty())
        .map(|(i, piece)| (i + 1, piece))
}

/// A statement together with its position in the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based position of the piece in the raw split, counting empty pieces.
    pub index: usize,

    /// Trimmed statement text.
    pub sql: String,
}

/// An ordered sequence of statements read from one file.
#[derive(Debug, Clone, Default)]
pub struct Script {
    path: Option<PathBuf>,
    statements: Vec<Statement>,
}

impl Script {
    /// Parses script text.
    pub fn parse(text: &str, delimiter: char) -> Self {
        let statements = pieces(text, delimiter)
            .map(|(index, sql)| Statement {
                index,
                sql: sql.to_string(),
            })
            .collect();

        Self {
            path: None,
            statements,
        }
    }

    /// Reads and parses a UTF-8 script file.
    pub fn load(path: &Path, delimiter: char) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CheckError::Script {
            path: path.to_path_buf(),
            source,
        })?;

        let mut script = Self::parse(&text, delimiter);
        script.path = Some(path.to_path_buf());
        Ok(script)
    }

    /// File the script was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Statements in execution order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Returns true if the script has no statements.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Label used in progress output.
    pub fn label(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<inline>".to_string())
    }
}
