//! double-check - run the same SQL against two database versions and stop at
//! the first divergence in their results.
//!
//! This library exposes the core modules for use by the binary and in
//! integration tests.

pub mod cli;
pub mod compare;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod logging;
pub mod provision;
pub mod report;
pub mod runner;
pub mod script;
pub mod session;
