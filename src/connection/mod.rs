//! Connection management for double-check.
//!
//! Centralizes how the session obtains a live connection for each side.

pub mod provider;

pub use provider::{ConnectionProvider, DsnConnectionProvider, MockConnectionProvider};
