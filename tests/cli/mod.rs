//! Tests that drive the compiled binary.

pub mod exit_code_test;
