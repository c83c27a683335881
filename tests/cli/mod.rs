//! CLI command integration tests

pub mod deps_tests;
