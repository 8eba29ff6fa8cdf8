//! Shared storage integration tests.
//!
//! Tests the SalesStore interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod sales_store_tests;
