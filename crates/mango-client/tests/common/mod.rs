//! Shared test helpers for mango-client integration tests.

#![allow(dead_code)]

pub mod fixtures;
pub mod ledger;

pub use fixtures::*;
pub use ledger::*;

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
