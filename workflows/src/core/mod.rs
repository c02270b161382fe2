//! Deterministic, pure logic shared by the step helpers.
//!
//! Core modules never touch the host. They operate on in-memory values and
//! return deterministic outputs suitable for tests.

pub mod classifier;
pub mod coerce;
pub mod ledger;
pub mod operator;
pub mod path;
pub mod search;
pub mod types;
