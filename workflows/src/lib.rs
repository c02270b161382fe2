//! Step helpers for API collection runs: variable population from JSON
//! responses, declarative response checks, and polling a step until its checks
//! pass.
//!
//! The crate keeps a strict split:
//!
//! - **[`core`]**: pure logic (path resolution, search, status classification,
//!   the test ledger, comparison operators). No host access.
//! - **[`io`]**: the [`io::host::Host`] boundary the runner implements, the
//!   polling configuration and the blocking sleep.
//!
//! A [`step::Step`] ties both together for one step invocation; [`check`],
//! [`populate`], [`poll`] and [`tester`] add the operations a step runs.

pub mod check;
pub mod core;
pub mod error;
pub mod io;
pub mod logging;
pub mod poll;
pub mod populate;
pub mod step;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tester;

pub use crate::check::{CheckDef, CheckSpec, Expected};
pub use crate::core::ledger::Ledger;
pub use crate::core::types::{NextStep, Response};
pub use crate::error::WorkflowError;
pub use crate::io::config::PollConfig;
pub use crate::io::host::Host;
pub use crate::io::memory::MemoryHost;
pub use crate::poll::PollState;
pub use crate::populate::{VariableDef, VariableSpec};
pub use crate::step::Step;

/// Version of this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
