//! Scripted collection runner for the `workflows` step helpers.
//!
//! A collection (TOML) lists steps with canned responses and the helpers each
//! step runs. The [`sequencer`] invokes them one at a time against an
//! in-memory host and follows their next-step decisions, so polling flows can
//! be exercised end to end without a network.

pub mod collection;
pub mod exit_codes;
pub mod report;
pub mod sequencer;
