//! Stable exit codes for collection-runner commands.

/// The run completed and every invocation passed (or the command succeeded).
pub const OK: i32 = 0;
/// Invalid collection, config or arguments.
pub const INVALID: i32 = 1;
/// The run completed but some invocation failed.
pub const FAILED: i32 = 2;
/// A step halted the sequence (or jumped to an unknown step).
pub const HALTED: i32 = 3;
/// `max_executions` was reached.
pub const EXECUTION_LIMIT: i32 = 4;
