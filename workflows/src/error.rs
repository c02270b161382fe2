//! Configuration errors that abort an assertion pass.
//!
//! Response problems (bad status, missing paths, mismatches) are not errors;
//! they are recorded in the ledger.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("invalid match op \"{0}\" specified")]
    UnknownOperator(String),
    #[error("invalid regex \"{pattern}\": {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
