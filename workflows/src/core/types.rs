//! Shared types exchanged with the host.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport-level view of the response a step received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Request method, upper case (`GET`, `POST`, ...).
    pub method: String,
    pub status: u16,
    /// Raw response body; empty when the response had none.
    pub body: String,
}

impl Response {
    pub fn new(method: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            status,
            body: body.into(),
        }
    }
}

/// Sequencing decision handed to the host runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextStep {
    /// Stop executing the rest of the sequence.
    Halt,
    /// Resume at (or jump to) the named step.
    Step(String),
}

impl NextStep {
    pub fn step(name: impl Into<String>) -> Self {
        NextStep::Step(name.into())
    }
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextStep::Halt => f.write_str("<halt>"),
            NextStep::Step(name) => f.write_str(name),
        }
    }
}
