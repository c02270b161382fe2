//! Helpers for collections that test the library itself: runtime variable
//! cleanup and reference-state comparison.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::types::NextStep;
use crate::io::host::Host;
use crate::io::vars::{PollVars, RUNTIME_VAR_PREFIX};
use crate::step::Step;

pub const CLEARED_RUNTIME_VARS: &str = "[Cleared Runtime Env Vars]";
pub const TESTER_ALL_PASSED: &str = "[Tester] All Tests Passed";

/// Expected end state of a step's ledger, in ledger order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceState {
    pub expect: Vec<(String, u8)>,
}

impl ReferenceState {
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("serialize reference state")
    }
}

impl<H: Host + ?Sized> Step<'_, H> {
    /// Blank every `_rt_` environment variable, or remove them when `delete`
    /// is set.
    pub fn clear_runtime_vars(&mut self, delete: bool) {
        for name in self.host.environment_names() {
            if !name.starts_with(RUNTIME_VAR_PREFIX) {
                continue;
            }
            self.debug("clear_runtime_vars", &format!("clearing env variable: {name}"));
            if delete {
                self.host.clear_environment(&name);
            } else {
                self.host.set_environment(&name, "");
            }
        }
        self.ledger.set(CLEARED_RUNTIME_VARS, 1);
    }

    /// Compare the ledger with a reference state.
    ///
    /// Every expected entry must be present with exactly the expected value;
    /// extra entries are ignored. The outcome is recorded with the poll
    /// override so a mismatch fails even in polled mode. A mismatch also halts
    /// the sequence unless polled mode is on.
    pub fn test_check(&mut self, expected: &[(String, u8)]) -> bool {
        let mismatch = expected
            .iter()
            .find(|(name, value)| self.ledger.get(name) != Some(*value));

        if let Some((name, value)) = mismatch {
            let actual = self.ledger.get(name);
            self.debug("test_check", &format!("'{name}' expected {value}, got {actual:?}"));
            self.record_with_override(TESTER_ALL_PASSED, false, None);
            if !self.host.polled_mode() {
                self.host.set_next_step(NextStep::Halt);
            }
            return false;
        }
        self.record_with_override(TESTER_ALL_PASSED, true, None);
        true
    }

    /// Render the current ledger as a reference state, send it to the host
    /// log and return it.
    pub fn test_state_generate(&self) -> Result<String> {
        let state = ReferenceState {
            expect: self
                .ledger
                .iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        };
        let rendered = state.to_toml()?;
        self.host.log(&rendered);
        Ok(rendered)
    }
}
