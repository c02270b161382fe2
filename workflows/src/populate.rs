//! Populate environment variables from the response body.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::coerce::{display, truthy};
use crate::io::host::Host;
use crate::step::Step;

/// Computes a variable from the parsed body (if any) and the variable's extra
/// arguments. `None` means "not found".
pub type ComputeFn = Arc<dyn Fn(Option<&Value>, &[Value]) -> Option<Value> + Send + Sync>;

/// Where a variable's value comes from.
#[derive(Clone)]
pub enum VarSource {
    /// Dot path into the response body.
    Path(String),
    Compute(ComputeFn),
}

impl fmt::Debug for VarSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            VarSource::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariableSpec {
    pub name: String,
    pub value: VarSource,
    pub args: Vec<Value>,
}

impl VariableSpec {
    pub fn path(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: VarSource::Path(path.into()),
            args: Vec::new(),
        }
    }

    pub fn compute<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(Option<&Value>, &[Value]) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            value: VarSource::Compute(Arc::new(compute)),
            args: Vec::new(),
        }
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }
}

/// Serialized form of a path-based variable spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    pub value: String,
}

impl From<VariableDef> for VariableSpec {
    fn from(def: VariableDef) -> Self {
        VariableSpec::path(def.name, def.value)
    }
}

/// Ledger label for populating `name`.
pub fn populate_test_name(name: &str) -> String {
    format!("[Populate Variable] {name}=")
}

impl<H: Host + ?Sized> Step<'_, H> {
    /// Store values from the response into environment variables.
    ///
    /// `None` does nothing, not even the status check. Otherwise a failing
    /// status halts (unless polled mode or the bypass is on) and nothing is
    /// populated.
    ///
    /// - computed: a result is stored and recorded as a pass; `None` stores
    ///   an empty string and records a failure.
    /// - path: a truthy value is stored and recorded as a pass; a missing or
    ///   falsy value stores nothing, records a failure and halts (same
    ///   exceptions as above).
    pub fn populate_vars(&mut self, vars: Option<&[VariableSpec]>) {
        let Some(vars) = vars else {
            return;
        };

        if !self.check_response_code().is_success() {
            self.debug("populate_vars", "response code bad");
            self.halt_unless_bypassed("populate_vars");
            return;
        }

        for spec in vars {
            let test_name = populate_test_name(&spec.name);
            self.debug("populate_vars", &format!("name={}", spec.name));

            match &spec.value {
                VarSource::Compute(compute) => {
                    self.debug("populate_vars", "running custom function");
                    match compute(self.json(), &spec.args) {
                        Some(value) => {
                            self.record(&test_name, true, Some(&value));
                            self.host.set_environment(&spec.name, &display(&value));
                        }
                        None => {
                            self.record(&test_name, false, None);
                            self.host.set_environment(&spec.name, "");
                        }
                    }
                }
                VarSource::Path(path) => {
                    let found = self
                        .lookup(path)
                        .filter(|v| truthy(Some(&**v)))
                        .map(Cow::into_owned);
                    match found {
                        Some(value) => {
                            self.debug("populate_vars", "found attribute");
                            self.host.set_environment(&spec.name, &display(&value));
                            self.record(&test_name, true, Some(&value));
                        }
                        None => {
                            self.debug("populate_vars", "did not find attribute");
                            self.record(&test_name, false, None);
                            self.halt_unless_bypassed("populate_vars");
                        }
                    }
                }
            }
        }
    }
}
