//! Declarative response checks.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::core::coerce::truthy;
use crate::core::operator::Operator;
use crate::error::WorkflowError;
use crate::io::host::Host;
use crate::step::Step;

/// Custom check: receives the parsed body (if any) and the check's extra
/// arguments, returns whether the check passed.
pub type CheckFn = Arc<dyn Fn(Option<&Value>, &[Value]) -> bool + Send + Sync>;

/// What a check compares against.
#[derive(Clone)]
pub enum Expected {
    Value(Value),
    Predicate(CheckFn),
}

impl fmt::Debug for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Expected::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// One assertion against the response body.
///
/// `path` and `expected` are required; a check missing either is reported and
/// skipped. `op` defaults to `==`, `test` to true and `testname` to the path.
#[derive(Debug, Clone, Default)]
pub struct CheckSpec {
    pub path: Option<String>,
    pub expected: Option<Expected>,
    pub op: Option<String>,
    pub test: Option<bool>,
    pub testname: Option<String>,
    pub args: Vec<Value>,
}

impl CheckSpec {
    pub fn new(path: impl Into<String>, expected: impl Into<Value>) -> Self {
        Self {
            path: Some(path.into()),
            expected: Some(Expected::Value(expected.into())),
            ..Self::default()
        }
    }

    pub fn predicate<F>(path: impl Into<String>, check: F) -> Self
    where
        F: Fn(Option<&Value>, &[Value]) -> bool + Send + Sync + 'static,
    {
        Self {
            path: Some(path.into()),
            expected: Some(Expected::Predicate(Arc::new(check))),
            ..Self::default()
        }
    }

    pub fn op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// `false` records the current value only, without comparing.
    pub fn test(mut self, test: bool) -> Self {
        self.test = Some(test);
        self
    }

    pub fn testname(mut self, name: impl Into<String>) -> Self {
        self.testname = Some(name.into());
        self
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn op_name(&self) -> &str {
        self.op.as_deref().unwrap_or("==")
    }

    /// Parse the operator up front. Custom predicates ignore `op`.
    pub fn operator(&self) -> Result<Operator, WorkflowError> {
        self.op_name().parse()
    }
}

/// Serialized form of a check (collection files, JSON payloads).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testname: Option<String>,
}

impl From<CheckDef> for CheckSpec {
    fn from(def: CheckDef) -> Self {
        CheckSpec {
            path: def.path,
            expected: def.value.map(Expected::Value),
            op: def.op,
            test: def.test,
            testname: def.testname,
            args: Vec::new(),
        }
    }
}

impl<H: Host + ?Sized> Step<'_, H> {
    /// Check the response status and then every entry in `checks`.
    ///
    /// With `None` only the status code is checked. A failing status halts the
    /// sequence (unless polled mode or the bypass is on) and skips the specs.
    /// For each check a truthy resolved value is recorded as
    /// `[Current Value] <testname>=<value>` and the comparison as
    /// `[Check Value] <testname> <op> <expected>`. Falsy values (`0`, `""`,
    /// `false`, `null`) are still compared but get no current-value entry.
    ///
    /// An unknown operator or invalid regex aborts the remaining specs and is
    /// returned as an error; entries recorded before it stay in the ledger.
    pub fn check_response(&mut self, checks: Option<&[CheckSpec]>) -> Result<(), WorkflowError> {
        let Some(checks) = checks else {
            self.check_response_code();
            return Ok(());
        };

        if !self.check_response_code().is_success() {
            self.debug("check_response", "response code bad");
            self.halt_unless_bypassed("check_response");
            return Ok(());
        }

        for (i, spec) in checks.iter().enumerate() {
            let (Some(path), Some(expected)) = (&spec.path, &spec.expected) else {
                let message = format!("check_response: ERROR: element {i} does not have path and value attributes");
                warn!(index = i, "check spec is missing path or value");
                self.host.log(&message);
                continue;
            };
            let testname = spec.testname.as_deref().unwrap_or(path);
            let op = spec.op_name();

            let current = self.lookup(path).map(Cow::into_owned);
            if let Some(shown) = current.as_ref().filter(|v| truthy(Some(*v))) {
                self.record(&format!("[Current Value] {testname}="), true, Some(shown));
            }

            if !spec.test.unwrap_or(true) {
                continue;
            }

            let check_name = format!("[Check Value] {testname} {op} ");
            match expected {
                Expected::Predicate(check) => {
                    let passed = check(self.json(), &spec.args);
                    let label = Value::from("[custom function]");
                    self.record(&check_name, passed, Some(&label));
                }
                Expected::Value(value) => {
                    let outcome = spec
                        .operator()
                        .and_then(|operator| operator.apply(current.as_ref(), value));
                    let passed = match outcome {
                        Ok(passed) => passed,
                        Err(err) => {
                            warn!(error = %err, testname, "aborting checks");
                            self.host.log(&err.to_string());
                            return Err(err);
                        }
                    };
                    self.debug("check_response", &format!("op={op} current={current:?} passed={passed}"));
                    self.record(&check_name, passed, Some(value));
                }
            }
        }
        Ok(())
    }
}
