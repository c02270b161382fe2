//! Execution context for a single step invocation.
//!
//! A `Step` borrows the host for the duration of one invocation and owns the
//! per-invocation state: the response, its lazily parsed body, the status
//! whitelist and the test ledger. The ledger is handed back with
//! [`Step::finish`].

use std::borrow::Cow;
use std::cell::OnceCell;

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::classifier::{ResponseClass, StatusWhitelist, status_test_name};
use crate::core::ledger::{Ledger, RecordMode};
use crate::core::path::resolve;
use crate::core::types::{NextStep, Response};
use crate::io::host::Host;
use crate::io::vars::PollVars;

pub struct Step<'h, H: Host + ?Sized> {
    pub(crate) host: &'h mut H,
    response: Response,
    parsed: OnceCell<Option<Value>>,
    whitelist: StatusWhitelist,
    pub(crate) ledger: Ledger,
}

impl<'h, H: Host + ?Sized> Step<'h, H> {
    pub fn new(host: &'h mut H, response: Response) -> Self {
        Self {
            host,
            response,
            parsed: OnceCell::new(),
            whitelist: StatusWhitelist::default(),
            ledger: Ledger::new(),
        }
    }

    pub fn host(&self) -> &H {
        &*self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut *self.host
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// End the invocation and return its test results.
    pub fn finish(self) -> Ledger {
        self.ledger
    }

    /// Parsed response body, parsed on first access.
    ///
    /// An empty body or invalid JSON yields `None` for the rest of the
    /// invocation; a parse failure is reported to the host log once.
    pub fn json(&self) -> Option<&Value> {
        self.parsed
            .get_or_init(|| {
                if self.response.body.is_empty() {
                    return None;
                }
                match serde_json::from_str(&self.response.body) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        warn!(error = %err, "response body is not valid JSON");
                        self.host.log(&format!("response body is not valid JSON: {err}"));
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Value at dot path `path` in the response body.
    pub fn lookup(&self, path: &str) -> Option<Cow<'_, Value>> {
        self.lookup_ancestor(path, 0)
    }

    /// Value at `path` with the last `levels` segments dropped.
    pub fn lookup_ancestor(&self, path: &str, levels: usize) -> Option<Cow<'_, Value>> {
        let found = resolve(self.json(), path, levels);
        self.debug("lookup", &format!("path={path} levels={levels} found={}", found.is_some()));
        found
    }

    pub fn record_mode(&self) -> RecordMode {
        if self.host.polled_mode() {
            RecordMode::Polled
        } else {
            RecordMode::Direct
        }
    }

    /// Record a test outcome in the ledger using the current record mode.
    pub fn record(&mut self, base: &str, passed: bool, value: Option<&Value>) -> String {
        let mode = self.record_mode();
        self.ledger.record(mode, base, passed, value, false)
    }

    /// Like [`Step::record`], but a polled failure is stored as 0.
    pub fn record_with_override(&mut self, base: &str, passed: bool, value: Option<&Value>) -> String {
        let mode = self.record_mode();
        self.ledger.record(mode, base, passed, value, true)
    }

    /// True unless some test failed (value 0 or a polled failure name).
    pub fn all_tests_passed(&self) -> bool {
        match self.ledger.failures().next() {
            Some(name) => {
                self.debug("all_tests_passed", &format!("test '{name}' not passed"));
                false
            }
            None => {
                self.debug("all_tests_passed", "all passed");
                true
            }
        }
    }

    /// Classify the response status for the request method and record it as
    /// `[<METHOD> Response Code]=<status>`.
    pub fn check_response_code(&mut self) -> ResponseClass {
        let class = self
            .whitelist
            .classify(&self.response.method, self.response.status);
        let name = status_test_name(&self.response.method);
        let status = Value::from(self.response.status);
        self.record(&name, class.is_success(), Some(&status));
        self.debug(
            "check_response_code",
            &format!("status={} class={class:?}", self.response.status),
        );
        class
    }

    /// Accept 404 for GET for the rest of the invocation.
    pub fn extend_get_with_404(&mut self) {
        self.debug("check_response_code", "adding 404 to GET codes");
        self.whitelist.extend_get_with_404();
    }

    /// [`Step::check_response_code`] with 404 accepted for GET. The extension
    /// stays in effect for the rest of the invocation.
    pub fn check_response_code_with_404(&mut self) -> ResponseClass {
        self.extend_get_with_404();
        self.check_response_code()
    }

    /// Halt the sequence unless polled mode or the timeout bypass is on.
    pub(crate) fn halt_unless_bypassed(&mut self, label: &str) {
        if self.host.polled_mode() || self.host.poll_bypass_timeout() {
            self.debug(label, "halt suppressed (polled mode or bypass)");
            return;
        }
        self.debug(label, "next is halt");
        self.host.set_next_step(NextStep::Halt);
    }

    /// Emit a diagnostic; forwarded to the host log when the debug global is
    /// set.
    pub fn debug(&self, label: &str, message: &str) {
        debug!(label, "{message}");
        if self.host.debug_enabled() {
            self.host.log(&format!("[{label}] {message}"));
        }
    }
}
