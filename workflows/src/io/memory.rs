//! In-memory host used by the collection runner and by tests.

use std::cell::RefCell;

use indexmap::IndexMap;

use crate::core::types::NextStep;
use crate::io::host::Host;

/// Host backed by insertion-ordered maps.
///
/// Sequencing decisions are kept until the runner takes them, and every log
/// line is retained so callers can inspect what a step printed.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    globals: IndexMap<String, String>,
    environment: IndexMap<String, String>,
    current_step: String,
    next_step: Option<NextStep>,
    logs: RefCell<Vec<String>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_current_step(name: impl Into<String>) -> Self {
        Self {
            current_step: name.into(),
            ..Self::default()
        }
    }

    pub fn set_current_step(&mut self, name: impl Into<String>) {
        self.current_step = name.into();
    }

    /// Decision made during the last invocation, if any.
    pub fn next_step(&self) -> Option<&NextStep> {
        self.next_step.as_ref()
    }

    /// Consume the pending decision (call once per invocation).
    pub fn take_next_step(&mut self) -> Option<NextStep> {
        self.next_step.take()
    }

    pub fn globals(&self) -> impl Iterator<Item = (&str, &str)> {
        self.globals.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn environment_vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.environment.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.borrow().clone()
    }

    pub fn take_logs(&self) -> Vec<String> {
        std::mem::take(&mut *self.logs.borrow_mut())
    }
}

impl Host for MemoryHost {
    fn global(&self, name: &str) -> Option<String> {
        self.globals.get(name).cloned()
    }

    fn set_global(&mut self, name: &str, value: &str) {
        self.globals.insert(name.to_string(), value.to_string());
    }

    fn clear_global(&mut self, name: &str) {
        self.globals.shift_remove(name);
    }

    fn environment(&self, name: &str) -> Option<String> {
        self.environment.get(name).cloned()
    }

    fn set_environment(&mut self, name: &str, value: &str) {
        self.environment.insert(name.to_string(), value.to_string());
    }

    fn clear_environment(&mut self, name: &str) {
        self.environment.shift_remove(name);
    }

    fn environment_names(&self) -> Vec<String> {
        self.environment.keys().cloned().collect()
    }

    fn set_next_step(&mut self, next: NextStep) {
        self.next_step = Some(next);
    }

    fn current_step_name(&self) -> String {
        self.current_step.clone()
    }

    fn log(&self, message: &str) {
        self.logs.borrow_mut().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_next_step_wins_until_taken() {
        let mut host = MemoryHost::new();
        host.set_next_step(NextStep::step("a"));
        host.set_next_step(NextStep::Halt);
        assert_eq!(host.take_next_step(), Some(NextStep::Halt));
        assert_eq!(host.take_next_step(), None);
    }

    #[test]
    fn clearing_removes_variables() {
        let mut host = MemoryHost::new();
        host.set_environment("_rt_id", "1");
        host.set_environment("keep", "2");
        host.clear_environment("_rt_id");
        assert_eq!(host.environment("_rt_id"), None);
        assert_eq!(host.environment_names(), vec!["keep".to_string()]);
    }

    #[test]
    fn logs_are_retained() {
        let host = MemoryHost::with_current_step("Create");
        host.log("one");
        host.log("two");
        assert_eq!(host.current_step_name(), "Create");
        assert_eq!(host.take_logs(), vec!["one", "two"]);
        assert!(host.logs().is_empty());
    }
}
