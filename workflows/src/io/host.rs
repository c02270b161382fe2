//! Interface the host runner provides to a step.

use crate::core::types::NextStep;

/// Services of the runner executing the current step.
///
/// Variables are plain strings addressed by name, in two scopes: globals
/// (polling state) and environment (user variables). Execution is strictly
/// one step at a time, so implementations need no synchronisation.
pub trait Host {
    fn global(&self, name: &str) -> Option<String>;
    fn set_global(&mut self, name: &str, value: &str);
    fn clear_global(&mut self, name: &str);

    fn environment(&self, name: &str) -> Option<String>;
    fn set_environment(&mut self, name: &str, value: &str);
    fn clear_environment(&mut self, name: &str);
    fn environment_names(&self) -> Vec<String>;

    /// Decide which step runs next. The last decision of an invocation wins;
    /// without one the runner applies its own default ordering.
    fn set_next_step(&mut self, next: NextStep);

    /// Name of the step being executed.
    fn current_step_name(&self) -> String;

    /// Raw console sink.
    fn log(&self, message: &str);
}
