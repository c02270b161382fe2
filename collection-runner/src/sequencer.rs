//! Step-at-a-time execution of a collection.
//!
//! The sequencer plays the external runner: it invokes one step, applies the
//! step's next-step decision, and repeats until the run completes, halts or
//! hits `max_executions`. No decision means "next step in file order".

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use workflows::io::sleep::block_for;
use workflows::io::vars::PollVars;
use workflows::{CheckSpec, Host, Ledger, MemoryHost, NextStep, PollState, Step, VariableSpec};

use crate::collection::{ClearMode, Collection, StepDef};

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunStop {
    /// Ran past the last step.
    Completed,
    /// A step asked the sequencer to stop.
    Halted { step: String },
    /// A step jumped to a name the collection does not define.
    UnknownStep { step: String, target: String },
    ExecutionLimit { max_executions: usize },
}

/// Result of one step invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    pub step: String,
    /// 1-based count of this step's invocations.
    pub attempt: usize,
    pub status: u16,
    pub ledger: Ledger,
    pub next: Option<NextStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
    /// Rendered reference state, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Invocation {
    /// Passed as a runner reports it: no error and every entry is 1. Polled
    /// failures are stored as 1 and so do not fail the invocation.
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.ledger.iter().all(|(_, value)| value == 1)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Render each invocation's ledger as a reference state.
    pub generate_state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub stop: RunStop,
    pub invocations: Vec<Invocation>,
}

impl RunOutcome {
    pub fn all_passed(&self) -> bool {
        self.invocations.iter().all(Invocation::passed)
    }
}

pub struct Sequencer<'c> {
    collection: &'c Collection,
    host: MemoryHost,
    delay_step: StepDef,
    invocations: HashMap<String, usize>,
    options: RunOptions,
}

impl<'c> Sequencer<'c> {
    /// Seed the host with the collection's environment and poll settings.
    pub fn new(collection: &'c Collection, options: RunOptions) -> Self {
        let mut host = MemoryHost::new();
        for (name, value) in &collection.environment {
            host.set_environment(name, value);
        }
        collection.settings.poll.install(&mut host);

        let delay_name = collection.delay_step_name();
        let delay_step = collection
            .step_index(delay_name)
            .map(|index| collection.steps[index].clone())
            .unwrap_or_else(|| StepDef::passthrough(delay_name));

        Self {
            collection,
            host,
            delay_step,
            invocations: HashMap::new(),
            options,
        }
    }

    pub fn host(&self) -> &MemoryHost {
        &self.host
    }

    /// Run from the first step, calling `on_invocation` after every step.
    pub fn run<F: FnMut(&Invocation)>(&mut self, mut on_invocation: F) -> RunOutcome {
        let mut invocations = Vec::new();
        let mut current = self.collection.steps.first().map(|step| step.name.clone());

        let stop = loop {
            let Some(name) = current.take() else {
                break RunStop::Completed;
            };
            if invocations.len() >= self.collection.settings.max_executions {
                warn!(max = self.collection.settings.max_executions, "execution limit reached");
                break RunStop::ExecutionLimit {
                    max_executions: self.collection.settings.max_executions,
                };
            }

            let Some(step) = self.resolve(&name) else {
                let from = invocations
                    .last()
                    .map(|inv: &Invocation| inv.step.clone())
                    .unwrap_or_default();
                warn!(step = %from, target = %name, "jump to unknown step");
                break RunStop::UnknownStep {
                    step: from,
                    target: name,
                };
            };

            let invocation = self.invoke(&step);
            on_invocation(&invocation);
            let next = invocation.next.clone();
            invocations.push(invocation);

            current = match next {
                Some(NextStep::Halt) => {
                    info!(step = %name, "sequence halted");
                    break RunStop::Halted { step: name };
                }
                Some(NextStep::Step(target)) => Some(target),
                None => self.following(&name),
            };
        };

        RunOutcome { stop, invocations }
    }

    fn resolve(&self, name: &str) -> Option<StepDef> {
        match self.collection.step_index(name) {
            Some(index) => Some(self.collection.steps[index].clone()),
            None if name == self.delay_step.name => Some(self.delay_step.clone()),
            None => None,
        }
    }

    /// Next step in file order; `None` past the end or for the synthesized
    /// delay step.
    fn following(&self, name: &str) -> Option<String> {
        let index = self.collection.step_index(name)?;
        self.collection
            .steps
            .get(index + 1)
            .map(|step| step.name.clone())
    }

    fn invoke(&mut self, def: &StepDef) -> Invocation {
        let counter = self.invocations.entry(def.name.clone()).or_insert(0);
        let index = *counter;
        *counter += 1;

        let response = def.response(index);
        let status = response.status;
        debug!(step = %def.name, attempt = index + 1, status, "invoking step");

        self.host.set_current_step(def.name.as_str());
        self.host.take_next_step();
        let is_delay = def.name == self.delay_step.name;
        let generate_state = self.options.generate_state;

        let mut error = None;
        let mut poll = None;
        let mut state = None;
        let ledger = {
            let mut step = Step::new(&mut self.host, response);
            if def.extend_get_404 {
                step.extend_get_with_404();
            }

            if is_delay {
                run_delay(&mut step);
            } else {
                if !def.populate.is_empty() {
                    let vars: Vec<VariableSpec> =
                        def.populate.iter().cloned().map(VariableSpec::from).collect();
                    step.populate_vars(Some(&vars));
                }
                match &def.checks {
                    Some(checks) => {
                        let specs: Vec<CheckSpec> =
                            checks.iter().cloned().map(CheckSpec::from).collect();
                        if let Err(err) = step.check_response(Some(&specs)) {
                            error = Some(err.to_string());
                        }
                    }
                    None if def.populate.is_empty() => {
                        if let Err(err) = step.check_response(None) {
                            error = Some(err.to_string());
                        }
                    }
                    None => {}
                }
                if let Some(mode) = def.clear_runtime_vars {
                    step.clear_runtime_vars(mode == ClearMode::Delete);
                }
                if let Some(target) = &def.poll {
                    poll = Some(step.poll_until_all_tests_pass(&target.next, None));
                }
            }

            if let Some(expected) = &def.expect {
                step.test_check(expected);
            }
            if generate_state {
                match step.test_state_generate() {
                    Ok(rendered) => state = Some(rendered),
                    Err(err) => error = Some(format!("{err:#}")),
                }
            }
            step.finish()
        };

        Invocation {
            step: def.name.clone(),
            attempt: index + 1,
            status,
            ledger,
            next: self.host.take_next_step(),
            poll,
            error,
            logs: self.host.take_logs(),
            state,
        }
    }
}

/// The external delay: wait (unless the poll sleeps in place) and resume the
/// polled step.
fn run_delay<H: Host + ?Sized>(step: &mut Step<'_, H>) {
    let host = step.host();
    if !host.poll_use_internal() {
        let wait = host.poll_wait_secs();
        block_for(Duration::from_secs(wait));
    }
    step.record_delay_target();
    step.poll_next();
}
