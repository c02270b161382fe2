//! Poll-until-success across step invocations.
//!
//! A poll never loops inside one invocation. Each call looks at the ledger of
//! the current invocation and the attempt counter in the globals, then tells
//! the sequencer what to run next:
//!
//! ```text
//!   all passed ───────────────► Success        (iterator = 1, next = `next`)
//!   iterator >= max_tries ────► Exhausted      (iterator = 1, halt unless bypassed)
//!   otherwise, iterator += 1
//!     use_internal ───────────► RetryInternal  (block `wait`, next = current step)
//!     else ───────────────────► RetryExternal  (marker = current step, next = delay step)
//! ```
//!
//! The delay step calls [`Step::poll_next`] to resume at the marked step.

use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::core::classifier::ResponseClass;
use crate::core::types::NextStep;
use crate::io::host::Host;
use crate::io::sleep::block_for;
use crate::io::vars::PollVars;
use crate::step::Step;

pub const MAX_TRIES_REACHED: &str = "[Poller] Max Tries Reached";

/// Decision taken by [`Step::poll_until_all_tests_pass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    Success,
    /// Slept in place; the same step runs again.
    RetryInternal,
    /// Handed off to the external delay step.
    RetryExternal,
    Exhausted,
}

/// Heartbeat label written on every poll attempt.
pub fn try_test_name(iterator: i64, max_tries: i64) -> String {
    format!("[Poller] Try {iterator} of {max_tries}")
}

impl<H: Host + ?Sized> Step<'_, H> {
    /// Advance the poll after this invocation's checks have been recorded.
    ///
    /// `current` is the step to re-run; `None` uses the host's current step.
    /// On [`PollState::Exhausted`] with the bypass on, no next step is set and
    /// the runner's default ordering applies.
    pub fn poll_until_all_tests_pass(&mut self, next: &str, current: Option<&str>) -> PollState {
        let current = current
            .map(str::to_string)
            .unwrap_or_else(|| self.host.current_step_name());
        self.debug("poll", &format!("curr={current}"));
        self.debug("poll", &format!("next={next}"));

        let iterator = self.host.poll_iterator();
        let max_tries = self.host.poll_max_tries();
        self.ledger.set(try_test_name(iterator, max_tries), 1);

        if self.all_tests_passed() {
            self.debug("poll", &format!("tests passed, next is '{next}'"));
            self.host.set_poll_iterator(1);
            self.host.set_next_step(NextStep::step(next));
            info!(step = %current, attempt = iterator, "poll succeeded");
            return PollState::Success;
        }

        if iterator >= max_tries {
            self.debug("poll", "reached max_tries");
            self.ledger.set(MAX_TRIES_REACHED, 0);
            self.host.set_poll_iterator(1);
            if self.host.poll_bypass_timeout() {
                self.debug("poll", "bypassing timeout, next left to the runner");
            } else {
                self.debug("poll", "next is halt");
                self.host.set_next_step(NextStep::Halt);
            }
            info!(step = %current, max_tries, "poll exhausted");
            return PollState::Exhausted;
        }

        self.debug("poll", "tests NOT passed, trying again");
        self.host.set_poll_iterator(iterator + 1);

        if self.host.poll_use_internal() {
            let wait = self.host.poll_wait_secs();
            self.debug("poll", &format!("using internal sleep of {wait}s"));
            block_for(Duration::from_secs(wait));
            self.host.set_next_step(NextStep::step(current.as_str()));
            self.host.set_poll_current("");
            PollState::RetryInternal
        } else {
            let delay_step = self.host.poll_delay_step();
            self.debug("poll", &format!("using external delay step '{delay_step}'"));
            self.host.set_poll_current(&current);
            self.host.set_next_step(NextStep::Step(delay_step));
            PollState::RetryExternal
        }
    }

    /// Resume the polled step; called from the external delay step.
    ///
    /// The delay step's own response must pass the status check, otherwise
    /// the sequence halts. It also halts when no polled step is recorded. The
    /// marker is cleared either way.
    pub fn poll_next(&mut self) -> ResponseClass {
        let marker = self.host.poll_current();
        self.debug("poll_next", &format!("curr={marker:?}"));

        let class = self.check_response_code();
        let next = match (class.is_success(), marker) {
            (true, Some(step)) => NextStep::Step(step),
            _ => NextStep::Halt,
        };
        self.debug("poll_next", &format!("next is {next}"));
        self.host.set_next_step(next);
        self.host.set_poll_current("");
        class
    }

    /// Record the configured delay endpoint, if any, in the delay step's
    /// results.
    pub fn record_delay_target(&mut self) {
        if let Some(url) = self.host.poll_api_url() {
            self.ledger.set(format!("[Poller] Delay {url}"), 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Response;
    use crate::io::config::PollConfig;
    use crate::io::memory::MemoryHost;
    use crate::io::vars::POLL_ITERATOR;

    fn configured(max_tries: u32, use_internal: bool, bypass_timeout: bool) -> MemoryHost {
        let mut host = MemoryHost::with_current_step("Wait for job");
        PollConfig {
            max_tries,
            wait_secs: 0,
            use_internal,
            bypass_timeout,
            ..PollConfig::default()
        }
        .install(&mut host);
        host
    }

    fn attempt(host: &mut MemoryHost, status: u16) -> (PollState, Vec<(String, u8)>) {
        let mut step = Step::new(host, Response::new("GET", status, ""));
        step.check_response_code();
        let state = step.poll_until_all_tests_pass("Next", None);
        let ledger = step
            .finish()
            .iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        (state, ledger)
    }

    #[test]
    fn success_resets_iterator_and_moves_on() {
        let mut host = configured(5, true, false);
        host.set_global(POLL_ITERATOR, "2");
        let (state, ledger) = attempt(&mut host, 200);
        assert_eq!(state, PollState::Success);
        assert_eq!(host.poll_iterator(), 1);
        assert_eq!(host.next_step(), Some(&NextStep::step("Next")));
        assert!(ledger.contains(&("[Poller] Try 2 of 5".to_string(), 1)));
    }

    #[test]
    fn internal_retry_reruns_current_step() {
        let mut host = configured(3, true, false);
        let (state, _) = attempt(&mut host, 503);
        assert_eq!(state, PollState::RetryInternal);
        assert_eq!(host.poll_iterator(), 2);
        assert_eq!(host.next_step(), Some(&NextStep::step("Wait for job")));
        assert_eq!(host.poll_current(), None);
    }

    #[test]
    fn external_retry_hands_off_to_delay_step() {
        let mut host = configured(3, false, false);
        let mut step = Step::new(&mut host, Response::new("GET", 503, ""));
        step.check_response_code();
        let state = step.poll_until_all_tests_pass("Next", Some("Explicit"));
        step.finish();
        assert_eq!(state, PollState::RetryExternal);
        assert_eq!(host.poll_current().as_deref(), Some("Explicit"));
        assert_eq!(host.next_step(), Some(&NextStep::step("_POLL_DELAY")));
    }

    #[test]
    fn exhausts_at_max_tries_and_halts() {
        let mut host = configured(3, true, false);
        let mut states = Vec::new();
        let mut last = Vec::new();
        for _ in 0..3 {
            let (state, ledger) = attempt(&mut host, 503);
            states.push(state);
            last = ledger;
        }
        assert_eq!(
            states,
            vec![PollState::RetryInternal, PollState::RetryInternal, PollState::Exhausted]
        );
        assert!(last.contains(&("[Poller] Try 3 of 3".to_string(), 1)));
        assert!(last.contains(&(MAX_TRIES_REACHED.to_string(), 0)));
        assert_eq!(host.poll_iterator(), 1);
        assert_eq!(host.next_step(), Some(&NextStep::Halt));
    }

    #[test]
    fn exhausted_with_bypass_leaves_next_step_unset() {
        let mut host = configured(1, true, true);
        let (state, ledger) = attempt(&mut host, 503);
        assert_eq!(state, PollState::Exhausted);
        assert!(ledger.contains(&(MAX_TRIES_REACHED.to_string(), 0)));
        assert_eq!(host.next_step(), None);
    }

    #[test]
    fn passes_on_second_attempt() {
        let mut host = configured(5, false, false);
        let (first, _) = attempt(&mut host, 503);
        assert_eq!(first, PollState::RetryExternal);
        assert_eq!(host.poll_iterator(), 2);

        let (second, _) = attempt(&mut host, 200);
        assert_eq!(second, PollState::Success);
        assert_eq!(host.poll_iterator(), 1);
        assert_eq!(host.next_step(), Some(&NextStep::step("Next")));
    }

    #[test]
    fn poll_next_resumes_marked_step_and_clears_marker() {
        let mut host = configured(3, false, false);
        host.set_poll_current("Wait for job");
        let class = {
            let mut step = Step::new(&mut host, Response::new("GET", 200, ""));
            step.poll_next()
        };
        assert!(class.is_success());
        assert_eq!(host.next_step(), Some(&NextStep::step("Wait for job")));
        assert_eq!(host.poll_current(), None);
    }

    #[test]
    fn poll_next_halts_on_bad_status_or_missing_marker() {
        let mut host = configured(3, false, false);
        host.set_poll_current("Wait for job");
        {
            let mut step = Step::new(&mut host, Response::new("GET", 500, ""));
            step.poll_next();
        }
        assert_eq!(host.take_next_step(), Some(NextStep::Halt));
        assert_eq!(host.poll_current(), None);

        {
            let mut step = Step::new(&mut host, Response::new("GET", 200, ""));
            step.poll_next();
        }
        assert_eq!(host.take_next_step(), Some(NextStep::Halt));
    }

    #[test]
    fn delay_target_is_recorded_when_configured() {
        let mut host = configured(3, false, false);
        host.set_global(crate::io::vars::POLL_API_URL, "https://delay.example/5");
        let ledger = {
            let mut step = Step::new(&mut host, Response::new("GET", 200, ""));
            step.record_delay_target();
            step.finish()
        };
        assert_eq!(ledger.get("[Poller] Delay https://delay.example/5"), Some(1));
    }
}
