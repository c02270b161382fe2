//! Names and typed accessors for the global variables that carry polling
//! state between step invocations.
//!
//! The values are strings in the host's global store. Numbers and flags are
//! read the way `parseInt(value, 10)` reads them; a flag is set when it parses
//! to a non-zero integer.

use crate::core::coerce::parse_int;
use crate::io::host::Host;

pub const POLL_ITERATOR: &str = "_poll_iterator";
pub const POLL_MAX_TRIES: &str = "_poll_max_tries";
pub const POLL_WAIT: &str = "_poll_wait";
pub const POLL_USE_INTERNAL: &str = "_poll_useinternal";
pub const POLL_API_URL: &str = "_poll_apiurl";
pub const POLL_DELAY_STEP: &str = "_poll_delay_step";
pub const POLL_BYPASS_TIMEOUT: &str = "_poll_bypass_timeout";
pub const POLL_CURRENT: &str = "_poll_curr";
pub const ENABLE_POLLED_MODE: &str = "_enable_polled_mode";
pub const DEBUG: &str = "_debug";

/// Environment variables with this prefix are runtime scratch values.
pub const RUNTIME_VAR_PREFIX: &str = "_rt_";

pub const DEFAULT_MAX_TRIES: i64 = 10;
pub const DEFAULT_DELAY_STEP: &str = "_POLL_DELAY";

/// Typed get/set-by-name access to the polling context.
pub trait PollVars: Host {
    fn int_global(&self, name: &str) -> Option<i64> {
        self.global(name).as_deref().and_then(parse_int)
    }

    fn flag_global(&self, name: &str) -> bool {
        self.int_global(name).is_some_and(|n| n != 0)
    }

    /// Current attempt (1-based). Unset or unparsable reads as 1.
    fn poll_iterator(&self) -> i64 {
        self.int_global(POLL_ITERATOR).unwrap_or(1)
    }

    fn set_poll_iterator(&mut self, value: i64) {
        self.set_global(POLL_ITERATOR, &value.to_string());
    }

    fn poll_max_tries(&self) -> i64 {
        self.int_global(POLL_MAX_TRIES).unwrap_or(DEFAULT_MAX_TRIES)
    }

    /// Seconds to wait between attempts; unset or negative is no wait.
    fn poll_wait_secs(&self) -> u64 {
        self.int_global(POLL_WAIT)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0)
    }

    /// Blocking in-step sleep instead of the external delay step. Only the
    /// value 1 selects it.
    fn poll_use_internal(&self) -> bool {
        self.int_global(POLL_USE_INTERNAL) == Some(1)
    }

    fn poll_bypass_timeout(&self) -> bool {
        self.flag_global(POLL_BYPASS_TIMEOUT)
    }

    fn polled_mode(&self) -> bool {
        self.flag_global(ENABLE_POLLED_MODE)
    }

    fn debug_enabled(&self) -> bool {
        self.global(DEBUG).as_deref() == Some("1")
    }

    fn poll_api_url(&self) -> Option<String> {
        self.global(POLL_API_URL).filter(|url| !url.is_empty())
    }

    fn poll_delay_step(&self) -> String {
        self.global(POLL_DELAY_STEP)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_DELAY_STEP.to_string())
    }

    /// Step to resume after the external delay; `None` when no poll is in
    /// flight.
    fn poll_current(&self) -> Option<String> {
        self.global(POLL_CURRENT).filter(|name| !name.is_empty())
    }

    fn set_poll_current(&mut self, step: &str) {
        self.set_global(POLL_CURRENT, step);
    }
}

impl<H: Host + ?Sized> PollVars for H {}
