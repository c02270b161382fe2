//! Polling configuration (TOML) and its installation into the global store.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io::host::Host;
use crate::io::vars::{
    DEBUG, DEFAULT_DELAY_STEP, DEFAULT_MAX_TRIES, ENABLE_POLLED_MODE, POLL_API_URL,
    POLL_BYPASS_TIMEOUT, POLL_CURRENT, POLL_DELAY_STEP, POLL_ITERATOR, POLL_MAX_TRIES,
    POLL_USE_INTERNAL, POLL_WAIT,
};

/// Polling configuration.
///
/// Meant to be written by humans; missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollConfig {
    /// Attempts before the poller gives up.
    pub max_tries: u32,

    /// Seconds between attempts.
    pub wait_secs: u64,

    /// Sleep inside the polled step (blocks the thread) instead of handing
    /// off to the external delay step.
    pub use_internal: bool,

    /// On max tries, continue with the sequence instead of halting. Also keeps
    /// bad status codes and missing variables from halting.
    pub bypass_timeout: bool,

    /// Encode pass/fail in the test name (see `RecordMode::Polled`).
    pub polled_mode: bool,

    /// Name of the step that implements the external delay.
    pub delay_step: String,

    /// Endpoint the external delay step calls, if it calls one.
    pub api_url: Option<String>,

    /// Forward debug lines to the host log.
    pub debug: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES as u32,
            wait_secs: 5,
            use_internal: false,
            bypass_timeout: false,
            polled_mode: false,
            delay_step: DEFAULT_DELAY_STEP.to_string(),
            api_url: None,
            debug: false,
        }
    }
}

impl PollConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_tries == 0 {
            return Err(anyhow!("max_tries must be > 0"));
        }
        if self.delay_step.trim().is_empty() {
            return Err(anyhow!("delay_step must be a non-empty step name"));
        }
        Ok(())
    }

    /// Write the configuration into the host's globals and reset the poll
    /// state (iterator back to 1, no step awaiting resumption).
    pub fn install<H: Host + ?Sized>(&self, host: &mut H) {
        debug!(max_tries = self.max_tries, wait_secs = self.wait_secs, "installing poll config");
        host.set_global(POLL_MAX_TRIES, &self.max_tries.to_string());
        host.set_global(POLL_WAIT, &self.wait_secs.to_string());
        host.set_global(POLL_USE_INTERNAL, flag(self.use_internal));
        host.set_global(POLL_BYPASS_TIMEOUT, flag(self.bypass_timeout));
        host.set_global(ENABLE_POLLED_MODE, flag(self.polled_mode));
        host.set_global(POLL_DELAY_STEP, &self.delay_step);
        match &self.api_url {
            Some(url) => host.set_global(POLL_API_URL, url),
            None => host.clear_global(POLL_API_URL),
        }
        host.set_global(DEBUG, flag(self.debug));
        host.set_global(POLL_ITERATOR, "1");
        host.set_global(POLL_CURRENT, "");
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

/// Read a standalone poll config file.
///
/// Fields the file leaves out take their defaults; the result is validated.
pub fn load_config(path: &Path) -> Result<PollConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read poll config {}", path.display()))?;
    let config: PollConfig =
        toml::from_str(&raw).with_context(|| format!("parse poll config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("poll config {}", path.display()))?;
    debug!(path = %path.display(), "loaded poll config");
    Ok(config)
}
