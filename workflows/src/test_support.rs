//! Test-only builders for hosts, responses and ledgers.

use serde_json::Value;

use crate::core::ledger::Ledger;
use crate::core::types::Response;
use crate::io::config::PollConfig;
use crate::io::memory::MemoryHost;

/// Host positioned at `step` with the poll configuration installed and no
/// waiting between attempts.
pub fn polling_host(step: &str, max_tries: u32, use_internal: bool) -> MemoryHost {
    let mut host = MemoryHost::with_current_step(step);
    PollConfig {
        max_tries,
        wait_secs: 0,
        use_internal,
        ..PollConfig::default()
    }
    .install(&mut host);
    host
}

/// GET response with a JSON body.
pub fn get_json(status: u16, body: &Value) -> Response {
    Response::new("GET", status, body.to_string())
}

/// Ledger entries as owned pairs, in ledger order.
pub fn entries(ledger: &Ledger) -> Vec<(String, u8)> {
    ledger
        .iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Names of the entries that count as failures.
pub fn failures(ledger: &Ledger) -> Vec<String> {
    ledger.failures().map(str::to_string).collect()
}
