//! Tracing setup for binaries embedding the library.
//!
//! Library diagnostics are `tracing` events with a `label` field naming the
//! operation. They are separate from the host log sink, which only receives
//! them when the `_debug` global is "1".

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stderr subscriber filtered by `RUST_LOG` (default `warn`).
///
/// ```bash
/// RUST_LOG=workflows=debug collection-runner run smoke.toml
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
