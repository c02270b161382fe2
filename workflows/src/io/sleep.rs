//! Thread-blocking wait used by the internal poll delay.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Busy-wait the calling thread for `duration`.
///
/// This never yields to a scheduler: nothing else on the thread runs until the
/// wait is over. A duration past the clock's range waits indefinitely.
pub fn block_for(duration: Duration) {
    debug!(millis = duration.as_millis() as u64, "blocking sleep");
    let deadline = deadline_after(Instant::now(), duration);
    if deadline.is_none() {
        warn!(secs = duration.as_secs(), "sleep exceeds the clock range, waiting indefinitely");
    }
    while deadline.is_none_or(|deadline| Instant::now() < deadline) {
        std::hint::spin_loop();
    }
}

/// `start + duration`, or `None` when that instant cannot be represented.
pub fn deadline_after(start: Instant, duration: Duration) -> Option<Instant> {
    start.checked_add(duration)
}
