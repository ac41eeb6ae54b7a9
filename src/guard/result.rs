// CLASSIFICATION: COMMUNITY
// Filename: result.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome of one guarded execution. Reporting depends on this shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// The probe was cut short by an intercepted memory fault.
    pub crashed: bool,
    /// Monotonic time from just before the probe started to just after it
    /// returned or the fault was intercepted.
    pub elapsed_ns: u64,
}

impl RunResult {
    pub fn new(crashed: bool, elapsed: Duration) -> Self {
        Self {
            crashed,
            elapsed_ns: u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }
}
