use chrono::{DateTime, TimeDelta, Utc};
use multisig_txp_engine::Clock;
use tokio::time::Instant;

/// A wall clock driven by tokio's clock.
///
/// Reads `base` plus the tokio time elapsed since creation, so pausing and advancing tokio time
/// moves this clock too.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    base: DateTime<Utc>,
    start: Instant,
}

impl TokioClock {
    /// Creates a clock reading `base` now.
    pub fn new(base: DateTime<Utc>) -> Self {
        Self { base, start: Instant::now() }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.start.elapsed()).expect("elapsed time fits");
        self.base + elapsed
    }
}
