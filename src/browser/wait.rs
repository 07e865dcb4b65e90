//! Bounded polling.
//!
//! Every wait in the archiver is a [`BoundedPoll`]: probe a condition, sleep
//! `interval`, probe again, give up once `timeout` has elapsed. There is no
//! cancellation; a poll always runs until its condition holds or its deadline
//! passes.

use crate::error::Result;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, instrument};

/// A condition poll with a fixed interval and overall deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedPoll {
    pub interval: Duration,
    pub timeout: Duration,
}

impl BoundedPoll {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Run `probe` until it yields `Some`, or until the deadline passes.
    ///
    /// The probe always runs at least once, even with a zero timeout. Errors
    /// from the probe end the poll immediately.
    ///
    /// # Returns
    ///
    /// `Ok(Some(value))` from the first successful probe, `Ok(None)` on timeout.
    #[instrument(level = "debug", skip_all, fields(interval_ms = self.interval.as_millis() as u64, timeout_ms = self.timeout.as_millis() as u64))]
    pub async fn until<T, F, Fut>(&self, mut probe: F) -> Result<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let t0 = Instant::now();
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            if let Some(value) = probe().await? {
                debug!(attempts, elapsed_ms = t0.elapsed().as_millis() as u64, "Poll condition met");
                return Ok(Some(value));
            }
            if t0.elapsed() >= self.timeout {
                debug!(attempts, "Poll deadline passed");
                return Ok(None);
            }
            sleep(self.interval).await;
        }
    }
}
