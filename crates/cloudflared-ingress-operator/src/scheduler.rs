//! Fixed-interval reconciliation loop
//!
//! Passes never overlap: the next one starts only after the previous one
//! finished and the interval elapsed. A failed or panicking pass is retried
//! sooner.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error};

use crate::reconciler::Reconciler;

/// Delay after a pass that completed
pub const RECONCILE_INTERVAL: Duration = Duration::from_secs(30);

/// Delay after a pass that failed
pub const FAILURE_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Result of one cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The pass ran to completion
    Completed,
    /// The pass failed with an error
    Failed,
}

/// Drives [`Reconciler::reconcile`] forever
pub struct Scheduler {
    reconciler: Reconciler,
    interval: Duration,
    retry_interval: Duration,
}

impl Scheduler {
    /// Create a scheduler with the standard intervals
    pub fn new(reconciler: Reconciler) -> Self {
        Self::with_intervals(reconciler, RECONCILE_INTERVAL, FAILURE_RETRY_INTERVAL)
    }

    /// Create a scheduler with custom intervals
    pub fn with_intervals(
        reconciler: Reconciler,
        interval: Duration,
        retry_interval: Duration,
    ) -> Self {
        Self {
            reconciler,
            interval,
            retry_interval,
        }
    }

    /// Run one pass, containing any error or panic it raises
    pub async fn run_cycle(&self) -> CycleOutcome {
        // The reconciler holds no state a panic could leave half-updated
        let pass = AssertUnwindSafe(self.reconciler.reconcile()).catch_unwind();
        match pass.await {
            Ok(Ok(_)) => CycleOutcome::Completed,
            Ok(Err(e)) => {
                error!(
                    error = %e,
                    error_debug = ?e,
                    retryable = e.is_retryable(),
                    "error in reconcile loop"
                );
                CycleOutcome::Failed
            }
            Err(panic) => {
                error!(panic = %panic_message(panic.as_ref()), "reconcile pass panicked");
                CycleOutcome::Failed
            }
        }
    }

    /// How long to wait after a cycle with this outcome
    pub fn delay_after(&self, outcome: CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Completed => self.interval,
            CycleOutcome::Failed => self.retry_interval,
        }
    }

    /// Loop until the process is terminated
    pub async fn run(&self) {
        loop {
            let outcome = self.run_cycle().await;
            let delay = self.delay_after(outcome);
            debug!(outcome = ?outcome, delay = ?delay, "sleeping until next pass");
            tokio::time::sleep(delay).await;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic payload"
    }
}
