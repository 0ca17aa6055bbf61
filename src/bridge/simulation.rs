//! Simulation timer.
//!
//! Re-dispatches a sample broadcast at a fixed interval as if it had come
//! from the transport. At most one timer runs; starting a new one cancels
//! the previous one first.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use super::shared::Shared;

// ============================================================================
// Simulation
// ============================================================================

/// Owns the running simulation task, if any.
#[derive(Debug, Default)]
pub(crate) struct Simulation {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Simulation {
    /// Cancels any running timer and starts a new one for `sample`.
    ///
    /// The first dispatch happens one interval after the call.
    pub(crate) fn start(&self, runtime: &Handle, shared: Arc<Shared>, sample: Value) {
        let period = shared.options.simulation_interval;
        let first = Instant::now() + period;

        let task = runtime.spawn(async move {
            let mut ticker = interval_at(first, period);
            loop {
                ticker.tick().await;
                shared.handle_inbound(sample.clone());
            }
        });

        if let Some(previous) = self.task.lock().replace(task) {
            previous.abort();
        }
    }

    /// Cancels the running timer. No-op if none.
    pub(crate) fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Returns `true` while a timer is active.
    pub(crate) fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

// ============================================================================
// Tests
// ============================================================================
