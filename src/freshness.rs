//! Periodic driver for [`crate::Db::check_expiry`].
//!
//! `check_expiry` is a stateless probe, not a loop; scheduling it is
//! left to callers. Most deployments of this cache want *some*
//! periodic caller though, so this module supplies the obvious one: a
//! background thread driven by a `crossbeam::channel` shutdown signal.

use crate::Db;
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Runs [`Db::check_expiry`] on a fixed interval until stopped or
/// dropped.
pub struct FreshnessScheduler {
    stop: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl FreshnessScheduler {
    /// Spawns a background thread that calls `db.check_expiry()` every
    /// `period`, logging the expired count via `tracing`.
    pub fn spawn(db: Arc<Db>, period: Duration) -> Self {
        let (stop, stop_rx) = channel::bounded(0);

        let worker = thread::spawn(move || loop {
            match stop_rx.recv_timeout(period) {
                Ok(()) => break,
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    debug!("running scheduled freshness check");
                    db.check_expiry();
                }
            }
        });

        Self {
            stop,
            worker: Some(worker),
        }
    }

    /// Signals the background thread to stop and waits for it to exit.
    pub fn stop(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        let _ = self.stop.send(());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for FreshnessScheduler {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
