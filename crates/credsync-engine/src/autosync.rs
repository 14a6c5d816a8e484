//! Periodic per-device reconciliation.
//!
//! One cancellable background task per device, tracked in a registry keyed
//! by device ID. A failing tick is logged and retried on the next tick; the
//! model is at-least-eventually-consistent, so drift self-heals without
//! operator action.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use credsync_connector::DeviceId;

use crate::engine::ReconcileEngine;

struct DeviceTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Registry of periodic reconciliation tasks, at most one per device.
pub struct AutoSyncRegistry {
    engine: Arc<ReconcileEngine>,
    tasks: Mutex<HashMap<DeviceId, DeviceTask>>,
}

impl AutoSyncRegistry {
    /// Create an empty registry.
    pub fn new(engine: Arc<ReconcileEngine>) -> Self {
        Self {
            engine,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Start periodic reconciliation for a device.
    ///
    /// The first pass runs immediately, then every `interval`. Starting a
    /// device that already has a timer replaces it: the prior task is
    /// cancelled first.
    pub fn start(&self, device_id: DeviceId, interval: Duration) {
        let mut tasks = self.tasks.lock().expect("auto-sync registry poisoned");

        if let Some(previous) = tasks.remove(&device_id) {
            debug!(device_id = %device_id, "Replacing existing auto-sync task");
            previous.token.cancel();
        }

        let token = CancellationToken::new();
        let task_token = token.clone();
        let engine = Arc::clone(&self.engine);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        debug!(device_id = %device_id, "Auto-sync task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        match engine.reconcile_device(device_id).await {
                            Ok(report) if report.is_noop() => {
                                debug!(device_id = %device_id, "Auto-sync tick: no drift");
                            }
                            Ok(report) => {
                                info!(
                                    device_id = %device_id,
                                    added = report.users_added,
                                    updated = report.users_updated,
                                    removed = report.users_removed,
                                    errors = report.errors.len(),
                                    "Auto-sync tick applied changes"
                                );
                            }
                            Err(e) => {
                                // The timer stays registered; the next tick
                                // retries independently.
                                warn!(
                                    device_id = %device_id,
                                    error = %e,
                                    "Auto-sync tick failed, retrying on next tick"
                                );
                            }
                        }
                    }
                }
            }
        });

        info!(
            device_id = %device_id,
            interval_ms = interval.as_millis() as u64,
            "Auto-sync started"
        );
        tasks.insert(device_id, DeviceTask { token, handle });
    }

    /// Stop the device's periodic reconciliation.
    ///
    /// Returns `false` if no timer was registered. An in-flight pass is not
    /// interrupted; the task exits after it completes.
    pub fn stop(&self, device_id: DeviceId) -> bool {
        let mut tasks = self.tasks.lock().expect("auto-sync registry poisoned");
        match tasks.remove(&device_id) {
            Some(task) => {
                task.token.cancel();
                info!(device_id = %device_id, "Auto-sync stopped");
                true
            }
            None => false,
        }
    }

    /// Whether a timer is registered for the device.
    pub fn is_running(&self, device_id: DeviceId) -> bool {
        let tasks = self.tasks.lock().expect("auto-sync registry poisoned");
        tasks
            .get(&device_id)
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Number of registered timers.
    pub fn len(&self) -> usize {
        self.tasks.lock().expect("auto-sync registry poisoned").len()
    }

    /// Whether the registry has no timers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel every device task.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().expect("auto-sync registry poisoned");
        let count = tasks.len();
        for (_, task) in tasks.drain() {
            task.token.cancel();
        }
        if count > 0 {
            info!(count = count, "Auto-sync registry shut down");
        }
    }
}

impl Drop for AutoSyncRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
