//! Fleet-wide sync sequencing.
//!
//! Fans reconciliation out over connected devices with a bounded worker
//! pool. Devices are independent stores with no shared invariant, so there
//! is no cross-device ordering; a device-level failure is folded into the
//! fleet report and never aborts the remaining devices.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use credsync_connector::{DeviceDirectory, DeviceId};
use credsync_store::{AssignmentId, AssignmentRepository};

use crate::engine::ReconcileEngine;
use crate::error::EngineResult;
use crate::report::{DeviceOutcome, FleetSyncReport};

/// Configuration for the sync orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Number of devices reconciled concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    4
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// Sequences reconciliation across the device fleet.
pub struct SyncOrchestrator {
    engine: Arc<ReconcileEngine>,
    repo: Arc<dyn AssignmentRepository>,
    directory: Arc<dyn DeviceDirectory>,
    config: OrchestratorConfig,
}

impl SyncOrchestrator {
    /// Create an orchestrator with default configuration.
    pub fn new(
        engine: Arc<ReconcileEngine>,
        repo: Arc<dyn AssignmentRepository>,
        directory: Arc<dyn DeviceDirectory>,
    ) -> Self {
        Self::with_config(engine, repo, directory, OrchestratorConfig::default())
    }

    /// Create an orchestrator with custom configuration.
    pub fn with_config(
        engine: Arc<ReconcileEngine>,
        repo: Arc<dyn AssignmentRepository>,
        directory: Arc<dyn DeviceDirectory>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            engine,
            repo,
            directory,
            config,
        }
    }

    /// Reconcile every currently connected device.
    pub async fn sync_all(&self) -> EngineResult<FleetSyncReport> {
        self.sync_all_cancellable(&CancellationToken::new()).await
    }

    /// [`sync_all`](Self::sync_all) with cooperative cancellation.
    #[instrument(skip(self, cancel))]
    pub async fn sync_all_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> EngineResult<FleetSyncReport> {
        let devices = self.directory.connected_devices().await?;
        let device_ids: Vec<DeviceId> = devices.iter().map(|d| d.device_id).collect();

        info!(devices = device_ids.len(), "Starting fleet sync");
        self.reconcile_many(device_ids, cancel).await
    }

    /// Reconcile only the devices already holding an enrollment for one
    /// assignment. Used after a single card change to avoid a full fleet
    /// pass.
    #[instrument(skip(self), fields(assignment_id = %assignment_id))]
    pub async fn sync_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> EngineResult<FleetSyncReport> {
        let rows = self.repo.enrollments_for_assignment(assignment_id).await?;
        let device_ids: Vec<DeviceId> = rows
            .into_iter()
            .filter(|row| row.status.is_present())
            .map(|row| row.device_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        info!(
            devices = device_ids.len(),
            "Starting targeted assignment sync"
        );
        self.reconcile_many(device_ids, &CancellationToken::new())
            .await
    }

    async fn reconcile_many(
        &self,
        device_ids: Vec<DeviceId>,
        cancel: &CancellationToken,
    ) -> EngineResult<FleetSyncReport> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks: JoinSet<DeviceOutcome> = JoinSet::new();

        for device_id in device_ids {
            if cancel.is_cancelled() {
                break;
            }

            let engine = Arc::clone(&self.engine);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                // Closed only on runtime shutdown.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return DeviceOutcome::failed(device_id, "worker pool shut down");
                };
                match engine
                    .reconcile_device_cancellable(device_id, &cancel)
                    .await
                {
                    Ok(report) => DeviceOutcome::ok(report),
                    Err(e) => DeviceOutcome::failed(device_id, e.to_string()),
                }
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(error = %e, "Reconciliation task aborted"),
            }
        }

        let report =
            FleetSyncReport::from_outcomes(outcomes, start.elapsed().as_millis() as u64);
        info!(
            devices_total = report.statistics.devices_total,
            devices_failed = report.statistics.devices_failed,
            users_added = report.statistics.users_added,
            users_updated = report.statistics.users_updated,
            users_removed = report.statistics.users_removed,
            "Fleet sync complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_config_default() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_orchestrator_config_serde_default() {
        let config: OrchestratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.concurrency, 4);
    }
}
