//! Per-device reconciliation pass.
//!
//! Pulls desired state from the assignment repository and actual state from
//! the device, applies the diff in Enroll → Update → Remove order, and
//! writes every outcome back into the enrollment ledger. Operations within
//! one device are strictly sequential: the device session is a stateful,
//! non-reentrant resource.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use credsync_connector::{
    CardWrite, DeviceClient, DeviceError, DeviceId, DeviceResult, EnrollRequest,
};
use credsync_store::{AssignmentId, AssignmentRepository, CardAssignment, EnrollmentStatus};

use crate::error::EngineResult;
use crate::plan::compute_plan;
use crate::report::DeviceSyncReport;

/// Which active assignments are in scope for a device's automatic pass.
///
/// The base model applies the full active set to every device; deployments
/// that enroll selectively restrict the pass to assignments already present
/// in the device's ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopePolicy {
    /// Project every active assignment onto every device.
    #[default]
    AllActive,
    /// Only reconcile assignments that already have a live enrollment row
    /// on the device.
    EnrolledOnly,
}

/// Configuration for the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout applied to every individual device RPC.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    /// Assignment scope policy.
    #[serde(default)]
    pub scope: ScopePolicy,
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_secs: default_rpc_timeout_secs(),
            scope: ScopePolicy::default(),
        }
    }
}

enum UpdateApplied {
    Updated,
    Reenrolled,
}

/// Reconciliation engine for a fleet of access devices.
///
/// Dependencies are injected as trait objects; the engine holds no global
/// state and is cheap to share behind an [`Arc`].
pub struct ReconcileEngine {
    repo: Arc<dyn AssignmentRepository>,
    devices: Arc<dyn DeviceClient>,
    config: EngineConfig,
}

impl ReconcileEngine {
    /// Create an engine with default configuration.
    pub fn new(repo: Arc<dyn AssignmentRepository>, devices: Arc<dyn DeviceClient>) -> Self {
        Self::with_config(repo, devices, EngineConfig::default())
    }

    /// Create an engine with custom configuration.
    pub fn with_config(
        repo: Arc<dyn AssignmentRepository>,
        devices: Arc<dyn DeviceClient>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repo,
            devices,
            config,
        }
    }

    /// Get configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Make one device's state match the database and report what changed.
    pub async fn reconcile_device(&self, device_id: DeviceId) -> EngineResult<DeviceSyncReport> {
        self.reconcile_device_cancellable(device_id, &CancellationToken::new())
            .await
    }

    /// [`reconcile_device`](Self::reconcile_device) with cooperative
    /// cancellation.
    ///
    /// Cancellation stops before the next pending item; the in-flight RPC
    /// completes or times out. Applied changes are never rolled back — the
    /// next pass recomputes the diff and finishes the job.
    #[instrument(skip(self, cancel), fields(device_id = %device_id))]
    pub async fn reconcile_device_cancellable(
        &self,
        device_id: DeviceId,
        cancel: &CancellationToken,
    ) -> EngineResult<DeviceSyncReport> {
        let start = Instant::now();
        let mut report = DeviceSyncReport::new(device_id);

        let desired = self.desired_for_device(device_id).await?;
        let actual = self
            .with_timeout(self.devices.list_users(device_id))
            .await?;
        let plan = compute_plan(&desired, &actual);

        if plan.is_converged() {
            debug!("Device already converged");
            report.duration_ms = start.elapsed().as_millis() as u64;
            return Ok(report);
        }

        info!(
            to_enroll = plan.to_enroll.len(),
            to_update = plan.to_update.len(),
            to_remove = plan.to_remove.len(),
            "Applying reconciliation plan"
        );

        for assignment in &plan.to_enroll {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match self.apply_enroll(device_id, assignment).await? {
                Ok(()) => report.users_added += 1,
                Err(e) => {
                    warn!(user_id = %assignment.employee_id, error = %e, "Enroll failed");
                    report.record_error(&assignment.employee_id, &e);
                }
            }
        }

        for assignment in &plan.to_update {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match self.apply_update(device_id, assignment).await? {
                Ok(UpdateApplied::Updated) => report.users_updated += 1,
                Ok(UpdateApplied::Reenrolled) => report.users_added += 1,
                Err(e) => {
                    warn!(user_id = %assignment.employee_id, error = %e, "Card update failed");
                    report.record_error(&assignment.employee_id, &e);
                }
            }
        }

        for user_id in &plan.to_remove {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match self.apply_remove(device_id, user_id).await? {
                Ok(()) => report.users_removed += 1,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Removal failed");
                    report.record_error(user_id, &e);
                }
            }
        }

        if report.cancelled {
            warn!(
                applied = report.actions_applied(),
                remaining = plan.action_count() as u32 - report.actions_applied()
                    - report.errors.len() as u32,
                "Reconciliation pass cancelled; remaining items left for the next pass"
            );
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            added = report.users_added,
            updated = report.users_updated,
            removed = report.users_removed,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "Device reconciliation pass complete"
        );

        Ok(report)
    }

    /// Active assignments in scope for this device under the configured
    /// policy.
    async fn desired_for_device(
        &self,
        device_id: DeviceId,
    ) -> EngineResult<Vec<CardAssignment>> {
        let active = self.repo.find_active_assignments().await?;

        match self.config.scope {
            ScopePolicy::AllActive => Ok(active),
            ScopePolicy::EnrolledOnly => {
                let enrolled: HashSet<AssignmentId> = self
                    .repo
                    .enrollments_for_device(device_id)
                    .await?
                    .into_iter()
                    .filter(|row| row.status.is_present())
                    .map(|row| row.assignment_id)
                    .collect();
                Ok(active
                    .into_iter()
                    .filter(|a| enrolled.contains(&a.id))
                    .collect())
            }
        }
    }

    /// Create a user on the device and set its card.
    ///
    /// The ledger row goes `Pending` before the card write and `Active`
    /// after, so an interrupted pass is visible as drift.
    async fn apply_enroll(
        &self,
        device_id: DeviceId,
        assignment: &CardAssignment,
    ) -> EngineResult<Result<(), DeviceError>> {
        self.repo
            .upsert_enrollment(
                device_id,
                assignment.id,
                &assignment.employee_id,
                EnrollmentStatus::Pending,
            )
            .await?;

        let request =
            EnrollRequest::new(&assignment.employee_id, assignment.employee_name.clone());
        if let Err(e) = self
            .with_timeout(
                self.devices
                    .enroll_users(device_id, std::slice::from_ref(&request)),
            )
            .await
        {
            return Ok(Err(e));
        }

        let write = CardWrite::new(&assignment.employee_id, &assignment.card_data);
        if let Err(e) = self
            .with_timeout(
                self.devices
                    .set_user_cards(device_id, std::slice::from_ref(&write)),
            )
            .await
        {
            return Ok(Err(e));
        }

        self.repo
            .upsert_enrollment(
                device_id,
                assignment.id,
                &assignment.employee_id,
                EnrollmentStatus::Active,
            )
            .await?;

        Ok(Ok(()))
    }

    /// Rewrite a user's card. A device `NotFound` means the user vanished
    /// between listing and write; retried as a fresh enrollment exactly
    /// once.
    async fn apply_update(
        &self,
        device_id: DeviceId,
        assignment: &CardAssignment,
    ) -> EngineResult<Result<UpdateApplied, DeviceError>> {
        let write = CardWrite::new(&assignment.employee_id, &assignment.card_data);
        match self
            .with_timeout(
                self.devices
                    .set_user_cards(device_id, std::slice::from_ref(&write)),
            )
            .await
        {
            Ok(()) => {
                self.repo
                    .upsert_enrollment(
                        device_id,
                        assignment.id,
                        &assignment.employee_id,
                        EnrollmentStatus::Active,
                    )
                    .await?;
                Ok(Ok(UpdateApplied::Updated))
            }
            Err(e) if e.is_not_found() => {
                debug!(
                    user_id = %assignment.employee_id,
                    "User missing during card update, retrying as enrollment"
                );
                match self.apply_enroll(device_id, assignment).await? {
                    Ok(()) => Ok(Ok(UpdateApplied::Reenrolled)),
                    Err(e) => Ok(Err(e)),
                }
            }
            Err(e) => Ok(Err(e)),
        }
    }

    /// Delete a user from the device and mark its ledger row removed.
    async fn apply_remove(
        &self,
        device_id: DeviceId,
        user_id: &str,
    ) -> EngineResult<Result<(), DeviceError>> {
        let ids = [user_id.to_string()];
        if let Err(e) = self
            .with_timeout(self.devices.delete_users(device_id, &ids))
            .await
        {
            return Ok(Err(e));
        }

        let had_row = self
            .repo
            .mark_enrollment_removed(device_id, user_id)
            .await?;
        if !had_row {
            // The device held a user the store never enrolled; nothing to
            // transition, but the deletion itself still counts.
            debug!(user_id = %user_id, "Removed device user with no ledger row");
        }

        Ok(Ok(()))
    }

    async fn with_timeout<T>(
        &self,
        fut: impl Future<Output = DeviceResult<T>>,
    ) -> DeviceResult<T> {
        let timeout = Duration::from_secs(self.config.rpc_timeout_secs);
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DeviceError::Timeout {
                timeout_secs: self.config.rpc_timeout_secs,
            }),
        }
    }
}
