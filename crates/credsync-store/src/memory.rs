//! In-memory reference implementation of the repository contract.
//!
//! Used by tests and embedded deployments. Enforces the same invariants the
//! production schema enforces with unique indexes: one active assignment
//! per card value, one non-removed enrollment per (device, assignment) and
//! per (device, device user).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use credsync_connector::DeviceId;

use crate::error::{StoreError, StoreResult};
use crate::ids::AssignmentId;
use crate::model::{AssignmentStatus, CardAssignment, DeviceEnrollment, EnrollmentStatus};
use crate::repository::AssignmentRepository;

#[derive(Default)]
struct Inner {
    assignments: HashMap<AssignmentId, CardAssignment>,
    enrollments: HashMap<(DeviceId, AssignmentId), DeviceEnrollment>,
}

/// Thread-safe in-memory assignment store.
#[derive(Default)]
pub struct MemoryAssignmentStore {
    inner: RwLock<Inner>,
}

impl MemoryAssignmentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of assignment records (all statuses).
    pub async fn assignment_count(&self) -> usize {
        self.inner.read().await.assignments.len()
    }
}

#[async_trait]
impl AssignmentRepository for MemoryAssignmentStore {
    async fn find_active_assignments(&self) -> StoreResult<Vec<CardAssignment>> {
        let inner = self.inner.read().await;
        let mut active: Vec<CardAssignment> = inner
            .assignments
            .values()
            .filter(|a| a.is_active())
            .cloned()
            .collect();
        // Stable order keeps reconciliation passes deterministic.
        active.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
        Ok(active)
    }

    async fn find_assignment(&self, id: AssignmentId) -> StoreResult<Option<CardAssignment>> {
        Ok(self.inner.read().await.assignments.get(&id).cloned())
    }

    async fn create_assignment(&self, assignment: CardAssignment) -> StoreResult<CardAssignment> {
        let mut inner = self.inner.write().await;

        if assignment.is_active() {
            if let Some(existing) = inner
                .assignments
                .values()
                .find(|a| a.is_active() && a.card_data == assignment.card_data)
            {
                return Err(StoreError::duplicate_active_card(
                    &assignment.card_data,
                    &existing.employee_id,
                ));
            }
        }

        inner.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn revoke_assignment(
        &self,
        id: AssignmentId,
        reason: &str,
    ) -> StoreResult<CardAssignment> {
        let mut inner = self.inner.write().await;
        let assignment = inner
            .assignments
            .get_mut(&id)
            .ok_or(StoreError::AssignmentNotFound { id })?;

        if !assignment.is_active() {
            return Err(StoreError::invalid_status_transition(
                assignment.status.to_string(),
                AssignmentStatus::Revoked.to_string(),
            ));
        }

        assignment.status = AssignmentStatus::Revoked;
        assignment.revoked_at = Some(Utc::now());
        assignment.notes = match assignment.notes.take() {
            Some(notes) => Some(format!("{notes}; revoked: {reason}")),
            None => Some(format!("revoked: {reason}")),
        };

        Ok(assignment.clone())
    }

    async fn upsert_enrollment(
        &self,
        device_id: DeviceId,
        assignment_id: AssignmentId,
        device_user_id: &str,
        status: EnrollmentStatus,
    ) -> StoreResult<DeviceEnrollment> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        // Supersede any other live row on this device holding the same
        // device user, so (device_id, device_user_id) stays unique.
        for ((dev, assign), row) in inner.enrollments.iter_mut() {
            if *dev == device_id
                && *assign != assignment_id
                && row.device_user_id == device_user_id
                && row.status.is_present()
            {
                debug!(
                    device_id = %device_id,
                    device_user_id = device_user_id,
                    superseded_assignment = %assign,
                    "Superseding enrollment for reassigned device user"
                );
                row.status = EnrollmentStatus::Removed;
                row.last_sync_at = now;
            }
        }

        let row = inner
            .enrollments
            .entry((device_id, assignment_id))
            .and_modify(|row| {
                row.device_user_id = device_user_id.to_string();
                row.status = status;
                row.last_sync_at = now;
            })
            .or_insert_with(|| DeviceEnrollment {
                device_id,
                assignment_id,
                device_user_id: device_user_id.to_string(),
                status,
                enrolled_at: now,
                last_sync_at: now,
            });

        Ok(row.clone())
    }

    async fn mark_enrollment_removed(
        &self,
        device_id: DeviceId,
        device_user_id: &str,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut transitioned = false;

        for ((dev, _), row) in inner.enrollments.iter_mut() {
            if *dev == device_id
                && row.device_user_id == device_user_id
                && row.status.is_present()
            {
                row.status = EnrollmentStatus::Removed;
                row.last_sync_at = now;
                transitioned = true;
            }
        }

        Ok(transitioned)
    }

    async fn enrollments_for_device(
        &self,
        device_id: DeviceId,
    ) -> StoreResult<Vec<DeviceEnrollment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .enrollments
            .values()
            .filter(|row| row.device_id == device_id)
            .cloned()
            .collect())
    }

    async fn enrollments_for_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> StoreResult<Vec<DeviceEnrollment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .enrollments
            .values()
            .filter(|row| row.assignment_id == assignment_id)
            .cloned()
            .collect())
    }
}
