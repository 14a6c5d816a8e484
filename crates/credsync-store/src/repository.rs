//! Repository contract for the assignment store.
//!
//! The reconciliation engine receives this trait as an injected dependency;
//! it never reaches for a process-wide database handle. The production
//! implementation lives with the database layer; [`crate::MemoryAssignmentStore`]
//! is the in-memory reference implementation.

use async_trait::async_trait;

use credsync_connector::DeviceId;

use crate::error::StoreResult;
use crate::ids::AssignmentId;
use crate::model::{CardAssignment, DeviceEnrollment, EnrollmentStatus};

/// Queries and mutations over card assignments and device enrollments.
///
/// Enrollment writes are per-row upserts keyed on
/// (`device_id`, `assignment_id`); concurrent reconciliation workers may
/// call them without coordination.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// All assignments with `Active` status — the desired fleet state.
    async fn find_active_assignments(&self) -> StoreResult<Vec<CardAssignment>>;

    /// Look up one assignment.
    async fn find_assignment(&self, id: AssignmentId) -> StoreResult<Option<CardAssignment>>;

    /// Create an assignment, rejecting a duplicate active card value with
    /// [`StoreError::DuplicateActiveCard`](crate::StoreError::DuplicateActiveCard).
    async fn create_assignment(&self, assignment: CardAssignment) -> StoreResult<CardAssignment>;

    /// Revoke an active assignment, stamping `revoked_at` and recording the
    /// reason in the notes.
    async fn revoke_assignment(
        &self,
        id: AssignmentId,
        reason: &str,
    ) -> StoreResult<CardAssignment>;

    /// Create or update the enrollment row for (`device_id`, `assignment_id`).
    ///
    /// Any other non-removed row on the same device holding the same
    /// `device_user_id` is superseded (marked `Removed`) so the
    /// (`device_id`, `device_user_id`) uniqueness holds.
    async fn upsert_enrollment(
        &self,
        device_id: DeviceId,
        assignment_id: AssignmentId,
        device_user_id: &str,
        status: EnrollmentStatus,
    ) -> StoreResult<DeviceEnrollment>;

    /// Mark the enrollment for a device user as removed.
    ///
    /// Returns `true` if a row was transitioned; `false` if the device held
    /// a user the store never knew about.
    async fn mark_enrollment_removed(
        &self,
        device_id: DeviceId,
        device_user_id: &str,
    ) -> StoreResult<bool>;

    /// Every enrollment row for a device, including removed history.
    async fn enrollments_for_device(
        &self,
        device_id: DeviceId,
    ) -> StoreResult<Vec<DeviceEnrollment>>;

    /// Every enrollment row for an assignment across the fleet.
    async fn enrollments_for_assignment(
        &self,
        assignment_id: AssignmentId,
    ) -> StoreResult<Vec<DeviceEnrollment>>;
}
