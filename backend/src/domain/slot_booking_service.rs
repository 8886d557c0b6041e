//! Slot booking engine: atomic claims under contention.
//!
//! The service never decides a race itself. It validates what it can read,
//! then hands the claim to the repository's conditional write; whichever
//! caller's update lands first wins, and every other caller comes back with
//! `AlreadyBooked`.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::{
    EnrollmentRepository, EnrollmentRepositoryError, SlotBatchRepository,
    SlotBatchRepositoryError, SlotClaimOutcome,
};
use crate::domain::{
    DomainError, Notification, NotificationDebouncer, NotificationKind, Slot, SlotBatch, UserId,
};

fn map_batch_repo_error(error: SlotBatchRepositoryError) -> DomainError {
    match error {
        SlotBatchRepositoryError::Connection { message } => DomainError::service_unavailable(
            format!("slot batch repository unavailable: {message}"),
        ),
        SlotBatchRepositoryError::Query { message } => {
            DomainError::internal(format!("slot batch repository error: {message}"))
        }
    }
}

fn map_enrollment_repo_error(error: EnrollmentRepositoryError) -> DomainError {
    match error {
        EnrollmentRepositoryError::Connection { message } => DomainError::service_unavailable(
            format!("enrollment repository unavailable: {message}"),
        ),
        other => DomainError::internal(format!("enrollment repository error: {other}")),
    }
}

fn slot_index_error(batch: &SlotBatch, slot_index: i32) -> DomainError {
    DomainError::invalid_request(format!(
        "slot index {slot_index} is out of range for batch {}",
        batch.id
    ))
    .with_details(json!({ "slotCount": batch.slots.len() }))
}

/// Service owning the contended slot claim and the claim-then-release
/// reschedule.
#[derive(Clone)]
pub struct SlotBookingService<R, E> {
    batch_repo: Arc<R>,
    enrollment_repo: Arc<E>,
    debouncer: NotificationDebouncer,
    clock: Arc<dyn Clock>,
}

impl<R, E> SlotBookingService<R, E> {
    /// Create the service with its repositories, debouncer, and clock.
    pub fn new(
        batch_repo: Arc<R>,
        enrollment_repo: Arc<E>,
        debouncer: NotificationDebouncer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            batch_repo,
            enrollment_repo,
            debouncer,
            clock,
        }
    }
}

impl<R, E> SlotBookingService<R, E>
where
    R: SlotBatchRepository,
    E: EnrollmentRepository,
{
    async fn load_open_batch(&self, batch_id: &Uuid) -> Result<SlotBatch, DomainError> {
        let batch = self
            .batch_repo
            .find_by_id(batch_id)
            .await
            .map_err(map_batch_repo_error)?
            .ok_or_else(|| DomainError::not_found(format!("slot batch {batch_id} not found")))?;

        if !batch.is_open(self.clock.utc()) {
            return Err(DomainError::expired_or_cancelled(format!(
                "slot batch {batch_id} is expired or archived"
            )));
        }
        Ok(batch)
    }

    async fn claim(
        &self,
        batch: &SlotBatch,
        slot_index: i32,
        student_id: UserId,
    ) -> Result<Slot, DomainError> {
        let index = usize::try_from(slot_index)
            .map_err(|_| slot_index_error(batch, slot_index))?;
        if index >= batch.slots.len() {
            return Err(slot_index_error(batch, slot_index));
        }

        let outcome = self
            .batch_repo
            .claim_slot(&batch.id, slot_index, student_id, self.clock.utc())
            .await
            .map_err(map_batch_repo_error)?;

        match outcome {
            SlotClaimOutcome::Claimed(slot) => Ok(slot),
            SlotClaimOutcome::AlreadyBooked => Err(DomainError::already_booked(format!(
                "slot {slot_index} in batch {} is already booked",
                batch.id
            ))),
            // The index was in range on our read, so the row disappearing
            // under us is a store-level anomaly, not a client mistake.
            SlotClaimOutcome::NoSuchSlot => Err(DomainError::internal(format!(
                "slot {slot_index} vanished from batch {}",
                batch.id
            ))),
        }
    }

    async fn notify_owner(&self, batch: &SlotBatch, kind: NotificationKind, body: String) {
        self.debouncer
            .trigger(
                Notification {
                    recipient: batch.owner_id,
                    scope: batch.id.to_string(),
                    kind,
                    subject: "Booking update".to_owned(),
                    body,
                },
                false,
            )
            .await;
    }

    /// Claim one slot for a student.
    ///
    /// Exactly one of any number of concurrent calls for the same
    /// `(batch, index)` succeeds; the rest receive `AlreadyBooked` and
    /// should refresh the batch rather than retry the same index.
    pub async fn book(
        &self,
        batch_id: &Uuid,
        slot_index: i32,
        student_id: UserId,
    ) -> Result<Slot, DomainError> {
        let batch = self.load_open_batch(batch_id).await?;

        let enrolled = self
            .enrollment_repo
            .has_active_pair(student_id, batch.owner_id)
            .await
            .map_err(map_enrollment_repo_error)?;
        if !enrolled {
            return Err(DomainError::not_enrolled(format!(
                "student {student_id} has no active enrollment with mentor {}",
                batch.owner_id
            )));
        }

        let slot = self.claim(&batch, slot_index, student_id).await?;
        self.notify_owner(
            &batch,
            NotificationKind::SlotBooked,
            format!("A student booked slot {slot_index} of \"{}\"", batch.title),
        )
        .await;
        Ok(slot)
    }

    /// Move a student's booking to a different slot in the same batch.
    ///
    /// The new slot is claimed first; only after that claim commits is the
    /// old slot freed. A failed claim leaves the old booking untouched and
    /// propagates exactly the error the claim produced, so the student never
    /// passes through a state where they hold no slot at all.
    pub async fn reschedule(
        &self,
        batch_id: &Uuid,
        old_index: i32,
        new_index: i32,
        student_id: UserId,
    ) -> Result<Slot, DomainError> {
        if old_index == new_index {
            return Err(DomainError::invalid_request(
                "reschedule requires a different target slot",
            ));
        }

        let batch = self.load_open_batch(batch_id).await?;

        let old_slot = usize::try_from(old_index)
            .ok()
            .and_then(|index| batch.slots.get(index))
            .ok_or_else(|| slot_index_error(&batch, old_index))?;
        if old_slot.booked_by != Some(student_id) {
            return Err(DomainError::forbidden(format!(
                "slot {old_index} in batch {batch_id} is not booked by student {student_id}"
            )));
        }

        let slot = self.claim(&batch, new_index, student_id).await?;

        let released = self
            .batch_repo
            .release_slot(batch_id, old_index, student_id)
            .await
            .map_err(map_batch_repo_error)?;
        if !released {
            // Both slots stay claimed rather than risking a zero-slot hold;
            // the stale booking surfaces in the owner's batch view.
            warn!(
                %batch_id,
                old_index,
                %student_id,
                "old slot was not released after reschedule claim"
            );
        }

        self.notify_owner(
            &batch,
            NotificationKind::SlotRebooked,
            format!(
                "A student moved their booking from slot {old_index} to slot {new_index} of \"{}\"",
                batch.title
            ),
        )
        .await;
        Ok(slot)
    }
}

#[cfg(test)]
#[path = "slot_booking_service_tests.rs"]
mod tests;
