//! Slot batch domain service: publication, reads, and archiving.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::{
    EnrollmentRepository, EnrollmentRepositoryError, SlotBatchRepository,
    SlotBatchRepositoryError,
};
use crate::domain::{
    DomainError, Notification, NotificationDebouncer, NotificationKind, SlotBatch, SlotBatchDraft,
    SlotBatchStatus, SlotSpec, UserId,
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

/// Publication command for a new batch.
#[derive(Debug, Clone)]
pub struct PublishSlotBatch {
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub timezone: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub slots: Vec<SlotSpec>,
}

/// Service owning slot batch publication and reads.
#[derive(Clone)]
pub struct SlotBatchService<R, E> {
    batch_repo: Arc<R>,
    enrollment_repo: Arc<E>,
    debouncer: NotificationDebouncer,
    clock: Arc<dyn Clock>,
}

impl<R, E> SlotBatchService<R, E> {
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

impl<R, E> SlotBatchService<R, E>
where
    R: SlotBatchRepository,
    E: EnrollmentRepository,
{
    /// Publish a batch of candidate slots and notify enrolled students.
    ///
    /// Validation failures surface as `InvalidRequest`. The fan-out is
    /// debounced per student and never fails the publication.
    pub async fn publish(&self, command: PublishSlotBatch) -> Result<SlotBatch, DomainError> {
        let batch = SlotBatch::new(SlotBatchDraft {
            id: Uuid::new_v4(),
            owner_id: command.owner_id,
            title: command.title,
            description: command.description,
            timezone: command.timezone,
            expires_at: command.expires_at,
            created_at: self.clock.utc(),
            slots: command.slots,
        })
        .map_err(|err| DomainError::invalid_request(err.to_string()))?;

        self.batch_repo
            .insert(&batch)
            .await
            .map_err(map_batch_repo_error)?;

        // The batch is already persisted; a broken fan-out read costs the
        // students a heads-up, never the mentor their publication.
        let students = match self
            .enrollment_repo
            .list_students_for_mentor(batch.owner_id)
            .await
        {
            Ok(students) => students,
            Err(err) => {
                warn!(batch_id = %batch.id, error = %err, "publish fan-out skipped");
                Vec::new()
            }
        };
        for student in students {
            self.debouncer
                .trigger(
                    Notification {
                        recipient: student,
                        scope: batch.id.to_string(),
                        kind: NotificationKind::SlotsPublished,
                        subject: "New availability published".to_owned(),
                        body: format!("Your mentor published \"{}\"", batch.title),
                    },
                    false,
                )
                .await;
        }

        Ok(batch)
    }

    /// Fetch a batch by id.
    pub async fn get(&self, batch_id: &Uuid) -> Result<SlotBatch, DomainError> {
        self.batch_repo
            .find_by_id(batch_id)
            .await
            .map_err(map_batch_repo_error)?
            .ok_or_else(|| DomainError::not_found(format!("slot batch {batch_id} not found")))
    }

    /// Active batches owned by a mentor.
    pub async fn list_active_for_owner(
        &self,
        owner_id: UserId,
    ) -> Result<Vec<SlotBatch>, DomainError> {
        self.batch_repo
            .list_active_for_owner(owner_id)
            .await
            .map_err(map_batch_repo_error)
    }

    /// Batches the student can book into: owned by actively enrolled
    /// mentors, open, and with at least one unbooked future slot.
    pub async fn list_bookable_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<SlotBatch>, DomainError> {
        let mentors = self
            .enrollment_repo
            .list_mentors_for_student(student_id)
            .await
            .map_err(map_enrollment_repo_error)?;
        if mentors.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.clock.utc();
        let batches = self
            .batch_repo
            .list_active_for_owners(&mentors)
            .await
            .map_err(map_batch_repo_error)?;

        Ok(batches
            .into_iter()
            .filter(|batch| batch.is_open(now) && batch.has_bookable_slot(now))
            .collect())
    }

    /// Archive a batch as `Completed` or `Cancelled`. Owner-only and
    /// idempotent when the batch already carries the requested status.
    pub async fn archive(
        &self,
        batch_id: &Uuid,
        owner_id: UserId,
        status: SlotBatchStatus,
    ) -> Result<SlotBatch, DomainError> {
        if !status.is_terminal() {
            return Err(DomainError::invalid_request(
                "batches can only be archived as completed or cancelled",
            ));
        }

        let mut batch = self.get(batch_id).await?;
        if batch.owner_id != owner_id {
            return Err(DomainError::forbidden(
                "only the batch owner may archive it",
            ));
        }
        if batch.status == status {
            return Ok(batch);
        }
        if batch.status.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "batch is already archived as {:?}",
                batch.status
            )));
        }

        self.batch_repo
            .set_status(batch_id, status)
            .await
            .map_err(map_batch_repo_error)?;
        batch.status = status;
        Ok(batch)
    }
}

#[cfg(test)]
#[path = "slot_batch_service_tests.rs"]
mod tests;
