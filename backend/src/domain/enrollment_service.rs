//! Enrollment binder: idempotent pair creation, thread binding, feedback,
//! and the duplicate repair sweep.

use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::ports::{
    ChatThread, ChatThreadRepository, ChatThreadRepositoryError, EnrollmentRepository,
    EnrollmentRepositoryError,
};
use crate::domain::{DomainError, Enrollment, Feedback, FeedbackRating, RepairReport, UserId};

fn map_enrollment_repo_error(error: EnrollmentRepositoryError) -> DomainError {
    match error {
        EnrollmentRepositoryError::Connection { message } => DomainError::service_unavailable(
            format!("enrollment repository unavailable: {message}"),
        ),
        other => DomainError::internal(format!("enrollment repository error: {other}")),
    }
}

fn map_thread_repo_error(error: ChatThreadRepositoryError) -> DomainError {
    match error {
        ChatThreadRepositoryError::Connection { message } => DomainError::service_unavailable(
            format!("chat thread repository unavailable: {message}"),
        ),
        ChatThreadRepositoryError::Query { message } => {
            DomainError::internal(format!("chat thread repository error: {message}"))
        }
    }
}

/// Service owning the student–mentor relationship and its chat threads.
#[derive(Clone)]
pub struct EnrollmentService<R, T> {
    enrollment_repo: Arc<R>,
    thread_repo: Arc<T>,
    clock: Arc<dyn Clock>,
}

impl<R, T> EnrollmentService<R, T> {
    /// Create the service with its repositories and clock.
    pub fn new(enrollment_repo: Arc<R>, thread_repo: Arc<T>, clock: Arc<dyn Clock>) -> Self {
        Self {
            enrollment_repo,
            thread_repo,
            clock,
        }
    }
}

impl<R, T> EnrollmentService<R, T>
where
    R: EnrollmentRepository,
    T: ChatThreadRepository,
{
    /// Enroll a student with a mentor, idempotently.
    ///
    /// The first caller for a pair creates the enrollment and its two chat
    /// threads as one unit. Every later caller, including one that lost a
    /// concurrent insert race against the unique index, receives the
    /// surviving enrollment as a plain success. An enrollment left without
    /// threads by an earlier partial failure is healed here.
    pub async fn enroll(
        &self,
        student_id: UserId,
        mentor_id: UserId,
    ) -> Result<Enrollment, DomainError> {
        if student_id == mentor_id {
            return Err(DomainError::invalid_request(
                "a user cannot enroll with themselves",
            ));
        }

        if let Some(existing) = self
            .enrollment_repo
            .find_by_pair(student_id, mentor_id)
            .await
            .map_err(map_enrollment_repo_error)?
        {
            return self.ensure_threads(existing).await;
        }

        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            student_id,
            mentor_id,
            student_thread_id: None,
            mentor_thread_id: None,
            is_active: true,
            created_at: self.clock.utc(),
        };

        match self.enrollment_repo.insert(&enrollment).await {
            Ok(()) => {}
            Err(EnrollmentRepositoryError::DuplicatePair) => {
                // Lost the insert race: the unique index is the arbiter, and
                // the loser converts the violation into the winner's row.
                let existing = self
                    .enrollment_repo
                    .find_by_pair(student_id, mentor_id)
                    .await
                    .map_err(map_enrollment_repo_error)?
                    .ok_or_else(|| {
                        DomainError::internal(
                            "enrollment disappeared during race resolution",
                        )
                    })?;
                return self.ensure_threads(existing).await;
            }
            Err(other) => return Err(map_enrollment_repo_error(other)),
        }

        match self.ensure_threads(enrollment.clone()).await {
            Ok(bound) => Ok(bound),
            Err(err) => {
                // Thread creation failed after the row landed. Roll the row
                // back so no half-bound enrollment survives this call; the
                // repair sweep catches anything the rollback itself misses.
                if let Err(cleanup_err) = self.enrollment_repo.delete(&enrollment.id).await {
                    warn!(
                        enrollment_id = %enrollment.id,
                        error = %cleanup_err,
                        "failed to roll back enrollment after thread creation failure"
                    );
                }
                Err(err)
            }
        }
    }

    /// Bind chat threads when the enrollment does not have them yet.
    async fn ensure_threads(&self, enrollment: Enrollment) -> Result<Enrollment, DomainError> {
        if enrollment.threads_bound() {
            return Ok(enrollment);
        }

        let now = self.clock.utc();
        let student_thread = ChatThread {
            id: Uuid::new_v4(),
            enrollment_id: enrollment.id,
            owner_id: enrollment.student_id,
            created_at: now,
        };
        let mentor_thread = ChatThread {
            id: Uuid::new_v4(),
            enrollment_id: enrollment.id,
            owner_id: enrollment.mentor_id,
            created_at: now,
        };

        self.thread_repo
            .create(&student_thread)
            .await
            .map_err(map_thread_repo_error)?;
        self.thread_repo
            .create(&mentor_thread)
            .await
            .map_err(map_thread_repo_error)?;
        self.enrollment_repo
            .bind_threads(&enrollment.id, student_thread.id, mentor_thread.id)
            .await
            .map_err(map_enrollment_repo_error)?;

        Ok(Enrollment {
            student_thread_id: Some(student_thread.id),
            mentor_thread_id: Some(mentor_thread.id),
            ..enrollment
        })
    }

    /// Append a feedback entry to an enrollment.
    pub async fn record_feedback(
        &self,
        enrollment_id: &Uuid,
        author_id: UserId,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Feedback, DomainError> {
        let enrollment = self
            .enrollment_repo
            .find_by_id(enrollment_id)
            .await
            .map_err(map_enrollment_repo_error)?
            .ok_or_else(|| {
                DomainError::not_found(format!("enrollment {enrollment_id} not found"))
            })?;

        if enrollment.student_id != author_id {
            return Err(DomainError::forbidden(
                "only the enrolled student may leave feedback",
            ));
        }

        let rating = FeedbackRating::new(rating)
            .map_err(|err| DomainError::invalid_request(err.to_string()))?;

        let feedback = Feedback {
            id: Uuid::new_v4(),
            enrollment_id: enrollment.id,
            author_id,
            rating,
            comment,
            created_at: self.clock.utc(),
        };
        self.enrollment_repo
            .append_feedback(&feedback)
            .await
            .map_err(map_enrollment_repo_error)?;
        Ok(feedback)
    }

    /// Maintenance sweep over data predating the unique index or left by
    /// partial failures: keep the earliest enrollment per pair, drop the
    /// rest with their threads, and drop threads matching no enrollment.
    ///
    /// Not on the request path; the index already prevents new duplicates.
    pub async fn repair_duplicates(&self) -> Result<RepairReport, DomainError> {
        let mut report = RepairReport::default();

        let groups = self
            .enrollment_repo
            .list_duplicate_pairs()
            .await
            .map_err(map_enrollment_repo_error)?;

        for group in groups {
            // Groups arrive oldest first; the earliest row survives.
            for duplicate in group.into_iter().skip(1) {
                let threads = self
                    .thread_repo
                    .list_for_enrollment(&duplicate.id)
                    .await
                    .map_err(map_thread_repo_error)?;
                for thread_id in threads {
                    self.thread_repo
                        .delete(&thread_id)
                        .await
                        .map_err(map_thread_repo_error)?;
                    report.threads_removed += 1;
                }
                self.enrollment_repo
                    .delete(&duplicate.id)
                    .await
                    .map_err(map_enrollment_repo_error)?;
                report.enrollments_removed += 1;
                info!(
                    enrollment_id = %duplicate.id,
                    student_id = %duplicate.student_id,
                    mentor_id = %duplicate.mentor_id,
                    "removed duplicate enrollment"
                );
            }
        }

        for thread_id in self
            .thread_repo
            .list_orphans()
            .await
            .map_err(map_thread_repo_error)?
        {
            self.thread_repo
                .delete(&thread_id)
                .await
                .map_err(map_thread_repo_error)?;
            report.orphan_threads_removed += 1;
        }

        Ok(report)
    }
}

#[cfg(test)]
#[path = "enrollment_service_tests.rs"]
mod tests;
