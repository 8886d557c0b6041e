//! Port for enrollment persistence.
//!
//! The `(student, mentor)` uniqueness invariant lives in the store as a
//! unique index. `insert` surfaces a lost insert race as `DuplicatePair`,
//! which the service converts into an idempotent re-read rather than an
//! error shown to a user.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Enrollment, Feedback, UserId};

/// Errors raised by enrollment repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrollmentRepositoryError {
    /// Repository connection could not be established.
    #[error("enrollment repository connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("enrollment repository query failed: {message}")]
    Query { message: String },
    /// An enrollment for this pair already exists (unique index hit).
    #[error("enrollment already exists for this student and mentor")]
    DuplicatePair,
}

impl EnrollmentRepositoryError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Port for enrollment storage, thread binding, and the repair sweep.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert a new enrollment row. Fails with
    /// [`EnrollmentRepositoryError::DuplicatePair`] when the unique index on
    /// the pair rejects it.
    async fn insert(&self, enrollment: &Enrollment) -> Result<(), EnrollmentRepositoryError>;

    /// Find the enrollment for a pair, if any.
    async fn find_by_pair(
        &self,
        student_id: UserId,
        mentor_id: UserId,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError>;

    /// Find an enrollment by id.
    async fn find_by_id(
        &self,
        enrollment_id: &Uuid,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError>;

    /// Bind the two chat threads created for this enrollment.
    async fn bind_threads(
        &self,
        enrollment_id: &Uuid,
        student_thread_id: Uuid,
        mentor_thread_id: Uuid,
    ) -> Result<(), EnrollmentRepositoryError>;

    /// Remove an enrollment row. Only the binder's rollback path and the
    /// repair sweep call this; enrollments are otherwise never deleted.
    async fn delete(&self, enrollment_id: &Uuid) -> Result<(), EnrollmentRepositoryError>;

    /// Whether an active enrollment binds the pair.
    async fn has_active_pair(
        &self,
        student_id: UserId,
        mentor_id: UserId,
    ) -> Result<bool, EnrollmentRepositoryError>;

    /// Mentors the student is actively enrolled with.
    async fn list_mentors_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<UserId>, EnrollmentRepositoryError>;

    /// Students actively enrolled with the mentor.
    async fn list_students_for_mentor(
        &self,
        mentor_id: UserId,
    ) -> Result<Vec<UserId>, EnrollmentRepositoryError>;

    /// Append one feedback entry.
    async fn append_feedback(&self, feedback: &Feedback) -> Result<(), EnrollmentRepositoryError>;

    /// Groups of enrollments sharing a pair, oldest first within each group.
    /// Only pairs with more than one row are returned. Exists for the repair
    /// sweep over data predating the unique index.
    async fn list_duplicate_pairs(
        &self,
    ) -> Result<Vec<Vec<Enrollment>>, EnrollmentRepositoryError>;
}

/// Fixture implementation for tests that do not exercise enrollment storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureEnrollmentRepository;

#[async_trait]
impl EnrollmentRepository for FixtureEnrollmentRepository {
    async fn insert(&self, _enrollment: &Enrollment) -> Result<(), EnrollmentRepositoryError> {
        Ok(())
    }

    async fn find_by_pair(
        &self,
        _student_id: UserId,
        _mentor_id: UserId,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError> {
        Ok(None)
    }

    async fn find_by_id(
        &self,
        _enrollment_id: &Uuid,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError> {
        Ok(None)
    }

    async fn bind_threads(
        &self,
        _enrollment_id: &Uuid,
        _student_thread_id: Uuid,
        _mentor_thread_id: Uuid,
    ) -> Result<(), EnrollmentRepositoryError> {
        Ok(())
    }

    async fn delete(&self, _enrollment_id: &Uuid) -> Result<(), EnrollmentRepositoryError> {
        Ok(())
    }

    async fn has_active_pair(
        &self,
        _student_id: UserId,
        _mentor_id: UserId,
    ) -> Result<bool, EnrollmentRepositoryError> {
        Ok(false)
    }

    async fn list_mentors_for_student(
        &self,
        _student_id: UserId,
    ) -> Result<Vec<UserId>, EnrollmentRepositoryError> {
        Ok(Vec::new())
    }

    async fn list_students_for_mentor(
        &self,
        _mentor_id: UserId,
    ) -> Result<Vec<UserId>, EnrollmentRepositoryError> {
        Ok(Vec::new())
    }

    async fn append_feedback(
        &self,
        _feedback: &Feedback,
    ) -> Result<(), EnrollmentRepositoryError> {
        Ok(())
    }

    async fn list_duplicate_pairs(
        &self,
    ) -> Result<Vec<Vec<Enrollment>>, EnrollmentRepositoryError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_pair_lookup_returns_none() {
        let repo = FixtureEnrollmentRepository;
        let found = repo
            .find_by_pair(UserId::random(), UserId::random())
            .await
            .expect("fixture lookup succeeds");
        assert!(found.is_none());
    }

    #[test]
    fn duplicate_pair_has_stable_message() {
        let err = EnrollmentRepositoryError::DuplicatePair;
        assert!(err.to_string().contains("already exists"));
    }
}
