//! Port for meeting persistence with status-conditional updates.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Meeting, MeetingStatus, RescheduleRequest};

/// Errors raised by meeting repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeetingRepositoryError {
    /// Repository connection could not be established.
    #[error("meeting repository connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("meeting repository query failed: {message}")]
    Query { message: String },
}

impl MeetingRepositoryError {
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

/// Result of a conditional meeting update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingUpdateOutcome {
    /// The row matched the expected state and was updated.
    Updated,
    /// The row exists but no longer matches the expected state: another
    /// actor's write landed first.
    Stale,
    /// No row with this id exists.
    NotFound,
}

/// Port for meeting storage.
///
/// Meetings are never deleted; terminal lifecycle states are statuses.
/// `update_if_current` is the conditional-write primitive every transition
/// goes through: the write only lands when the stored status (and, for
/// reschedule resolutions, the stored negotiation log) still matches what
/// the transition was computed from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeetingRepository: Send + Sync {
    /// Persist a newly requested meeting.
    async fn insert(&self, meeting: &Meeting) -> Result<(), MeetingRepositoryError>;

    /// Find a meeting by id.
    async fn find_by_id(
        &self,
        meeting_id: &Uuid,
    ) -> Result<Option<Meeting>, MeetingRepositoryError>;

    /// Write `next` only if the stored row still carries `expected_status`
    /// and `expected_requests`.
    async fn update_if_current(
        &self,
        next: &Meeting,
        expected_status: MeetingStatus,
        expected_requests: &[RescheduleRequest],
    ) -> Result<MeetingUpdateOutcome, MeetingRepositoryError>;
}

/// Fixture implementation for tests that do not exercise meeting storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureMeetingRepository;

#[async_trait]
impl MeetingRepository for FixtureMeetingRepository {
    async fn insert(&self, _meeting: &Meeting) -> Result<(), MeetingRepositoryError> {
        Ok(())
    }

    async fn find_by_id(
        &self,
        _meeting_id: &Uuid,
    ) -> Result<Option<Meeting>, MeetingRepositoryError> {
        Ok(None)
    }

    async fn update_if_current(
        &self,
        _next: &Meeting,
        _expected_status: MeetingStatus,
        _expected_requests: &[RescheduleRequest],
    ) -> Result<MeetingUpdateOutcome, MeetingRepositoryError> {
        Ok(MeetingUpdateOutcome::NotFound)
    }
}
