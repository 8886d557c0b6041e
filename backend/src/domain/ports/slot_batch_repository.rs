//! Port for slot batch persistence and the atomic slot claim primitive.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Slot, SlotBatch, SlotBatchStatus, UserId};

/// Errors raised by slot batch repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotBatchRepositoryError {
    /// Repository connection could not be established.
    #[error("slot batch repository connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("slot batch repository query failed: {message}")]
    Query { message: String },
}

impl SlotBatchRepositoryError {
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

/// Result of an atomic claim attempt on one slot.
///
/// The distinction is made by the store, not by a prior read: the claim is a
/// single conditional update on `is_booked = false`, and a zero-row result is
/// disambiguated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotClaimOutcome {
    /// This caller won the slot; the updated row is returned.
    Claimed(Slot),
    /// Another booking already holds the slot.
    AlreadyBooked,
    /// The batch has no slot at the given index.
    NoSuchSlot,
}

/// Port for slot batch storage.
///
/// `claim_slot` and `release_slot` are the concurrency-bearing operations:
/// implementations must make them single conditional writes so that, of any
/// number of concurrent claims on one `(batch, index)`, exactly one succeeds.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlotBatchRepository: Send + Sync {
    /// Persist a freshly published batch with its slots.
    async fn insert(&self, batch: &SlotBatch) -> Result<(), SlotBatchRepositoryError>;

    /// Find a batch (with slots, ordered by index) by id.
    async fn find_by_id(
        &self,
        batch_id: &Uuid,
    ) -> Result<Option<SlotBatch>, SlotBatchRepositoryError>;

    /// All `Active` batches owned by the given mentor.
    async fn list_active_for_owner(
        &self,
        owner_id: UserId,
    ) -> Result<Vec<SlotBatch>, SlotBatchRepositoryError>;

    /// All `Active` batches owned by any of the given mentors.
    async fn list_active_for_owners(
        &self,
        owner_ids: &[UserId],
    ) -> Result<Vec<SlotBatch>, SlotBatchRepositoryError>;

    /// Archive a batch. Returns `false` when the batch does not exist.
    async fn set_status(
        &self,
        batch_id: &Uuid,
        status: SlotBatchStatus,
    ) -> Result<bool, SlotBatchRepositoryError>;

    /// Atomically claim an unbooked slot for `student_id`.
    async fn claim_slot(
        &self,
        batch_id: &Uuid,
        slot_index: i32,
        student_id: UserId,
        booked_at: DateTime<Utc>,
    ) -> Result<SlotClaimOutcome, SlotBatchRepositoryError>;

    /// Free a slot currently booked by `student_id`. Returns `false` when the
    /// condition did not hold (slot unbooked, or held by someone else).
    async fn release_slot(
        &self,
        batch_id: &Uuid,
        slot_index: i32,
        student_id: UserId,
    ) -> Result<bool, SlotBatchRepositoryError>;
}

/// Fixture implementation for tests that do not exercise slot persistence.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSlotBatchRepository;

#[async_trait]
impl SlotBatchRepository for FixtureSlotBatchRepository {
    async fn insert(&self, _batch: &SlotBatch) -> Result<(), SlotBatchRepositoryError> {
        Ok(())
    }

    async fn find_by_id(
        &self,
        _batch_id: &Uuid,
    ) -> Result<Option<SlotBatch>, SlotBatchRepositoryError> {
        Ok(None)
    }

    async fn list_active_for_owner(
        &self,
        _owner_id: UserId,
    ) -> Result<Vec<SlotBatch>, SlotBatchRepositoryError> {
        Ok(Vec::new())
    }

    async fn list_active_for_owners(
        &self,
        _owner_ids: &[UserId],
    ) -> Result<Vec<SlotBatch>, SlotBatchRepositoryError> {
        Ok(Vec::new())
    }

    async fn set_status(
        &self,
        _batch_id: &Uuid,
        _status: SlotBatchStatus,
    ) -> Result<bool, SlotBatchRepositoryError> {
        Ok(false)
    }

    async fn claim_slot(
        &self,
        _batch_id: &Uuid,
        _slot_index: i32,
        _student_id: UserId,
        _booked_at: DateTime<Utc>,
    ) -> Result<SlotClaimOutcome, SlotBatchRepositoryError> {
        Ok(SlotClaimOutcome::NoSuchSlot)
    }

    async fn release_slot(
        &self,
        _batch_id: &Uuid,
        _slot_index: i32,
        _student_id: UserId,
    ) -> Result<bool, SlotBatchRepositoryError> {
        Ok(false)
    }
}
