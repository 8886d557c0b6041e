//! Slot batch entities: a mentor's published availability.
//!
//! A [`SlotBatch`] is an ordered list of independently bookable [`Slot`]s.
//! Validation happens at construction; the booking flow never mutates these
//! values in memory, because the persistence layer's conditional update is
//! the sole authority for the `is_booked` transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::UserId;

/// Lifecycle status of a slot batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SlotBatchStatus {
    /// Published and bookable.
    Active,
    /// Archived after the sessions took place.
    Completed,
    /// Withdrawn by the mentor.
    Cancelled,
}

impl SlotBatchStatus {
    /// Whether the status is one of the archived terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Validation failures raised when constructing a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotBatchValidationError {
    #[error("a slot batch must contain at least one slot")]
    EmptySlots,
    #[error("slot {index} ends at or before it starts")]
    InvertedInterval { index: usize },
    #[error("batch title must not be empty")]
    EmptyTitle,
}

/// Publication input for one bookable time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotSpec {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Capacity of the slot. Current product usage always publishes 1.
    #[serde(default = "default_max_participants")]
    pub max_participants: i32,
}

fn default_max_participants() -> i32 {
    1
}

/// One bookable time window inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// Position within the batch; stable for the batch's lifetime.
    pub index: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i32,
    pub max_participants: i32,
    pub booked_by: Option<UserId>,
    pub is_booked: bool,
    pub booked_at: Option<DateTime<Utc>>,
}

impl Slot {
    /// Whether the slot can still be claimed at `now`.
    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        !self.is_booked && self.start > now
    }
}

/// Input payload for [`SlotBatch::new`].
#[derive(Debug, Clone)]
pub struct SlotBatchDraft {
    pub id: Uuid,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub timezone: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub slots: Vec<SlotSpec>,
}

/// A mentor-published set of candidate slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotBatch {
    pub id: Uuid,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub status: SlotBatchStatus,
    /// IANA timezone name the mentor published in; opaque to the core.
    pub timezone: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub slots: Vec<Slot>,
}

impl SlotBatch {
    /// Create a validated, freshly published batch with all slots unbooked.
    ///
    /// # Errors
    ///
    /// Rejects an empty slot list, an empty title, and any slot whose end does
    /// not come strictly after its start.
    pub fn new(draft: SlotBatchDraft) -> Result<Self, SlotBatchValidationError> {
        if draft.title.trim().is_empty() {
            return Err(SlotBatchValidationError::EmptyTitle);
        }
        if draft.slots.is_empty() {
            return Err(SlotBatchValidationError::EmptySlots);
        }

        let mut slots = Vec::with_capacity(draft.slots.len());
        for (index, spec) in draft.slots.iter().enumerate() {
            if spec.end <= spec.start {
                return Err(SlotBatchValidationError::InvertedInterval { index });
            }
            let duration_minutes = i32::try_from((spec.end - spec.start).num_minutes())
                .map_err(|_| SlotBatchValidationError::InvertedInterval { index })?;
            slots.push(Slot {
                index: i32::try_from(index)
                    .map_err(|_| SlotBatchValidationError::InvertedInterval { index })?,
                start: spec.start,
                end: spec.end,
                duration_minutes,
                max_participants: spec.max_participants.max(1),
                booked_by: None,
                is_booked: false,
                booked_at: None,
            });
        }

        Ok(Self {
            id: draft.id,
            owner_id: draft.owner_id,
            title: draft.title,
            description: draft.description,
            status: SlotBatchStatus::Active,
            timezone: draft.timezone,
            expires_at: draft.expires_at,
            created_at: draft.created_at,
            slots,
        })
    }

    /// Whether the batch accepts bookings at `now`.
    ///
    /// Expiry is advisory and checked at read time; nothing reaps expired
    /// batches in the background.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == SlotBatchStatus::Active
            && self.expires_at.map_or(true, |expiry| expiry > now)
    }

    /// Whether at least one slot is unbooked and still in the future.
    pub fn has_bookable_slot(&self, now: DateTime<Utc>) -> bool {
        self.slots.iter().any(|slot| slot.is_bookable(now))
    }
}

#[cfg(test)]
#[path = "scheduling_tests.rs"]
mod tests;
