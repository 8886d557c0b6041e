//! Enrollment entities: the unique student–mentor relationship.
//!
//! At most one enrollment may exist per (student, mentor) pair. That
//! invariant is owned by the database's unique index, not by code in this
//! module; see the enrollment service for how insert races are resolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::UserId;

/// The relationship record binding one student to one mentor.
///
/// Carries the two chat threads created alongside it, one per party. Thread
/// ids are `None` only in the invalid intermediate state left behind by a
/// partial failure; the next `enroll` call or the repair pass heals it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: UserId,
    pub mentor_id: UserId,
    pub student_thread_id: Option<Uuid>,
    pub mentor_thread_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Enrollment {
    /// Whether both chat threads are bound.
    pub fn threads_bound(&self) -> bool {
        self.student_thread_id.is_some() && self.mentor_thread_id.is_some()
    }

    /// Whether the given user is one of the two parties.
    pub fn involves(&self, user_id: UserId) -> bool {
        self.student_id == user_id || self.mentor_id == user_id
    }
}

/// Validation failures for feedback entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedbackValidationError {
    #[error("rating must be between 1 and 5, got {value}")]
    RatingOutOfRange { value: i16 },
}

/// A 1–5 star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "i16", into = "i16")]
pub struct FeedbackRating(i16);

impl FeedbackRating {
    /// Validate and wrap a raw rating value.
    pub fn new(value: i16) -> Result<Self, FeedbackValidationError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(FeedbackValidationError::RatingOutOfRange { value })
        }
    }

    /// The raw rating value.
    pub fn value(self) -> i16 {
        self.0
    }
}

impl TryFrom<i16> for FeedbackRating {
    type Error = FeedbackValidationError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FeedbackRating> for i16 {
    fn from(value: FeedbackRating) -> Self {
        value.0
    }
}

/// One append-only feedback entry on an enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub author_id: UserId,
    pub rating: FeedbackRating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of the duplicate-enrollment maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    /// Duplicate enrollment rows removed (the earliest per pair survives).
    pub enrollments_removed: u64,
    /// Chat threads removed along with duplicate enrollments.
    pub threads_removed: u64,
    /// Chat threads matching no enrollment at all.
    pub orphan_threads_removed: u64,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(5)]
    fn accepts_ratings_in_range(#[case] value: i16) {
        let rating = FeedbackRating::new(value).expect("in-range rating");
        assert_eq!(rating.value(), value);
    }

    #[rstest]
    #[case(0)]
    #[case(6)]
    #[case(-1)]
    fn rejects_ratings_out_of_range(#[case] value: i16) {
        let err = FeedbackRating::new(value).expect_err("out-of-range rating");
        assert_eq!(err, FeedbackValidationError::RatingOutOfRange { value });
    }

    #[rstest]
    fn threads_bound_requires_both_sides() {
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            student_id: UserId::random(),
            mentor_id: UserId::random(),
            student_thread_id: Some(Uuid::new_v4()),
            mentor_thread_id: None,
            is_active: true,
            created_at: Utc::now(),
        };

        assert!(!enrollment.threads_bound());
    }
}
