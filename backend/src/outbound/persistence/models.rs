//! Internal Diesel row structs and status encodings.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{MeetingStatus, SlotBatchStatus};

use super::schema::{
    chat_threads, enrollment_feedback, enrollments, meetings, slot_batches, slots,
    thread_messages,
};

/// Encode a batch status for its `VARCHAR` column.
pub(crate) fn batch_status_to_str(status: SlotBatchStatus) -> &'static str {
    match status {
        SlotBatchStatus::Active => "active",
        SlotBatchStatus::Completed => "completed",
        SlotBatchStatus::Cancelled => "cancelled",
    }
}

/// Decode a batch status column value.
pub(crate) fn batch_status_from_str(value: &str) -> Option<SlotBatchStatus> {
    match value {
        "active" => Some(SlotBatchStatus::Active),
        "completed" => Some(SlotBatchStatus::Completed),
        "cancelled" => Some(SlotBatchStatus::Cancelled),
        _ => None,
    }
}

/// Encode a meeting status for its `VARCHAR` column.
pub(crate) fn meeting_status_to_str(status: MeetingStatus) -> &'static str {
    match status {
        MeetingStatus::Requested => "requested",
        MeetingStatus::Scheduled => "scheduled",
        MeetingStatus::LinkSent => "link_sent",
        MeetingStatus::Completed => "completed",
        MeetingStatus::Cancelled => "cancelled",
    }
}

/// Decode a meeting status column value.
pub(crate) fn meeting_status_from_str(value: &str) -> Option<MeetingStatus> {
    match value {
        "requested" => Some(MeetingStatus::Requested),
        "scheduled" => Some(MeetingStatus::Scheduled),
        "link_sent" => Some(MeetingStatus::LinkSent),
        "completed" => Some(MeetingStatus::Completed),
        "cancelled" => Some(MeetingStatus::Cancelled),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Slot batch models
// ---------------------------------------------------------------------------

/// Row struct for reading from the slot_batches table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = slot_batches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SlotBatchRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub timezone: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for publishing a batch.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = slot_batches)]
pub(crate) struct NewSlotBatchRow<'a> {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub status: &'a str,
    pub timezone: &'a str,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row struct for reading from the slots table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = slots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SlotRow {
    pub batch_id: Uuid,
    pub slot_index: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub max_participants: i32,
    pub booked_by: Option<Uuid>,
    pub is_booked: bool,
    pub booked_at: Option<DateTime<Utc>>,
}

/// Insertable struct for the slots published with a batch.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = slots)]
pub(crate) struct NewSlotRow {
    pub batch_id: Uuid,
    pub slot_index: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub max_participants: i32,
    pub is_booked: bool,
}

// ---------------------------------------------------------------------------
// Enrollment models
// ---------------------------------------------------------------------------

/// Row struct for reading from the enrollments table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EnrollmentRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub mentor_id: Uuid,
    pub student_thread_id: Option<Uuid>,
    pub mentor_thread_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for creating enrollment rows.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = enrollments)]
pub(crate) struct NewEnrollmentRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub mentor_id: Uuid,
    pub student_thread_id: Option<Uuid>,
    pub mentor_thread_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for feedback entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = enrollment_feedback)]
pub(crate) struct NewFeedbackRow<'a> {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub author_id: Uuid,
    pub rating: i16,
    pub comment: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Chat thread models
// ---------------------------------------------------------------------------

/// Insertable struct for chat threads.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chat_threads)]
pub(crate) struct NewChatThreadRow {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for system messages.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = thread_messages)]
pub(crate) struct NewThreadMessageRow<'a> {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub body: &'a str,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Meeting models
// ---------------------------------------------------------------------------

/// Row struct for reading from the meetings table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = meetings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MeetingRow {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub student_id: Uuid,
    pub mentor_id: Uuid,
    pub reason: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub link: Option<String>,
    pub room_id: Option<String>,
    pub status: String,
    pub reschedule_requests: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for newly requested meetings.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = meetings)]
pub(crate) struct NewMeetingRow<'a> {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub student_id: Uuid,
    pub mentor_id: Uuid,
    pub reason: Option<&'a str>,
    pub status: &'a str,
    pub reschedule_requests: &'a serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset struct carrying a full lifecycle update.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = meetings)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct MeetingUpdate<'a> {
    pub scheduled_time: Option<DateTime<Utc>>,
    pub link: Option<&'a str>,
    pub room_id: Option<&'a str>,
    pub status: &'a str,
    pub reschedule_requests: &'a serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    //! Round-trip coverage for the status encodings.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(SlotBatchStatus::Active, "active")]
    #[case(SlotBatchStatus::Completed, "completed")]
    #[case(SlotBatchStatus::Cancelled, "cancelled")]
    fn batch_status_round_trips(#[case] status: SlotBatchStatus, #[case] encoded: &str) {
        assert_eq!(batch_status_to_str(status), encoded);
        assert_eq!(batch_status_from_str(encoded), Some(status));
    }

    #[rstest]
    #[case(MeetingStatus::Requested, "requested")]
    #[case(MeetingStatus::Scheduled, "scheduled")]
    #[case(MeetingStatus::LinkSent, "link_sent")]
    #[case(MeetingStatus::Completed, "completed")]
    #[case(MeetingStatus::Cancelled, "cancelled")]
    fn meeting_status_round_trips(#[case] status: MeetingStatus, #[case] encoded: &str) {
        assert_eq!(meeting_status_to_str(status), encoded);
        assert_eq!(meeting_status_from_str(encoded), Some(status));
    }

    #[rstest]
    fn unknown_status_strings_decode_to_none() {
        assert_eq!(batch_status_from_str("archived"), None);
        assert_eq!(meeting_status_from_str("pending"), None);
    }
}
