//! Regression coverage for slot batch construction and read-time checks.

use chrono::{Duration, TimeZone, Utc};
use rstest::{fixture, rstest};
use uuid::Uuid;

use super::*;

fn spec(start_offset_hours: i64, length_minutes: i64) -> SlotSpec {
    let start = Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).single().expect("valid date")
        + Duration::hours(start_offset_hours);
    SlotSpec {
        start,
        end: start + Duration::minutes(length_minutes),
        max_participants: 1,
    }
}

#[fixture]
fn draft() -> SlotBatchDraft {
    SlotBatchDraft {
        id: Uuid::new_v4(),
        owner_id: UserId::random(),
        title: "Algebra office hours".to_owned(),
        description: None,
        timezone: "Europe/London".to_owned(),
        expires_at: None,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).single().expect("valid date"),
        slots: vec![spec(0, 60), spec(1, 60)],
    }
}

#[rstest]
fn publishes_all_slots_unbooked(draft: SlotBatchDraft) {
    let batch = SlotBatch::new(draft).expect("valid draft");

    assert_eq!(batch.status, SlotBatchStatus::Active);
    assert_eq!(batch.slots.len(), 2);
    assert!(batch.slots.iter().all(|slot| !slot.is_booked));
    assert!(batch.slots.iter().all(|slot| slot.booked_by.is_none()));
    assert_eq!(batch.slots[0].duration_minutes, 60);
}

#[rstest]
fn rejects_empty_slot_list(mut draft: SlotBatchDraft) {
    draft.slots.clear();

    let err = SlotBatch::new(draft).expect_err("empty slots must fail");
    assert_eq!(err, SlotBatchValidationError::EmptySlots);
}

#[rstest]
fn rejects_inverted_interval(mut draft: SlotBatchDraft) {
    let start = draft.slots[0].start;
    draft.slots.push(SlotSpec {
        start,
        end: start - Duration::minutes(30),
        max_participants: 1,
    });

    let err = SlotBatch::new(draft).expect_err("inverted interval must fail");
    assert_eq!(err, SlotBatchValidationError::InvertedInterval { index: 2 });
}

#[rstest]
fn rejects_zero_length_slot(mut draft: SlotBatchDraft) {
    let start = draft.slots[0].start;
    draft.slots = vec![SlotSpec {
        start,
        end: start,
        max_participants: 1,
    }];

    let err = SlotBatch::new(draft).expect_err("zero-length slot must fail");
    assert_eq!(err, SlotBatchValidationError::InvertedInterval { index: 0 });
}

#[rstest]
fn rejects_blank_title(mut draft: SlotBatchDraft) {
    draft.title = "  ".to_owned();

    let err = SlotBatch::new(draft).expect_err("blank title must fail");
    assert_eq!(err, SlotBatchValidationError::EmptyTitle);
}

#[rstest]
fn expired_batch_is_not_open(draft: SlotBatchDraft) {
    let now = draft.created_at + Duration::days(30);
    let mut batch = SlotBatch::new(draft).expect("valid draft");
    batch.expires_at = Some(now - Duration::hours(1));

    assert!(!batch.is_open(now));
}

#[rstest]
#[case(SlotBatchStatus::Completed)]
#[case(SlotBatchStatus::Cancelled)]
fn archived_batch_is_not_open(draft: SlotBatchDraft, #[case] status: SlotBatchStatus) {
    let now = draft.created_at;
    let mut batch = SlotBatch::new(draft).expect("valid draft");
    batch.status = status;

    assert!(status.is_terminal());
    assert!(!batch.is_open(now));
}

#[rstest]
fn fully_booked_batch_has_no_bookable_slot(draft: SlotBatchDraft) {
    let now = draft.created_at;
    let mut batch = SlotBatch::new(draft).expect("valid draft");
    for slot in &mut batch.slots {
        slot.is_booked = true;
        slot.booked_by = Some(UserId::random());
        slot.booked_at = Some(now);
    }

    assert!(!batch.has_bookable_slot(now));
}

#[rstest]
fn past_slots_are_not_bookable(draft: SlotBatchDraft) {
    let batch = SlotBatch::new(draft).expect("valid draft");
    let after_all = batch.slots[1].start + Duration::hours(2);

    assert!(!batch.has_bookable_slot(after_all));
}
