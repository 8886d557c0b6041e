//! Meeting service behaviour: persistence keyed on expected state, wrong
//! actor rejections, idempotent cancellation, and best-effort side effects.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::rstest;
use uuid::Uuid;

use super::*;
use crate::domain::ports::{
    ChatThreadRepositoryError, FixtureDebounceStore, MeetingRepository, MockMeetingRepository,
    MockThreadMessenger, NotificationSink, NotificationSinkError,
};
use crate::domain::{ErrorCode, Notification, RescheduleStatus};

fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 8, 15, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_now(),
    })
}

#[derive(Default)]
struct CountingSink {
    delivered: AtomicUsize,
    recipients: Mutex<Vec<UserId>>,
}

#[async_trait::async_trait]
impl NotificationSink for CountingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationSinkError> {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        self.recipients
            .lock()
            .expect("recipients lock")
            .push(notification.recipient);
        Ok(())
    }
}

/// Map-backed repository with the same conditional-update contract as the
/// Diesel adapter.
#[derive(Default)]
struct InMemoryMeetingRepository {
    rows: Mutex<HashMap<Uuid, Meeting>>,
}

#[async_trait::async_trait]
impl MeetingRepository for InMemoryMeetingRepository {
    async fn insert(&self, meeting: &Meeting) -> Result<(), MeetingRepositoryError> {
        self.rows
            .lock()
            .expect("rows lock")
            .insert(meeting.id, meeting.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        meeting_id: &Uuid,
    ) -> Result<Option<Meeting>, MeetingRepositoryError> {
        Ok(self.rows.lock().expect("rows lock").get(meeting_id).cloned())
    }

    async fn update_if_current(
        &self,
        next: &Meeting,
        expected_status: MeetingStatus,
        expected_requests: &[crate::domain::RescheduleRequest],
    ) -> Result<MeetingUpdateOutcome, MeetingRepositoryError> {
        let mut rows = self.rows.lock().expect("rows lock");
        let Some(current) = rows.get(&next.id) else {
            return Ok(MeetingUpdateOutcome::NotFound);
        };
        if current.status != expected_status || current.reschedule_requests != expected_requests {
            return Ok(MeetingUpdateOutcome::Stale);
        }
        rows.insert(next.id, next.clone());
        Ok(MeetingUpdateOutcome::Updated)
    }
}

struct Harness {
    service: MeetingService<InMemoryMeetingRepository, MockThreadMessenger>,
    repo: Arc<InMemoryMeetingRepository>,
    sink: Arc<CountingSink>,
    student: UserId,
    mentor: UserId,
}

fn harness() -> Harness {
    let mut messenger = MockThreadMessenger::new();
    messenger
        .expect_post_system_message()
        .returning(|_, _| Ok(()));
    harness_with_messenger(messenger)
}

fn harness_with_messenger(messenger: MockThreadMessenger) -> Harness {
    let repo = Arc::new(InMemoryMeetingRepository::default());
    let sink = Arc::new(CountingSink::default());
    let clock = fixture_clock();
    let debouncer = NotificationDebouncer::new(
        sink.clone(),
        Arc::new(FixtureDebounceStore),
        clock.clone(),
        0,
    );

    Harness {
        service: MeetingService::new(repo.clone(), Arc::new(messenger), debouncer, clock),
        repo,
        sink,
        student: UserId::random(),
        mentor: UserId::random(),
    }
}

impl Harness {
    async fn requested(&self) -> Meeting {
        self.service
            .request(
                self.student,
                self.mentor,
                Uuid::new_v4(),
                Some("exam prep".to_owned()),
            )
            .await
            .expect("request succeeds")
    }

    async fn scheduled(&self) -> Meeting {
        let meeting = self.requested().await;
        self.service
            .schedule(&meeting.id, fixture_now() + Duration::days(2), self.mentor)
            .await
            .expect("schedule succeeds")
    }

    async fn link_sent(&self) -> Meeting {
        let meeting = self.scheduled().await;
        self.service
            .send_link(
                &meeting.id,
                "https://meet.example/abc".to_owned(),
                "room-abc".to_owned(),
            )
            .await
            .expect("send link succeeds")
    }
}

#[rstest]
#[tokio::test]
async fn request_persists_and_notifies_the_mentor() {
    let harness = harness();

    let meeting = harness.requested().await;

    assert_eq!(meeting.status, MeetingStatus::Requested);
    let stored = harness
        .repo
        .find_by_id(&meeting.id)
        .await
        .expect("lookup succeeds")
        .expect("row exists");
    assert_eq!(stored.status, MeetingStatus::Requested);
    assert_eq!(harness.sink.delivered.load(Ordering::SeqCst), 1);
    assert_eq!(
        harness.sink.recipients.lock().expect("recipients lock")[0],
        harness.mentor
    );
}

#[rstest]
#[tokio::test]
async fn full_lifecycle_reaches_completed() {
    let harness = harness();
    let meeting = harness.link_sent().await;

    let meeting = harness
        .service
        .complete(&meeting.id)
        .await
        .expect("complete succeeds");
    assert_eq!(meeting.status, MeetingStatus::Completed);
}

#[rstest]
#[tokio::test]
async fn schedule_after_completion_is_an_invalid_transition() {
    let harness = harness();
    let meeting = harness.link_sent().await;
    harness
        .service
        .complete(&meeting.id)
        .await
        .expect("complete succeeds");

    let err = harness
        .service
        .schedule(&meeting.id, fixture_now() + Duration::days(3), harness.mentor)
        .await
        .expect_err("completed meetings cannot be scheduled");
    assert_eq!(err.code(), ErrorCode::InvalidTransition);

    // State must be unchanged by the rejected call.
    let stored = harness
        .repo
        .find_by_id(&meeting.id)
        .await
        .expect("lookup succeeds")
        .expect("row exists");
    assert_eq!(stored.status, MeetingStatus::Completed);
}

#[rstest]
#[tokio::test]
async fn schedule_on_cancelled_meeting_is_rejected() {
    let harness = harness();
    let meeting = harness.requested().await;
    harness
        .service
        .cancel(&meeting.id, harness.student, None)
        .await
        .expect("cancel succeeds");

    let err = harness
        .service
        .schedule(&meeting.id, fixture_now() + Duration::days(1), harness.mentor)
        .await
        .expect_err("cancelled meetings cannot be scheduled");
    assert_eq!(err.code(), ErrorCode::InvalidTransition);
}

#[rstest]
#[tokio::test]
async fn send_link_notifies_the_student() {
    let harness = harness();
    let meeting = harness.link_sent().await;

    assert_eq!(meeting.status, MeetingStatus::LinkSent);
    let recipients = harness.sink.recipients.lock().expect("recipients lock");
    assert!(recipients.contains(&harness.student));
}

#[rstest]
#[tokio::test]
async fn cancel_is_idempotent_at_the_service_level() {
    let harness = harness();
    let meeting = harness.requested().await;

    let first = harness
        .service
        .cancel(&meeting.id, harness.student, Some("sick".to_owned()))
        .await
        .expect("first cancel");
    assert_eq!(first.status, MeetingStatus::Cancelled);
    let notifications_after_first = harness.sink.delivered.load(Ordering::SeqCst);

    let second = harness
        .service
        .cancel(&meeting.id, harness.student, None)
        .await
        .expect("repeat cancel is a no-op success");
    assert_eq!(second.status, MeetingStatus::Cancelled);
    // The repeat produced no fresh notification.
    assert_eq!(
        harness.sink.delivered.load(Ordering::SeqCst),
        notifications_after_first
    );
}

#[rstest]
#[tokio::test]
async fn resolve_by_the_requester_is_forbidden() {
    let harness = harness();
    let meeting = harness.scheduled().await;
    harness
        .service
        .propose_reschedule(
            &meeting.id,
            harness.student,
            fixture_now() + Duration::days(3),
            None,
        )
        .await
        .expect("propose succeeds");

    let err = harness
        .service
        .resolve_reschedule(&meeting.id, 0, RescheduleDecision::Accepted, harness.student)
        .await
        .expect_err("requester cannot resolve their own request");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn accepted_reschedule_on_link_sent_regresses_and_clears_link() {
    let harness = harness();
    let meeting = harness.link_sent().await;
    let proposed = fixture_now() + Duration::days(4);

    harness
        .service
        .propose_reschedule(&meeting.id, harness.student, proposed, None)
        .await
        .expect("propose succeeds");
    let resolved = harness
        .service
        .resolve_reschedule(&meeting.id, 0, RescheduleDecision::Accepted, harness.mentor)
        .await
        .expect("mentor accepts");

    assert_eq!(resolved.status, MeetingStatus::Scheduled);
    assert_eq!(resolved.scheduled_time, Some(proposed));
    assert!(resolved.link.is_none());
    assert!(resolved.room_id.is_none());
    assert_eq!(
        resolved.reschedule_requests[0].status,
        RescheduleStatus::Accepted
    );

    let stored = harness
        .repo
        .find_by_id(&meeting.id)
        .await
        .expect("lookup succeeds")
        .expect("row exists");
    assert!(stored.link.is_none());
}

#[rstest]
#[tokio::test]
async fn stale_conditional_write_surfaces_as_invalid_transition() {
    let student = UserId::random();
    let mentor = UserId::random();
    let meeting = Meeting::request(
        Uuid::new_v4(),
        Uuid::new_v4(),
        student,
        mentor,
        None,
        fixture_now(),
    );

    let mut repo = MockMeetingRepository::new();
    let loaded = meeting.clone();
    repo.expect_find_by_id()
        .returning(move |_| Ok(Some(loaded.clone())));
    // Another actor's write landed between our read and our update.
    repo.expect_update_if_current()
        .times(1)
        .returning(|_, _, _| Ok(MeetingUpdateOutcome::Stale));

    let mut messenger = MockThreadMessenger::new();
    messenger.expect_post_system_message().never();
    let sink = Arc::new(CountingSink::default());
    let clock = fixture_clock();
    let debouncer = NotificationDebouncer::new(
        sink.clone(),
        Arc::new(FixtureDebounceStore),
        clock.clone(),
        0,
    );
    let service = MeetingService::new(Arc::new(repo), Arc::new(messenger), debouncer, clock);

    let err = service
        .schedule(&meeting.id, fixture_now() + Duration::days(1), mentor)
        .await
        .expect_err("stale write is surfaced, not retried");
    assert_eq!(err.code(), ErrorCode::InvalidTransition);
    assert_eq!(sink.delivered.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn failed_system_message_does_not_fail_the_transition() {
    let mut messenger = MockThreadMessenger::new();
    messenger
        .expect_post_system_message()
        .returning(|_, _| Err(ChatThreadRepositoryError::query("thread gone")));
    let harness = harness_with_messenger(messenger);

    let meeting = harness.requested().await;
    assert_eq!(meeting.status, MeetingStatus::Requested);
}

#[rstest]
#[tokio::test]
async fn request_with_identical_parties_is_rejected() {
    let harness = harness();
    let user = UserId::random();

    let err = harness
        .service
        .request(user, user, Uuid::new_v4(), None)
        .await
        .expect_err("two distinct participants required");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn advancing_an_unknown_meeting_is_not_found() {
    let harness = harness();

    let err = harness
        .service
        .complete(&Uuid::new_v4())
        .await
        .expect_err("unknown meeting");
    assert_eq!(err.code(), ErrorCode::NotFound);
}
