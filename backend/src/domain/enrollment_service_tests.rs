//! Enrollment binder behaviour: idempotency under races, thread binding and
//! rollback, feedback validation, and the repair sweep.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::rstest;
use uuid::Uuid;

use super::*;
use crate::domain::ports::{
    ChatThreadRepository, EnrollmentRepository, MockChatThreadRepository,
    MockEnrollmentRepository,
};
use crate::domain::{Enrollment, ErrorCode};

fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 5, 12, 0, 0)
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

/// Map-backed repository enforcing pair uniqueness the way the database
/// unique index does: the check and the insert share one lock.
#[derive(Default)]
struct InMemoryEnrollmentRepository {
    rows: Mutex<Vec<Enrollment>>,
    feedback: Mutex<Vec<Feedback>>,
}

#[async_trait::async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn insert(&self, enrollment: &Enrollment) -> Result<(), EnrollmentRepositoryError> {
        let mut rows = self.rows.lock().expect("rows lock");
        if rows.iter().any(|row| {
            row.student_id == enrollment.student_id && row.mentor_id == enrollment.mentor_id
        }) {
            return Err(EnrollmentRepositoryError::DuplicatePair);
        }
        rows.push(enrollment.clone());
        Ok(())
    }

    async fn find_by_pair(
        &self,
        student_id: UserId,
        mentor_id: UserId,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError> {
        Ok(self
            .rows
            .lock()
            .expect("rows lock")
            .iter()
            .find(|row| row.student_id == student_id && row.mentor_id == mentor_id)
            .cloned())
    }

    async fn find_by_id(
        &self,
        enrollment_id: &Uuid,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError> {
        Ok(self
            .rows
            .lock()
            .expect("rows lock")
            .iter()
            .find(|row| row.id == *enrollment_id)
            .cloned())
    }

    async fn bind_threads(
        &self,
        enrollment_id: &Uuid,
        student_thread_id: Uuid,
        mentor_thread_id: Uuid,
    ) -> Result<(), EnrollmentRepositoryError> {
        let mut rows = self.rows.lock().expect("rows lock");
        if let Some(row) = rows.iter_mut().find(|row| row.id == *enrollment_id) {
            row.student_thread_id = Some(student_thread_id);
            row.mentor_thread_id = Some(mentor_thread_id);
        }
        Ok(())
    }

    async fn delete(&self, enrollment_id: &Uuid) -> Result<(), EnrollmentRepositoryError> {
        self.rows
            .lock()
            .expect("rows lock")
            .retain(|row| row.id != *enrollment_id);
        Ok(())
    }

    async fn has_active_pair(
        &self,
        student_id: UserId,
        mentor_id: UserId,
    ) -> Result<bool, EnrollmentRepositoryError> {
        Ok(self
            .find_by_pair(student_id, mentor_id)
            .await?
            .is_some_and(|row| row.is_active))
    }

    async fn list_mentors_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<UserId>, EnrollmentRepositoryError> {
        Ok(self
            .rows
            .lock()
            .expect("rows lock")
            .iter()
            .filter(|row| row.student_id == student_id && row.is_active)
            .map(|row| row.mentor_id)
            .collect())
    }

    async fn list_students_for_mentor(
        &self,
        mentor_id: UserId,
    ) -> Result<Vec<UserId>, EnrollmentRepositoryError> {
        Ok(self
            .rows
            .lock()
            .expect("rows lock")
            .iter()
            .filter(|row| row.mentor_id == mentor_id && row.is_active)
            .map(|row| row.student_id)
            .collect())
    }

    async fn append_feedback(&self, feedback: &Feedback) -> Result<(), EnrollmentRepositoryError> {
        self.feedback
            .lock()
            .expect("feedback lock")
            .push(feedback.clone());
        Ok(())
    }

    async fn list_duplicate_pairs(
        &self,
    ) -> Result<Vec<Vec<Enrollment>>, EnrollmentRepositoryError> {
        let rows = self.rows.lock().expect("rows lock");
        let mut groups: Vec<Vec<Enrollment>> = Vec::new();
        for row in rows.iter() {
            if let Some(group) = groups.iter_mut().find(|group| {
                group.first().is_some_and(|first| {
                    first.student_id == row.student_id && first.mentor_id == row.mentor_id
                })
            }) {
                group.push(row.clone());
            } else {
                groups.push(vec![row.clone()]);
            }
        }
        let mut duplicates: Vec<Vec<Enrollment>> = groups
            .into_iter()
            .filter(|group| group.len() > 1)
            .collect();
        for group in &mut duplicates {
            group.sort_by_key(|row| row.created_at);
        }
        Ok(duplicates)
    }
}

/// Thread store recording creations and deletions.
#[derive(Default)]
struct InMemoryThreadRepository {
    threads: Mutex<Vec<ChatThread>>,
}

#[async_trait::async_trait]
impl ChatThreadRepository for InMemoryThreadRepository {
    async fn create(&self, thread: &ChatThread) -> Result<(), ChatThreadRepositoryError> {
        self.threads
            .lock()
            .expect("threads lock")
            .push(thread.clone());
        Ok(())
    }

    async fn delete(&self, thread_id: &Uuid) -> Result<(), ChatThreadRepositoryError> {
        self.threads
            .lock()
            .expect("threads lock")
            .retain(|thread| thread.id != *thread_id);
        Ok(())
    }

    async fn list_orphans(&self) -> Result<Vec<Uuid>, ChatThreadRepositoryError> {
        Ok(Vec::new())
    }

    async fn list_for_enrollment(
        &self,
        enrollment_id: &Uuid,
    ) -> Result<Vec<Uuid>, ChatThreadRepositoryError> {
        Ok(self
            .threads
            .lock()
            .expect("threads lock")
            .iter()
            .filter(|thread| thread.enrollment_id == *enrollment_id)
            .map(|thread| thread.id)
            .collect())
    }
}

fn service(
    repo: Arc<InMemoryEnrollmentRepository>,
    threads: Arc<InMemoryThreadRepository>,
) -> EnrollmentService<InMemoryEnrollmentRepository, InMemoryThreadRepository> {
    EnrollmentService::new(repo, threads, fixture_clock())
}

#[rstest]
#[tokio::test]
async fn first_enroll_creates_row_and_both_threads() {
    let repo = Arc::new(InMemoryEnrollmentRepository::default());
    let threads = Arc::new(InMemoryThreadRepository::default());
    let service = service(repo.clone(), threads.clone());
    let student = UserId::random();
    let mentor = UserId::random();

    let enrollment = service.enroll(student, mentor).await.expect("enroll succeeds");

    assert!(enrollment.is_active);
    assert!(enrollment.threads_bound());
    assert_eq!(threads.threads.lock().expect("threads lock").len(), 2);

    let stored = repo
        .find_by_pair(student, mentor)
        .await
        .expect("lookup succeeds")
        .expect("row exists");
    assert_eq!(stored.student_thread_id, enrollment.student_thread_id);
    assert_eq!(stored.mentor_thread_id, enrollment.mentor_thread_id);
}

#[rstest]
#[tokio::test]
async fn second_enroll_returns_the_existing_row() {
    let repo = Arc::new(InMemoryEnrollmentRepository::default());
    let threads = Arc::new(InMemoryThreadRepository::default());
    let service = service(repo.clone(), threads.clone());
    let student = UserId::random();
    let mentor = UserId::random();

    let first = service.enroll(student, mentor).await.expect("first enroll");
    let second = service.enroll(student, mentor).await.expect("second enroll");

    assert_eq!(first.id, second.id);
    assert_eq!(repo.rows.lock().expect("rows lock").len(), 1);
    // No extra threads were spawned by the repeat.
    assert_eq!(threads.threads.lock().expect("threads lock").len(), 2);
}

/// N concurrent enrolls for one pair leave exactly one row, and every
/// caller walks away with the same enrollment id.
#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_enrolls_converge_on_one_row() {
    let repo = Arc::new(InMemoryEnrollmentRepository::default());
    let threads = Arc::new(InMemoryThreadRepository::default());
    let service = Arc::new(service(repo.clone(), threads.clone()));
    let student = UserId::random();
    let mentor = UserId::random();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.enroll(student, mentor).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let enrollment = handle
            .await
            .expect("task completes")
            .expect("every caller succeeds");
        ids.push(enrollment.id);
    }

    assert_eq!(repo.rows.lock().expect("rows lock").len(), 1);
    let winner = ids[0];
    assert!(ids.iter().all(|id| *id == winner));
}

#[rstest]
#[tokio::test]
async fn lost_insert_race_is_converted_to_the_winners_row() {
    let student = UserId::random();
    let mentor = UserId::random();
    let winner = Enrollment {
        id: Uuid::new_v4(),
        student_id: student,
        mentor_id: mentor,
        student_thread_id: Some(Uuid::new_v4()),
        mentor_thread_id: Some(Uuid::new_v4()),
        is_active: true,
        created_at: fixture_now(),
    };

    let mut repo = MockEnrollmentRepository::new();
    // The pre-insert read sees nothing; the insert then loses the race.
    repo.expect_find_by_pair().times(1).returning(|_, _| Ok(None));
    repo.expect_insert()
        .times(1)
        .returning(|_| Err(EnrollmentRepositoryError::DuplicatePair));
    let winner_clone = winner.clone();
    repo.expect_find_by_pair()
        .times(1)
        .returning(move |_, _| Ok(Some(winner_clone.clone())));

    let threads = MockChatThreadRepository::new();
    let service = EnrollmentService::new(Arc::new(repo), Arc::new(threads), fixture_clock());

    let enrollment = service
        .enroll(student, mentor)
        .await
        .expect("loser still succeeds");
    assert_eq!(enrollment.id, winner.id);
}

#[rstest]
#[tokio::test]
async fn thread_failure_rolls_the_new_row_back() {
    let student = UserId::random();
    let mentor = UserId::random();

    let mut repo = MockEnrollmentRepository::new();
    repo.expect_find_by_pair().times(1).returning(|_, _| Ok(None));
    repo.expect_insert().times(1).returning(|_| Ok(()));
    repo.expect_delete().times(1).returning(|_| Ok(()));

    let mut threads = MockChatThreadRepository::new();
    threads
        .expect_create()
        .times(1)
        .returning(|_| Err(ChatThreadRepositoryError::query("disk full")));

    let service = EnrollmentService::new(Arc::new(repo), Arc::new(threads), fixture_clock());

    let err = service
        .enroll(student, mentor)
        .await
        .expect_err("thread failure propagates");
    assert_eq!(err.code(), ErrorCode::InternalError);
}

#[rstest]
#[tokio::test]
async fn enroll_heals_an_unbound_enrollment() {
    let repo = Arc::new(InMemoryEnrollmentRepository::default());
    let threads = Arc::new(InMemoryThreadRepository::default());
    let student = UserId::random();
    let mentor = UserId::random();
    // A partial failure left this row without threads.
    repo.rows.lock().expect("rows lock").push(Enrollment {
        id: Uuid::new_v4(),
        student_id: student,
        mentor_id: mentor,
        student_thread_id: None,
        mentor_thread_id: None,
        is_active: true,
        created_at: fixture_now(),
    });

    let service = service(repo.clone(), threads.clone());
    let enrollment = service.enroll(student, mentor).await.expect("heals");

    assert!(enrollment.threads_bound());
    assert_eq!(threads.threads.lock().expect("threads lock").len(), 2);
}

#[rstest]
#[tokio::test]
async fn self_enrollment_is_rejected() {
    let repo = Arc::new(InMemoryEnrollmentRepository::default());
    let threads = Arc::new(InMemoryThreadRepository::default());
    let service = service(repo, threads);
    let user = UserId::random();

    let err = service.enroll(user, user).await.expect_err("self enroll");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn feedback_is_appended_for_the_student() {
    let repo = Arc::new(InMemoryEnrollmentRepository::default());
    let threads = Arc::new(InMemoryThreadRepository::default());
    let service = service(repo.clone(), threads);
    let student = UserId::random();
    let mentor = UserId::random();
    let enrollment = service.enroll(student, mentor).await.expect("enroll");

    let feedback = service
        .record_feedback(&enrollment.id, student, 4, Some("very helpful".to_owned()))
        .await
        .expect("feedback accepted");

    assert_eq!(feedback.rating.value(), 4);
    assert_eq!(repo.feedback.lock().expect("feedback lock").len(), 1);
}

#[rstest]
#[case(0)]
#[case(6)]
#[tokio::test]
async fn feedback_rating_out_of_bounds_is_rejected(#[case] rating: i16) {
    let repo = Arc::new(InMemoryEnrollmentRepository::default());
    let threads = Arc::new(InMemoryThreadRepository::default());
    let service = service(repo, threads);
    let student = UserId::random();
    let enrollment = service
        .enroll(student, UserId::random())
        .await
        .expect("enroll");

    let err = service
        .record_feedback(&enrollment.id, student, rating, None)
        .await
        .expect_err("rating outside 1-5");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn feedback_from_the_mentor_is_forbidden() {
    let repo = Arc::new(InMemoryEnrollmentRepository::default());
    let threads = Arc::new(InMemoryThreadRepository::default());
    let service = service(repo, threads);
    let student = UserId::random();
    let mentor = UserId::random();
    let enrollment = service.enroll(student, mentor).await.expect("enroll");

    let err = service
        .record_feedback(&enrollment.id, mentor, 5, None)
        .await
        .expect_err("mentor cannot rate themselves");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn repair_keeps_the_earliest_row_and_sweeps_threads() {
    let repo = Arc::new(InMemoryEnrollmentRepository::default());
    let threads = Arc::new(InMemoryThreadRepository::default());
    let student = UserId::random();
    let mentor = UserId::random();

    // Two rows for one pair, created before the unique index existed.
    let keeper_id = Uuid::new_v4();
    let duplicate_id = Uuid::new_v4();
    {
        let mut rows = repo.rows.lock().expect("rows lock");
        rows.push(Enrollment {
            id: duplicate_id,
            student_id: student,
            mentor_id: mentor,
            student_thread_id: None,
            mentor_thread_id: None,
            is_active: true,
            created_at: fixture_now() + chrono::Duration::hours(1),
        });
        rows.push(Enrollment {
            id: keeper_id,
            student_id: student,
            mentor_id: mentor,
            student_thread_id: None,
            mentor_thread_id: None,
            is_active: true,
            created_at: fixture_now(),
        });
    }
    threads
        .threads
        .lock()
        .expect("threads lock")
        .push(ChatThread {
            id: Uuid::new_v4(),
            enrollment_id: duplicate_id,
            owner_id: student,
            created_at: fixture_now(),
        });

    let service = service(repo.clone(), threads.clone());
    let report = service.repair_duplicates().await.expect("repair succeeds");

    assert_eq!(report.enrollments_removed, 1);
    assert_eq!(report.threads_removed, 1);
    let rows = repo.rows.lock().expect("rows lock");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, keeper_id, "the earliest row survives");
    assert!(threads.threads.lock().expect("threads lock").is_empty());
}
