//! PostgreSQL-backed `EnrollmentRepository` implementation using Diesel.
//!
//! The `(student_id, mentor_id)` unique index is the authority on pair
//! uniqueness; this adapter's only job in a race is to recognise the
//! violation and report it as `DuplicatePair` so the service can re-read
//! the winner.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{EnrollmentRepository, EnrollmentRepositoryError};
use crate::domain::{Enrollment, Feedback, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{EnrollmentRow, NewEnrollmentRow, NewFeedbackRow};
use super::pool::{DbPool, PoolError};
use super::schema::{enrollment_feedback, enrollments};

/// Diesel-backed implementation of the enrollment repository port.
#[derive(Clone)]
pub struct DieselEnrollmentRepository {
    pool: DbPool,
}

impl DieselEnrollmentRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool(error: PoolError) -> EnrollmentRepositoryError {
    map_pool_error(error, EnrollmentRepositoryError::connection)
}

fn map_diesel(error: DieselError) -> EnrollmentRepositoryError {
    map_diesel_error(
        error,
        EnrollmentRepositoryError::query,
        EnrollmentRepositoryError::connection,
    )
}

fn row_to_enrollment(row: EnrollmentRow) -> Enrollment {
    Enrollment {
        id: row.id,
        student_id: UserId::from_uuid(row.student_id),
        mentor_id: UserId::from_uuid(row.mentor_id),
        student_thread_id: row.student_thread_id,
        mentor_thread_id: row.mentor_thread_id,
        is_active: row.is_active,
        created_at: row.created_at,
    }
}

#[async_trait]
impl EnrollmentRepository for DieselEnrollmentRepository {
    async fn insert(&self, enrollment: &Enrollment) -> Result<(), EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = NewEnrollmentRow {
            id: enrollment.id,
            student_id: *enrollment.student_id.as_uuid(),
            mentor_id: *enrollment.mentor_id.as_uuid(),
            student_thread_id: enrollment.student_thread_id,
            mentor_thread_id: enrollment.mentor_thread_id,
            is_active: enrollment.is_active,
            created_at: enrollment.created_at,
        };

        diesel::insert_into(enrollments::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    EnrollmentRepositoryError::DuplicatePair
                }
                other => map_diesel(other),
            })
    }

    async fn find_by_pair(
        &self,
        student_id: UserId,
        mentor_id: UserId,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = enrollments::table
            .filter(
                enrollments::student_id
                    .eq(student_id.as_uuid())
                    .and(enrollments::mentor_id.eq(mentor_id.as_uuid())),
            )
            .order(enrollments::created_at.asc())
            .select(EnrollmentRow::as_select())
            .first::<EnrollmentRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        Ok(row.map(row_to_enrollment))
    }

    async fn find_by_id(
        &self,
        enrollment_id: &Uuid,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = enrollments::table
            .filter(enrollments::id.eq(enrollment_id))
            .select(EnrollmentRow::as_select())
            .first::<EnrollmentRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        Ok(row.map(row_to_enrollment))
    }

    async fn bind_threads(
        &self,
        enrollment_id: &Uuid,
        student_thread_id: Uuid,
        mentor_thread_id: Uuid,
    ) -> Result<(), EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        diesel::update(enrollments::table.filter(enrollments::id.eq(enrollment_id)))
            .set((
                enrollments::student_thread_id.eq(Some(student_thread_id)),
                enrollments::mentor_thread_id.eq(Some(mentor_thread_id)),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel)
    }

    async fn delete(&self, enrollment_id: &Uuid) -> Result<(), EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        diesel::delete(enrollments::table.filter(enrollments::id.eq(enrollment_id)))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel)
    }

    async fn has_active_pair(
        &self,
        student_id: UserId,
        mentor_id: UserId,
    ) -> Result<bool, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let count: i64 = enrollments::table
            .filter(
                enrollments::student_id
                    .eq(student_id.as_uuid())
                    .and(enrollments::mentor_id.eq(mentor_id.as_uuid()))
                    .and(enrollments::is_active.eq(true)),
            )
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel)?;

        Ok(count > 0)
    }

    async fn list_mentors_for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<UserId>, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let ids: Vec<Uuid> = enrollments::table
            .filter(
                enrollments::student_id
                    .eq(student_id.as_uuid())
                    .and(enrollments::is_active.eq(true)),
            )
            .select(enrollments::mentor_id)
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }

    async fn list_students_for_mentor(
        &self,
        mentor_id: UserId,
    ) -> Result<Vec<UserId>, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let ids: Vec<Uuid> = enrollments::table
            .filter(
                enrollments::mentor_id
                    .eq(mentor_id.as_uuid())
                    .and(enrollments::is_active.eq(true)),
            )
            .select(enrollments::student_id)
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }

    async fn append_feedback(&self, feedback: &Feedback) -> Result<(), EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = NewFeedbackRow {
            id: feedback.id,
            enrollment_id: feedback.enrollment_id,
            author_id: *feedback.author_id.as_uuid(),
            rating: feedback.rating.value(),
            comment: feedback.comment.as_deref(),
            created_at: feedback.created_at,
        };

        diesel::insert_into(enrollment_feedback::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel)
    }

    async fn list_duplicate_pairs(
        &self,
    ) -> Result<Vec<Vec<Enrollment>>, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        // Load the whole table ordered by pair and age; duplicates are rare
        // (pre-index data only) and the sweep runs off the request path.
        let rows: Vec<EnrollmentRow> = enrollments::table
            .order((
                enrollments::student_id.asc(),
                enrollments::mentor_id.asc(),
                enrollments::created_at.asc(),
            ))
            .select(EnrollmentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        let mut groups: Vec<Vec<Enrollment>> = Vec::new();
        for row in rows {
            let enrollment = row_to_enrollment(row);
            match groups.last_mut() {
                Some(group)
                    if group.as_slice().first().is_some_and(|first| {
                        first.student_id == enrollment.student_id
                            && first.mentor_id == enrollment.mentor_id
                    }) =>
                {
                    group.push(enrollment);
                }
                _ => groups.push(vec![enrollment]),
            }
        }

        Ok(groups.into_iter().filter(|group| group.len() > 1).collect())
    }
}
