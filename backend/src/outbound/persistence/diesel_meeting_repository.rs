//! PostgreSQL-backed `MeetingRepository` implementation using Diesel.
//!
//! Lifecycle writes are conditional on the status (and negotiation log) the
//! transition was computed from, so a write that raced another actor's
//! update affects zero rows and is reported as stale instead of landing on
//! top of it.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{MeetingRepository, MeetingRepositoryError, MeetingUpdateOutcome};
use crate::domain::{Meeting, MeetingStatus, RescheduleRequest, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{
    meeting_status_from_str, meeting_status_to_str, MeetingRow, MeetingUpdate, NewMeetingRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::meetings;

/// Diesel-backed implementation of the meeting repository port.
#[derive(Clone)]
pub struct DieselMeetingRepository {
    pool: DbPool,
}

impl DieselMeetingRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool(error: PoolError) -> MeetingRepositoryError {
    map_pool_error(error, MeetingRepositoryError::connection)
}

fn map_diesel(error: diesel::result::Error) -> MeetingRepositoryError {
    map_diesel_error(
        error,
        MeetingRepositoryError::query,
        MeetingRepositoryError::connection,
    )
}

fn serialize_requests(
    requests: &[RescheduleRequest],
) -> Result<serde_json::Value, MeetingRepositoryError> {
    serde_json::to_value(requests).map_err(|err| {
        MeetingRepositoryError::query(format!("serialise reschedule requests: {err}"))
    })
}

fn row_to_meeting(row: MeetingRow) -> Result<Meeting, MeetingRepositoryError> {
    let status = meeting_status_from_str(&row.status).ok_or_else(|| {
        MeetingRepositoryError::query(format!("unknown meeting status {:?}", row.status))
    })?;
    let reschedule_requests: Vec<RescheduleRequest> =
        serde_json::from_value(row.reschedule_requests).map_err(|err| {
            MeetingRepositoryError::query(format!("decode reschedule requests: {err}"))
        })?;

    Ok(Meeting {
        id: row.id,
        thread_id: row.thread_id,
        student_id: UserId::from_uuid(row.student_id),
        mentor_id: UserId::from_uuid(row.mentor_id),
        reason: row.reason,
        scheduled_time: row.scheduled_time,
        link: row.link,
        room_id: row.room_id,
        status,
        reschedule_requests,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl MeetingRepository for DieselMeetingRepository {
    async fn insert(&self, meeting: &Meeting) -> Result<(), MeetingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let requests = serialize_requests(&meeting.reschedule_requests)?;

        let row = NewMeetingRow {
            id: meeting.id,
            thread_id: meeting.thread_id,
            student_id: *meeting.student_id.as_uuid(),
            mentor_id: *meeting.mentor_id.as_uuid(),
            reason: meeting.reason.as_deref(),
            status: meeting_status_to_str(meeting.status),
            reschedule_requests: &requests,
            created_at: meeting.created_at,
            updated_at: meeting.updated_at,
        };

        diesel::insert_into(meetings::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel)
    }

    async fn find_by_id(
        &self,
        meeting_id: &Uuid,
    ) -> Result<Option<Meeting>, MeetingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = meetings::table
            .filter(meetings::id.eq(meeting_id))
            .select(MeetingRow::as_select())
            .first::<MeetingRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        row.map(row_to_meeting).transpose()
    }

    async fn update_if_current(
        &self,
        next: &Meeting,
        expected_status: MeetingStatus,
        expected_requests: &[RescheduleRequest],
    ) -> Result<MeetingUpdateOutcome, MeetingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let expected_requests = serialize_requests(expected_requests)?;
        let next_requests = serialize_requests(&next.reschedule_requests)?;
        let update = MeetingUpdate {
            scheduled_time: next.scheduled_time,
            link: next.link.as_deref(),
            room_id: next.room_id.as_deref(),
            status: meeting_status_to_str(next.status),
            reschedule_requests: &next_requests,
            updated_at: next.updated_at,
        };

        let updated = diesel::update(
            meetings::table.filter(
                meetings::id
                    .eq(next.id)
                    .and(meetings::status.eq(meeting_status_to_str(expected_status)))
                    .and(meetings::reschedule_requests.eq(&expected_requests)),
            ),
        )
        .set(&update)
        .execute(&mut conn)
        .await
        .map_err(map_diesel)?;

        if updated == 1 {
            return Ok(MeetingUpdateOutcome::Updated);
        }

        // Zero rows: the meeting either moved on or never existed.
        let exists: i64 = meetings::table
            .filter(meetings::id.eq(next.id))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel)?;

        Ok(if exists > 0 {
            MeetingUpdateOutcome::Stale
        } else {
            MeetingUpdateOutcome::NotFound
        })
    }
}
