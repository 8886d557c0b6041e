//! PostgreSQL-backed `SlotBatchRepository` implementation using Diesel.
//!
//! The claim path is the one place double-booking could re-enter the
//! system: it is a single `UPDATE ... WHERE is_booked = FALSE` whose row
//! count decides the race. No in-process lock is involved, so the guarantee
//! holds across multiple instances of this service.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{SlotBatchRepository, SlotBatchRepositoryError, SlotClaimOutcome};
use crate::domain::{Slot, SlotBatch, SlotBatchStatus, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{
    batch_status_from_str, batch_status_to_str, NewSlotBatchRow, NewSlotRow, SlotBatchRow,
    SlotRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{slot_batches, slots};

/// Diesel-backed implementation of the slot batch repository port.
#[derive(Clone)]
pub struct DieselSlotBatchRepository {
    pool: DbPool,
}

impl DieselSlotBatchRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool(error: PoolError) -> SlotBatchRepositoryError {
    map_pool_error(error, SlotBatchRepositoryError::connection)
}

fn map_diesel(error: diesel::result::Error) -> SlotBatchRepositoryError {
    map_diesel_error(
        error,
        SlotBatchRepositoryError::query,
        SlotBatchRepositoryError::connection,
    )
}

fn row_to_slot(row: SlotRow) -> Slot {
    Slot {
        index: row.slot_index,
        start: row.start_at,
        end: row.end_at,
        duration_minutes: row.duration_minutes,
        max_participants: row.max_participants,
        booked_by: row.booked_by.map(UserId::from_uuid),
        is_booked: row.is_booked,
        booked_at: row.booked_at,
    }
}

fn rows_to_batch(
    row: SlotBatchRow,
    slot_rows: Vec<SlotRow>,
) -> Result<SlotBatch, SlotBatchRepositoryError> {
    let status = batch_status_from_str(&row.status).ok_or_else(|| {
        SlotBatchRepositoryError::query(format!("unknown batch status {:?}", row.status))
    })?;

    Ok(SlotBatch {
        id: row.id,
        owner_id: UserId::from_uuid(row.owner_id),
        title: row.title,
        description: row.description,
        status,
        timezone: row.timezone,
        expires_at: row.expires_at,
        created_at: row.created_at,
        slots: slot_rows.into_iter().map(row_to_slot).collect(),
    })
}

/// Load the slots for a set of batches, grouped by batch id.
async fn load_slots_grouped(
    conn: &mut AsyncPgConnection,
    batch_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<SlotRow>>, SlotBatchRepositoryError> {
    let rows: Vec<SlotRow> = slots::table
        .filter(slots::batch_id.eq_any(batch_ids))
        .order((slots::batch_id.asc(), slots::slot_index.asc()))
        .select(SlotRow::as_select())
        .load(conn)
        .await
        .map_err(map_diesel)?;

    let mut grouped: HashMap<Uuid, Vec<SlotRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.batch_id).or_default().push(row);
    }
    Ok(grouped)
}

async fn load_batches(
    conn: &mut AsyncPgConnection,
    batch_rows: Vec<SlotBatchRow>,
) -> Result<Vec<SlotBatch>, SlotBatchRepositoryError> {
    let ids: Vec<Uuid> = batch_rows.iter().map(|row| row.id).collect();
    let mut grouped = load_slots_grouped(conn, &ids).await?;

    batch_rows
        .into_iter()
        .map(|row| {
            let slot_rows = grouped.remove(&row.id).unwrap_or_default();
            rows_to_batch(row, slot_rows)
        })
        .collect()
}

#[async_trait]
impl SlotBatchRepository for DieselSlotBatchRepository {
    async fn insert(&self, batch: &SlotBatch) -> Result<(), SlotBatchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let batch_row = NewSlotBatchRow {
            id: batch.id,
            owner_id: *batch.owner_id.as_uuid(),
            title: &batch.title,
            description: batch.description.as_deref(),
            status: batch_status_to_str(batch.status),
            timezone: &batch.timezone,
            expires_at: batch.expires_at,
            created_at: batch.created_at,
        };
        let slot_rows: Vec<NewSlotRow> = batch
            .slots
            .iter()
            .map(|slot| NewSlotRow {
                batch_id: batch.id,
                slot_index: slot.index,
                start_at: slot.start,
                end_at: slot.end,
                duration_minutes: slot.duration_minutes,
                max_participants: slot.max_participants,
                is_booked: slot.is_booked,
            })
            .collect();

        conn.transaction(|conn| {
            async move {
                diesel::insert_into(slot_batches::table)
                    .values(&batch_row)
                    .execute(conn)
                    .await?;
                diesel::insert_into(slots::table)
                    .values(&slot_rows)
                    .execute(conn)
                    .await?;
                Ok::<_, diesel::result::Error>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel)
    }

    async fn find_by_id(
        &self,
        batch_id: &Uuid,
    ) -> Result<Option<SlotBatch>, SlotBatchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = slot_batches::table
            .filter(slot_batches::id.eq(batch_id))
            .select(SlotBatchRow::as_select())
            .first::<SlotBatchRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let slot_rows: Vec<SlotRow> = slots::table
            .filter(slots::batch_id.eq(batch_id))
            .order(slots::slot_index.asc())
            .select(SlotRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        rows_to_batch(row, slot_rows).map(Some)
    }

    async fn list_active_for_owner(
        &self,
        owner_id: UserId,
    ) -> Result<Vec<SlotBatch>, SlotBatchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let batch_rows: Vec<SlotBatchRow> = slot_batches::table
            .filter(
                slot_batches::owner_id
                    .eq(owner_id.as_uuid())
                    .and(slot_batches::status.eq(batch_status_to_str(SlotBatchStatus::Active))),
            )
            .order(slot_batches::created_at.desc())
            .select(SlotBatchRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        load_batches(&mut conn, batch_rows).await
    }

    async fn list_active_for_owners(
        &self,
        owner_ids: &[UserId],
    ) -> Result<Vec<SlotBatch>, SlotBatchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let ids: Vec<Uuid> = owner_ids.iter().map(|id| *id.as_uuid()).collect();
        let batch_rows: Vec<SlotBatchRow> = slot_batches::table
            .filter(
                slot_batches::owner_id
                    .eq_any(ids)
                    .and(slot_batches::status.eq(batch_status_to_str(SlotBatchStatus::Active))),
            )
            .order(slot_batches::created_at.desc())
            .select(SlotBatchRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        load_batches(&mut conn, batch_rows).await
    }

    async fn set_status(
        &self,
        batch_id: &Uuid,
        status: SlotBatchStatus,
    ) -> Result<bool, SlotBatchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let updated = diesel::update(slot_batches::table.filter(slot_batches::id.eq(batch_id)))
            .set(slot_batches::status.eq(batch_status_to_str(status)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel)?;

        Ok(updated > 0)
    }

    async fn claim_slot(
        &self,
        batch_id: &Uuid,
        slot_index: i32,
        student_id: UserId,
        booked_at: DateTime<Utc>,
    ) -> Result<SlotClaimOutcome, SlotBatchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        // The store is the arbiter: one statement, conditional on the flag.
        // Of any number of concurrent claims, exactly one sees a row here.
        let claimed = diesel::update(
            slots::table.filter(
                slots::batch_id
                    .eq(batch_id)
                    .and(slots::slot_index.eq(slot_index))
                    .and(slots::is_booked.eq(false)),
            ),
        )
        .set((
            slots::is_booked.eq(true),
            slots::booked_by.eq(Some(*student_id.as_uuid())),
            slots::booked_at.eq(Some(booked_at)),
        ))
        .returning(SlotRow::as_returning())
        .get_result::<SlotRow>(&mut conn)
        .await
        .optional()
        .map_err(map_diesel)?;

        if let Some(row) = claimed {
            return Ok(SlotClaimOutcome::Claimed(row_to_slot(row)));
        }

        // Zero rows: either the slot is taken or it never existed.
        let exists = slots::table
            .filter(
                slots::batch_id
                    .eq(batch_id)
                    .and(slots::slot_index.eq(slot_index)),
            )
            .select(SlotRow::as_select())
            .first::<SlotRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel)?;

        Ok(match exists {
            Some(_) => SlotClaimOutcome::AlreadyBooked,
            None => SlotClaimOutcome::NoSuchSlot,
        })
    }

    async fn release_slot(
        &self,
        batch_id: &Uuid,
        slot_index: i32,
        student_id: UserId,
    ) -> Result<bool, SlotBatchRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let released = diesel::update(
            slots::table.filter(
                slots::batch_id
                    .eq(batch_id)
                    .and(slots::slot_index.eq(slot_index))
                    .and(slots::is_booked.eq(true))
                    .and(slots::booked_by.eq(student_id.as_uuid())),
            ),
        )
        .set((
            slots::is_booked.eq(false),
            slots::booked_by.eq(None::<Uuid>),
            slots::booked_at.eq(None::<DateTime<Utc>>),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel)?;

        Ok(released == 1)
    }
}

#[cfg(test)]
mod tests {
    //! Row conversion and status decoding edge cases.

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn batch_row() -> SlotBatchRow {
        SlotBatchRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Office hours".to_owned(),
            description: None,
            status: "active".to_owned(),
            timezone: "UTC".to_owned(),
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    fn slot_row(batch_id: Uuid, index: i32) -> SlotRow {
        let start = Utc::now();
        SlotRow {
            batch_id,
            slot_index: index,
            start_at: start,
            end_at: start + chrono::Duration::hours(1),
            duration_minutes: 60,
            max_participants: 1,
            booked_by: None,
            is_booked: false,
            booked_at: None,
        }
    }

    #[rstest]
    fn assembles_batch_with_ordered_slots(batch_row: SlotBatchRow) {
        let id = batch_row.id;
        let batch = rows_to_batch(batch_row, vec![slot_row(id, 0), slot_row(id, 1)])
            .expect("valid rows");

        assert_eq!(batch.status, SlotBatchStatus::Active);
        assert_eq!(batch.slots.len(), 2);
        assert_eq!(batch.slots[1].index, 1);
    }

    #[rstest]
    fn rejects_unknown_status(mut batch_row: SlotBatchRow) {
        batch_row.status = "paused".to_owned();

        let err = rows_to_batch(batch_row, Vec::new()).expect_err("unknown status");
        assert!(matches!(err, SlotBatchRepositoryError::Query { .. }));
        assert!(err.to_string().contains("paused"));
    }

    #[rstest]
    fn maps_booked_slot_fields(batch_row: SlotBatchRow) {
        let id = batch_row.id;
        let booker = Uuid::new_v4();
        let mut row = slot_row(id, 0);
        row.is_booked = true;
        row.booked_by = Some(booker);

        let batch = rows_to_batch(batch_row, vec![row]).expect("valid rows");
        assert!(batch.slots[0].is_booked);
        assert_eq!(batch.slots[0].booked_by, Some(UserId::from_uuid(booker)));
    }
}
