//! PostgreSQL-backed chat thread adapter.
//!
//! Implements both thread ports: the full lifecycle for the enrollment
//! binder and the message-only surface handed to the meeting service.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    ChatThread, ChatThreadRepository, ChatThreadRepositoryError, ThreadMessenger,
};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewChatThreadRow, NewThreadMessageRow};
use super::pool::{DbPool, PoolError};
use super::schema::{chat_threads, enrollments, thread_messages};

/// Diesel-backed implementation of the chat thread ports.
#[derive(Clone)]
pub struct DieselChatThreadRepository {
    pool: DbPool,
}

impl DieselChatThreadRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool(error: PoolError) -> ChatThreadRepositoryError {
    map_pool_error(error, ChatThreadRepositoryError::connection)
}

fn map_diesel(error: diesel::result::Error) -> ChatThreadRepositoryError {
    map_diesel_error(
        error,
        ChatThreadRepositoryError::query,
        ChatThreadRepositoryError::connection,
    )
}

#[async_trait]
impl ChatThreadRepository for DieselChatThreadRepository {
    async fn create(&self, thread: &ChatThread) -> Result<(), ChatThreadRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = NewChatThreadRow {
            id: thread.id,
            enrollment_id: thread.enrollment_id,
            owner_id: *thread.owner_id.as_uuid(),
            created_at: thread.created_at,
        };

        diesel::insert_into(chat_threads::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel)
    }

    async fn delete(&self, thread_id: &Uuid) -> Result<(), ChatThreadRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let thread_id = *thread_id;

        conn.transaction(|conn| {
            async move {
                diesel::delete(
                    thread_messages::table.filter(thread_messages::thread_id.eq(thread_id)),
                )
                .execute(conn)
                .await?;
                diesel::delete(chat_threads::table.filter(chat_threads::id.eq(thread_id)))
                    .execute(conn)
                    .await?;
                Ok::<_, diesel::result::Error>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel)
    }

    async fn list_orphans(&self) -> Result<Vec<Uuid>, ChatThreadRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let ids: Vec<Uuid> = chat_threads::table
            .filter(
                chat_threads::enrollment_id
                    .ne_all(enrollments::table.select(enrollments::id)),
            )
            .select(chat_threads::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        Ok(ids)
    }

    async fn list_for_enrollment(
        &self,
        enrollment_id: &Uuid,
    ) -> Result<Vec<Uuid>, ChatThreadRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let ids: Vec<Uuid> = chat_threads::table
            .filter(chat_threads::enrollment_id.eq(enrollment_id))
            .select(chat_threads::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel)?;

        Ok(ids)
    }
}

#[async_trait]
impl ThreadMessenger for DieselChatThreadRepository {
    async fn post_system_message(
        &self,
        thread_id: &Uuid,
        body: &str,
    ) -> Result<(), ChatThreadRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;

        let row = NewThreadMessageRow {
            id: Uuid::new_v4(),
            thread_id: *thread_id,
            body,
            is_system: true,
            created_at: Utc::now(),
        };

        diesel::insert_into(thread_messages::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel)
    }
}
