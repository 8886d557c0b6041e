//! Ports for chat thread lifecycle and system messages.
//!
//! Thread creation and deletion are deliberately confined to
//! [`ChatThreadRepository`], which only the enrollment binder and the repair
//! sweep hold. Everything else (the meeting lifecycle) gets the narrower
//! [`ThreadMessenger`] and cannot delete a thread, making the "persistent
//! chats cannot be deleted" rule a capability restriction rather than a
//! runtime check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::UserId;

/// Errors raised by chat thread adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatThreadRepositoryError {
    /// Repository connection could not be established.
    #[error("chat thread repository connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("chat thread repository query failed: {message}")]
    Query { message: String },
}

impl ChatThreadRepositoryError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// A chat thread owned by an enrollment, one per party.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatThread {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Append-only system message capability. The only thread surface exposed
/// outside the enrollment binder.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThreadMessenger: Send + Sync {
    /// Append a system message to a thread. Best-effort from the caller's
    /// point of view; callers log and continue on failure.
    async fn post_system_message(
        &self,
        thread_id: &Uuid,
        body: &str,
    ) -> Result<(), ChatThreadRepositoryError>;
}

/// Full thread lifecycle port, held by the enrollment binder alone.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatThreadRepository: Send + Sync {
    /// Persist a new thread.
    async fn create(&self, thread: &ChatThread) -> Result<(), ChatThreadRepositoryError>;

    /// Delete a thread and its messages.
    async fn delete(&self, thread_id: &Uuid) -> Result<(), ChatThreadRepositoryError>;

    /// Threads whose enrollment no longer exists.
    async fn list_orphans(&self) -> Result<Vec<Uuid>, ChatThreadRepositoryError>;

    /// Thread ids belonging to the given enrollment.
    async fn list_for_enrollment(
        &self,
        enrollment_id: &Uuid,
    ) -> Result<Vec<Uuid>, ChatThreadRepositoryError>;
}

/// Fixture implementation for tests that do not exercise threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureChatThreadRepository;

#[async_trait]
impl ChatThreadRepository for FixtureChatThreadRepository {
    async fn create(&self, _thread: &ChatThread) -> Result<(), ChatThreadRepositoryError> {
        Ok(())
    }

    async fn delete(&self, _thread_id: &Uuid) -> Result<(), ChatThreadRepositoryError> {
        Ok(())
    }

    async fn list_orphans(&self) -> Result<Vec<Uuid>, ChatThreadRepositoryError> {
        Ok(Vec::new())
    }

    async fn list_for_enrollment(
        &self,
        _enrollment_id: &Uuid,
    ) -> Result<Vec<Uuid>, ChatThreadRepositoryError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl ThreadMessenger for FixtureChatThreadRepository {
    async fn post_system_message(
        &self,
        _thread_id: &Uuid,
        _body: &str,
    ) -> Result<(), ChatThreadRepositoryError> {
        Ok(())
    }
}
