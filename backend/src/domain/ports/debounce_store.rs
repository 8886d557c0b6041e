//! Port for debounce bookkeeping with TTL semantics.
//!
//! The store decides, atomically, whether a key has been quiet long enough
//! to dispatch again. The default adapter is an in-process map, which means
//! the window resets on restart and is not shared between instances of this
//! service; deployments running more than one instance should back this
//! port with an external cache instead.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Errors raised by debounce store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DebounceStoreError {
    /// The backing store rejected the operation.
    #[error("debounce store failed: {message}")]
    Store { message: String },
}

impl DebounceStoreError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

/// Port for the last-dispatch bookkeeping behind the debouncer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DebounceStore: Send + Sync {
    /// Atomically check and record a dispatch attempt.
    ///
    /// Returns `true` (and records `now`) when no dispatch for `key` happened
    /// within `window` before `now`; returns `false` without recording when
    /// the key is still inside its window. Check and record are one
    /// operation so concurrent triggers cannot both pass.
    async fn check_and_record(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<bool, DebounceStoreError>;
}

/// Fixture implementation that never suppresses.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDebounceStore;

#[async_trait]
impl DebounceStore for FixtureDebounceStore {
    async fn check_and_record(
        &self,
        _key: &str,
        _now: DateTime<Utc>,
        _window: Duration,
    ) -> Result<bool, DebounceStoreError> {
        Ok(true)
    }
}
