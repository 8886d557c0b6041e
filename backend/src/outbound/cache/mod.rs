//! In-process debounce store.
//!
//! Backs the [`DebounceStore`] port with a mutex-guarded map, which is
//! enough for a single-instance deployment: entries live for one window and
//! the whole map is lost on restart. Multi-instance deployments need an
//! external cache (Redis-class) behind the same port; the in-process map
//! deliberately does not pretend to cover that case.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::ports::{DebounceStore, DebounceStoreError};

/// Mutex-guarded map from debounce key to last dispatch time.
#[derive(Debug, Default)]
pub struct InMemoryDebounceStore {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryDebounceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DebounceStore for InMemoryDebounceStore {
    async fn check_and_record(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<bool, DebounceStoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| DebounceStoreError::store("debounce map poisoned"))?;

        // Expired entries are dropped opportunistically while we hold the
        // lock, keeping the map bounded by the active key set.
        entries.retain(|_, last_sent| now - *last_sent < window);

        if let Some(last_sent) = entries.get(key) {
            if now - *last_sent < window {
                return Ok(false);
            }
        }

        entries.insert(key.to_owned(), now);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    //! Window arithmetic for the in-process store.

    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0)
            .single()
            .expect("valid date")
            + Duration::seconds(seconds)
    }

    #[rstest]
    #[tokio::test]
    async fn first_trigger_passes_and_is_recorded() {
        let store = InMemoryDebounceStore::new();

        let passed = store
            .check_and_record("a|b|c", at(0), Duration::minutes(2))
            .await
            .expect("store succeeds");
        assert!(passed);
    }

    #[rstest]
    #[tokio::test]
    async fn second_trigger_inside_the_window_is_suppressed() {
        let store = InMemoryDebounceStore::new();
        let window = Duration::minutes(2);

        assert!(store.check_and_record("k", at(0), window).await.expect("store"));
        assert!(!store.check_and_record("k", at(30), window).await.expect("store"));
    }

    #[rstest]
    #[tokio::test]
    async fn trigger_after_the_window_passes_again() {
        let store = InMemoryDebounceStore::new();
        let window = Duration::minutes(2);

        assert!(store.check_and_record("k", at(0), window).await.expect("store"));
        assert!(store.check_and_record("k", at(121), window).await.expect("store"));
    }

    #[rstest]
    #[tokio::test]
    async fn distinct_keys_do_not_interfere() {
        let store = InMemoryDebounceStore::new();
        let window = Duration::minutes(2);

        assert!(store.check_and_record("k1", at(0), window).await.expect("store"));
        assert!(store.check_and_record("k2", at(1), window).await.expect("store"));
    }

    #[rstest]
    #[tokio::test]
    async fn expired_entries_are_evicted() {
        let store = InMemoryDebounceStore::new();
        let window = Duration::minutes(2);

        assert!(store.check_and_record("old", at(0), window).await.expect("store"));
        assert!(store.check_and_record("new", at(300), window).await.expect("store"));

        let entries = store.entries.lock().expect("map lock");
        assert!(!entries.contains_key("old"), "expired key swept");
        assert!(entries.contains_key("new"));
    }
}
