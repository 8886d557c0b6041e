//! Process-wide suppression of duplicate outward notifications.
//!
//! Every notification leaving the booking and meeting services passes
//! through here. Two triggers sharing a `(recipient, scope, kind)` key
//! inside the configured window collapse into one dispatch. Delivery
//! failures are logged and swallowed at this boundary: the operation that
//! triggered the notification has already succeeded and must stay that way.

use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;
use tracing::{debug, warn};

use crate::domain::Notification;
use crate::domain::ports::{DebounceStore, NotificationSink};

/// Debouncing front door for all outward notifications.
#[derive(Clone)]
pub struct NotificationDebouncer {
    sink: Arc<dyn NotificationSink>,
    store: Arc<dyn DebounceStore>,
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl NotificationDebouncer {
    /// Create a debouncer with the given suppression window in milliseconds.
    ///
    /// A zero window disables debouncing entirely.
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        store: Arc<dyn DebounceStore>,
        clock: Arc<dyn Clock>,
        window_ms: u64,
    ) -> Self {
        Self {
            sink,
            store,
            clock,
            window: Duration::milliseconds(i64::try_from(window_ms).unwrap_or(i64::MAX)),
        }
    }

    /// Dispatch `notification` unless an identical key fired within the
    /// window. `force` bypasses the window without resetting it forward.
    ///
    /// Returns whether a dispatch was attempted. Never fails: suppression is
    /// silent, and delivery errors are logged and dropped.
    pub async fn trigger(&self, notification: Notification, force: bool) -> bool {
        let key = notification.debounce_key();

        if !force && !self.window.is_zero() {
            let now = self.clock.utc();
            match self.store.check_and_record(&key, now, self.window).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(%key, "notification suppressed inside debounce window");
                    return false;
                }
                Err(err) => {
                    // A broken store must not grow into lost notifications.
                    warn!(%key, error = %err, "debounce store failed; dispatching anyway");
                }
            }
        }

        if let Err(err) = self.sink.deliver(&notification).await {
            warn!(
                recipient = %notification.recipient,
                kind = notification.kind.as_str(),
                error = %err,
                "notification delivery failed"
            );
        }
        true
    }
}

#[cfg(test)]
#[path = "notification_debouncer_tests.rs"]
mod tests;
