//! Notification sink adapter.
//!
//! The surrounding platform owns the real delivery channels (email, push).
//! This service's contract is fire-and-forget, so the default adapter
//! records the dispatch in the structured log where the platform's shipper
//! picks it up; swapping in a direct channel adapter is a wiring change
//! behind the same port.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{NotificationSink, NotificationSinkError};
use crate::domain::Notification;

/// Sink writing each dispatch as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationSink;

impl TracingNotificationSink {
    /// Create a new sink.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationSinkError> {
        info!(
            recipient = %notification.recipient,
            scope = %notification.scope,
            kind = notification.kind.as_str(),
            subject = %notification.subject,
            "notification dispatched"
        );
        Ok(())
    }
}
