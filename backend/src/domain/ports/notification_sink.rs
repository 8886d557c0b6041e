//! Port for outward notification delivery.

use async_trait::async_trait;

use crate::domain::Notification;

/// Errors raised by notification sink adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationSinkError {
    /// Delivery to the downstream channel failed.
    #[error("notification delivery failed: {message}")]
    Delivery { message: String },
}

impl NotificationSinkError {
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
        }
    }
}

/// Fire-and-forget delivery channel (email, push, in-app).
///
/// Failures are swallowed at the debouncer boundary: a lost reminder must
/// never fail the booking or scheduling operation that triggered it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationSinkError>;
}

/// Fixture implementation discarding all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureNotificationSink;

#[async_trait]
impl NotificationSink for FixtureNotificationSink {
    async fn deliver(&self, _notification: &Notification) -> Result<(), NotificationSinkError> {
        Ok(())
    }
}
