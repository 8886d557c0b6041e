//! Outward notification payloads and debounce keys.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::UserId;

/// Category of an outward notification. Part of the debounce key, so two
/// different kinds aimed at the same recipient never suppress each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SlotsPublished,
    SlotBooked,
    SlotRebooked,
    MeetingRequested,
    MeetingScheduled,
    MeetingLinkSent,
    MeetingCompleted,
    MeetingCancelled,
    RescheduleProposed,
    RescheduleResolved,
}

impl NotificationKind {
    /// Stable token used in debounce keys and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SlotsPublished => "slots_published",
            Self::SlotBooked => "slot_booked",
            Self::SlotRebooked => "slot_rebooked",
            Self::MeetingRequested => "meeting_requested",
            Self::MeetingScheduled => "meeting_scheduled",
            Self::MeetingLinkSent => "meeting_link_sent",
            Self::MeetingCompleted => "meeting_completed",
            Self::MeetingCancelled => "meeting_cancelled",
            Self::RescheduleProposed => "reschedule_proposed",
            Self::RescheduleResolved => "reschedule_resolved",
        }
    }
}

/// A single outward notification, delivered best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    /// Conversation scope the notification belongs to, e.g. a batch or
    /// meeting id. Part of the debounce key.
    pub scope: String,
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Debounce key: `recipient|scope|kind`.
    pub fn debounce_key(&self) -> String {
        format!("{}|{}|{}", self.recipient, self.scope, self.kind.as_str())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use super::*;

    #[test]
    fn debounce_key_distinguishes_kinds() {
        let recipient = UserId::random();
        let booked = Notification {
            recipient,
            scope: "batch-1".to_owned(),
            kind: NotificationKind::SlotBooked,
            subject: "s".to_owned(),
            body: "b".to_owned(),
        };
        let mut published = booked.clone();
        published.kind = NotificationKind::SlotsPublished;

        assert_ne!(booked.debounce_key(), published.debounce_key());
        assert!(booked.debounce_key().ends_with("slot_booked"));
    }
}
