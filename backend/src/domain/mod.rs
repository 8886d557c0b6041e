//! Domain entities, services, and ports for the scheduling core.
//!
//! Everything here is transport agnostic. The HTTP layer adapts requests
//! into service calls; the outbound layer implements the ports against
//! PostgreSQL, the in-process debounce cache, and the notification channel.

pub mod enrollment;
pub mod enrollment_service;
pub mod error;
pub mod meeting;
pub mod meeting_service;
pub mod notification;
pub mod notification_debouncer;
pub mod party;
pub mod ports;
pub mod scheduling;
pub mod slot_batch_service;
pub mod slot_booking_service;

pub use self::enrollment::{
    Enrollment, Feedback, FeedbackRating, FeedbackValidationError, RepairReport,
};
pub use self::enrollment_service::EnrollmentService;
pub use self::error::{DomainError, ErrorCode};
pub use self::meeting::{
    Meeting, MeetingStatus, MeetingTransitionError, RescheduleDecision, RescheduleRequest,
    RescheduleStatus,
};
pub use self::meeting_service::MeetingService;
pub use self::notification::{Notification, NotificationKind};
pub use self::notification_debouncer::NotificationDebouncer;
pub use self::party::UserId;
pub use self::scheduling::{
    Slot, SlotBatch, SlotBatchDraft, SlotBatchStatus, SlotBatchValidationError, SlotSpec,
};
pub use self::slot_batch_service::{PublishSlotBatch, SlotBatchService};
pub use self::slot_booking_service::SlotBookingService;
