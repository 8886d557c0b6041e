//! Ports: the traits the domain drives and the adapters implement.
//!
//! Each port carries its own error enum and a `Fixture*` implementation for
//! tests that do not exercise that port. Mockall automocks are generated
//! under `cfg(test)`.

pub mod chat_thread_repository;
pub mod debounce_store;
pub mod enrollment_repository;
pub mod meeting_repository;
pub mod notification_sink;
pub mod slot_batch_repository;

pub use chat_thread_repository::{
    ChatThread, ChatThreadRepository, ChatThreadRepositoryError, FixtureChatThreadRepository,
    ThreadMessenger,
};
pub use debounce_store::{DebounceStore, DebounceStoreError, FixtureDebounceStore};
pub use enrollment_repository::{
    EnrollmentRepository, EnrollmentRepositoryError, FixtureEnrollmentRepository,
};
pub use meeting_repository::{
    FixtureMeetingRepository, MeetingRepository, MeetingRepositoryError, MeetingUpdateOutcome,
};
pub use notification_sink::{FixtureNotificationSink, NotificationSink, NotificationSinkError};
pub use slot_batch_repository::{
    FixtureSlotBatchRepository, SlotBatchRepository, SlotBatchRepositoryError, SlotClaimOutcome,
};

#[cfg(test)]
pub use chat_thread_repository::{MockChatThreadRepository, MockThreadMessenger};
#[cfg(test)]
pub use debounce_store::MockDebounceStore;
#[cfg(test)]
pub use enrollment_repository::MockEnrollmentRepository;
#[cfg(test)]
pub use meeting_repository::MockMeetingRepository;
#[cfg(test)]
pub use notification_sink::MockNotificationSink;
#[cfg(test)]
pub use slot_batch_repository::MockSlotBatchRepository;
