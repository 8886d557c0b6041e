//! PostgreSQL persistence adapters built on Diesel.

pub mod diesel_chat_thread_repository;
pub mod diesel_enrollment_repository;
mod diesel_error_mapping;
pub mod diesel_meeting_repository;
pub mod diesel_slot_batch_repository;
mod models;
pub mod pool;
pub mod schema;

pub use diesel_chat_thread_repository::DieselChatThreadRepository;
pub use diesel_enrollment_repository::DieselEnrollmentRepository;
pub use diesel_meeting_repository::DieselMeetingRepository;
pub use diesel_slot_batch_repository::DieselSlotBatchRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
