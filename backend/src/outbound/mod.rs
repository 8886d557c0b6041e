//! Outbound adapters: PostgreSQL persistence, the in-process debounce
//! cache, and the notification sink.

pub mod cache;
pub mod notify;
pub mod persistence;
