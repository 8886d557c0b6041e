//! REST API modules.

pub mod enrollments;
pub mod error;
pub mod health;
pub mod meetings;
pub mod slots;

pub use error::{ApiError, ApiResult};
