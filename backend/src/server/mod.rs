//! Server configuration and application state wiring.

pub mod config;
pub mod state;

pub use config::AppSettings;
pub use state::{
    build_state, AppEnrollmentService, AppMeetingService, AppSlotBatchService,
    AppSlotBookingService, AppState,
};
