//! Application state: concrete service types and their wiring.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use crate::domain::{
    EnrollmentService, MeetingService, NotificationDebouncer, SlotBatchService,
    SlotBookingService,
};
use crate::outbound::cache::InMemoryDebounceStore;
use crate::outbound::notify::TracingNotificationSink;
use crate::outbound::persistence::{
    DbPool, DieselChatThreadRepository, DieselEnrollmentRepository, DieselMeetingRepository,
    DieselSlotBatchRepository,
};

use super::config::AppSettings;

/// Slot batch service over the Diesel adapters.
pub type AppSlotBatchService =
    SlotBatchService<DieselSlotBatchRepository, DieselEnrollmentRepository>;
/// Booking engine over the Diesel adapters.
pub type AppSlotBookingService =
    SlotBookingService<DieselSlotBatchRepository, DieselEnrollmentRepository>;
/// Enrollment binder over the Diesel adapters.
pub type AppEnrollmentService =
    EnrollmentService<DieselEnrollmentRepository, DieselChatThreadRepository>;
/// Meeting lifecycle over the Diesel adapters.
pub type AppMeetingService = MeetingService<DieselMeetingRepository, DieselChatThreadRepository>;

/// Fully wired services shared with the handler layer.
#[derive(Clone)]
pub struct AppState {
    pub slot_batches: web::Data<AppSlotBatchService>,
    pub bookings: web::Data<AppSlotBookingService>,
    pub enrollments: web::Data<AppEnrollmentService>,
    pub meetings: web::Data<AppMeetingService>,
}

/// Build the service graph over a database pool.
///
/// The debounce store is in-process by construction; see the port docs for
/// the multi-instance caveat.
pub fn build_state(pool: &DbPool, settings: &AppSettings) -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let debouncer = NotificationDebouncer::new(
        Arc::new(TracingNotificationSink::new()),
        Arc::new(InMemoryDebounceStore::new()),
        clock.clone(),
        settings.debounce_window_ms,
    );

    let batch_repo = Arc::new(DieselSlotBatchRepository::new(pool.clone()));
    let enrollment_repo = Arc::new(DieselEnrollmentRepository::new(pool.clone()));
    let thread_repo = Arc::new(DieselChatThreadRepository::new(pool.clone()));
    let meeting_repo = Arc::new(DieselMeetingRepository::new(pool.clone()));

    AppState {
        slot_batches: web::Data::new(SlotBatchService::new(
            batch_repo.clone(),
            enrollment_repo.clone(),
            debouncer.clone(),
            clock.clone(),
        )),
        bookings: web::Data::new(SlotBookingService::new(
            batch_repo,
            enrollment_repo.clone(),
            debouncer.clone(),
            clock.clone(),
        )),
        enrollments: web::Data::new(EnrollmentService::new(
            enrollment_repo,
            thread_repo.clone(),
            clock.clone(),
        )),
        meetings: web::Data::new(MeetingService::new(
            meeting_repo,
            thread_repo,
            debouncer,
            clock,
        )),
    }
}
