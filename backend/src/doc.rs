//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] aggregates every HTTP endpoint and the schemas they exchange.
//! The generated specification backs Swagger UI in debug builds.

use utoipa::OpenApi;

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scheduling backend API",
        description = "Slot publication and booking, enrollments, and the meeting lifecycle."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::api::slots::publish_slots,
        crate::api::slots::get_slot_batch,
        crate::api::slots::list_mentor_slot_batches,
        crate::api::slots::list_bookable_slot_batches,
        crate::api::slots::archive_slot_batch,
        crate::api::slots::book_slot,
        crate::api::slots::reschedule_slot,
        crate::api::enrollments::enroll,
        crate::api::enrollments::record_feedback,
        crate::api::enrollments::repair_enrollments,
        crate::api::meetings::request_meeting,
        crate::api::meetings::get_meeting,
        crate::api::meetings::advance_meeting,
        crate::api::meetings::propose_reschedule,
        crate::api::meetings::resolve_reschedule,
        crate::api::health::ready,
        crate::api::health::live,
    ),
    components(schemas(
        crate::api::error::ApiError,
        crate::domain::ErrorCode,
        crate::domain::SlotBatch,
        crate::domain::Slot,
        crate::domain::SlotSpec,
        crate::domain::SlotBatchStatus,
        crate::domain::Enrollment,
        crate::domain::Feedback,
        crate::domain::RepairReport,
        crate::domain::Meeting,
        crate::domain::MeetingStatus,
        crate::domain::RescheduleRequest,
        crate::domain::RescheduleStatus,
        crate::domain::RescheduleDecision,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Sanity checks over the generated document.

    use utoipa::OpenApi;

    use super::ApiDoc;

    #[test]
    fn document_contains_the_operation_surface() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| p.ends_with("/slot-batches")));
        assert!(paths.iter().any(|p| p.contains("/slots/reschedule")));
        assert!(paths.iter().any(|p| p.ends_with("/enrollments")));
        assert!(paths.iter().any(|p| p.ends_with("/meetings")));
        assert!(paths.iter().any(|p| p.contains("/reschedule-requests")));
    }
}
