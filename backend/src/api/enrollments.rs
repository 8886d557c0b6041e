//! Enrollment API handlers.

use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::domain::{RepairReport, UserId};
use crate::server::AppEnrollmentService;

/// Request body for enrolling a student with a mentor.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub student_id: UserId,
    pub mentor_id: UserId,
}

/// Enroll a student with a mentor.
///
/// Idempotent: repeating the call (or losing a concurrent race) returns the
/// existing enrollment with a 200 instead of creating a second one.
#[utoipa::path(
    post,
    path = "/api/v1/enrollments",
    request_body = EnrollRequest,
    responses(
        (status = 201, description = "Enrollment created or already existing", body = crate::domain::Enrollment),
        (status = 400, description = "Student and mentor are the same user"),
    ),
    tags = ["enrollments"],
    operation_id = "enroll"
)]
#[post("/enrollments")]
pub async fn enroll(
    service: web::Data<AppEnrollmentService>,
    body: web::Json<EnrollRequest>,
) -> ApiResult<HttpResponse> {
    let enrollment = service.enroll(body.student_id, body.mentor_id).await?;
    Ok(HttpResponse::Created().json(enrollment))
}

/// Request body for leaving feedback on an enrollment.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub author_id: UserId,
    /// 1 to 5.
    pub rating: i16,
    pub comment: Option<String>,
}

/// Append a feedback entry to an enrollment.
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/{enrollment_id}/feedback",
    request_body = FeedbackRequest,
    responses(
        (status = 201, description = "Feedback recorded", body = crate::domain::Feedback),
        (status = 400, description = "Rating outside 1-5"),
        (status = 403, description = "Author is not the enrolled student"),
        (status = 404, description = "Unknown enrollment"),
    ),
    tags = ["enrollments"],
    operation_id = "recordFeedback"
)]
#[post("/enrollments/{enrollment_id}/feedback")]
pub async fn record_feedback(
    service: web::Data<AppEnrollmentService>,
    path: web::Path<Uuid>,
    body: web::Json<FeedbackRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let feedback = service
        .record_feedback(&path.into_inner(), body.author_id, body.rating, body.comment)
        .await?;
    Ok(HttpResponse::Created().json(feedback))
}

/// Run the duplicate-enrollment repair sweep.
///
/// Maintenance endpoint, not on any user path.
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/repair",
    responses(
        (status = 200, description = "Sweep finished", body = RepairReport),
    ),
    tags = ["enrollments"],
    operation_id = "repairEnrollments"
)]
#[post("/enrollments/repair")]
pub async fn repair_enrollments(
    service: web::Data<AppEnrollmentService>,
) -> ApiResult<web::Json<RepairReport>> {
    let report = service.repair_duplicates().await?;
    Ok(web::Json(report))
}
