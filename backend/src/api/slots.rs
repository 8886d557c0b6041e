//! Slot batch and booking API handlers.

use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::domain::{PublishSlotBatch, SlotBatch, SlotBatchStatus, SlotSpec, UserId};
use crate::server::{AppSlotBatchService, AppSlotBookingService};

/// Request body for publishing a batch of candidate slots.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishSlotsRequest {
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "Europe/London")]
    pub timezone: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub slots: Vec<SlotSpec>,
}

/// Publish a new slot batch.
#[utoipa::path(
    post,
    path = "/api/v1/slot-batches",
    request_body = PublishSlotsRequest,
    responses(
        (status = 201, description = "Batch published", body = SlotBatch),
        (status = 400, description = "Empty slot list or inverted interval"),
    ),
    tags = ["slots"],
    operation_id = "publishSlots"
)]
#[post("/slot-batches")]
pub async fn publish_slots(
    service: web::Data<AppSlotBatchService>,
    body: web::Json<PublishSlotsRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let batch = service
        .publish(PublishSlotBatch {
            owner_id: body.owner_id,
            title: body.title,
            description: body.description,
            timezone: body.timezone,
            expires_at: body.expires_at,
            slots: body.slots,
        })
        .await?;
    Ok(HttpResponse::Created().json(batch))
}

/// Fetch one batch with its slots.
#[utoipa::path(
    get,
    path = "/api/v1/slot-batches/{batch_id}",
    responses(
        (status = 200, description = "Batch", body = SlotBatch),
        (status = 404, description = "Unknown batch"),
    ),
    tags = ["slots"],
    operation_id = "getSlotBatch"
)]
#[get("/slot-batches/{batch_id}")]
pub async fn get_slot_batch(
    service: web::Data<AppSlotBatchService>,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<SlotBatch>> {
    let batch = service.get(&path.into_inner()).await?;
    Ok(web::Json(batch))
}

/// Active batches owned by a mentor.
#[utoipa::path(
    get,
    path = "/api/v1/mentors/{mentor_id}/slot-batches",
    responses(
        (status = 200, description = "Active batches", body = [SlotBatch]),
    ),
    tags = ["slots"],
    operation_id = "listMentorSlotBatches"
)]
#[get("/mentors/{mentor_id}/slot-batches")]
pub async fn list_mentor_slot_batches(
    service: web::Data<AppSlotBatchService>,
    path: web::Path<UserId>,
) -> ApiResult<web::Json<Vec<SlotBatch>>> {
    let batches = service.list_active_for_owner(path.into_inner()).await?;
    Ok(web::Json(batches))
}

/// Batches a student can currently book into.
#[utoipa::path(
    get,
    path = "/api/v1/students/{student_id}/bookable-slot-batches",
    responses(
        (status = 200, description = "Bookable batches", body = [SlotBatch]),
    ),
    tags = ["slots"],
    operation_id = "listBookableSlotBatches"
)]
#[get("/students/{student_id}/bookable-slot-batches")]
pub async fn list_bookable_slot_batches(
    service: web::Data<AppSlotBatchService>,
    path: web::Path<UserId>,
) -> ApiResult<web::Json<Vec<SlotBatch>>> {
    let batches = service.list_bookable_for_student(path.into_inner()).await?;
    Ok(web::Json(batches))
}

/// Request body for archiving a batch.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveBatchRequest {
    pub owner_id: UserId,
    pub status: SlotBatchStatus,
}

/// Archive a batch as completed or cancelled.
#[utoipa::path(
    post,
    path = "/api/v1/slot-batches/{batch_id}/archive",
    request_body = ArchiveBatchRequest,
    responses(
        (status = 200, description = "Batch archived", body = SlotBatch),
        (status = 403, description = "Not the batch owner"),
        (status = 404, description = "Unknown batch"),
        (status = 409, description = "Batch already archived differently"),
    ),
    tags = ["slots"],
    operation_id = "archiveSlotBatch"
)]
#[post("/slot-batches/{batch_id}/archive")]
pub async fn archive_slot_batch(
    service: web::Data<AppSlotBatchService>,
    path: web::Path<Uuid>,
    body: web::Json<ArchiveBatchRequest>,
) -> ApiResult<web::Json<SlotBatch>> {
    let batch = service
        .archive(&path.into_inner(), body.owner_id, body.status)
        .await?;
    Ok(web::Json(batch))
}

/// Request body for claiming a slot.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookSlotRequest {
    pub student_id: UserId,
}

/// Response for a successful claim.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookSlotResponse {
    pub success: bool,
    pub slot_index: i32,
    pub booked_at: Option<DateTime<Utc>>,
}

/// Claim one slot for a student.
#[utoipa::path(
    post,
    path = "/api/v1/slot-batches/{batch_id}/slots/{slot_index}/book",
    request_body = BookSlotRequest,
    responses(
        (status = 200, description = "Slot claimed", body = BookSlotResponse),
        (status = 403, description = "Student not enrolled with the mentor"),
        (status = 404, description = "Unknown batch"),
        (status = 409, description = "Slot already booked; refresh and pick another"),
        (status = 410, description = "Batch expired or archived"),
    ),
    tags = ["slots"],
    operation_id = "bookSlot"
)]
#[post("/slot-batches/{batch_id}/slots/{slot_index}/book")]
pub async fn book_slot(
    service: web::Data<AppSlotBookingService>,
    path: web::Path<(Uuid, i32)>,
    body: web::Json<BookSlotRequest>,
) -> ApiResult<web::Json<BookSlotResponse>> {
    let (batch_id, slot_index) = path.into_inner();
    let slot = service.book(&batch_id, slot_index, body.student_id).await?;
    Ok(web::Json(BookSlotResponse {
        success: true,
        slot_index: slot.index,
        booked_at: slot.booked_at,
    }))
}

/// Request body for moving a booking to a different slot.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleSlotRequest {
    pub student_id: UserId,
    pub old_slot_index: i32,
    pub new_slot_index: i32,
}

/// Move a student's booking to another slot in the same batch.
#[utoipa::path(
    post,
    path = "/api/v1/slot-batches/{batch_id}/slots/reschedule",
    request_body = RescheduleSlotRequest,
    responses(
        (status = 200, description = "Booking moved", body = BookSlotResponse),
        (status = 403, description = "Existing booking belongs to someone else"),
        (status = 409, description = "Target slot already booked"),
        (status = 410, description = "Batch expired or archived"),
    ),
    tags = ["slots"],
    operation_id = "rescheduleSlot"
)]
#[post("/slot-batches/{batch_id}/slots/reschedule")]
pub async fn reschedule_slot(
    service: web::Data<AppSlotBookingService>,
    path: web::Path<Uuid>,
    body: web::Json<RescheduleSlotRequest>,
) -> ApiResult<web::Json<BookSlotResponse>> {
    let slot = service
        .reschedule(
            &path.into_inner(),
            body.old_slot_index,
            body.new_slot_index,
            body.student_id,
        )
        .await?;
    Ok(web::Json(BookSlotResponse {
        success: true,
        slot_index: slot.index,
        booked_at: slot.booked_at,
    }))
}
