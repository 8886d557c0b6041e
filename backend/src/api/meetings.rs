//! Meeting lifecycle API handlers.

use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::domain::{Meeting, RescheduleDecision, UserId};
use crate::server::AppMeetingService;

/// Request body for opening a meeting request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeetingRequest {
    pub student_id: UserId,
    pub mentor_id: UserId,
    /// Chat thread the lifecycle posts its system messages to.
    pub thread_id: Uuid,
    pub reason: Option<String>,
}

/// Open a new meeting request.
#[utoipa::path(
    post,
    path = "/api/v1/meetings",
    request_body = RequestMeetingRequest,
    responses(
        (status = 201, description = "Meeting requested", body = Meeting),
        (status = 400, description = "Participants are not distinct"),
    ),
    tags = ["meetings"],
    operation_id = "requestMeeting"
)]
#[post("/meetings")]
pub async fn request_meeting(
    service: web::Data<AppMeetingService>,
    body: web::Json<RequestMeetingRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let meeting = service
        .request(body.student_id, body.mentor_id, body.thread_id, body.reason)
        .await?;
    Ok(HttpResponse::Created().json(meeting))
}

/// Fetch a meeting by id.
#[utoipa::path(
    get,
    path = "/api/v1/meetings/{meeting_id}",
    responses(
        (status = 200, description = "Meeting", body = Meeting),
        (status = 404, description = "Unknown meeting"),
    ),
    tags = ["meetings"],
    operation_id = "getMeeting"
)]
#[get("/meetings/{meeting_id}")]
pub async fn get_meeting(
    service: web::Data<AppMeetingService>,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<Meeting>> {
    let meeting = service.get(&path.into_inner()).await?;
    Ok(web::Json(meeting))
}

/// Lifecycle action applied to a meeting.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdvanceMeetingRequest {
    /// `requested → scheduled`.
    #[serde(rename_all = "camelCase")]
    Schedule {
        scheduled_time: DateTime<Utc>,
        actor_id: UserId,
    },
    /// `scheduled → link_sent`.
    #[serde(rename_all = "camelCase")]
    SendLink { link: String, room_id: String },
    /// `link_sent → completed` (or `scheduled → completed`).
    Complete,
    /// `requested | scheduled → cancelled`; idempotent once cancelled.
    #[serde(rename_all = "camelCase")]
    Cancel {
        actor_id: UserId,
        reason: Option<String>,
    },
}

/// Advance a meeting through its lifecycle.
///
/// Illegal transitions are rejected whole: the meeting is left untouched
/// and the caller should refresh its view rather than retry blindly.
#[utoipa::path(
    post,
    path = "/api/v1/meetings/{meeting_id}/advance",
    request_body = AdvanceMeetingRequest,
    responses(
        (status = 200, description = "Meeting advanced", body = Meeting),
        (status = 403, description = "Actor is not a participant"),
        (status = 404, description = "Unknown meeting"),
        (status = 409, description = "Action is illegal from the current state"),
    ),
    tags = ["meetings"],
    operation_id = "advanceMeeting"
)]
#[post("/meetings/{meeting_id}/advance")]
pub async fn advance_meeting(
    service: web::Data<AppMeetingService>,
    path: web::Path<Uuid>,
    body: web::Json<AdvanceMeetingRequest>,
) -> ApiResult<web::Json<Meeting>> {
    let meeting_id = path.into_inner();
    let meeting = match body.into_inner() {
        AdvanceMeetingRequest::Schedule {
            scheduled_time,
            actor_id,
        } => {
            service
                .schedule(&meeting_id, scheduled_time, actor_id)
                .await?
        }
        AdvanceMeetingRequest::SendLink { link, room_id } => {
            service.send_link(&meeting_id, link, room_id).await?
        }
        AdvanceMeetingRequest::Complete => service.complete(&meeting_id).await?,
        AdvanceMeetingRequest::Cancel { actor_id, reason } => {
            service.cancel(&meeting_id, actor_id, reason).await?
        }
    };
    Ok(web::Json(meeting))
}

/// Request body for proposing a new meeting time.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposeRescheduleRequest {
    pub requested_by: UserId,
    pub proposed_time: DateTime<Utc>,
    pub note: Option<String>,
}

/// Propose a new time for a scheduled meeting.
#[utoipa::path(
    post,
    path = "/api/v1/meetings/{meeting_id}/reschedule-requests",
    request_body = ProposeRescheduleRequest,
    responses(
        (status = 200, description = "Proposal recorded", body = Meeting),
        (status = 403, description = "Proposer is not a participant"),
        (status = 409, description = "Nothing to reschedule in the current state"),
    ),
    tags = ["meetings"],
    operation_id = "proposeReschedule"
)]
#[post("/meetings/{meeting_id}/reschedule-requests")]
pub async fn propose_reschedule(
    service: web::Data<AppMeetingService>,
    path: web::Path<Uuid>,
    body: web::Json<ProposeRescheduleRequest>,
) -> ApiResult<web::Json<Meeting>> {
    let body = body.into_inner();
    let meeting = service
        .propose_reschedule(
            &path.into_inner(),
            body.requested_by,
            body.proposed_time,
            body.note,
        )
        .await?;
    Ok(web::Json(meeting))
}

/// Request body for resolving a reschedule proposal.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRescheduleRequest {
    pub decision: RescheduleDecision,
    pub actor_id: UserId,
}

/// Accept or reject a pending reschedule proposal as the counterparty.
#[utoipa::path(
    post,
    path = "/api/v1/meetings/{meeting_id}/reschedule-requests/{request_index}/resolve",
    request_body = ResolveRescheduleRequest,
    responses(
        (status = 200, description = "Proposal resolved", body = Meeting),
        (status = 403, description = "Resolver is the requester or an outsider"),
        (status = 404, description = "Unknown meeting or request index"),
        (status = 409, description = "Request already resolved"),
    ),
    tags = ["meetings"],
    operation_id = "resolveReschedule"
)]
#[post("/meetings/{meeting_id}/reschedule-requests/{request_index}/resolve")]
pub async fn resolve_reschedule(
    service: web::Data<AppMeetingService>,
    path: web::Path<(Uuid, usize)>,
    body: web::Json<ResolveRescheduleRequest>,
) -> ApiResult<web::Json<Meeting>> {
    let (meeting_id, request_index) = path.into_inner();
    let meeting = service
        .resolve_reschedule(&meeting_id, request_index, body.decision, body.actor_id)
        .await?;
    Ok(web::Json(meeting))
}
