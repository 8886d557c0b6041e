//! Meeting lifecycle service: persistence and side effects around the pure
//! state machine in [`crate::domain::meeting`].
//!
//! Every transition is written back through the repository's conditional
//! update. When the write reports the row moved underneath us, the caller
//! gets `InvalidTransition` and decides whether to re-read; nothing is
//! retried here. System messages and notifications are best-effort and
//! never fail the transition that produced them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::{
    MeetingRepository, MeetingRepositoryError, MeetingUpdateOutcome, ThreadMessenger,
};
use crate::domain::{
    DomainError, Meeting, MeetingStatus, MeetingTransitionError, Notification,
    NotificationDebouncer, NotificationKind, RescheduleDecision, UserId,
};

fn map_meeting_repo_error(error: MeetingRepositoryError) -> DomainError {
    match error {
        MeetingRepositoryError::Connection { message } => DomainError::service_unavailable(
            format!("meeting repository unavailable: {message}"),
        ),
        MeetingRepositoryError::Query { message } => {
            DomainError::internal(format!("meeting repository error: {message}"))
        }
    }
}

fn map_transition_error(error: MeetingTransitionError) -> DomainError {
    match &error {
        MeetingTransitionError::IllegalTransition { .. }
        | MeetingTransitionError::RequestNotPending { .. } => {
            DomainError::invalid_transition(error.to_string())
        }
        MeetingTransitionError::NotParticipant { .. }
        | MeetingTransitionError::RequesterCannotResolve => {
            DomainError::forbidden(error.to_string())
        }
        MeetingTransitionError::NoSuchRequest { .. } => DomainError::not_found(error.to_string()),
    }
}

/// Service advancing meetings through their lifecycle.
#[derive(Clone)]
pub struct MeetingService<R, M> {
    meeting_repo: Arc<R>,
    messenger: Arc<M>,
    debouncer: NotificationDebouncer,
    clock: Arc<dyn Clock>,
}

impl<R, M> MeetingService<R, M> {
    /// Create the service with its repository, thread messenger, debouncer,
    /// and clock.
    pub fn new(
        meeting_repo: Arc<R>,
        messenger: Arc<M>,
        debouncer: NotificationDebouncer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            meeting_repo,
            messenger,
            debouncer,
            clock,
        }
    }
}

impl<R, M> MeetingService<R, M>
where
    R: MeetingRepository,
    M: ThreadMessenger,
{
    async fn load(&self, meeting_id: &Uuid) -> Result<Meeting, DomainError> {
        self.meeting_repo
            .find_by_id(meeting_id)
            .await
            .map_err(map_meeting_repo_error)?
            .ok_or_else(|| DomainError::not_found(format!("meeting {meeting_id} not found")))
    }

    /// Write `next` keyed on the state the transition started from.
    async fn persist(&self, prior: &Meeting, next: Meeting) -> Result<Meeting, DomainError> {
        let outcome = self
            .meeting_repo
            .update_if_current(&next, prior.status, &prior.reschedule_requests)
            .await
            .map_err(map_meeting_repo_error)?;
        match outcome {
            MeetingUpdateOutcome::Updated => Ok(next),
            MeetingUpdateOutcome::Stale => Err(DomainError::invalid_transition(
                "the meeting was modified concurrently; refresh and retry the action",
            )),
            MeetingUpdateOutcome::NotFound => Err(DomainError::not_found(format!(
                "meeting {} not found",
                prior.id
            ))),
        }
    }

    async fn post_system_message(&self, meeting: &Meeting, body: &str) {
        if let Err(err) = self
            .messenger
            .post_system_message(&meeting.thread_id, body)
            .await
        {
            warn!(
                meeting_id = %meeting.id,
                thread_id = %meeting.thread_id,
                error = %err,
                "failed to post system message"
            );
        }
    }

    async fn notify(&self, meeting: &Meeting, recipient: UserId, kind: NotificationKind, body: String) {
        self.debouncer
            .trigger(
                Notification {
                    recipient,
                    scope: meeting.id.to_string(),
                    kind,
                    subject: "Meeting update".to_owned(),
                    body,
                },
                false,
            )
            .await;
    }

    /// Open a new meeting request between a student and a mentor.
    pub async fn request(
        &self,
        student_id: UserId,
        mentor_id: UserId,
        thread_id: Uuid,
        reason: Option<String>,
    ) -> Result<Meeting, DomainError> {
        if student_id == mentor_id {
            return Err(DomainError::invalid_request(
                "a meeting needs two distinct participants",
            ));
        }

        let meeting = Meeting::request(
            Uuid::new_v4(),
            thread_id,
            student_id,
            mentor_id,
            reason,
            self.clock.utc(),
        );
        self.meeting_repo
            .insert(&meeting)
            .await
            .map_err(map_meeting_repo_error)?;

        self.post_system_message(&meeting, "A meeting has been requested.")
            .await;
        self.notify(
            &meeting,
            mentor_id,
            NotificationKind::MeetingRequested,
            "A student requested a meeting with you".to_owned(),
        )
        .await;
        Ok(meeting)
    }

    /// Fetch a meeting by id.
    pub async fn get(&self, meeting_id: &Uuid) -> Result<Meeting, DomainError> {
        self.load(meeting_id).await
    }

    /// Fix the meeting time: `Requested → Scheduled`.
    pub async fn schedule(
        &self,
        meeting_id: &Uuid,
        scheduled_time: DateTime<Utc>,
        actor_id: UserId,
    ) -> Result<Meeting, DomainError> {
        let prior = self.load(meeting_id).await?;
        let next = prior
            .clone()
            .schedule(scheduled_time, actor_id, self.clock.utc())
            .map_err(map_transition_error)?;
        let meeting = self.persist(&prior, next).await?;

        self.post_system_message(
            &meeting,
            &format!("Meeting scheduled for {scheduled_time}."),
        )
        .await;
        if let Some(counterparty) = meeting.counterparty(actor_id) {
            self.notify(
                &meeting,
                counterparty,
                NotificationKind::MeetingScheduled,
                format!("Your meeting was scheduled for {scheduled_time}"),
            )
            .await;
        }
        Ok(meeting)
    }

    /// Distribute the join link: `Scheduled → LinkSent`.
    pub async fn send_link(
        &self,
        meeting_id: &Uuid,
        link: String,
        room_id: String,
    ) -> Result<Meeting, DomainError> {
        let prior = self.load(meeting_id).await?;
        let next = prior
            .clone()
            .send_link(link, room_id, self.clock.utc())
            .map_err(map_transition_error)?;
        let meeting = self.persist(&prior, next).await?;

        self.post_system_message(&meeting, "The meeting link has been shared.")
            .await;
        self.notify(
            &meeting,
            meeting.student_id,
            NotificationKind::MeetingLinkSent,
            "Your meeting link is ready".to_owned(),
        )
        .await;
        Ok(meeting)
    }

    /// Close out a held session: `LinkSent → Completed` (or `Scheduled →
    /// Completed` when no link was needed).
    pub async fn complete(&self, meeting_id: &Uuid) -> Result<Meeting, DomainError> {
        let prior = self.load(meeting_id).await?;
        let next = prior
            .clone()
            .complete(self.clock.utc())
            .map_err(map_transition_error)?;
        let meeting = self.persist(&prior, next).await?;

        self.post_system_message(&meeting, "The meeting was completed.")
            .await;
        Ok(meeting)
    }

    /// Cancel a not-yet-committed meeting. Idempotent on `Cancelled`.
    pub async fn cancel(
        &self,
        meeting_id: &Uuid,
        actor_id: UserId,
        reason: Option<String>,
    ) -> Result<Meeting, DomainError> {
        let prior = self.load(meeting_id).await?;
        if prior.status == MeetingStatus::Cancelled {
            return Ok(prior);
        }

        let next = prior
            .clone()
            .cancel(actor_id, self.clock.utc())
            .map_err(map_transition_error)?;
        let meeting = self.persist(&prior, next).await?;

        let message = reason.as_deref().map_or_else(
            || "The meeting was cancelled.".to_owned(),
            |why| format!("The meeting was cancelled: {why}"),
        );
        self.post_system_message(&meeting, &message).await;
        if let Some(counterparty) = meeting.counterparty(actor_id) {
            self.notify(
                &meeting,
                counterparty,
                NotificationKind::MeetingCancelled,
                message,
            )
            .await;
        }
        Ok(meeting)
    }

    /// Record a reschedule proposal without moving the meeting state.
    pub async fn propose_reschedule(
        &self,
        meeting_id: &Uuid,
        requested_by: UserId,
        proposed_time: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<Meeting, DomainError> {
        let prior = self.load(meeting_id).await?;
        let next = prior
            .clone()
            .propose_reschedule(requested_by, proposed_time, note, self.clock.utc())
            .map_err(map_transition_error)?;
        let meeting = self.persist(&prior, next).await?;

        self.post_system_message(
            &meeting,
            &format!("A new time was proposed: {proposed_time}."),
        )
        .await;
        if let Some(counterparty) = meeting.counterparty(requested_by) {
            self.notify(
                &meeting,
                counterparty,
                NotificationKind::RescheduleProposed,
                format!("A reschedule to {proposed_time} was proposed"),
            )
            .await;
        }
        Ok(meeting)
    }

    /// Resolve a pending reschedule proposal as the counterparty.
    pub async fn resolve_reschedule(
        &self,
        meeting_id: &Uuid,
        request_index: usize,
        decision: RescheduleDecision,
        actor_id: UserId,
    ) -> Result<Meeting, DomainError> {
        let prior = self.load(meeting_id).await?;
        let next = prior
            .clone()
            .resolve_reschedule(request_index, decision, actor_id, self.clock.utc())
            .map_err(map_transition_error)?;
        let meeting = self.persist(&prior, next).await?;

        let verdict = match decision {
            RescheduleDecision::Accepted => "accepted",
            RescheduleDecision::Rejected => "declined",
        };
        self.post_system_message(
            &meeting,
            &format!("The reschedule proposal was {verdict}."),
        )
        .await;
        if let Some(request) = meeting.reschedule_requests.get(request_index) {
            self.notify(
                &meeting,
                request.requested_by,
                NotificationKind::RescheduleResolved,
                format!("Your reschedule proposal was {verdict}"),
            )
            .await;
        }
        Ok(meeting)
    }
}

#[cfg(test)]
#[path = "meeting_service_tests.rs"]
mod tests;
