//! Meeting lifecycle entities and the transition rules between them.
//!
//! A meeting is a single negotiated session, distinct from a booked slot.
//! Transitions here are pure: they consume the current value and return the
//! next one, or a typed error when the move is illegal. Persisting a
//! transition is the service's job and is guarded by a conditional write
//! keyed on the status the transition started from, so two parties acting
//! near-simultaneously cannot overwrite each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::UserId;

/// Lifecycle states of a meeting.
///
/// `Cancelled` is reachable from `Requested` and `Scheduled` only; once a
/// link has gone out the meeting is committed and can only complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Requested,
    Scheduled,
    LinkSent,
    Completed,
    Cancelled,
}

/// Resolution state of a reschedule proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Decision applied when resolving a reschedule proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleDecision {
    Accepted,
    Rejected,
}

/// One entry in a meeting's append-only reschedule negotiation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub requested_by: UserId,
    pub proposed_time: DateTime<Utc>,
    pub note: Option<String>,
    pub status: RescheduleStatus,
    pub created_at: DateTime<Utc>,
}

/// Errors raised by illegal transitions or wrong actors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeetingTransitionError {
    #[error("cannot {action} a meeting in state {from:?}")]
    IllegalTransition {
        from: MeetingStatus,
        action: &'static str,
    },
    #[error("actor {actor} is not a participant of this meeting")]
    NotParticipant { actor: UserId },
    #[error("a reschedule request cannot be resolved by its requester")]
    RequesterCannotResolve,
    #[error("no reschedule request at index {index}")]
    NoSuchRequest { index: usize },
    #[error("reschedule request {index} is not pending")]
    RequestNotPending { index: usize },
}

/// A single negotiated session between one student and one mentor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: Uuid,
    /// Chat thread the lifecycle posts its system messages to.
    pub thread_id: Uuid,
    pub student_id: UserId,
    pub mentor_id: UserId,
    pub reason: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub link: Option<String>,
    pub room_id: Option<String>,
    pub status: MeetingStatus,
    pub reschedule_requests: Vec<RescheduleRequest>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    /// Create a meeting in the `Requested` state.
    pub fn request(
        id: Uuid,
        thread_id: Uuid,
        student_id: UserId,
        mentor_id: UserId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            thread_id,
            student_id,
            mentor_id,
            reason,
            scheduled_time: None,
            link: None,
            room_id: None,
            status: MeetingStatus::Requested,
            reschedule_requests: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the given user is the student or the mentor.
    pub fn involves(&self, user_id: UserId) -> bool {
        self.student_id == user_id || self.mentor_id == user_id
    }

    /// The participant opposite `user_id`.
    pub fn counterparty(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.student_id {
            Some(self.mentor_id)
        } else if user_id == self.mentor_id {
            Some(self.student_id)
        } else {
            None
        }
    }

    fn require_participant(&self, actor: UserId) -> Result<(), MeetingTransitionError> {
        if self.involves(actor) {
            Ok(())
        } else {
            Err(MeetingTransitionError::NotParticipant { actor })
        }
    }

    /// `Requested → Scheduled`, fixing the agreed time.
    pub fn schedule(
        mut self,
        scheduled_time: DateTime<Utc>,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, MeetingTransitionError> {
        self.require_participant(actor)?;
        if self.status != MeetingStatus::Requested {
            return Err(MeetingTransitionError::IllegalTransition {
                from: self.status,
                action: "schedule",
            });
        }
        self.scheduled_time = Some(scheduled_time);
        self.status = MeetingStatus::Scheduled;
        self.updated_at = now;
        Ok(self)
    }

    /// `Scheduled → LinkSent`, recording the distributed join link.
    pub fn send_link(
        mut self,
        link: String,
        room_id: String,
        now: DateTime<Utc>,
    ) -> Result<Self, MeetingTransitionError> {
        if self.status != MeetingStatus::Scheduled {
            return Err(MeetingTransitionError::IllegalTransition {
                from: self.status,
                action: "send a link for",
            });
        }
        self.link = Some(link);
        self.room_id = Some(room_id);
        self.status = MeetingStatus::LinkSent;
        self.updated_at = now;
        Ok(self)
    }

    /// `LinkSent → Completed`, or `Scheduled → Completed` for no-link sessions.
    pub fn complete(mut self, now: DateTime<Utc>) -> Result<Self, MeetingTransitionError> {
        if !matches!(
            self.status,
            MeetingStatus::LinkSent | MeetingStatus::Scheduled
        ) {
            return Err(MeetingTransitionError::IllegalTransition {
                from: self.status,
                action: "complete",
            });
        }
        self.status = MeetingStatus::Completed;
        self.updated_at = now;
        Ok(self)
    }

    /// Cancel from `Requested` or `Scheduled`. Idempotent on `Cancelled`.
    pub fn cancel(
        mut self,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, MeetingTransitionError> {
        self.require_participant(actor)?;
        match self.status {
            MeetingStatus::Cancelled => Ok(self),
            MeetingStatus::Requested | MeetingStatus::Scheduled => {
                self.status = MeetingStatus::Cancelled;
                self.updated_at = now;
                Ok(self)
            }
            from => Err(MeetingTransitionError::IllegalTransition {
                from,
                action: "cancel",
            }),
        }
    }

    /// Append a pending reschedule proposal. Does not change `status`.
    pub fn propose_reschedule(
        mut self,
        requested_by: UserId,
        proposed_time: DateTime<Utc>,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, MeetingTransitionError> {
        self.require_participant(requested_by)?;
        if !matches!(
            self.status,
            MeetingStatus::Scheduled | MeetingStatus::LinkSent
        ) {
            return Err(MeetingTransitionError::IllegalTransition {
                from: self.status,
                action: "propose a reschedule for",
            });
        }
        self.reschedule_requests.push(RescheduleRequest {
            requested_by,
            proposed_time,
            note,
            status: RescheduleStatus::Pending,
            created_at: now,
        });
        self.updated_at = now;
        Ok(self)
    }

    /// Resolve a pending proposal. Only the counterparty may resolve.
    ///
    /// Acceptance moves `scheduled_time` to the proposed time. A meeting in
    /// `LinkSent` regresses to `Scheduled` with `link`/`room_id` cleared: the
    /// old link pointed at the old time and must not survive the change.
    pub fn resolve_reschedule(
        mut self,
        index: usize,
        decision: RescheduleDecision,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, MeetingTransitionError> {
        self.require_participant(actor)?;
        let request = self
            .reschedule_requests
            .get_mut(index)
            .ok_or(MeetingTransitionError::NoSuchRequest { index })?;
        if request.requested_by == actor {
            return Err(MeetingTransitionError::RequesterCannotResolve);
        }
        if request.status != RescheduleStatus::Pending {
            return Err(MeetingTransitionError::RequestNotPending { index });
        }

        match decision {
            RescheduleDecision::Rejected => {
                request.status = RescheduleStatus::Rejected;
            }
            RescheduleDecision::Accepted => {
                let proposed_time = request.proposed_time;
                request.status = RescheduleStatus::Accepted;
                self.scheduled_time = Some(proposed_time);
                if self.status == MeetingStatus::LinkSent {
                    self.link = None;
                    self.room_id = None;
                    self.status = MeetingStatus::Scheduled;
                }
            }
        }
        self.updated_at = now;
        Ok(self)
    }
}

#[cfg(test)]
#[path = "meeting_tests.rs"]
mod tests;
