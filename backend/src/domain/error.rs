//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses or any other protocol-specific envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// The actor is not permitted to perform this action.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// Another booking claimed the slot first.
    AlreadyBooked,
    /// The student has no active enrollment with the mentor.
    NotEnrolled,
    /// The meeting is not in a state from which this action is legal.
    InvalidTransition,
    /// The slot batch has expired or been archived.
    ExpiredOrCancelled,
    /// A backing dependency is unavailable.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// Domain error payload carried from services to adapters.
///
/// # Examples
/// ```
/// use backend::domain::{DomainError, ErrorCode};
///
/// let err = DomainError::not_found("missing");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainError {
    #[schema(example = "already_booked")]
    code: ErrorCode,
    #[schema(example = "slot 2 is already booked")]
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl DomainError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary error details for adapters.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::DomainError;
    /// use serde_json::json;
    ///
    /// let err = DomainError::invalid_request("bad slot index")
    ///     .with_details(json!({ "slotIndex": 9 }));
    /// assert!(err.details().is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::AlreadyBooked`].
    pub fn already_booked(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyBooked, message)
    }

    /// Convenience constructor for [`ErrorCode::NotEnrolled`].
    pub fn not_enrolled(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotEnrolled, message)
    }

    /// Convenience constructor for [`ErrorCode::InvalidTransition`].
    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransition, message)
    }

    /// Convenience constructor for [`ErrorCode::ExpiredOrCancelled`].
    pub fn expired_or_cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExpiredOrCancelled, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(DomainError::already_booked("taken"), ErrorCode::AlreadyBooked)]
    #[case(DomainError::not_enrolled("no pair"), ErrorCode::NotEnrolled)]
    #[case(DomainError::invalid_transition("bad state"), ErrorCode::InvalidTransition)]
    #[case(DomainError::expired_or_cancelled("gone"), ErrorCode::ExpiredOrCancelled)]
    fn constructors_set_expected_codes(#[case] err: DomainError, #[case] code: ErrorCode) {
        assert_eq!(err.code(), code);
    }

    #[rstest]
    fn serialises_codes_as_snake_case() {
        let err = DomainError::already_booked("slot 2 is already booked");
        let value = serde_json::to_value(&err).expect("error serialises");
        assert_eq!(value["code"], json!("already_booked"));
    }

    #[rstest]
    fn details_round_trip() {
        let err = DomainError::invalid_request("bad").with_details(json!({ "slotIndex": 3 }));
        assert_eq!(err.details(), Some(&json!({ "slotIndex": 3 })));
    }
}
