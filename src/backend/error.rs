//! # Backend Errors
//!
//! Two tiers, never mixed:
//!
//! - [`TransportError`]: the call never produced an answer (channel closed, build or handshake
//!   failed). Retried by [`RetryPolicy`](crate::retry::RetryPolicy).
//! - [`ErrorCode`]: the backend answered with a domain failure inside a
//!   [`ResultEnvelope`](super::ResultEnvelope). Never retried, mapped to a message instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors raised while talking to the backend actor itself.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum TransportError {
    #[error("Backend actor closed")]
    ActorClosed,
    #[error("Backend actor dropped response channel")]
    ActorDropped,
    #[error("Failed to build backend actor: {0}")]
    Build(String),
    #[error("Access control handshake failed: {0}")]
    Handshake(String),
}

/// Domain failure codes returned by the backend inside an envelope.
///
/// `Unrecognized` absorbs codes introduced by newer backends so that deserialization never fails
/// on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    RoleNotSet,
    RecruiterCannotApply,
    NoApplicationFound,
    AlreadyRegistered,
    JobSeekerCannotSearch,
    Unauthorized,
    InvalidCredentials,
    RoleAlreadySet,
    ProfileNotFound,
    #[serde(other)]
    Unrecognized,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::RoleNotSet => "roleNotSet",
            ErrorCode::RecruiterCannotApply => "recruiterCannotApply",
            ErrorCode::NoApplicationFound => "noApplicationFound",
            ErrorCode::AlreadyRegistered => "alreadyRegistered",
            ErrorCode::JobSeekerCannotSearch => "jobSeekerCannotSearch",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::InvalidCredentials => "invalidCredentials",
            ErrorCode::RoleAlreadySet => "roleAlreadySet",
            ErrorCode::ProfileNotFound => "profileNotFound",
            ErrorCode::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_wire_names() {
        let code: ErrorCode = serde_json::from_str("\"noApplicationFound\"").unwrap();
        assert_eq!(code, ErrorCode::NoApplicationFound);
        assert_eq!(
            serde_json::to_string(&ErrorCode::JobSeekerCannotSearch).unwrap(),
            "\"jobSeekerCannotSearch\""
        );
    }

    #[test]
    fn test_unknown_code_is_absorbed() {
        let code: ErrorCode = serde_json::from_str("\"accountSuspended\"").unwrap();
        assert_eq!(code, ErrorCode::Unrecognized);
    }
}
