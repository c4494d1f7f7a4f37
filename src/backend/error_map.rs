//! Maps backend [`ErrorCode`]s to user-facing messages and recovery actions.

use super::error::ErrorCode;
use serde::Serialize;

/// What the UI should offer the user after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryAction {
    Retry,
    Login,
    Onboarding,
}

/// Message and actions presented for a backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendErrorInfo {
    pub message: &'static str,
    pub actions: &'static [RecoveryAction],
}

impl BackendErrorInfo {
    pub fn offers(&self, action: RecoveryAction) -> bool {
        self.actions.contains(&action)
    }
}

/// Shown when nothing more specific applies.
pub const UNEXPECTED_ERROR: BackendErrorInfo = BackendErrorInfo {
    message: "An unexpected error occurred. Please try again.",
    actions: &[RecoveryAction::Retry],
};

/// Shown once connection retries are exhausted.
pub const CONNECTION_FAILED_MESSAGE: &str =
    "Unable to connect to the backend system. Please check your connection and try again.";

/// Total over [`ErrorCode`]; unknown codes land on [`UNEXPECTED_ERROR`].
pub fn map_backend_error(code: ErrorCode) -> BackendErrorInfo {
    use RecoveryAction::*;

    match code {
        ErrorCode::ProfileNotFound => BackendErrorInfo {
            message: "Your profile could not be found. Please log in again to continue.",
            actions: &[Login, Retry],
        },
        ErrorCode::RoleNotSet => BackendErrorInfo {
            message: "Your account role is not set. Please complete the onboarding process.",
            actions: &[Onboarding],
        },
        ErrorCode::NoApplicationFound => BackendErrorInfo {
            message: "No application found. You can create one by submitting your information.",
            actions: &[Retry],
        },
        ErrorCode::Unauthorized => BackendErrorInfo {
            message: "Your session has expired or you need to log in to continue.",
            actions: &[Login],
        },
        ErrorCode::InvalidCredentials => BackendErrorInfo {
            message: "Invalid email or password. Please try again.",
            actions: &[Retry],
        },
        ErrorCode::AlreadyRegistered => BackendErrorInfo {
            message: "This email is already registered. Please log in instead.",
            actions: &[Login],
        },
        ErrorCode::RoleAlreadySet => BackendErrorInfo {
            message: "Your role has already been set and cannot be changed.",
            actions: &[Retry],
        },
        ErrorCode::RecruiterCannotApply => BackendErrorInfo {
            message: "Recruiters cannot submit job applications.",
            actions: &[],
        },
        ErrorCode::JobSeekerCannotSearch => BackendErrorInfo {
            message: "Job seekers cannot search for applicants.",
            actions: &[],
        },
        ErrorCode::Unrecognized => UNEXPECTED_ERROR,
    }
}
