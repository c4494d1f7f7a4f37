//! # Backend Messages
//!
//! Requests sent from a [`BackendClient`](super::BackendClient) to whatever serves the backend
//! actor. Every variant carries a `oneshot` responder; the server answers exactly once or drops
//! the responder.

use super::envelope::ResultEnvelope;
use super::error::TransportError;
use super::types::{JobApplicantProfile, Location, PhotoBlob, Principal, UserProfile, UserRole};
use std::fmt;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the backend.
pub type Response<T> = oneshot::Sender<Result<T, TransportError>>;

/// Request enum mirroring the backend actor's interface.
#[derive(Debug)]
pub enum BackendRequest {
    InitializeAccessControl {
        secret: String,
        respond_to: Response<()>,
    },
    AuthenticateUser {
        email: String,
        password: String,
        respond_to: Response<ResultEnvelope<()>>,
    },
    RegisterUser {
        profile: UserProfile,
        password: String,
        respond_to: Response<ResultEnvelope<Principal>>,
    },
    GetCallerUserProfile {
        respond_to: Response<ResultEnvelope<Option<UserProfile>>>,
    },
    SaveCallerUserProfile {
        profile: UserProfile,
        respond_to: Response<ResultEnvelope<()>>,
    },
    SetUserRole {
        role: UserRole,
        respond_to: Response<ResultEnvelope<()>>,
    },
    SetUserLocation {
        location: Location,
        respond_to: Response<ResultEnvelope<()>>,
    },
    GetMyJobApplication {
        respond_to: Response<ResultEnvelope<JobApplicantProfile>>,
    },
    SubmitJobApplication {
        location: Location,
        photo: PhotoBlob,
        respond_to: Response<ResultEnvelope<()>>,
    },
    UpdateJobApplication {
        location: Location,
        photo: PhotoBlob,
        respond_to: Response<ResultEnvelope<()>>,
    },
    SearchApplicantsByLocation {
        location: Location,
        include_photo: bool,
        respond_to: Response<ResultEnvelope<Vec<JobApplicantProfile>>>,
    },
}

/// Payload-free name of a [`BackendRequest`], used for logging and test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    InitializeAccessControl,
    AuthenticateUser,
    RegisterUser,
    GetCallerUserProfile,
    SaveCallerUserProfile,
    SetUserRole,
    SetUserLocation,
    GetMyJobApplication,
    SubmitJobApplication,
    UpdateJobApplication,
    SearchApplicantsByLocation,
}

impl BackendRequest {
    pub fn operation(&self) -> Operation {
        match self {
            BackendRequest::InitializeAccessControl { .. } => Operation::InitializeAccessControl,
            BackendRequest::AuthenticateUser { .. } => Operation::AuthenticateUser,
            BackendRequest::RegisterUser { .. } => Operation::RegisterUser,
            BackendRequest::GetCallerUserProfile { .. } => Operation::GetCallerUserProfile,
            BackendRequest::SaveCallerUserProfile { .. } => Operation::SaveCallerUserProfile,
            BackendRequest::SetUserRole { .. } => Operation::SetUserRole,
            BackendRequest::SetUserLocation { .. } => Operation::SetUserLocation,
            BackendRequest::GetMyJobApplication { .. } => Operation::GetMyJobApplication,
            BackendRequest::SubmitJobApplication { .. } => Operation::SubmitJobApplication,
            BackendRequest::UpdateJobApplication { .. } => Operation::UpdateJobApplication,
            BackendRequest::SearchApplicantsByLocation { .. } => {
                Operation::SearchApplicantsByLocation
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
