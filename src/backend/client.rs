//! # Backend Client
//!
//! The handle through which the application invokes the backend's remote procedures.

use super::envelope::ResultEnvelope;
use super::error::TransportError;
use super::message::{BackendRequest, Response};
use super::types::{JobApplicantProfile, Location, PhotoBlob, Principal, UserProfile, UserRole};
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

/// ## BackendClient
///
/// Forwards each call over a Tokio `mpsc` channel and awaits the answer on a `oneshot`.
///
/// * **Cloneable**: holds only a sender, so every query gate can keep its own copy.
/// * **Two error tiers**: the outer `Result` is the transport, the inner
///   [`ResultEnvelope`] is the backend's domain answer.
#[derive(Clone)]
pub struct BackendClient {
    sender: mpsc::Sender<BackendRequest>,
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl BackendClient {
    pub fn new(sender: mpsc::Sender<BackendRequest>) -> Self {
        Self { sender }
    }

    /// True when both handles talk to the same backend channel.
    pub fn same_actor(&self, other: &BackendClient) -> bool {
        self.sender.same_channel(&other.sender)
    }

    async fn call<R>(
        &self,
        make: impl FnOnce(Response<R>) -> BackendRequest,
    ) -> Result<R, TransportError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(make(respond_to))
            .await
            .map_err(|_| TransportError::ActorClosed)?;
        response.await.map_err(|_| TransportError::ActorDropped)?
    }

    /// One-time access-control registration performed right after the client is built.
    #[instrument(skip_all)]
    pub async fn initialize_access_control(&self, secret: String) -> Result<(), TransportError> {
        debug!("Sending handshake");
        self.call(|respond_to| BackendRequest::InitializeAccessControl { secret, respond_to })
            .await
    }

    #[instrument(skip(self, password))]
    pub async fn authenticate_user(
        &self,
        email: String,
        password: String,
    ) -> Result<ResultEnvelope<()>, TransportError> {
        debug!("Sending request");
        self.call(|respond_to| BackendRequest::AuthenticateUser {
            email,
            password,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self, password), fields(email = %profile.email))]
    pub async fn register_user(
        &self,
        profile: UserProfile,
        password: String,
    ) -> Result<ResultEnvelope<Principal>, TransportError> {
        debug!("Sending request");
        self.call(|respond_to| BackendRequest::RegisterUser {
            profile,
            password,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_caller_user_profile(
        &self,
    ) -> Result<ResultEnvelope<Option<UserProfile>>, TransportError> {
        debug!("Sending request");
        self.call(|respond_to| BackendRequest::GetCallerUserProfile { respond_to })
            .await
    }

    #[instrument(skip(self))]
    pub async fn save_caller_user_profile(
        &self,
        profile: UserProfile,
    ) -> Result<ResultEnvelope<()>, TransportError> {
        debug!("Sending request");
        self.call(|respond_to| BackendRequest::SaveCallerUserProfile {
            profile,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn set_user_role(
        &self,
        role: UserRole,
    ) -> Result<ResultEnvelope<()>, TransportError> {
        debug!("Sending request");
        self.call(|respond_to| BackendRequest::SetUserRole { role, respond_to })
            .await
    }

    #[instrument(skip(self))]
    pub async fn set_user_location(
        &self,
        location: Location,
    ) -> Result<ResultEnvelope<()>, TransportError> {
        debug!("Sending request");
        self.call(|respond_to| BackendRequest::SetUserLocation {
            location,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_my_job_application(
        &self,
    ) -> Result<ResultEnvelope<JobApplicantProfile>, TransportError> {
        debug!("Sending request");
        self.call(|respond_to| BackendRequest::GetMyJobApplication { respond_to })
            .await
    }

    #[instrument(skip(self, photo))]
    pub async fn submit_job_application(
        &self,
        location: Location,
        photo: PhotoBlob,
    ) -> Result<ResultEnvelope<()>, TransportError> {
        debug!("Sending request");
        self.call(|respond_to| BackendRequest::SubmitJobApplication {
            location,
            photo,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self, photo))]
    pub async fn update_job_application(
        &self,
        location: Location,
        photo: PhotoBlob,
    ) -> Result<ResultEnvelope<()>, TransportError> {
        debug!("Sending request");
        self.call(|respond_to| BackendRequest::UpdateJobApplication {
            location,
            photo,
            respond_to,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn search_applicants_by_location(
        &self,
        location: Location,
        include_photo: bool,
    ) -> Result<ResultEnvelope<Vec<JobApplicantProfile>>, TransportError> {
        debug!("Sending request");
        self.call(|respond_to| BackendRequest::SearchApplicantsByLocation {
            location,
            include_photo,
            respond_to,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ErrorCode, Operation};
    use crate::mock::{create_mock_client, expect_profile_request, expect_request};

    #[tokio::test]
    async fn test_answer_reaches_caller() {
        let (client, mut receiver) = create_mock_client(4);
        let call = tokio::spawn(async move { client.get_caller_user_profile().await });

        let respond_to = expect_profile_request(&mut receiver)
            .await
            .expect("expected a profile request");
        respond_to.send(Ok(ResultEnvelope::Ok(None))).unwrap();

        assert_eq!(call.await.unwrap(), Ok(ResultEnvelope::Ok(None)));
    }

    #[tokio::test]
    async fn test_domain_error_is_not_a_transport_error() {
        let (client, mut receiver) = create_mock_client(4);
        let call = tokio::spawn(async move { client.set_user_role(UserRole::Recruiter).await });

        match expect_request(&mut receiver, Operation::SetUserRole).await {
            Some(BackendRequest::SetUserRole { role, respond_to }) => {
                assert_eq!(role, UserRole::Recruiter);
                respond_to
                    .send(Ok(ResultEnvelope::Err(ErrorCode::Unauthorized)))
                    .unwrap();
            }
            other => panic!("expected SetUserRole, got {:?}", other.map(|r| r.operation())),
        }

        assert_eq!(
            call.await.unwrap(),
            Ok(ResultEnvelope::Err(ErrorCode::Unauthorized))
        );
    }

    #[tokio::test]
    async fn test_dropped_responder_is_actor_dropped() {
        let (client, mut receiver) = create_mock_client(4);
        let call = tokio::spawn(async move { client.get_my_job_application().await });

        let request = expect_request(&mut receiver, Operation::GetMyJobApplication).await;
        drop(request);

        assert_eq!(call.await.unwrap(), Err(TransportError::ActorDropped));
    }

    #[tokio::test]
    async fn test_closed_channel_is_actor_closed() {
        let (client, receiver) = create_mock_client(4);
        drop(receiver);

        let result = client.authenticate_user("a@x.io".into(), "pw".into()).await;
        assert_eq!(result, Err(TransportError::ActorClosed));
    }

    #[tokio::test]
    async fn test_clones_share_one_actor() {
        let (client, _receiver) = create_mock_client(4);
        let (other, _other_receiver) = create_mock_client(4);

        assert!(client.same_actor(&client.clone()));
        assert!(!client.same_actor(&other));
    }
}
