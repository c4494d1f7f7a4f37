//! Current user's profile.

use super::gate::{QueryGate, QueryView};
use crate::auth::Identity;
use crate::backend::{BackendClient, ResultEnvelope, TransportError, UserProfile};
use crate::cache::{QueryKey, CURRENT_USER_PROFILE};
use crate::connection::ActorConnection;
use crate::retry::RetryConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Reads `getCallerUserProfile`, scoped by the signed-in email.
///
/// A backend answer of `Ok(None)` is cached like any other value: the profile is missing, which
/// is not an error. See [`QueryView::is_profile_null`].
#[derive(Clone)]
pub struct ProfileQuery {
    connection: Arc<ActorConnection>,
    retry: RetryConfig,
}

impl ProfileQuery {
    pub fn new(connection: Arc<ActorConnection>) -> Self {
        Self {
            connection,
            retry: RetryConfig::with_max_attempts(3),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl QueryGate for ProfileQuery {
    type Output = Option<UserProfile>;

    fn connection(&self) -> &ActorConnection {
        &self.connection
    }

    fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    fn key(&self, identity: &Identity) -> Option<QueryKey> {
        Some(QueryKey::new(CURRENT_USER_PROFILE).with(identity.email()))
    }

    async fn fetch(
        &self,
        client: &BackendClient,
    ) -> Result<ResultEnvelope<Option<UserProfile>>, TransportError> {
        client.get_caller_user_profile().await
    }
}

impl QueryView<Option<UserProfile>> {
    pub fn profile(&self) -> Option<&UserProfile> {
        self.data.as_ref().and_then(Option::as_ref)
    }

    /// Fetched without error, and the backend has no profile for this user.
    pub fn is_profile_null(&self) -> bool {
        self.is_fetched && !self.is_loading && self.error.is_none() && matches!(self.data, Some(None))
    }
}
