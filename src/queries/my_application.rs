//! The signed-in job seeker's own application.

use super::error::QueryError;
use super::gate::QueryGate;
use crate::auth::Identity;
use crate::backend::{BackendClient, ErrorCode, JobApplicantProfile, ResultEnvelope, TransportError};
use crate::cache::{QueryKey, MY_JOB_APPLICATION};
use crate::connection::ActorConnection;
use crate::retry::RetryConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Reads `getMyJobApplication`. `noApplicationFound` resolves to `None`, not an error.
#[derive(Clone)]
pub struct MyApplicationQuery {
    connection: Arc<ActorConnection>,
    retry: RetryConfig,
}

impl MyApplicationQuery {
    pub fn new(connection: Arc<ActorConnection>) -> Self {
        Self {
            connection,
            retry: RetryConfig::with_max_attempts(2),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl QueryGate for MyApplicationQuery {
    type Output = Option<JobApplicantProfile>;

    fn connection(&self) -> &ActorConnection {
        &self.connection
    }

    fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    fn key(&self, identity: &Identity) -> Option<QueryKey> {
        Some(QueryKey::new(MY_JOB_APPLICATION).with(identity.email()))
    }

    async fn fetch(
        &self,
        client: &BackendClient,
    ) -> Result<ResultEnvelope<Option<JobApplicantProfile>>, TransportError> {
        Ok(client.get_my_job_application().await?.map(Some))
    }

    fn interpret(
        envelope: ResultEnvelope<Option<JobApplicantProfile>>,
    ) -> Result<Option<JobApplicantProfile>, QueryError> {
        match envelope {
            ResultEnvelope::Ok(application) => Ok(application),
            ResultEnvelope::Err(ErrorCode::NoApplicationFound) => Ok(None),
            ResultEnvelope::Err(code) => Err(QueryError::domain(code)),
        }
    }
}
