//! Recruiter-side applicant search.

use super::gate::QueryGate;
use crate::auth::Identity;
use crate::backend::{BackendClient, JobApplicantProfile, Location, ResultEnvelope, TransportError};
use crate::cache::{QueryKey, APPLICANTS_BY_LOCATION};
use crate::connection::ActorConnection;
use crate::retry::RetryConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Reads `searchApplicantsByLocation` with photos. Disabled until a location is chosen.
#[derive(Clone)]
pub struct ApplicantsQuery {
    connection: Arc<ActorConnection>,
    location: Option<Location>,
    retry: RetryConfig,
}

impl ApplicantsQuery {
    pub fn new(connection: Arc<ActorConnection>, location: Option<Location>) -> Self {
        Self {
            connection,
            location,
            retry: RetryConfig::with_max_attempts(2),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: Option<Location>) {
        self.location = location;
    }
}

#[async_trait]
impl QueryGate for ApplicantsQuery {
    type Output = Vec<JobApplicantProfile>;

    fn connection(&self) -> &ActorConnection {
        &self.connection
    }

    fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    fn key(&self, identity: &Identity) -> Option<QueryKey> {
        let location = self.location.as_ref()?;
        Some(
            QueryKey::new(APPLICANTS_BY_LOCATION)
                .with(identity.email())
                .with(location.cache_scope()),
        )
    }

    async fn fetch(
        &self,
        client: &BackendClient,
    ) -> Result<ResultEnvelope<Vec<JobApplicantProfile>>, TransportError> {
        match &self.location {
            Some(location) => client.search_applicants_by_location(location.clone(), true).await,
            // key() keeps load() from getting here without a location.
            None => Ok(ResultEnvelope::Ok(Vec::new())),
        }
    }
}
