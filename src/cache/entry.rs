//! Keys, values and per-entry bookkeeping of the query cache.

use crate::backend::{JobApplicantProfile, UserProfile};
use crate::queries::QueryError;
use std::borrow::Cow;
use std::fmt;
use tokio::time::Instant;

/// Resource name of the signed-in user's profile.
pub const CURRENT_USER_PROFILE: &str = "currentUserProfile";
/// Resource name of the signed-in job seeker's application.
pub const MY_JOB_APPLICATION: &str = "myJobApplication";
/// Resource name of a recruiter's applicant search.
pub const APPLICANTS_BY_LOCATION: &str = "applicantsByLocation";

/// Identifies one cache entry: a resource name plus scope parts (identity, location, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    resource: Cow<'static, str>,
    scope: Vec<String>,
}

impl QueryKey {
    pub fn new(resource: impl Into<Cow<'static, str>>) -> Self {
        Self {
            resource: resource.into(),
            scope: Vec::new(),
        }
    }

    /// Appends one scope part.
    pub fn with(mut self, part: impl Into<String>) -> Self {
        self.scope.push(part.into());
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn scope(&self) -> &[String] {
        &self.scope
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)?;
        if !self.scope.is_empty() {
            write!(f, "[{}]", self.scope.join(", "))?;
        }
        Ok(())
    }
}

/// Cached payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Profile(Option<UserProfile>),
    Application(Option<JobApplicantProfile>),
    Applicants(Vec<JobApplicantProfile>),
    /// Client-only UI state. Untouched by connection lifecycle operations.
    Local(serde_json::Value),
}

/// Conversion between a gate's typed output and [`QueryData`].
pub trait CacheValue: Sized {
    fn into_data(self) -> QueryData;
    fn from_data(data: &QueryData) -> Option<Self>;
}

impl CacheValue for Option<UserProfile> {
    fn into_data(self) -> QueryData {
        QueryData::Profile(self)
    }

    fn from_data(data: &QueryData) -> Option<Self> {
        match data {
            QueryData::Profile(profile) => Some(profile.clone()),
            _ => None,
        }
    }
}

impl CacheValue for Option<JobApplicantProfile> {
    fn into_data(self) -> QueryData {
        QueryData::Application(self)
    }

    fn from_data(data: &QueryData) -> Option<Self> {
        match data {
            QueryData::Application(application) => Some(application.clone()),
            _ => None,
        }
    }
}

impl CacheValue for Vec<JobApplicantProfile> {
    fn into_data(self) -> QueryData {
        QueryData::Applicants(self)
    }

    fn from_data(data: &QueryData) -> Option<Self> {
        match data {
            QueryData::Applicants(applicants) => Some(applicants.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched, or reset.
    Idle,
    Loading,
    Success,
    Error,
}

/// One cache entry.
#[derive(Debug, Clone)]
pub struct CachedQuery {
    pub data: Option<QueryData>,
    pub status: QueryStatus,
    pub error: Option<QueryError>,
    pub is_stale: bool,
    pub is_fetching: bool,
    /// Consecutive failed fetches; cleared on success.
    pub failure_count: u32,
    /// Cache clock value of the last reset or invalidation of this entry.
    pub epoch: u64,
    pub updated_at: Option<Instant>,
}

impl CachedQuery {
    pub(crate) fn empty(epoch: u64) -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            is_stale: false,
            is_fetching: false,
            failure_count: 0,
            epoch,
            updated_at: None,
        }
    }

    /// Holds data that can be served without a refetch.
    pub fn is_fresh(&self) -> bool {
        self.status == QueryStatus::Success && !self.is_stale && self.data.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = QueryKey::new(CURRENT_USER_PROFILE).with("alice@example.com");
        assert_eq!(key.to_string(), "currentUserProfile[alice@example.com]");
        assert_eq!(QueryKey::new(MY_JOB_APPLICATION).to_string(), "myJobApplication");
    }

    #[test]
    fn test_cache_value_rejects_other_variants() {
        let data = QueryData::Applicants(Vec::new());
        assert_eq!(<Option<UserProfile>>::from_data(&data), None);
        assert_eq!(<Vec<JobApplicantProfile>>::from_data(&data), Some(Vec::new()));
    }
}
