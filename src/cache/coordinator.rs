//! Cache operations driven by the connection lifecycle.

use super::entry::{APPLICANTS_BY_LOCATION, CURRENT_USER_PROFILE, MY_JOB_APPLICATION};
use super::store::QueryCache;
use tracing::debug;

/// Resources refetched after every successful (re)initialization.
pub const CONNECTION_RESOURCES: [&str; 3] = [
    CURRENT_USER_PROFILE,
    MY_JOB_APPLICATION,
    APPLICANTS_BY_LOCATION,
];

/// Matches every identity-scoped profile entry regardless of its scope.
pub fn is_profile_resource(resource: &str) -> bool {
    resource == CURRENT_USER_PROFILE
}

/// The only writer of connection-lifecycle cache state.
///
/// Owned by [`ActorConnection`](crate::connection::ActorConnection). Query gates read the same
/// [`QueryCache`] but only ever write their own entry.
#[derive(Clone)]
pub struct QueryCacheCoordinator {
    cache: QueryCache,
}

impl QueryCacheCoordinator {
    pub fn new(cache: QueryCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn cancel_and_reset(&self, matches: impl Fn(&str) -> bool) -> usize {
        self.cache.cancel_and_reset(matches)
    }

    pub fn invalidate(&self, resources: &[&str]) -> usize {
        self.cache.invalidate(resources)
    }

    /// Runs before an initialization attempt.
    pub fn reset_before_connect(&self) -> usize {
        let count = self.cancel_and_reset(is_profile_resource);
        debug!(count, "Cleared profile queries before connecting");
        count
    }

    /// Runs after a successful initialization.
    pub fn invalidate_after_connect(&self) -> usize {
        let count = self.invalidate(&CONNECTION_RESOURCES);
        debug!(count, "Invalidated connection queries");
        count
    }
}
