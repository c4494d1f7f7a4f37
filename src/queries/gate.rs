//! # Query Gate
//!
//! Shared read path of every connection-dependent query.
//!
//! A gate fetches only when the connection is ready, no initialization is running, someone is
//! signed in, and the gate's own preconditions hold (see [`QueryGate::key`]). Results go
//! through the [`QueryCache`](crate::cache::QueryCache) under a ticket taken before the
//! connection state is read, so a fetch that started under a client or an identity that has
//! since been replaced can never land.

use super::error::QueryError;
use crate::auth::Identity;
use crate::backend::{BackendClient, ResultEnvelope, TransportError};
use crate::cache::{CacheValue, CachedQuery, QueryKey, QueryStatus};
use crate::connection::ActorConnection;
use crate::retry::{RetryConfig, RetryError, RetryPolicy};
use async_trait::async_trait;
use tracing::{debug, warn};

/// What a reader sees for one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryView<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    /// A fetch completed (successfully or not) for the current key.
    pub is_fetched: bool,
    pub error: Option<QueryError>,
    pub is_stale: bool,
}

impl<T> QueryView<T> {
    /// Gate disabled: nothing to show and nothing coming.
    pub fn idle() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_fetched: false,
            error: None,
            is_stale: false,
        }
    }

    /// Waiting on the connection or on a fetch that was superseded.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::idle()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl<T: CacheValue> QueryView<T> {
    pub fn from_entry(entry: &CachedQuery) -> Self {
        Self {
            data: entry.data.as_ref().and_then(T::from_data),
            is_loading: entry.is_fetching || entry.status == QueryStatus::Loading,
            is_fetched: matches!(entry.status, QueryStatus::Success | QueryStatus::Error),
            error: entry.error.clone(),
            is_stale: entry.is_stale,
        }
    }
}

/// A connection-dependent read.
///
/// Implementors name their cache key and their backend call; [`load`](Self::load) supplies the
/// gating, caching and transport retries.
#[async_trait]
pub trait QueryGate: Send + Sync {
    /// Cached payload type.
    type Output: CacheValue + Clone + Send + Sync + 'static;

    fn connection(&self) -> &ActorConnection;

    /// Transport retries for one fetch. Domain errors are never retried.
    fn retry_config(&self) -> RetryConfig;

    /// Cache key for `identity`, or `None` when the gate's own preconditions are unmet.
    fn key(&self, identity: &Identity) -> Option<QueryKey>;

    /// One backend call.
    async fn fetch(
        &self,
        client: &BackendClient,
    ) -> Result<ResultEnvelope<Self::Output>, TransportError>;

    /// Turns the backend's answer into the cached value.
    fn interpret(envelope: ResultEnvelope<Self::Output>) -> Result<Self::Output, QueryError> {
        match envelope {
            ResultEnvelope::Ok(value) => Ok(value),
            ResultEnvelope::Err(code) => Err(QueryError::domain(code)),
        }
    }

    /// Cache key for the current identity, when the gate is enabled for it.
    fn current_key(&self) -> Option<QueryKey> {
        let identity = self.connection().identity()?;
        self.key(&identity)
    }

    /// Serves the cached value when fresh, fetches otherwise.
    #[tracing::instrument(skip(self))]
    async fn load(&self) -> QueryView<Self::Output> {
        let connection = self.connection();
        let Some(key) = self.current_key() else {
            return QueryView::idle();
        };

        let cache = connection.cache();
        let ticket = cache.ticket(&key);
        let state = connection.state();
        if state.is_connecting() {
            return QueryView::loading();
        }
        let Some(client) = state.ready_actor().cloned() else {
            return QueryView::idle();
        };

        if let Some(entry) = cache.get(&key) {
            if entry.is_fresh() {
                return QueryView::from_entry(&entry);
            }
        }

        if !cache.mark_fetching(&ticket) {
            return QueryView::loading();
        }
        debug!(%key, "Fetching");
        let policy = RetryPolicy::new(self.retry_config());
        let outcome = match policy.execute(|| self.fetch(&client)).await {
            Ok(envelope) => Self::interpret(envelope),
            Err(RetryError::Operation(e)) => Err(QueryError::Transport(e)),
            Err(RetryError::Cancelled | RetryError::MaxAttemptsReached) => {
                Err(QueryError::ActorUnavailable)
            }
        };
        if let Err(e) = &outcome {
            warn!(%key, error = %e, "Query failed");
        }

        if !cache.complete_fetch(ticket, outcome.map(CacheValue::into_data)) {
            return QueryView::loading();
        }
        match cache.get(&key) {
            Some(entry) => QueryView::from_entry(&entry),
            None => QueryView::loading(),
        }
    }

    /// Marks the current entry stale and loads it again.
    async fn refetch(&self) -> QueryView<Self::Output> {
        if let Some(key) = self.current_key() {
            self.connection().cache().invalidate_key(&key);
        }
        self.load().await
    }

    /// Cached view without fetching.
    fn peek(&self) -> QueryView<Self::Output> {
        if self.connection().state().is_connecting() {
            return QueryView::loading();
        }
        self.current_key()
            .and_then(|key| self.connection().cache().get(&key))
            .map(|entry| QueryView::from_entry(&entry))
            .unwrap_or_else(QueryView::idle)
    }
}
