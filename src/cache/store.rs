//! # Query Cache
//!
//! Shared store of fetched query results.
//!
//! ## Superseded fetches
//!
//! The cache keeps a monotonic clock. Every reset or invalidation advances it and records the
//! new value as the *floor* of each affected resource (and as the epoch of each affected entry).
//! A fetch takes a [`FetchTicket`] before it reads the connection state; the ticket remembers
//! the clock at that moment. When the fetch completes, its result is accepted only if no reset
//! or invalidation touched its resource or entry after the ticket was taken. A fetch issued
//! through a replaced client can therefore never land in the cache.

use super::entry::{CachedQuery, QueryData, QueryKey, QueryStatus};
use crate::queries::QueryError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

/// Change notification published by [`QueryCache`].
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Reset(QueryKey),
    Invalidated(QueryKey),
    Updated(QueryKey),
    /// A completed fetch arrived after its entry was reset or invalidated.
    Discarded(QueryKey),
}

/// Proof that a fetch started at a given cache clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: QueryKey,
    started_at: u64,
}

impl FetchTicket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

#[derive(Default)]
struct CacheState {
    clock: u64,
    entries: HashMap<QueryKey, CachedQuery>,
    floors: HashMap<String, u64>,
}

impl CacheState {
    fn accepts(&self, ticket: &FetchTicket) -> bool {
        let floor = self
            .floors
            .get(ticket.key.resource())
            .copied()
            .unwrap_or(0);
        let epoch = self.entries.get(&ticket.key).map_or(0, |e| e.epoch);
        floor <= ticket.started_at && epoch <= ticket.started_at
    }
}

struct CacheInner {
    state: Mutex<CacheState>,
    events: broadcast::Sender<CacheEvent>,
}

/// Cheap-to-clone handle to the shared cache.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(CacheInner {
                state: Mutex::new(CacheState::default()),
                events,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: CacheEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    pub fn get(&self, key: &QueryKey) -> Option<CachedQuery> {
        self.state().entries.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        self.state().entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes client-side data directly, e.g. local UI state.
    pub fn set_data(&self, key: QueryKey, data: QueryData) {
        {
            let mut state = self.state();
            let epoch = state.clock;
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| CachedQuery::empty(epoch));
            entry.data = Some(data);
            entry.status = QueryStatus::Success;
            entry.error = None;
            entry.is_stale = false;
            entry.updated_at = Some(Instant::now());
        }
        self.emit(CacheEvent::Updated(key));
    }

    /// Starts tracking a fetch. Take the ticket *before* reading the connection state.
    pub fn ticket(&self, key: &QueryKey) -> FetchTicket {
        let mut state = self.state();
        state
            .floors
            .entry(key.resource().to_string())
            .or_insert(0);
        FetchTicket {
            key: key.clone(),
            started_at: state.clock,
        }
    }

    /// Marks the ticket's entry as fetching. Returns `false` if the ticket is already stale.
    pub fn mark_fetching(&self, ticket: &FetchTicket) -> bool {
        let mut state = self.state();
        if !state.accepts(ticket) {
            return false;
        }
        let epoch = state.clock;
        let entry = state
            .entries
            .entry(ticket.key.clone())
            .or_insert_with(|| CachedQuery::empty(epoch));
        entry.is_fetching = true;
        if entry.data.is_none() {
            entry.status = QueryStatus::Loading;
        }
        true
    }

    /// Stores a fetch result unless a reset or invalidation superseded the ticket.
    pub fn complete_fetch(
        &self,
        ticket: FetchTicket,
        outcome: Result<QueryData, QueryError>,
    ) -> bool {
        let accepted = {
            let mut state = self.state();
            if state.accepts(&ticket) {
                let epoch = state.clock;
                let entry = state
                    .entries
                    .entry(ticket.key.clone())
                    .or_insert_with(|| CachedQuery::empty(epoch));
                entry.is_fetching = false;
                entry.updated_at = Some(Instant::now());
                match outcome {
                    Ok(data) => {
                        entry.data = Some(data);
                        entry.status = QueryStatus::Success;
                        entry.error = None;
                        entry.is_stale = false;
                        entry.failure_count = 0;
                    }
                    Err(error) => {
                        entry.status = QueryStatus::Error;
                        entry.error = Some(error);
                        entry.failure_count += 1;
                    }
                }
                true
            } else {
                false
            }
        };

        if accepted {
            self.emit(CacheEvent::Updated(ticket.key));
        } else {
            debug!(key = %ticket.key, "Discarding superseded fetch result");
            self.emit(CacheEvent::Discarded(ticket.key));
        }
        accepted
    }

    /// Cancels in-flight fetches and clears every entry whose resource name matches.
    ///
    /// Returns the number of entries cleared.
    pub fn cancel_and_reset(&self, matches: impl Fn(&str) -> bool) -> usize {
        let reset: Vec<QueryKey> = {
            let mut state = self.state();
            state.clock += 1;
            let clock = state.clock;
            for (resource, floor) in state.floors.iter_mut() {
                if matches(resource) {
                    *floor = clock;
                }
            }
            let mut reset = Vec::new();
            for (key, entry) in state.entries.iter_mut() {
                if matches(key.resource()) {
                    *entry = CachedQuery::empty(clock);
                    reset.push(key.clone());
                }
            }
            reset
        };

        debug!(entries = reset.len(), "Reset cached queries");
        let count = reset.len();
        for key in reset {
            self.emit(CacheEvent::Reset(key));
        }
        count
    }

    /// Marks every entry of the given resources stale so the next read refetches.
    ///
    /// Fetches already in flight for those resources are discarded on completion.
    pub fn invalidate(&self, resources: &[&str]) -> usize {
        let invalidated: Vec<QueryKey> = {
            let mut state = self.state();
            state.clock += 1;
            let clock = state.clock;
            for resource in resources {
                state.floors.insert((*resource).to_string(), clock);
            }
            let mut invalidated = Vec::new();
            for (key, entry) in state.entries.iter_mut() {
                if resources.contains(&key.resource()) {
                    Self::mark_stale(entry, clock);
                    invalidated.push(key.clone());
                }
            }
            invalidated
        };

        debug!(?resources, entries = invalidated.len(), "Invalidated cached queries");
        let count = invalidated.len();
        for key in invalidated {
            self.emit(CacheEvent::Invalidated(key));
        }
        count
    }

    /// Marks a single entry stale. Other entries of the same resource are untouched.
    pub fn invalidate_key(&self, key: &QueryKey) -> bool {
        let found = {
            let mut state = self.state();
            state.clock += 1;
            let clock = state.clock;
            match state.entries.get_mut(key) {
                Some(entry) => {
                    Self::mark_stale(entry, clock);
                    true
                }
                None => false,
            }
        };
        if found {
            self.emit(CacheEvent::Invalidated(key.clone()));
        }
        found
    }

    fn mark_stale(entry: &mut CachedQuery, clock: u64) {
        entry.is_stale = true;
        entry.is_fetching = false;
        entry.epoch = clock;
    }
}
