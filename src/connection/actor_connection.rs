//! # Actor Connection
//!
//! Owns the one live [`BackendClient`] and rebuilds it whenever the signed-in identity changes.
//!
//! ## Lifecycle
//!
//! Every initialization runs the same sequence:
//!
//! 1. Supersede the previous initialization (bump the generation, cancel its [`RetryPolicy`]).
//! 2. Publish an initializing [`ConnectionState`].
//! 3. Reset every cached profile query.
//! 4. Build the client and run the access-control handshake, with backoff.
//! 5. Invalidate the connection query set and publish ready, or publish the failure.
//!
//! Steps 1-3 happen under one lock, so a reader that sees the initializing state also sees the
//! reset cache. A superseded initialization never publishes anything: all writes after step 3
//! are guarded by the generation they started with.

use super::state::ConnectionState;
use crate::auth::{AuthSession, Identity};
use crate::backend::{ActorFactory, BackendClient, TransportError, CONNECTION_FAILED_MESSAGE};
use crate::cache::{QueryCache, QueryCacheCoordinator};
use crate::config::Config;
use crate::retry::{RetryConfig, RetryError, RetryPolicy};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The initialization that is allowed to publish.
#[derive(Default)]
struct ActiveInit {
    generation: u64,
    policy: Option<Arc<RetryPolicy>>,
    closed: bool,
}

/// Handed from [`ActorConnection::begin`] to [`ActorConnection::connect`].
struct Attempt {
    generation: u64,
    policy: Arc<RetryPolicy>,
}

/// Shared connection to the backend actor.
///
/// Built with [`mount`](Self::mount) and shared as `Arc<ActorConnection>`. Query gates and
/// commands read it; only the connection itself replaces the client or touches the
/// connection-owned cache entries.
pub struct ActorConnection {
    factory: Arc<dyn ActorFactory>,
    coordinator: QueryCacheCoordinator,
    auth: AuthSession,
    retry: RetryConfig,
    admin_token: String,
    state: watch::Sender<ConnectionState>,
    active: Mutex<ActiveInit>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl ActorConnection {
    /// Starts the first initialization and follows `auth` for identity changes.
    ///
    /// Returns with the connection already in the initializing state. Must be called inside a
    /// Tokio runtime.
    pub fn mount(
        factory: Arc<dyn ActorFactory>,
        cache: QueryCache,
        config: &Config,
        auth: AuthSession,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectionState::idle(config.connection_retry.max_attempts));
        let connection = Arc::new(Self {
            factory,
            coordinator: QueryCacheCoordinator::new(cache),
            auth,
            retry: config.connection_retry,
            admin_token: config.admin_token.clone(),
            state,
            active: Mutex::new(ActiveInit::default()),
            watcher: Mutex::new(None),
        });

        let mut identity = connection.auth.subscribe();
        identity.borrow_and_update();
        info!(identity = ?connection.auth.identity(), "Mounting backend connection");
        if let Some(attempt) = connection.begin() {
            tokio::spawn(Arc::clone(&connection).connect_owned(attempt));
        }

        let watcher = tokio::spawn(watch_identity(Arc::downgrade(&connection), identity));
        *lock(&connection.watcher) = Some(watcher);
        connection
    }

    /// Runs one full initialization and returns once it has settled or been superseded.
    ///
    /// The initialization runs on its own task. Dropping the returned future stops the wait,
    /// not the initialization.
    pub async fn initialize(self: &Arc<Self>) {
        let Some(attempt) = self.begin() else {
            return;
        };
        let generation = attempt.generation;
        let task = tokio::spawn(Arc::clone(self).connect_owned(attempt));
        if let Err(e) = task.await {
            warn!(generation, error = %e, "Initialization task ended abnormally");
        }
    }

    /// Manual retry after a failure. Discards any initialization still in flight.
    pub async fn retry(self: &Arc<Self>) {
        info!("Manual retry requested");
        self.initialize().await;
    }

    /// Cancels the active initialization and stops following identity changes.
    ///
    /// Nothing is published after this returns. The last state stays readable.
    pub fn shutdown(&self) {
        {
            let mut active = lock(&self.active);
            active.closed = true;
            active.generation += 1;
            if let Some(policy) = active.policy.take() {
                policy.cancel();
            }
        }
        if let Some(watcher) = lock(&self.watcher).take() {
            watcher.abort();
        }
        info!("Backend connection shut down");
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// The client, when the connection is ready.
    pub fn client(&self) -> Option<BackendClient> {
        self.state.borrow().ready_actor().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().ready_actor().is_some()
    }

    pub fn cache(&self) -> &QueryCache {
        self.coordinator.cache()
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub fn identity(&self) -> Option<Identity> {
        self.auth.identity()
    }

    /// Waits until no initialization is running and returns the state it left.
    pub async fn wait_until_settled(&self) -> ConnectionState {
        self.wait_for(|state| !state.is_initializing).await
    }

    /// Waits until initialization `generation` (or a later one) has settled.
    pub async fn wait_for_generation(&self, generation: u64) -> ConnectionState {
        self.wait_for(|state| state.generation >= generation && !state.is_initializing)
            .await
    }

    async fn wait_for(&self, settled: impl FnMut(&ConnectionState) -> bool) -> ConnectionState {
        let mut state = self.state.subscribe();
        let result = match state.wait_for(settled).await {
            Ok(current) => Some(current.clone()),
            Err(_) => None,
        };
        result.unwrap_or_else(|| self.state())
    }

    /// Supersedes the current initialization, publishes the initializing state and resets the
    /// profile queries. `None` once shut down.
    fn begin(&self) -> Option<Attempt> {
        let mut active = lock(&self.active);
        if active.closed {
            debug!("Connection shut down, not initializing");
            return None;
        }

        active.generation += 1;
        let generation = active.generation;
        if let Some(stale) = active.policy.take() {
            info!(generation, "Superseding previous initialization");
            stale.cancel();
        }
        let policy = Arc::new(RetryPolicy::new(self.retry));
        active.policy = Some(Arc::clone(&policy));

        info!(generation, "Initializing backend connection");
        self.state
            .send_replace(ConnectionState::initializing(generation, self.retry.max_attempts));
        self.coordinator.reset_before_connect();

        Some(Attempt { generation, policy })
    }

    async fn connect_owned(self: Arc<Self>, attempt: Attempt) {
        self.connect(attempt).await;
    }

    async fn connect(&self, attempt: Attempt) {
        let Attempt { generation, policy } = attempt;
        let result = policy
            .execute_with(
                || self.build(),
                |retry| {
                    self.publish_if_current(generation, |state| {
                        state.is_retrying = true;
                        state.retry_count = retry.attempt;
                    });
                },
            )
            .await;
        let retry_count = policy.current_attempt().saturating_sub(1);

        match result {
            Ok(client) => {
                let state =
                    ConnectionState::ready(generation, self.retry.max_attempts, client, retry_count);
                if self.settle(generation, state, true) {
                    info!(generation, retry_count, "Backend connection ready");
                }
            }
            Err(RetryError::Cancelled) => {
                debug!(generation, "Initialization cancelled");
            }
            Err(e) => {
                let state = ConnectionState::failed(
                    generation,
                    self.retry.max_attempts,
                    retry_count,
                    CONNECTION_FAILED_MESSAGE,
                );
                if self.settle(generation, state, false) {
                    warn!(generation, error = %e, "Backend connection failed");
                }
            }
        }
    }

    async fn build(&self) -> Result<BackendClient, TransportError> {
        let client = self.factory.create_actor().await?;
        client
            .initialize_access_control(self.admin_token.clone())
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        Ok(client)
    }

    fn publish_if_current(&self, generation: u64, update: impl FnOnce(&mut ConnectionState)) {
        let active = lock(&self.active);
        if active.generation == generation {
            self.state.send_modify(update);
        }
    }

    /// Publishes the terminal state of `generation` and retires its policy. Returns false and
    /// publishes nothing when `generation` was superseded.
    ///
    /// On success the connection queries are invalidated before the ready state goes out, so a
    /// reader that sees ready never races the invalidation.
    fn settle(&self, generation: u64, terminal: ConnectionState, connected: bool) -> bool {
        let mut active = lock(&self.active);
        if active.generation != generation {
            debug!(generation, current = active.generation, "Ignoring superseded initialization");
            return false;
        }
        active.policy = None;
        if connected {
            self.coordinator.invalidate_after_connect();
        }
        self.state.send_replace(terminal);
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn watch_identity(
    connection: Weak<ActorConnection>,
    mut identity: watch::Receiver<Option<Identity>>,
) {
    while identity.changed().await.is_ok() {
        let current = identity.borrow_and_update().clone();
        let Some(connection) = connection.upgrade() else {
            break;
        };
        info!(identity = ?current, "Identity changed, rebuilding backend client");
        if let Some(attempt) = connection.begin() {
            tokio::spawn(connection.connect_owned(attempt));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBackend, ScriptedFactory};
    use tokio::time::Duration;

    fn config() -> Config {
        Config {
            admin_token: "admin".to_string(),
            ..Config::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_publishes_initializing_then_ready() {
        let backend = MockBackend::new();
        let factory = Arc::new(ScriptedFactory::new(backend.clone()));
        let connection =
            ActorConnection::mount(factory.clone(), QueryCache::new(), &config(), AuthSession::in_memory());

        assert!(connection.state().is_initializing);
        assert_eq!(connection.state().generation, 1);

        let state = connection.wait_until_settled().await;
        assert!(state.is_ready);
        assert!(state.actor.is_some());
        assert_eq!(state.retry_count, 0);
        assert_eq!(factory.builds(), 1);
        connection.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_build_failures_are_retried() {
        let backend = MockBackend::new();
        let factory = Arc::new(ScriptedFactory::new(backend).failing_first(2));
        let connection =
            ActorConnection::mount(factory.clone(), QueryCache::new(), &config(), AuthSession::in_memory());

        let mut states = connection.subscribe();
        states
            .wait_for(|state| state.is_retrying && state.retry_count == 1)
            .await
            .unwrap();

        let state = connection.wait_until_settled().await;
        assert!(state.is_ready);
        assert!(!state.is_retrying);
        assert_eq!(state.retry_count, 2);
        assert_eq!(factory.builds(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_publish_failure() {
        let factory = Arc::new(ScriptedFactory::new(MockBackend::new()).failing_first(u32::MAX));
        let connection =
            ActorConnection::mount(factory.clone(), QueryCache::new(), &config(), AuthSession::in_memory());

        let state = connection.wait_until_settled().await;
        assert!(!state.is_ready);
        assert!(state.actor.is_none());
        assert_eq!(state.init_error.as_deref(), Some(CONNECTION_FAILED_MESSAGE));
        assert_eq!(factory.builds(), 5);
        assert!(state.upholds_invariants());

        // Failed stays failed until asked.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(factory.builds(), 5);
        assert!(connection.state().init_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_failure_reconnects() {
        let factory = Arc::new(ScriptedFactory::new(MockBackend::new()).failing_first(5));
        let connection =
            ActorConnection::mount(factory.clone(), QueryCache::new(), &config(), AuthSession::in_memory());
        assert!(connection.wait_until_settled().await.init_error.is_some());

        connection.retry().await;
        let state = connection.state();
        assert!(state.is_ready);
        assert_eq!(state.generation, 2);
        assert_eq!(factory.builds(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_uses_admin_token() {
        let backend = MockBackend::new();
        let factory = Arc::new(ScriptedFactory::new(backend.clone()));
        let connection =
            ActorConnection::mount(factory, QueryCache::new(), &config(), AuthSession::in_memory());
        connection.wait_until_settled().await;

        assert_eq!(backend.handshake_secrets(), vec!["admin".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_handshake_is_a_handshake_error() {
        let backend = MockBackend::new();
        let factory = Arc::new(ScriptedFactory::new(backend.clone()));
        let connection =
            ActorConnection::mount(factory, QueryCache::new(), &config(), AuthSession::in_memory());
        connection.wait_until_settled().await;

        backend.fail_handshakes(1);
        match connection.build().await {
            Err(TransportError::Handshake(reason)) => {
                assert_eq!(reason, TransportError::ActorDropped.to_string())
            }
            other => panic!("expected a handshake error, got {other:?}"),
        }
        assert!(connection.build().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_initialize_keeps_running() {
        let factory = Arc::new(ScriptedFactory::new(MockBackend::new()));
        let connection =
            ActorConnection::mount(factory.clone(), QueryCache::new(), &config(), AuthSession::in_memory());
        connection.wait_until_settled().await;

        factory.fail_next(1);
        let initialize = connection.initialize();
        tokio::pin!(initialize);
        tokio::select! {
            _ = &mut initialize => panic!("initialization should still be backing off"),
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
        drop(initialize);

        let state = connection.wait_for_generation(2).await;
        assert!(state.is_ready);
        assert_eq!(state.retry_count, 1);
        assert_eq!(factory.builds(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_backoff() {
        let factory = Arc::new(ScriptedFactory::new(MockBackend::new()).failing_first(u32::MAX));
        let connection =
            ActorConnection::mount(factory.clone(), QueryCache::new(), &config(), AuthSession::in_memory());

        let mut states = connection.subscribe();
        states.wait_for(|state| state.is_retrying).await.unwrap();
        connection.shutdown();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(factory.builds(), 1);
        // Superseded by shutdown: the failure is never published.
        assert!(connection.state().init_error.is_none());
    }
}
