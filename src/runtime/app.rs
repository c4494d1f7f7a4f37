use crate::auth::{AuthSession, FileSessionStore, MemorySessionStore, SessionError, SessionStore};
use crate::backend::{ActorFactory, Location};
use crate::cache::QueryCache;
use crate::commands::Commands;
use crate::config::Config;
use crate::connection::ActorConnection;
use crate::queries::{ApplicantsQuery, MyApplicationQuery, ProfileQuery};
use std::sync::Arc;
use tracing::info;

/// Wires the session, the cache, the connection and its dependents together.
///
/// `ReceptionApp` is responsible for:
/// - **Lifecycle Management**: mounting the connection and shutting it down
/// - **Dependency Wiring**: handing one connection and one cache to every gate and command
/// - **Configuration**: applying the per-resource retry settings from [`Config`]
///
/// # Example
///
/// ```ignore
/// let app = ReceptionApp::start(&config, factory)?;
/// app.commands.sign_in("alice@example.com", "password").await?;
/// let profile = app.profile.load().await;
/// app.shutdown();
/// ```
pub struct ReceptionApp {
    pub connection: Arc<ActorConnection>,
    pub commands: Commands,
    pub profile: ProfileQuery,
    pub my_application: MyApplicationQuery,
    pub session: AuthSession,
    pub cache: QueryCache,
    config: Config,
}

impl ReceptionApp {
    /// Restores the session and mounts the connection. Must be called inside a Tokio runtime.
    pub fn start(config: &Config, factory: Arc<dyn ActorFactory>) -> Result<Self, SessionError> {
        let store: Arc<dyn SessionStore> = match &config.session_file {
            Some(path) => Arc::new(FileSessionStore::new(path)),
            None => Arc::new(MemorySessionStore::new()),
        };
        let session = AuthSession::restore(store)?;
        let cache = QueryCache::new();
        let connection = ActorConnection::mount(factory, cache.clone(), config, session.clone());

        Ok(Self {
            commands: Commands::new(Arc::clone(&connection)),
            profile: ProfileQuery::new(Arc::clone(&connection)).with_retry(config.profile_query_retry),
            my_application: MyApplicationQuery::new(Arc::clone(&connection))
                .with_retry(config.application_query_retry),
            connection,
            session,
            cache,
            config: config.clone(),
        })
    }

    /// Applicant search at `location`, with the configured retries.
    pub fn applicants(&self, location: Option<Location>) -> ApplicantsQuery {
        ApplicantsQuery::new(Arc::clone(&self.connection), location)
            .with_retry(self.config.applicants_query_retry)
    }

    pub fn shutdown(self) {
        info!("Shutting down...");
        self.connection.shutdown();
        info!("Shutdown complete.");
    }
}
