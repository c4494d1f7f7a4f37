//! # Mock Backend
//!
//! Utilities for testing the connection, the gates and the commands without a real backend.
//!
//! - [`MockBackend`] serves scripted answers from a fluent expectation queue and records every
//!   operation it receives.
//! - [`ScriptedFactory`] hands out [`MockBackend`] clients and can fail the first N builds.
//! - [`create_mock_client`] gives a client plus the raw request receiver, for tests that want to
//!   answer (or drop) each request by hand.
//!
//! # Example
//! ```ignore
//! let backend = MockBackend::new();
//! backend.expect_profile().return_ok(Some(profile));
//! backend.expect_my_application().return_err(ErrorCode::NoApplicationFound);
//!
//! let factory = Arc::new(ScriptedFactory::new(backend.clone()).failing_first(2));
//! // Mount a connection with `factory`...
//! backend.verify(); // Ensures all expectations were met
//! ```

use crate::backend::{
    ActorFactory, BackendClient, BackendRequest, ErrorCode, JobApplicantProfile, Location,
    Operation, Principal, Response, ResultEnvelope, TransportError, UserProfile,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::warn;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// A scripted answer, typed by the operation it belongs to.
enum Reply {
    Unit(ResultEnvelope<()>),
    Principal(ResultEnvelope<Principal>),
    Profile(ResultEnvelope<Option<UserProfile>>),
    Application(ResultEnvelope<JobApplicantProfile>),
    Applicants(ResultEnvelope<Vec<JobApplicantProfile>>),
}

impl Reply {
    fn unit(self) -> Option<ResultEnvelope<()>> {
        match self {
            Reply::Unit(envelope) => Some(envelope),
            _ => None,
        }
    }

    fn principal(self) -> Option<ResultEnvelope<Principal>> {
        match self {
            Reply::Principal(envelope) => Some(envelope),
            _ => None,
        }
    }

    fn profile(self) -> Option<ResultEnvelope<Option<UserProfile>>> {
        match self {
            Reply::Profile(envelope) => Some(envelope),
            _ => None,
        }
    }

    fn application(self) -> Option<ResultEnvelope<JobApplicantProfile>> {
        match self {
            Reply::Application(envelope) => Some(envelope),
            _ => None,
        }
    }

    fn applicants(self) -> Option<ResultEnvelope<Vec<JobApplicantProfile>>> {
        match self {
            Reply::Applicants(envelope) => Some(envelope),
            _ => None,
        }
    }
}

struct Expectation {
    operation: Operation,
    response: Result<Reply, TransportError>,
    delay: Option<Duration>,
}

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    received: Vec<Operation>,
    unexpected: Vec<Operation>,
    handshake_secrets: Vec<String>,
    handshake_failures: u32,
    searches: Vec<(Location, bool)>,
}

/// A scripted backend shared by every client it hands out.
///
/// Requests are matched to the first queued expectation for the same [`Operation`]. The
/// access-control handshake is recorded, never queued; it succeeds unless
/// [`fail_handshakes`](Self::fail_handshakes) scripted a rejection. A request with no
/// matching expectation has its responder dropped, which the caller sees as
/// [`TransportError::ActorDropped`].
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Creates a new mock backend with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A fresh client served by a new task over this backend's expectations.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn client(&self) -> BackendClient {
        let (sender, mut receiver) = mpsc::channel::<BackendRequest>(32);
        let backend = self.clone();
        tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                backend.serve(request);
            }
        });
        BackendClient::new(sender)
    }

    fn serve(&self, request: BackendRequest) {
        let operation = request.operation();
        let mut handshake_rejected = false;
        let expectation = {
            let mut state = self.lock();
            state.received.push(operation);
            match &request {
                BackendRequest::InitializeAccessControl { secret, .. } => {
                    state.handshake_secrets.push(secret.clone());
                    if state.handshake_failures > 0 {
                        state.handshake_failures -= 1;
                        handshake_rejected = true;
                    }
                }
                BackendRequest::SearchApplicantsByLocation {
                    location,
                    include_photo,
                    ..
                } => state.searches.push((location.clone(), *include_photo)),
                _ => {}
            }
            if operation == Operation::InitializeAccessControl {
                None
            } else {
                let position = state
                    .expectations
                    .iter()
                    .position(|e| e.operation == operation);
                match position.and_then(|index| state.expectations.remove(index)) {
                    Some(expectation) => Some(expectation),
                    None => {
                        state.unexpected.push(operation);
                        warn!(%operation, "Unexpected request");
                        return;
                    }
                }
            }
        };

        match expectation {
            None => {
                if let BackendRequest::InitializeAccessControl { respond_to, .. } = request {
                    let answer = if handshake_rejected {
                        Err(TransportError::ActorDropped)
                    } else {
                        Ok(())
                    };
                    let _ = respond_to.send(answer);
                }
            }
            Some(Expectation {
                response, delay, ..
            }) => {
                tokio::spawn(async move {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    answer(request, response);
                });
            }
        }
    }

    /// Rejects the next `count` access-control handshakes, across every client.
    pub fn fail_handshakes(&self, count: u32) {
        self.lock().handshake_failures = count;
    }

    fn push(&self, expectation: Expectation) {
        self.lock().expectations.push_back(expectation);
    }

    fn builder<T>(
        &self,
        operation: Operation,
        wrap: fn(ResultEnvelope<T>) -> Reply,
    ) -> ExpectationBuilder<T> {
        ExpectationBuilder {
            backend: self.clone(),
            operation,
            delay: None,
            wrap,
        }
    }

    pub fn expect_authenticate(&self) -> ExpectationBuilder<()> {
        self.builder(Operation::AuthenticateUser, Reply::Unit)
    }

    pub fn expect_register(&self) -> ExpectationBuilder<Principal> {
        self.builder(Operation::RegisterUser, Reply::Principal)
    }

    pub fn expect_profile(&self) -> ExpectationBuilder<Option<UserProfile>> {
        self.builder(Operation::GetCallerUserProfile, Reply::Profile)
    }

    pub fn expect_save_profile(&self) -> ExpectationBuilder<()> {
        self.builder(Operation::SaveCallerUserProfile, Reply::Unit)
    }

    pub fn expect_set_role(&self) -> ExpectationBuilder<()> {
        self.builder(Operation::SetUserRole, Reply::Unit)
    }

    pub fn expect_set_location(&self) -> ExpectationBuilder<()> {
        self.builder(Operation::SetUserLocation, Reply::Unit)
    }

    pub fn expect_my_application(&self) -> ExpectationBuilder<JobApplicantProfile> {
        self.builder(Operation::GetMyJobApplication, Reply::Application)
    }

    pub fn expect_submit_application(&self) -> ExpectationBuilder<()> {
        self.builder(Operation::SubmitJobApplication, Reply::Unit)
    }

    pub fn expect_update_application(&self) -> ExpectationBuilder<()> {
        self.builder(Operation::UpdateJobApplication, Reply::Unit)
    }

    pub fn expect_search_applicants(&self) -> ExpectationBuilder<Vec<JobApplicantProfile>> {
        self.builder(Operation::SearchApplicantsByLocation, Reply::Applicants)
    }

    /// Every operation received so far, in arrival order. Includes handshakes.
    pub fn received(&self) -> Vec<Operation> {
        self.lock().received.clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .received
            .iter()
            .filter(|received| **received == operation)
            .count()
    }

    /// Requests that arrived with no matching expectation.
    pub fn unexpected(&self) -> Vec<Operation> {
        self.lock().unexpected.clone()
    }

    pub fn handshake_secrets(&self) -> Vec<String> {
        self.lock().handshake_secrets.clone()
    }

    /// `(location, include_photo)` of every applicant search.
    pub fn searches(&self) -> Vec<(Location, bool)> {
        self.lock().searches.clone()
    }

    pub fn pending(&self) -> usize {
        self.lock().expectations.len()
    }

    /// Verifies that all expectations were met and nothing unexpected arrived.
    pub fn verify(&self) {
        let state = self.lock();
        if !state.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                state.expectations.len()
            );
        }
        if !state.unexpected.is_empty() {
            panic!("Unexpected requests: {:?}", state.unexpected);
        }
    }
}

/// Builder for one queued answer.
pub struct ExpectationBuilder<T> {
    backend: MockBackend,
    operation: Operation,
    delay: Option<Duration>,
    wrap: fn(ResultEnvelope<T>) -> Reply,
}

impl<T> ExpectationBuilder<T> {
    /// Holds the answer back for `delay`. Other requests are served meanwhile.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the expectation to return a successful envelope.
    pub fn return_ok(self, value: T) {
        self.respond(ResultEnvelope::Ok(value));
    }

    /// Sets the expectation to return a domain error envelope.
    pub fn return_err(self, code: ErrorCode) {
        self.respond(ResultEnvelope::Err(code));
    }

    pub fn respond(self, envelope: ResultEnvelope<T>) {
        let reply = (self.wrap)(envelope);
        self.finish(Ok(reply));
    }

    /// Sets the expectation to fail at the transport level.
    pub fn fail(self, error: TransportError) {
        self.finish(Err(error));
    }

    fn finish(self, response: Result<Reply, TransportError>) {
        self.backend.push(Expectation {
            operation: self.operation,
            response,
            delay: self.delay,
        });
    }
}

fn answer(request: BackendRequest, response: Result<Reply, TransportError>) {
    match request {
        BackendRequest::InitializeAccessControl { respond_to, .. } => {
            let _ = respond_to.send(Ok(()));
        }
        BackendRequest::AuthenticateUser { respond_to, .. }
        | BackendRequest::SaveCallerUserProfile { respond_to, .. }
        | BackendRequest::SetUserRole { respond_to, .. }
        | BackendRequest::SetUserLocation { respond_to, .. }
        | BackendRequest::SubmitJobApplication { respond_to, .. }
        | BackendRequest::UpdateJobApplication { respond_to, .. } => {
            send(respond_to, response, Reply::unit)
        }
        BackendRequest::RegisterUser { respond_to, .. } => {
            send(respond_to, response, Reply::principal)
        }
        BackendRequest::GetCallerUserProfile { respond_to } => {
            send(respond_to, response, Reply::profile)
        }
        BackendRequest::GetMyJobApplication { respond_to } => {
            send(respond_to, response, Reply::application)
        }
        BackendRequest::SearchApplicantsByLocation { respond_to, .. } => {
            send(respond_to, response, Reply::applicants)
        }
    }
}

// A reply of the wrong shape drops the responder.
fn send<T>(
    respond_to: Response<T>,
    response: Result<Reply, TransportError>,
    extract: fn(Reply) -> Option<T>,
) {
    let response = match response {
        Ok(reply) => match extract(reply) {
            Some(value) => Ok(value),
            None => return,
        },
        Err(e) => Err(e),
    };
    let _ = respond_to.send(response);
}

// =============================================================================
// FACTORY
// =============================================================================

/// [`ActorFactory`] over a [`MockBackend`].
pub struct ScriptedFactory {
    backend: MockBackend,
    failures_remaining: AtomicU32,
    builds: AtomicU32,
    build_delay: Option<Duration>,
}

impl ScriptedFactory {
    pub fn new(backend: MockBackend) -> Self {
        Self {
            backend,
            failures_remaining: AtomicU32::new(0),
            builds: AtomicU32::new(0),
            build_delay: None,
        }
    }

    /// Fails the next `failures` builds with [`TransportError::Build`].
    pub fn failing_first(self, failures: u32) -> Self {
        self.failures_remaining.store(failures, Ordering::SeqCst);
        self
    }

    /// Every build takes `delay` before it succeeds or fails.
    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = Some(delay);
        self
    }

    /// Scripts `failures` more failing builds.
    pub fn fail_next(&self, failures: u32) {
        self.failures_remaining.store(failures, Ordering::SeqCst);
    }

    /// Builds attempted so far, failed ones included.
    pub fn builds(&self) -> u32 {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn backend(&self) -> &MockBackend {
        &self.backend
    }
}

#[async_trait]
impl ActorFactory for ScriptedFactory {
    async fn create_actor(&self) -> Result<BackendClient, TransportError> {
        let build = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.build_delay {
            tokio::time::sleep(delay).await;
        }
        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(TransportError::Build(format!("scripted failure on build {build}")));
        }
        Ok(self.backend.client())
    }
}

// =============================================================================
// MANUAL HELPERS
// =============================================================================

/// Creates a client and the receiver its requests arrive on.
///
/// For tests that need to hold a request open, answer it out of order, or drop it.
pub fn create_mock_client(buffer_size: usize) -> (BackendClient, mpsc::Receiver<BackendRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (BackendClient::new(sender), receiver)
}

/// Helper to verify that the next request is `operation`.
pub async fn expect_request(
    receiver: &mut mpsc::Receiver<BackendRequest>,
    operation: Operation,
) -> Option<BackendRequest> {
    match receiver.recv().await {
        Some(request) if request.operation() == operation => Some(request),
        _ => None,
    }
}

/// Helper to verify that the next request is a profile read and hand back its responder.
pub async fn expect_profile_request(
    receiver: &mut mpsc::Receiver<BackendRequest>,
) -> Option<Response<ResultEnvelope<Option<UserProfile>>>> {
    match receiver.recv().await {
        Some(BackendRequest::GetCallerUserProfile { respond_to }) => Some(respond_to),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Gender;

    #[tokio::test]
    async fn test_answers_match_by_operation() {
        let backend = MockBackend::new();
        backend.expect_set_role().return_ok(());
        backend
            .expect_profile()
            .return_ok(Some(UserProfile::new("Alice", "a@x.io", "1", Gender::Female)));

        let client = backend.client();
        let profile = client.get_caller_user_profile().await.unwrap();
        assert!(matches!(profile, ResultEnvelope::Ok(Some(_))));
        let role = client
            .set_user_role(crate::backend::UserRole::JobSeeker)
            .await
            .unwrap();
        assert_eq!(role, ResultEnvelope::Ok(()));

        backend.verify();
        assert_eq!(
            backend.received(),
            vec![Operation::GetCallerUserProfile, Operation::SetUserRole]
        );
    }

    #[tokio::test]
    async fn test_unexpected_request_drops_responder() {
        let backend = MockBackend::new();
        let client = backend.client();

        let result = client.get_my_job_application().await;
        assert_eq!(result, Err(TransportError::ActorDropped));
        assert_eq!(backend.unexpected(), vec![Operation::GetMyJobApplication]);
    }

    #[tokio::test]
    async fn test_transport_failure_expectation() {
        let backend = MockBackend::new();
        backend.expect_profile().fail(TransportError::ActorClosed);

        let result = backend.client().get_caller_user_profile().await;
        assert_eq!(result, Err(TransportError::ActorClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_answer_does_not_block_others() {
        let backend = MockBackend::new();
        backend
            .expect_profile()
            .after(Duration::from_secs(5))
            .return_ok(None);
        backend.expect_set_role().return_ok(());
        let client = backend.client();

        let slow = tokio::spawn({
            let client = client.clone();
            async move { client.get_caller_user_profile().await }
        });
        tokio::task::yield_now().await;

        let started = tokio::time::Instant::now();
        client
            .set_user_role(crate::backend::UserRole::Recruiter)
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));

        assert_eq!(slow.await.unwrap(), Ok(ResultEnvelope::Ok(None)));
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_scripted_factory_fails_first_builds() {
        let factory = ScriptedFactory::new(MockBackend::new()).failing_first(2);

        assert!(matches!(factory.create_actor().await, Err(TransportError::Build(_))));
        assert!(matches!(factory.create_actor().await, Err(TransportError::Build(_))));
        assert!(factory.create_actor().await.is_ok());
        assert_eq!(factory.builds(), 3);
    }
}
