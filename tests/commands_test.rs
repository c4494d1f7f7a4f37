use reception_connect::auth::{AuthSession, MemorySessionStore, StoredSession};
use reception_connect::backend::{
    ErrorCode, Gender, Location, Operation, PhotoBlob, Principal, RecoveryAction, UserProfile,
    UserRole,
};
use reception_connect::cache::{QueryCache, QueryKey, CURRENT_USER_PROFILE, MY_JOB_APPLICATION};
use reception_connect::commands::{CommandError, Commands};
use reception_connect::config::Config;
use reception_connect::connection::ActorConnection;
use reception_connect::mock::{MockBackend, ScriptedFactory};
use reception_connect::queries::{MyApplicationQuery, ProfileQuery, QueryGate};
use std::sync::Arc;
use std::time::Duration;

const EMAIL: &str = "asha@example.com";

fn mount(backend: &MockBackend, session: AuthSession) -> Arc<ActorConnection> {
    let factory = Arc::new(ScriptedFactory::new(backend.clone()));
    ActorConnection::mount(factory, QueryCache::new(), &Config::default(), session)
}

fn signed_in() -> AuthSession {
    let store = MemorySessionStore::with_session(StoredSession::signed_in(EMAIL));
    AuthSession::restore(Arc::new(store)).expect("Failed to restore session")
}

fn pune() -> Location {
    Location::new("Pune", "Haveli", "Maharashtra", "India")
}

#[tokio::test(start_paused = true)]
async fn test_commands_need_a_ready_client() {
    let backend = MockBackend::new();
    let factory =
        Arc::new(ScriptedFactory::new(backend.clone()).with_build_delay(Duration::from_secs(2)));
    let connection =
        ActorConnection::mount(factory, QueryCache::new(), &Config::default(), signed_in());
    let commands = Commands::new(connection);

    let result = commands.select_role(UserRole::Recruiter).await;
    assert!(matches!(result, Err(CommandError::NotReady)));
    assert_eq!(backend.count(Operation::SetUserRole), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_switches_identity_and_rebuilds() {
    let backend = MockBackend::new();
    backend.expect_authenticate().return_ok(());
    let session = AuthSession::in_memory();
    let connection = mount(&backend, session.clone());
    let first = connection.wait_until_settled().await;

    Commands::new(connection.clone())
        .sign_in(EMAIL, "correct horse")
        .await
        .expect("sign in failed");

    assert_eq!(session.identity().map(|i| i.email().to_string()), Some(EMAIL.to_string()));
    let state = connection.wait_for_generation(first.generation + 1).await;
    assert!(state.is_ready);
    backend.verify();
}

#[tokio::test(start_paused = true)]
async fn test_rejected_sign_in_keeps_session() {
    let backend = MockBackend::new();
    backend
        .expect_authenticate()
        .return_err(ErrorCode::InvalidCredentials);
    let session = AuthSession::in_memory();
    let connection = mount(&backend, session.clone());
    connection.wait_until_settled().await;

    let error = Commands::new(connection.clone())
        .sign_in(EMAIL, "wrong")
        .await
        .expect_err("sign in should fail");

    assert_eq!(error.code(), Some(ErrorCode::InvalidCredentials));
    match &error {
        CommandError::Domain { info, .. } => {
            assert_eq!(info.actions, &[RecoveryAction::Retry]);
        }
        other => panic!("expected a domain error, got {other:?}"),
    }
    assert!(!session.is_authenticated());
    assert_eq!(connection.state().generation, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sign_up_returns_principal_without_signing_in() {
    let backend = MockBackend::new();
    backend
        .expect_register()
        .return_ok(Principal("principal-asha".to_string()));
    let session = AuthSession::in_memory();
    let connection = mount(&backend, session.clone());
    connection.wait_until_settled().await;

    let profile = UserProfile::new("Asha", EMAIL, "555-0101", Gender::Female);
    let principal = Commands::new(connection)
        .sign_up(profile, "correct horse")
        .await
        .expect("sign up failed");

    assert_eq!(principal, Principal("principal-asha".to_string()));
    assert!(!session.is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_select_role_marks_only_the_profile_stale() {
    let backend = MockBackend::new();
    backend
        .expect_profile()
        .return_ok(Some(UserProfile::new("Asha", EMAIL, "555-0101", Gender::Female)));
    backend
        .expect_my_application()
        .return_err(ErrorCode::NoApplicationFound);
    backend.expect_set_role().return_ok(());
    let connection = mount(&backend, signed_in());
    connection.wait_until_settled().await;

    ProfileQuery::new(connection.clone()).load().await;
    MyApplicationQuery::new(connection.clone()).load().await;

    Commands::new(connection.clone())
        .select_role(UserRole::JobSeeker)
        .await
        .expect("select role failed");

    let cache = connection.cache();
    let profile = cache
        .get(&QueryKey::new(CURRENT_USER_PROFILE).with(EMAIL))
        .expect("profile cached");
    assert!(profile.is_stale);
    let application = cache
        .get(&QueryKey::new(MY_JOB_APPLICATION).with(EMAIL))
        .expect("application cached");
    assert!(application.is_fresh());
    backend.verify();
}

#[tokio::test(start_paused = true)]
async fn test_submit_application_marks_only_the_application_stale() {
    let backend = MockBackend::new();
    backend.expect_profile().return_ok(None);
    backend
        .expect_my_application()
        .return_err(ErrorCode::NoApplicationFound);
    backend.expect_submit_application().return_ok(());
    let connection = mount(&backend, signed_in());
    connection.wait_until_settled().await;

    ProfileQuery::new(connection.clone()).load().await;
    MyApplicationQuery::new(connection.clone()).load().await;

    Commands::new(connection.clone())
        .submit_application(pune(), PhotoBlob::from_bytes(vec![0xFF, 0xD8, 0xFF]))
        .await
        .expect("submit failed");

    let cache = connection.cache();
    assert!(cache
        .get(&QueryKey::new(MY_JOB_APPLICATION).with(EMAIL))
        .is_some_and(|entry| entry.is_stale));
    assert!(cache
        .get(&QueryKey::new(CURRENT_USER_PROFILE).with(EMAIL))
        .is_some_and(|entry| entry.is_fresh()));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_write_leaves_cache_alone() {
    let backend = MockBackend::new();
    backend.expect_profile().return_ok(None);
    backend
        .expect_submit_application()
        .return_err(ErrorCode::RecruiterCannotApply);
    let connection = mount(&backend, signed_in());
    connection.wait_until_settled().await;
    ProfileQuery::new(connection.clone()).load().await;

    let error = Commands::new(connection.clone())
        .submit_application(pune(), PhotoBlob::from_url("https://cdn.example.com/a.jpg"))
        .await
        .expect_err("recruiters cannot apply");

    assert_eq!(error.code(), Some(ErrorCode::RecruiterCannotApply));
    assert!(connection
        .cache()
        .get(&QueryKey::new(CURRENT_USER_PROFILE).with(EMAIL))
        .is_some_and(|entry| entry.is_fresh()));
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_clears_session_and_rebuilds() {
    let backend = MockBackend::new();
    let session = signed_in();
    let connection = mount(&backend, session.clone());
    connection.wait_until_settled().await;

    Commands::new(connection.clone())
        .sign_out()
        .expect("sign out failed");

    assert!(!session.is_authenticated());
    assert!(connection.wait_for_generation(2).await.is_ready);
    assert!(ProfileQuery::new(connection).current_key().is_none());
}
