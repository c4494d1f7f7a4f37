use reception_connect::backend::{Gender, UserProfile, UserRole};
use reception_connect::config::Config;
use reception_connect::mock::{MockBackend, ScriptedFactory};
use reception_connect::onboarding::{onboarding_redirect, OnboardingStep};
use reception_connect::queries::QueryGate;
use reception_connect::runtime::{setup_tracing, ReceptionApp};
use std::sync::Arc;
use tracing::{info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = Config::from_env().map_err(|e| e.to_string())?;
    info!("Starting reception client against a scripted backend");

    // Scripted backend standing in for the real actor. The first two builds fail.
    let backend = MockBackend::new();
    backend.expect_authenticate().return_ok(());
    let mut profile = UserProfile::new("Asha Rao", "asha@example.com", "555-0101", Gender::Female);
    backend.expect_profile().return_ok(Some(profile.clone()));
    backend.expect_set_role().return_ok(());
    profile.role = Some(UserRole::JobSeeker);
    backend.expect_profile().return_ok(Some(profile));

    let factory = Arc::new(ScriptedFactory::new(backend.clone()).failing_first(2));
    let app = ReceptionApp::start(&config, factory).map_err(|e| e.to_string())?;

    let state = app.connection.wait_until_settled().await;
    if let Some(error) = state.init_error {
        return Err(error);
    }
    info!(retry_count = state.retry_count, "Connected");

    let span = tracing::info_span!("sign_in");
    async {
        app.commands
            .sign_in("asha@example.com", "correct horse")
            .await
            .map_err(|e| e.to_string())
    }
    .instrument(span)
    .await?;

    // Signing in rebuilt the client; wait for that initialization.
    let generation = state.generation + 1;
    app.connection.wait_for_generation(generation).await;

    let view = app.profile.load().await;
    if let Some(profile) = view.profile() {
        let redirect = onboarding_redirect(OnboardingStep::Role, profile);
        info!(name = %profile.name, ?redirect, "Profile loaded");
    }

    app.commands
        .select_role(UserRole::JobSeeker)
        .await
        .map_err(|e| e.to_string())?;
    let view = app.profile.load().await;
    if let Some(profile) = view.profile() {
        let next = onboarding_redirect(OnboardingStep::Role, profile);
        info!(role = ?profile.role, next = ?next.map(|route| route.path()), "Role selected");
    }

    app.shutdown();
    if backend.pending() > 0 {
        warn!(pending = backend.pending(), "Scripted answers left unused");
    }
    Ok(())
}
