//! # Commands
//!
//! Writes against the ready backend client. Each command consumes the backend's envelope once,
//! maps a domain error through [`map_backend_error`], and on success marks stale only the cache
//! entry it owns.

use crate::auth::SessionError;
use crate::backend::{
    map_backend_error, BackendClient, BackendErrorInfo, ErrorCode, Location, PhotoBlob, Principal,
    ResultEnvelope, TransportError, UserProfile, UserRole,
};
use crate::cache::{QueryKey, CURRENT_USER_PROFILE, MY_JOB_APPLICATION};
use crate::connection::ActorConnection;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Backend connection is not ready")]
    NotReady,
    #[error("{}", .info.message)]
    Domain {
        code: ErrorCode,
        info: BackendErrorInfo,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl CommandError {
    pub fn domain(code: ErrorCode) -> Self {
        CommandError::Domain {
            code,
            info: map_backend_error(code),
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            CommandError::Domain { code, .. } => Some(*code),
            _ => None,
        }
    }
}

fn unwrap_envelope<T>(envelope: ResultEnvelope<T>) -> Result<T, CommandError> {
    match envelope {
        ResultEnvelope::Ok(value) => Ok(value),
        ResultEnvelope::Err(code) => {
            warn!(%code, "Backend rejected command");
            Err(CommandError::domain(code))
        }
    }
}

/// Command helpers bound to one connection.
#[derive(Clone)]
pub struct Commands {
    connection: Arc<ActorConnection>,
}

impl Commands {
    pub fn new(connection: Arc<ActorConnection>) -> Self {
        Self { connection }
    }

    fn client(&self) -> Result<BackendClient, CommandError> {
        self.connection.client().ok_or(CommandError::NotReady)
    }

    /// Marks the signed-in user's `resource` entry stale. Other resources are left alone.
    fn invalidate_own(&self, resource: &'static str) {
        if let Some(identity) = self.connection.identity() {
            let key = QueryKey::new(resource).with(identity.email());
            self.connection.cache().invalidate_key(&key);
        }
    }

    /// Authenticates and, on success, signs the session in as `email`.
    ///
    /// Signing in changes the identity, which rebuilds the backend client.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), CommandError> {
        let client = self.client()?;
        let envelope = client
            .authenticate_user(email.to_string(), password.to_string())
            .await?;
        unwrap_envelope(envelope)?;
        self.connection.auth().login(email)?;
        info!("Signed in");
        Ok(())
    }

    /// Registers a new account. Does not sign in.
    #[instrument(skip(self, profile, password), fields(email = %profile.email))]
    pub async fn sign_up(
        &self,
        profile: UserProfile,
        password: &str,
    ) -> Result<Principal, CommandError> {
        let client = self.client()?;
        let principal = unwrap_envelope(client.register_user(profile, password.to_string()).await?)?;
        info!(%principal, "Registered");
        Ok(principal)
    }

    #[instrument(skip(self))]
    pub async fn select_role(&self, role: UserRole) -> Result<(), CommandError> {
        let client = self.client()?;
        unwrap_envelope(client.set_user_role(role).await?)?;
        self.invalidate_own(CURRENT_USER_PROFILE);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_location(&self, location: Location) -> Result<(), CommandError> {
        let client = self.client()?;
        unwrap_envelope(client.set_user_location(location).await?)?;
        self.invalidate_own(CURRENT_USER_PROFILE);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn save_profile(&self, profile: UserProfile) -> Result<(), CommandError> {
        let client = self.client()?;
        unwrap_envelope(client.save_caller_user_profile(profile).await?)?;
        self.invalidate_own(CURRENT_USER_PROFILE);
        Ok(())
    }

    #[instrument(skip(self, photo))]
    pub async fn submit_application(
        &self,
        location: Location,
        photo: PhotoBlob,
    ) -> Result<(), CommandError> {
        let client = self.client()?;
        unwrap_envelope(client.submit_job_application(location, photo).await?)?;
        self.invalidate_own(MY_JOB_APPLICATION);
        Ok(())
    }

    #[instrument(skip(self, photo))]
    pub async fn update_application(
        &self,
        location: Location,
        photo: PhotoBlob,
    ) -> Result<(), CommandError> {
        let client = self.client()?;
        unwrap_envelope(client.update_job_application(location, photo).await?)?;
        self.invalidate_own(MY_JOB_APPLICATION);
        Ok(())
    }

    /// Clears the session. Works whether or not the connection is ready.
    pub fn sign_out(&self) -> Result<(), CommandError> {
        self.connection.auth().logout()?;
        Ok(())
    }
}
