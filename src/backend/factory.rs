//! The seam through which new [`BackendClient`]s are built.

use super::client::BackendClient;
use super::error::TransportError;
use async_trait::async_trait;

/// Builds a fresh client for the backend actor.
///
/// Called once per initialization attempt. Failures are treated as transient and retried by
/// the [`ActorConnection`](crate::connection::ActorConnection).
///
/// # Example
///
/// ```rust
/// use reception_connect::backend::{ActorFactory, BackendClient, TransportError};
/// use async_trait::async_trait;
/// use tokio::sync::mpsc;
///
/// struct LocalFactory;
///
/// #[async_trait]
/// impl ActorFactory for LocalFactory {
///     async fn create_actor(&self) -> Result<BackendClient, TransportError> {
///         let (sender, _receiver) = mpsc::channel(8);
///         Ok(BackendClient::new(sender))
///     }
/// }
/// ```
#[async_trait]
pub trait ActorFactory: Send + Sync + 'static {
    async fn create_actor(&self) -> Result<BackendClient, TransportError>;
}
