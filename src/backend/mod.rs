//! Contract with the remote backend actor.
//!
//! # Main Components
//!
//! - [`BackendClient`] - Cloneable handle that sends [`BackendRequest`]s
//! - [`ActorFactory`] - Builds new clients during connection initialization
//! - [`ResultEnvelope`] - Tagged domain answer returned by fallible calls
//! - [`map_backend_error`] - Total mapping from [`ErrorCode`] to message and actions
//!
//! # Testing
//!
//! See the [`mock`](crate::mock) module for a scripted backend.

pub mod client;
pub mod envelope;
pub mod error;
pub mod error_map;
pub mod factory;
pub mod message;
pub mod types;

pub use client::BackendClient;
pub use envelope::ResultEnvelope;
pub use error::{ErrorCode, TransportError};
pub use error_map::{
    map_backend_error, BackendErrorInfo, RecoveryAction, CONNECTION_FAILED_MESSAGE,
    UNEXPECTED_ERROR,
};
pub use factory::ActorFactory;
pub use message::{BackendRequest, Operation, Response};
pub use types::*;
