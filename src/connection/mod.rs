//! The shared backend connection and its observable state.

pub mod actor_connection;
pub mod state;

pub use actor_connection::ActorConnection;
pub use state::{ConnectionPhase, ConnectionState};
