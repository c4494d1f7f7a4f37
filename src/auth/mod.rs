//! Authenticated identity and its persistence.

pub mod session;
pub mod store;

pub use session::{AuthSession, Identity};
pub use store::{FileSessionStore, MemorySessionStore, SessionError, SessionStore, StoredSession};
