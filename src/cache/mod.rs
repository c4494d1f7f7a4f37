//! Query cache shared by the connection and the query gates.
//!
//! - [`QueryCache`] - the store, with ticket-based rejection of superseded fetches
//! - [`QueryCacheCoordinator`] - reset/invalidate operations tied to the connection lifecycle
//! - [`QueryKey`] / [`QueryData`] - keys and cached payloads

pub mod coordinator;
pub mod entry;
pub mod store;

pub use coordinator::{is_profile_resource, QueryCacheCoordinator, CONNECTION_RESOURCES};
pub use entry::*;
pub use store::{CacheEvent, FetchTicket, QueryCache};
