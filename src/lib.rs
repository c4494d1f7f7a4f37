//! # Reception Connect
//!
//! > **The client-side connection core of a healthcare-reception job marketplace.**
//!
//! Job seekers register, pick a role and a location, and submit an application with a photo.
//! Recruiters browse applicants by location. All of that lives in a remote backend actor; this
//! crate keeps the one handle to it alive and the cached reads on top of it honest.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### One connection, rebuilt per identity
//! The [`ActorConnection`](connection::ActorConnection) owns the only live
//! [`BackendClient`](backend::BackendClient). Every login, logout or manual retry rebuilds it
//! through an [`ActorFactory`](backend::ActorFactory), with exponential backoff from
//! [`RetryPolicy`](retry::RetryPolicy). A newer initialization always wins: the older one is
//! cancelled, and a generation counter keeps it from publishing if its last attempt lands late.
//!
//! ### Reads that never cross identities
//! Every cached read is keyed by the signed-in email. On top of that, profile entries are
//! reset before each initialization, and all connection-owned entries are invalidated after a
//! successful one. Fetches carry a ticket, so a result that started before a reset is thrown
//! away instead of cached.
//!
//! ### Two error tiers
//! - [`TransportError`](backend::TransportError): the call never got an answer. Retried.
//! - [`ErrorCode`](backend::ErrorCode) inside a [`ResultEnvelope`](backend::ResultEnvelope):
//!   the backend said no. Never retried; mapped to a message and recovery actions by
//!   [`map_backend_error`](backend::map_backend_error).
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Contract ([`backend`])
//! Request/response messages, the cloneable client, domain types and error mapping.
//!
//! ### 2. The Connection ([`connection`], [`retry`])
//! Lifecycle, observable [`ConnectionState`](connection::ConnectionState), backoff.
//!
//! ### 3. The Reads ([`cache`], [`queries`])
//! The query cache with its lifecycle coordinator, and one gate per resource.
//!
//! ### 4. The Writes ([`commands`], [`auth`])
//! Sign in/up/out, onboarding steps and applications, plus the persisted session.
//!
//! ### 5. The Orchestrator ([`runtime`])
//! [`ReceptionApp`](runtime::ReceptionApp) wires it all together from a [`Config`](config::Config).
//!
//! ## 🧪 Testing
//!
//! See the [`mock`] module for a scripted backend and a factory that fails on demand.
//!
//! ```bash
//! RUST_LOG=info cargo run
//! cargo test
//! ```

pub mod auth;
pub mod backend;
pub mod cache;
pub mod commands;
pub mod config;
pub mod connection;
pub mod mock;
pub mod onboarding;
pub mod queries;
pub mod retry;
pub mod runtime;
