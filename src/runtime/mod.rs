//! Runtime orchestration and lifecycle management.
//!
//! # Main Components
//!
//! - [`ReceptionApp`] - Mounts the connection and wires the gates and commands to it
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod app;
pub mod tracing;

pub use self::app::ReceptionApp;
pub use self::tracing::setup_tracing;
