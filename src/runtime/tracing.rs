//! # Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging with the `tracing` crate.
//!
//! ## Configuration
//!
//! Compact format, module prefix hidden (`with_target(false)`), level taken from `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Connection lifecycle**: initializing, superseded, ready and failed, each with `generation`
//! - **Retries**: every failed attempt with `attempt`, `delay_ms` and the error (`warn`)
//! - **Cache**: resets and invalidations with entry counts (`debug`)
//! - **Backend calls**: one span per client call, payloads only at `debug`
//!
//! ## Usage Examples
//!
//! ```bash
//! # Connection transitions only
//! RUST_LOG=info cargo run
//!
//! # Cache and per-call detail
//! RUST_LOG=debug cargo run
//! ```
//!
//! **With `RUST_LOG=info`**, a start where the first build fails once:
//!
//! ```text
//! INFO Mounting backend connection identity=None
//! INFO Initializing backend connection generation=1
//! WARN Attempt failed, backing off attempt=1 max_attempts=5 delay_ms=1000 error=Failed to build backend actor: scripted failure on build 1
//! INFO Backend connection ready generation=1 retry_count=1
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
