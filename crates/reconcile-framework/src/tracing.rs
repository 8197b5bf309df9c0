//! # Observability & Tracing
//!
//! The engine logs through the `tracing` facade and never installs a subscriber
//! itself. Hosts that want output call [`setup_tracing`] (or
//! [`setup_tracing_with`]) once at startup.
//!
//! ## What Gets Traced
//!
//! Every invocation runs inside a `reconcile` span carrying `resource_type` and
//! `verb`, so every line it emits is attributable:
//!
//! ```text
//! INFO reconcile{resource_type="Example::Compute::Cluster" verb=create}: Invoking create
//! INFO reconcile{resource_type="Example::Compute::Cluster" verb=create}: In progress checks=0
//! WARN reconcile{resource_type="Example::Compute::Cluster" verb=create}: Tagging not permitted; continuing without tags error=AccessDenied: ...
//! ```
//!
//! - **info**: verb entry, remote call issued, terminal outcome.
//! - **warn**: tag permission degraded, classified failures, immutability violations.
//! - **debug**: full request payloads, tag deltas, list pages walked by the resolver.
//!
//! ```bash
//! RUST_LOG=info cargo run --bin reconcile-demo
//! RUST_LOG=reconcile_framework=debug cargo run --bin reconcile-demo
//! ```

use tracing_subscriber::EnvFilter;

/// Installs a compact fmt subscriber filtered by `RUST_LOG`.
pub fn setup_tracing() {
    init(EnvFilter::from_default_env());
}

/// Like [`setup_tracing`], but with an explicit filter directive such as
/// `"info"` or `"reconcile_framework=debug"`. Falls back to `info` if the
/// directive does not parse.
pub fn setup_tracing_with(directive: &str) {
    init(EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info")));
}

fn init(filter: EnvFilter) {
    // A second call (e.g. from several tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
