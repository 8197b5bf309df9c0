//! # Reconcile Resources
//!
//! Concrete resource kinds driven by [`reconcile_framework`], plus the
//! in-memory control plane they reconcile against.
//!
//! ## Core Components
//!
//! - **[control_plane]**: an actor emulating a remote infrastructure API, and its [`RemoteClient`](reconcile_framework::RemoteClient).
//! - **[cluster]**: caller-keyed, taggable, long-running clusters.
//! - **[target_policy]**: content-addressed policies attached to targets.
//! - **[translate]**: field helpers shared by the kinds' translators.
//! - **[lifecycle]**: wiring, shutdown and the polling [`Driver`](lifecycle::Driver).

pub mod cluster;
pub mod control_plane;
pub mod lifecycle;
pub mod target_policy;
pub mod translate;
