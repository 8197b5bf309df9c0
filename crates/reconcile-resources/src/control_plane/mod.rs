//! # In-Memory Control Plane
//!
//! A stand-in for a remote infrastructure API, built as an actor: one Tokio
//! task owns all state and answers [`ApiRequest`]s sent through a
//! [`ControlPlaneClient`].
//!
//! ## Structure
//!
//! - [`message`] - wire requests, responses and service errors
//! - [`actor`] - [`ControlPlaneActor`], the state owner
//! - [`client`] - [`ControlPlaneClient`], the [`RemoteClient`](reconcile_framework::RemoteClient) implementation
//! - [`config`] - [`ControlPlaneConfig`], timing and fault knobs
//!
//! ## Usage
//!
//! ```rust
//! use reconcile_framework::RemoteClient;
//! use reconcile_resources::control_plane::{self, ApiRequest, ApiResponse, ControlPlaneConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (client, handle) = control_plane::spawn(ControlPlaneConfig::default());
//!
//!     let response = client
//!         .invoke(ApiRequest::ListPolicies { target_id: "t-1".into(), next_token: None })
//!         .await
//!         .unwrap();
//!     assert!(matches!(response, ApiResponse::PolicyPage { .. }));
//!
//!     drop(client);
//!     handle.await.unwrap();
//! }
//! ```

pub mod actor;
pub mod client;
pub mod config;
pub mod message;

pub use actor::ControlPlaneActor;
pub use client::ControlPlaneClient;
pub use config::ControlPlaneConfig;
pub use message::*;

use tokio::task::JoinHandle;

/// Creates the control plane actor and its client.
pub fn new(config: ControlPlaneConfig) -> (ControlPlaneActor, ControlPlaneClient) {
    ControlPlaneActor::new(config)
}

/// Creates the control plane and starts it on the current runtime. It stops
/// once every clone of the returned client is dropped.
pub fn spawn(config: ControlPlaneConfig) -> (ControlPlaneClient, JoinHandle<()>) {
    let (actor, client) = new(config);
    (client, tokio::spawn(actor.run()))
}
