//! # Reconcile Framework
//!
//! Building blocks for declarative resource reconciliation: an orchestrator says
//! what a resource should look like, and the engine makes one bounded step toward
//! it against a remote control plane, then reports where things stand.
//!
//! ## Architecture Overview
//!
//! The framework separates concerns into three layers:
//!
//! 1. **Kind Layer** ([`ResourceHandler`]) - how one resource kind maps onto the
//!    remote API: translation, and the create/read/update/delete calls.
//! 2. **Engine Layer** ([`ReconciliationEngine`]) - everything kind-independent:
//!    immutability checks, identity resolution, tag reconciliation, error
//!    classification, resumable progress.
//! 3. **Transport Layer** ([`RemoteClient`]) - one request in, one response or
//!    [`RemoteError`] out.
//!
//! You describe a kind **once** in a handler, and the engine handles ordering,
//! tagging and error normalization uniformly across kinds.
//!
//! ## Invocation Model
//!
//! ```text
//! orchestrator ──ReconcileRequest──▶ ReconciliationEngine ──▶ ResourceHandler ──▶ RemoteClient
//!      ▲                                     │
//!      └────────── ReconcileOutcome ◀────────┘
//!                 Success | Failed | InProgress(continuation)
//! ```
//!
//! One invocation is strictly sequential. Long-running operations return
//! `InProgress` with an opaque [`ContinuationState`]; the orchestrator calls
//! again with it until the outcome is terminal. See [`outcome`] for the contract.
//!
//! ## Resource Kinds
//!
//! - **Caller-keyed**: the caller chooses the primary key.
//! - **Content-addressed**: the remote system assigns an id and version token,
//!   and the engine finds existing instances by listing and comparing content
//!   ([`identity`]).
//!
//! Either kind may be taggable ([`tags`]) and may declare create-only fields
//! ([`immutability`]).
//!
//! ## Testing
//!
//! [`mock::MockRemote`] is a scripted [`RemoteClient`] for asserting exactly
//! which remote calls the engine makes.

pub mod classify;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod identity;
pub mod immutability;
pub mod mock;
pub mod model;
pub mod outcome;
pub mod schema;
pub mod tags;
pub mod tracing;

// Re-export core types for convenience
pub use classify::{classify, OutcomeCategory};
pub use client::RemoteClient;
pub use config::{ConfigError, EngineConfig};
pub use engine::ReconciliationEngine;
pub use error::{RemoteError, RemoteErrorKind};
pub use handler::{ListPage, ListedEntry, Progress, ResourceHandler};
pub use identity::{IdentityResolver, IdentityToken};
pub use immutability::ImmutableFieldSet;
pub use model::{ResourceModel, Verb};
pub use outcome::{ContinuationState, Failure, ReconcileOutcome, ReconcileRequest, Warning};
pub use schema::{Addressing, ResourceSchema};
pub use tags::{TagDelta, TagSet, TagShape};
