//! # Remote Errors
//!
//! Every failure surfaced by a [`RemoteClient`](crate::client::RemoteClient) is a
//! [`RemoteError`]. The remote client is responsible for mapping its wire error
//! codes onto the closed [`RemoteErrorKind`] tag; the raw code and message are
//! kept alongside for diagnostics and for the tagging-permission heuristic in
//! [`classify`](crate::classify).

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Closed set of error shapes a remote control plane can report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteErrorKind {
    AlreadyExists,
    NotFound,
    LimitExceeded,
    InvalidRequest,
    /// The version token sent with a mutating call was stale.
    ConcurrentModification,
    PreconditionFailed,
    Throttling,
    ServiceFailure,
    ServiceUnavailable,
    AccessDenied,
    /// The call never reached the remote system (closed channel, broken connection).
    Transport,
    /// A code this client does not know about. Carries the raw code.
    Unrecognized(String),
}

/// An error returned by the remote control plane.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    /// The raw wire code, e.g. `ResourceInUseException`.
    pub code: String,
    pub message: String,
    /// Debug rendering of the request that triggered the error, when known.
    pub request: Option<String>,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            request: None,
        }
    }

    /// Attaches the request that caused this error.
    pub fn with_request(mut self, request: &impl Debug) -> Self {
        self.request = Some(format!("{request:?}"));
        self
    }

    // Convenience constructors

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::AlreadyExists, "AlreadyExists", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, "NotFound", message)
    }

    pub fn limit_exceeded(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::LimitExceeded, "LimitExceeded", message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::InvalidRequest, "InvalidRequest", message)
    }

    pub fn concurrent_modification(message: impl Into<String>) -> Self {
        Self::new(
            RemoteErrorKind::ConcurrentModification,
            "ConcurrentModification",
            message,
        )
    }

    pub fn throttling(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Throttling, "Throttling", message)
    }

    pub fn service_failure(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::ServiceFailure, "ServiceFailure", message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::AccessDenied, "AccessDenied", message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transport, "Transport", message)
    }

    pub fn unrecognized(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        Self::new(RemoteErrorKind::Unrecognized(code.clone()), code, message)
    }
}
