//! # Exception Classification
//!
//! Collapses the open-ended world of remote failures into the small, closed
//! [`OutcomeCategory`] vocabulary that orchestrators make retry decisions on.
//!
//! Classification is a total `match` over [`RemoteErrorKind`]. The only place
//! where message text matters is access-denied errors: a denial for a tagging
//! action is reported as [`OutcomeCategory::TagPermissionDenied`] so that the
//! engine can finish the operation without tags instead of failing it. That
//! check is a heuristic and lives in [`names_tagging_action`] alone.

use crate::error::{RemoteError, RemoteErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Lowercased names of remote actions that add or remove tags.
pub const TAGGING_ACTIONS: &[&str] = &[
    "tagresource",
    "untagresource",
    "addtags",
    "removetags",
    "addtagstoresource",
    "removetagsfromresource",
    "createtags",
    "deletetags",
    "listtagsforresource",
    "listtags",
];

/// The closed set of outcome categories the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeCategory {
    AlreadyExists,
    NotFound,
    LimitExceeded,
    InvalidRequest,
    Throttled,
    InternalError,
    /// Access was denied for a tagging action specifically.
    TagPermissionDenied,
    AccessDenied,
    /// An update tried to change a field that cannot change in place.
    NotUpdatable,
    Unknown,
}

impl OutcomeCategory {
    /// Whether an orchestrator should retry (with backoff) after this outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OutcomeCategory::Throttled | OutcomeCategory::InternalError)
    }

    /// Stable code for the category.
    pub fn code(&self) -> &'static str {
        match self {
            OutcomeCategory::AlreadyExists => "AlreadyExists",
            OutcomeCategory::NotFound => "NotFound",
            OutcomeCategory::LimitExceeded => "ServiceLimitExceeded",
            OutcomeCategory::InvalidRequest => "InvalidRequest",
            OutcomeCategory::Throttled => "Throttling",
            OutcomeCategory::InternalError => "ServiceInternalError",
            OutcomeCategory::TagPermissionDenied => "UnauthorizedTaggingOperation",
            OutcomeCategory::AccessDenied => "AccessDenied",
            OutcomeCategory::NotUpdatable => "NotUpdatable",
            OutcomeCategory::Unknown => "GeneralServiceException",
        }
    }
}

impl Display for OutcomeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Maps a remote error onto its outcome category.
pub fn classify(error: &RemoteError) -> OutcomeCategory {
    match &error.kind {
        RemoteErrorKind::AlreadyExists => OutcomeCategory::AlreadyExists,
        RemoteErrorKind::NotFound => OutcomeCategory::NotFound,
        RemoteErrorKind::LimitExceeded => OutcomeCategory::LimitExceeded,
        RemoteErrorKind::InvalidRequest
        | RemoteErrorKind::ConcurrentModification
        | RemoteErrorKind::PreconditionFailed => OutcomeCategory::InvalidRequest,
        RemoteErrorKind::Throttling => OutcomeCategory::Throttled,
        RemoteErrorKind::ServiceFailure
        | RemoteErrorKind::ServiceUnavailable
        | RemoteErrorKind::Transport => OutcomeCategory::InternalError,
        // Tagging check must come before the generic mapping.
        RemoteErrorKind::AccessDenied if names_tagging_action(&error.message) => {
            OutcomeCategory::TagPermissionDenied
        }
        RemoteErrorKind::AccessDenied => OutcomeCategory::AccessDenied,
        RemoteErrorKind::Unrecognized(_) => OutcomeCategory::Unknown,
    }
}

/// Heuristic: does an access-denied message refer to a tagging action?
///
/// Remote systems report the denied action only inside the message text, as a
/// `service:Action` token (e.g. `not authorized to perform: cluster:TagResource`).
/// The token after `perform:` is used when present; otherwise any token of the
/// form `service:Action`. Only the action part is compared, exactly and
/// case-insensitively, against [`TAGGING_ACTIONS`], so resource names or ARNs
/// that merely contain a tagging word do not count.
pub fn names_tagging_action(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    if let Some((_, rest)) = message.split_once("perform:") {
        return rest
            .split_whitespace()
            .next()
            .is_some_and(is_tagging_action_token);
    }
    message
        .split_whitespace()
        .filter(|token| token.matches(':').count() == 1)
        .any(is_tagging_action_token)
}

fn is_tagging_action_token(token: &str) -> bool {
    let token = token.trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
    let action = token.rsplit(':').next().unwrap_or(token);
    TAGGING_ACTIONS.iter().any(|known| *known == action)
}
