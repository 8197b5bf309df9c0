//! # Requests and Outcomes
//!
//! This module defines what crosses the boundary between an orchestrator and the
//! [`ReconciliationEngine`](crate::engine::ReconciliationEngine).
//!
//! # The Resumable Contract
//! One logical operation (create, update, delete) may take several invocations.
//! The first invocation that cannot finish returns
//! [`ReconcileOutcome::InProgress`] with a [`ContinuationState`]. The
//! orchestrator hands that state back unchanged on the next invocation, and
//! keeps doing so until the outcome is terminal (`Success` or `Failed`).
//!
//! - **Opaque**: orchestrators store and forward the state; they never inspect it.
//! - **Single side effect**: only the first invocation issues the mutating call.
//!   Later invocations only check progress and reconcile tags.
//! - **Single flight**: the orchestrator never runs two invocations with the same
//!   continuation at once, so the engine takes no locks.

use crate::classify::OutcomeCategory;
use crate::error::RemoteError;
use crate::identity::IdentityToken;
use crate::model::{ResourceModel, Verb};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One invocation's worth of input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub verb: Verb,
    pub desired: ResourceModel,
    pub previous: Option<ResourceModel>,
    pub continuation: Option<ContinuationState>,
}

impl ReconcileRequest {
    pub fn new(verb: Verb, desired: ResourceModel) -> Self {
        Self {
            verb,
            desired,
            previous: None,
            continuation: None,
        }
    }

    pub fn create(desired: ResourceModel) -> Self {
        Self::new(Verb::Create, desired)
    }

    pub fn read(model: ResourceModel) -> Self {
        Self::new(Verb::Read, model)
    }

    pub fn update(previous: ResourceModel, desired: ResourceModel) -> Self {
        Self::new(Verb::Update, desired).with_previous(previous)
    }

    pub fn delete(model: ResourceModel) -> Self {
        Self::new(Verb::Delete, model)
    }

    pub fn with_previous(mut self, previous: ResourceModel) -> Self {
        self.previous = Some(previous);
        self
    }

    pub fn with_continuation(mut self, continuation: ContinuationState) -> Self {
        self.continuation = Some(continuation);
        self
    }
}

/// State carried between invocations of one logical operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationState {
    pub verb: Verb,
    /// The model as known when the operation went pending.
    pub model: ResourceModel,
    /// Restored onto the model on resume when the model lacks it.
    pub identity: Option<IdentityToken>,
    /// Progress checks performed so far.
    pub checks: u32,
    /// Handler-private progress data.
    pub data: Value,
}

/// A non-fatal problem attached to a successful outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub category: OutcomeCategory,
    pub message: String,
}

/// A terminal failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub category: OutcomeCategory,
    pub message: String,
    /// Only set for `NotUpdatable`, where it is the untouched previous model.
    pub model: Option<ResourceModel>,
    /// The remote error behind this failure, kept for diagnostics.
    pub error: Option<RemoteError>,
}

impl Failure {
    pub fn new(category: OutcomeCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            model: None,
            error: None,
        }
    }
}

/// Result of one engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ReconcileOutcome {
    Success {
        /// `None` after a delete.
        model: Option<ResourceModel>,
        warnings: Vec<Warning>,
    },
    Failed(Failure),
    InProgress {
        model: ResourceModel,
        continuation: ContinuationState,
    },
}

impl ReconcileOutcome {
    pub fn success(model: ResourceModel) -> Self {
        ReconcileOutcome::Success {
            model: Some(model),
            warnings: Vec::new(),
        }
    }

    pub fn gone() -> Self {
        ReconcileOutcome::Success {
            model: None,
            warnings: Vec::new(),
        }
    }

    pub fn failed(category: OutcomeCategory, message: impl Into<String>) -> Self {
        ReconcileOutcome::Failed(Failure::new(category, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReconcileOutcome::Success { .. })
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, ReconcileOutcome::InProgress { .. })
    }

    pub fn category(&self) -> Option<OutcomeCategory> {
        match self {
            ReconcileOutcome::Failed(failure) => Some(failure.category),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ReconcileOutcome::Failed(failure) => Some(failure.message.as_str()),
            _ => None,
        }
    }

    pub fn model(&self) -> Option<&ResourceModel> {
        match self {
            ReconcileOutcome::Success { model, .. } => model.as_ref(),
            ReconcileOutcome::Failed(failure) => failure.model.as_ref(),
            ReconcileOutcome::InProgress { model, .. } => Some(model),
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        match self {
            ReconcileOutcome::Success { warnings, .. } => warnings,
            _ => &[],
        }
    }

    pub fn continuation(&self) -> Option<&ContinuationState> {
        match self {
            ReconcileOutcome::InProgress { continuation, .. } => Some(continuation),
            _ => None,
        }
    }
}
