//! Wire shapes spoken by the in-memory control plane.
//!
//! These are what a real SDK would expose: typed requests, typed responses and
//! an error carrying a service error code. The translators in [`crate::cluster`]
//! and [`crate::target_policy`] convert between these and resource models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use tokio::sync::oneshot;

pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterStatus {
    Creating,
    Active,
    Updating,
    Deleting,
}

impl ClusterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStatus::Creating => "CREATING",
            ClusterStatus::Active => "ACTIVE",
            ClusterStatus::Updating => "UPDATING",
            ClusterStatus::Deleting => "DELETING",
        }
    }

    /// Whether an operation is still running on the cluster.
    pub fn is_transitional(&self) -> bool {
        !matches!(self, ClusterStatus::Active)
    }
}

impl Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDescription {
    pub name: String,
    pub arn: String,
    pub engine: String,
    pub node_count: u32,
    pub status: ClusterStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDescription {
    pub policy_id: String,
    pub target_id: String,
    pub content: String,
    pub revision_id: String,
}

/// One API call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    CreateCluster {
        name: String,
        engine: String,
        node_count: u32,
        tags: Tags,
    },
    DescribeCluster {
        name: String,
    },
    UpdateCluster {
        name: String,
        node_count: u32,
    },
    DeleteCluster {
        name: String,
    },
    /// Creates a policy when `policy_id` is `None`, otherwise replaces its
    /// content provided `revision_id` is current.
    PutPolicy {
        target_id: String,
        content: String,
        policy_id: Option<String>,
        revision_id: Option<String>,
    },
    GetPolicy {
        policy_id: String,
    },
    ListPolicies {
        target_id: String,
        next_token: Option<String>,
    },
    DeletePolicy {
        policy_id: String,
        revision_id: String,
    },
    ListTagsForResource {
        arn: String,
    },
    TagResource {
        arn: String,
        tags: Tags,
    },
    UntagResource {
        arn: String,
        keys: Vec<String>,
    },
}

impl ApiRequest {
    /// The action name, as used in permission checks and fault injection.
    pub fn action(&self) -> &'static str {
        match self {
            ApiRequest::CreateCluster { .. } => "CreateCluster",
            ApiRequest::DescribeCluster { .. } => "DescribeCluster",
            ApiRequest::UpdateCluster { .. } => "UpdateCluster",
            ApiRequest::DeleteCluster { .. } => "DeleteCluster",
            ApiRequest::PutPolicy { .. } => "PutPolicy",
            ApiRequest::GetPolicy { .. } => "GetPolicy",
            ApiRequest::ListPolicies { .. } => "ListPolicies",
            ApiRequest::DeletePolicy { .. } => "DeletePolicy",
            ApiRequest::ListTagsForResource { .. } => "ListTagsForResource",
            ApiRequest::TagResource { .. } => "TagResource",
            ApiRequest::UntagResource { .. } => "UntagResource",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Cluster(ClusterDescription),
    Policy(PolicyDescription),
    PolicyPage {
        policies: Vec<PolicyDescription>,
        next_token: Option<String>,
    },
    Tags(Tags),
    Ack,
}

/// Service error codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiErrorCode {
    ResourceInUse,
    ResourceNotFound,
    LimitExceeded,
    InvalidParameter,
    ConcurrentModification,
    Throttling,
    InternalFailure,
    ServiceUnavailable,
    AccessDenied,
    /// Anything else, by raw code.
    Other(String),
}

impl ApiErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ApiErrorCode::ResourceInUse => "ResourceInUseException",
            ApiErrorCode::ResourceNotFound => "ResourceNotFoundException",
            ApiErrorCode::LimitExceeded => "LimitExceededException",
            ApiErrorCode::InvalidParameter => "InvalidParameterException",
            ApiErrorCode::ConcurrentModification => "ConcurrentModificationException",
            ApiErrorCode::Throttling => "ThrottlingException",
            ApiErrorCode::InternalFailure => "InternalFailure",
            ApiErrorCode::ServiceUnavailable => "ServiceUnavailable",
            ApiErrorCode::AccessDenied => "AccessDeniedException",
            ApiErrorCode::Other(code) => code,
        }
    }
}

impl Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Messages accepted by the control plane actor.
#[derive(Debug)]
pub enum ControlMessage {
    Call {
        request: ApiRequest,
        respond_to: oneshot::Sender<Result<ApiResponse, ApiError>>,
    },
    /// Fail the next call of `action` with `error`.
    InjectFault {
        action: String,
        error: ApiError,
        respond_to: oneshot::Sender<()>,
    },
}
