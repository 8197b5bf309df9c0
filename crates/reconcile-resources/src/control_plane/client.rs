//! # Control Plane Client
//!
//! The client half of the in-memory control plane. It implements
//! [`RemoteClient`], so handlers and the engine see it as any other remote API,
//! and it does the SDK's job of mapping service error codes onto
//! [`RemoteErrorKind`].

use super::message::{ApiError, ApiErrorCode, ApiRequest, ApiResponse, ControlMessage};
use async_trait::async_trait;
use reconcile_framework::{RemoteClient, RemoteError, RemoteErrorKind};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

/// Cheap to clone: it only holds the channel sender.
#[derive(Clone)]
pub struct ControlPlaneClient {
    sender: mpsc::Sender<ControlMessage>,
}

impl ControlPlaneClient {
    pub fn new(sender: mpsc::Sender<ControlMessage>) -> Self {
        Self { sender }
    }

    /// Makes the next call of `action` fail with `error`.
    #[instrument(skip(self, error))]
    pub async fn inject_fault(&self, action: &str, error: ApiError) -> Result<(), RemoteError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ControlMessage::InjectFault {
                action: action.to_string(),
                error,
                respond_to,
            })
            .await
            .map_err(|_| closed())?;
        response.await.map_err(|_| dropped())
    }
}

#[async_trait]
impl RemoteClient for ControlPlaneClient {
    type Request = ApiRequest;
    type Response = ApiResponse;

    #[instrument(skip(self, request), fields(action = request.action()))]
    async fn invoke(&self, request: ApiRequest) -> Result<ApiResponse, RemoteError> {
        debug!("Sending request");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ControlMessage::Call {
                request: request.clone(),
                respond_to,
            })
            .await
            .map_err(|_| closed())?;
        response
            .await
            .map_err(|_| dropped())?
            .map_err(|e| to_remote_error(e, &request))
    }
}

fn closed() -> RemoteError {
    RemoteError::transport("control plane is not running")
}

fn dropped() -> RemoteError {
    RemoteError::transport("control plane dropped the request")
}

/// Maps a service error onto the closed remote error vocabulary.
pub fn to_remote_error(error: ApiError, request: &ApiRequest) -> RemoteError {
    let kind = match &error.code {
        ApiErrorCode::ResourceInUse => RemoteErrorKind::AlreadyExists,
        ApiErrorCode::ResourceNotFound => RemoteErrorKind::NotFound,
        ApiErrorCode::LimitExceeded => RemoteErrorKind::LimitExceeded,
        ApiErrorCode::InvalidParameter => RemoteErrorKind::InvalidRequest,
        ApiErrorCode::ConcurrentModification => RemoteErrorKind::ConcurrentModification,
        ApiErrorCode::Throttling => RemoteErrorKind::Throttling,
        ApiErrorCode::InternalFailure => RemoteErrorKind::ServiceFailure,
        ApiErrorCode::ServiceUnavailable => RemoteErrorKind::ServiceUnavailable,
        ApiErrorCode::AccessDenied => RemoteErrorKind::AccessDenied,
        ApiErrorCode::Other(code) => RemoteErrorKind::Unrecognized(code.clone()),
    };
    let attach_request = matches!(
        kind,
        RemoteErrorKind::InvalidRequest | RemoteErrorKind::ConcurrentModification
    );
    let remote = RemoteError::new(kind, error.code.as_str(), error.message);
    if attach_request {
        remote.with_request(request)
    } else {
        remote
    }
}
