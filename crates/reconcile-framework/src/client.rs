//! # RemoteClient Trait
//!
//! The single seam between the reconciliation core and the network. A client
//! sends one request shape and returns one response shape or a [`RemoteError`]
//! already mapped onto the closed [`RemoteErrorKind`](crate::error::RemoteErrorKind).
//!
//! Transport concerns (connection reuse, timeouts, retry on broken connections)
//! belong to the client. The engine never retries a call itself.

use crate::error::RemoteError;
use async_trait::async_trait;
use std::fmt::Debug;

/// A client for a remote control-plane API.
///
/// # Example
///
/// ```rust
/// use reconcile_framework::{RemoteClient, RemoteError};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// enum EchoRequest { Ping(u32) }
///
/// struct EchoClient;
///
/// #[async_trait]
/// impl RemoteClient for EchoClient {
///     type Request = EchoRequest;
///     type Response = u32;
///
///     async fn invoke(&self, request: EchoRequest) -> Result<u32, RemoteError> {
///         match request {
///             EchoRequest::Ping(n) if n > 0 => Ok(n),
///             other => Err(RemoteError::invalid_request("ping must be positive").with_request(&other)),
///         }
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let client = EchoClient;
///     assert_eq!(client.invoke(EchoRequest::Ping(7)).await.unwrap(), 7);
///     assert!(client.invoke(EchoRequest::Ping(0)).await.is_err());
/// }
/// ```
#[async_trait]
pub trait RemoteClient: Send + Sync {
    type Request: Send + Debug;
    type Response: Send + Debug;

    async fn invoke(&self, request: Self::Request) -> Result<Self::Response, RemoteError>;
}
