//! # ResourceHandler Trait
//!
//! The `ResourceHandler` trait is the contract every resource kind implements to
//! be driven by the generic [`ReconciliationEngine`](crate::engine::ReconciliationEngine).
//! A handler owns the mechanical part of the work: it translates models into
//! wire requests, sends them through its [`RemoteClient`], and translates the
//! responses back. The engine owns everything else (ordering, immutability,
//! identity resolution, tag reconciliation, error classification).
//!
//! # Provided Methods (Hooks)
//! Only the four lifecycle calls and [`ResourceHandler::schema`] are required.
//! The remaining hooks have defaults that fit a kind which:
//! - completes every call synchronously ([`ResourceHandler::check_progress`]),
//! - cannot be listed ([`ResourceHandler::list_page`]),
//! - carries no tags ([`ResourceHandler::list_tags`], [`ResourceHandler::tag`],
//!   [`ResourceHandler::untag`]).

use crate::client::RemoteClient;
use crate::error::RemoteError;
use crate::identity::IdentityToken;
use crate::model::{ResourceModel, Verb};
use crate::schema::ResourceSchema;
use crate::tags::TagSet;
use async_trait::async_trait;
use serde_json::Value;

/// Where a remote operation stands after a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// The operation finished; the model carries every server-assigned field.
    Done(ResourceModel),
    /// The remote system accepted the operation but has not finished it.
    /// `data` is handler-private and comes back on the next progress check.
    Pending { model: ResourceModel, data: Value },
}

impl Progress {
    pub fn done(model: ResourceModel) -> Self {
        Progress::Done(model)
    }

    pub fn pending(model: ResourceModel, data: impl Into<Value>) -> Self {
        Progress::Pending {
            model,
            data: data.into(),
        }
    }
}

/// One entry returned by a list call on a content-addressed kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedEntry {
    /// Value of the kind's content field (e.g. the policy document).
    pub content: Value,
    pub token: IdentityToken,
}

/// A page of list results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub entries: Vec<ListedEntry>,
    pub next_token: Option<String>,
}

/// Trait that any resource kind must implement to be reconciled.
///
/// # Dependency Injection
/// The remote client is not owned by the handler. The engine holds it and passes
/// it into every hook, so a handler is a stateless description of one resource
/// kind and the same handler can be pointed at a real endpoint, an in-memory
/// control plane or a [`MockRemote`](crate::mock::MockRemote).
#[async_trait]
pub trait ResourceHandler: Send + Sync + 'static {
    /// The client used to reach the remote control plane.
    type Client: RemoteClient;

    fn schema(&self) -> &ResourceSchema;

    /// Issues the create call. Content-addressed kinds return the assigned
    /// identity and version in the model.
    async fn create(
        &self,
        client: &Self::Client,
        desired: &ResourceModel,
    ) -> Result<Progress, RemoteError>;

    /// Reads the current remote state of `model`.
    async fn read(
        &self,
        client: &Self::Client,
        model: &ResourceModel,
    ) -> Result<ResourceModel, RemoteError>;

    /// Issues the update call. For content-addressed kinds `desired` carries the
    /// last observed identity token, which must be forwarded unchanged.
    async fn update(
        &self,
        client: &Self::Client,
        previous: Option<&ResourceModel>,
        desired: &ResourceModel,
    ) -> Result<Progress, RemoteError>;

    async fn delete(
        &self,
        client: &Self::Client,
        model: &ResourceModel,
    ) -> Result<Progress, RemoteError>;

    /// Checks on an operation that previously returned [`Progress::Pending`].
    async fn check_progress(
        &self,
        _client: &Self::Client,
        _verb: Verb,
        model: &ResourceModel,
        _data: &Value,
    ) -> Result<Progress, RemoteError> {
        Ok(Progress::Done(model.clone()))
    }

    /// Lists existing instances under the parent named in `scope`.
    async fn list_page(
        &self,
        _client: &Self::Client,
        _scope: &ResourceModel,
        _next_token: Option<String>,
    ) -> Result<ListPage, RemoteError> {
        Ok(ListPage::default())
    }

    /// Fetches the tags currently attached to `model` on the remote system.
    async fn list_tags(
        &self,
        _client: &Self::Client,
        _model: &ResourceModel,
    ) -> Result<TagSet, RemoteError> {
        Ok(TagSet::new())
    }

    async fn tag(
        &self,
        _client: &Self::Client,
        _model: &ResourceModel,
        _tags: &TagSet,
    ) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn untag(
        &self,
        _client: &Self::Client,
        _model: &ResourceModel,
        _keys: &[String],
    ) -> Result<(), RemoteError> {
        Ok(())
    }
}
