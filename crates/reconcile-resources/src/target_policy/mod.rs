//! # Target Policy
//!
//! A content-addressed resource kind: a policy document attached to a target.
//! The control plane assigns `PolicyId` and `RevisionId`; the caller only
//! supplies `TargetId` (create-only) and `Content`. Two policies with the same
//! content on the same target are the same policy as far as reconciliation is
//! concerned, and every replace or delete must name the current revision.
//!
//! All calls complete synchronously and policies carry no tags, so only the
//! required hooks and [`list_page`](ResourceHandler::list_page) are implemented.

pub mod translate;

use crate::control_plane::{ApiRequest, ApiResponse, ControlPlaneClient};
use async_trait::async_trait;
use reconcile_framework::{
    ListPage, Progress, RemoteClient, RemoteError, ResourceHandler, ResourceModel, ResourceSchema,
};
use std::marker::PhantomData;

pub const TYPE_NAME: &str = "Example::Access::TargetPolicy";

pub mod fields {
    pub const TARGET_ID: &str = "TargetId";
    pub const CONTENT: &str = "Content";
    pub const POLICY_ID: &str = "PolicyId";
    pub const REVISION_ID: &str = "RevisionId";
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::content_addressed(
        TYPE_NAME,
        fields::TARGET_ID,
        fields::CONTENT,
        fields::POLICY_ID,
        fields::REVISION_ID,
    )
    .with_immutable_fields([fields::TARGET_ID])
}

pub struct TargetPolicyHandler<C = ControlPlaneClient> {
    schema: ResourceSchema,
    _client: PhantomData<fn() -> C>,
}

impl<C> TargetPolicyHandler<C> {
    pub fn new() -> Self {
        Self {
            schema: schema(),
            _client: PhantomData,
        }
    }
}

impl<C> Default for TargetPolicyHandler<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C> ResourceHandler for TargetPolicyHandler<C>
where
    C: RemoteClient<Request = ApiRequest, Response = ApiResponse> + 'static,
{
    type Client = C;

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    async fn create(&self, client: &C, desired: &ResourceModel) -> Result<Progress, RemoteError> {
        let policy = translate::policy_from(client.invoke(translate::create_request(desired)?).await?)?;
        Ok(Progress::done(translate::to_model(&policy)))
    }

    async fn read(&self, client: &C, model: &ResourceModel) -> Result<ResourceModel, RemoteError> {
        let policy = translate::policy_from(client.invoke(translate::get_request(model)?).await?)?;
        Ok(translate::to_model(&policy))
    }

    async fn update(
        &self,
        client: &C,
        _previous: Option<&ResourceModel>,
        desired: &ResourceModel,
    ) -> Result<Progress, RemoteError> {
        let policy = translate::policy_from(client.invoke(translate::update_request(desired)?).await?)?;
        Ok(Progress::done(translate::to_model(&policy)))
    }

    async fn delete(&self, client: &C, model: &ResourceModel) -> Result<Progress, RemoteError> {
        client.invoke(translate::delete_request(model)?).await?;
        Ok(Progress::done(model.clone()))
    }

    async fn list_page(
        &self,
        client: &C,
        scope: &ResourceModel,
        next_token: Option<String>,
    ) -> Result<ListPage, RemoteError> {
        let request = translate::list_request(scope, next_token)?;
        Ok(translate::page_from(client.invoke(request).await?)?)
    }
}
