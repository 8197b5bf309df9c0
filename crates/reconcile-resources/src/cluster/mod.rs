//! # Cluster
//!
//! A caller-keyed, taggable, long-running resource kind.
//!
//! | Field | Kind |
//! |-------|------|
//! | `Name` | primary key, chosen by the caller, create-only |
//! | `Engine` | create-only |
//! | `NodeCount` | updatable, defaults to 1 |
//! | `Tags` | reconciled separately through tag/untag calls |
//! | `Arn`, `Status` | assigned by the control plane |
//!
//! Create, update and delete leave the cluster in a transitional status; the
//! handler reports [`Progress::Pending`] until a describe shows it `ACTIVE`
//! (or gone, for deletes).

pub mod translate;

use crate::control_plane::{ApiRequest, ApiResponse, ControlPlaneClient};
use async_trait::async_trait;
use reconcile_framework::{
    Progress, RemoteClient, RemoteError, ResourceHandler, ResourceModel, ResourceSchema, TagSet,
    Verb,
};
use serde_json::{json, Value};
use std::marker::PhantomData;
use tracing::debug;

pub const TYPE_NAME: &str = "Example::Compute::Cluster";

pub mod fields {
    pub const NAME: &str = "Name";
    pub const ENGINE: &str = "Engine";
    pub const NODE_COUNT: &str = "NodeCount";
    pub const TAGS: &str = "Tags";
    pub const ARN: &str = "Arn";
    pub const STATUS: &str = "Status";
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::caller_keyed(TYPE_NAME, fields::NAME)
        .with_immutable_fields([fields::ENGINE])
        .with_tags(fields::TAGS)
}

/// Handler for clusters. Generic over the client so tests can script it.
pub struct ClusterHandler<C = ControlPlaneClient> {
    schema: ResourceSchema,
    _client: PhantomData<fn() -> C>,
}

impl<C> ClusterHandler<C> {
    pub fn new() -> Self {
        Self {
            schema: schema(),
            _client: PhantomData,
        }
    }
}

impl<C> Default for ClusterHandler<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn progress(model: ResourceModel) -> Progress {
    let status = model.get_str(fields::STATUS).map(str::to_string);
    match status.as_deref() {
        Some("CREATING" | "UPDATING" | "DELETING") => {
            Progress::pending(model, json!({ "status": status }))
        }
        _ => Progress::done(model),
    }
}

#[async_trait]
impl<C> ResourceHandler for ClusterHandler<C>
where
    C: RemoteClient<Request = ApiRequest, Response = ApiResponse> + 'static,
{
    type Client = C;

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    async fn create(&self, client: &C, desired: &ResourceModel) -> Result<Progress, RemoteError> {
        let request = translate::create_request(desired)?;
        let cluster = translate::cluster_from(client.invoke(request).await?)?;
        Ok(progress(translate::to_model(&cluster)))
    }

    async fn read(&self, client: &C, model: &ResourceModel) -> Result<ResourceModel, RemoteError> {
        let request = translate::describe_request(model)?;
        let cluster = translate::cluster_from(client.invoke(request).await?)?;
        Ok(translate::to_model(&cluster))
    }

    async fn update(
        &self,
        client: &C,
        previous: Option<&ResourceModel>,
        desired: &ResourceModel,
    ) -> Result<Progress, RemoteError> {
        if !translate::needs_update(previous, desired)? {
            debug!("No updatable field changed");
            return Ok(Progress::done(self.read(client, desired).await?));
        }
        let request = translate::update_request(desired)?;
        let cluster = translate::cluster_from(client.invoke(request).await?)?;
        Ok(progress(translate::to_model(&cluster)))
    }

    async fn delete(&self, client: &C, model: &ResourceModel) -> Result<Progress, RemoteError> {
        let request = translate::delete_request(model)?;
        match client.invoke(request).await? {
            ApiResponse::Cluster(cluster) => Ok(progress(translate::to_model(&cluster))),
            _ => Ok(Progress::done(model.clone())),
        }
    }

    async fn check_progress(
        &self,
        client: &C,
        verb: Verb,
        model: &ResourceModel,
        data: &Value,
    ) -> Result<Progress, RemoteError> {
        debug!(%verb, last_status = %data["status"], "Describing");
        let observed = self.read(client, model).await?;
        Ok(progress(observed))
    }

    async fn list_tags(&self, client: &C, model: &ResourceModel) -> Result<TagSet, RemoteError> {
        let request = translate::list_tags_request(model)?;
        Ok(translate::tags_from(client.invoke(request).await?)?)
    }

    async fn tag(&self, client: &C, model: &ResourceModel, tags: &TagSet) -> Result<(), RemoteError> {
        client.invoke(translate::tag_request(model, tags)?).await?;
        Ok(())
    }

    async fn untag(&self, client: &C, model: &ResourceModel, keys: &[String]) -> Result<(), RemoteError> {
        client.invoke(translate::untag_request(model, keys)?).await?;
        Ok(())
    }
}
