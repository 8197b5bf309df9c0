//! Cluster model ↔ wire translation.

use super::fields;
use crate::control_plane::{ApiRequest, ApiResponse, ClusterDescription};
use crate::translate::{optional_u32, required_str, tag_map, TranslateError};
use reconcile_framework::{ResourceModel, TagSet};

const DEFAULT_NODE_COUNT: u32 = 1;

pub fn create_request(model: &ResourceModel) -> Result<ApiRequest, TranslateError> {
    Ok(ApiRequest::CreateCluster {
        name: required_str(model, fields::NAME)?,
        engine: required_str(model, fields::ENGINE)?,
        node_count: optional_u32(model, fields::NODE_COUNT)?.unwrap_or(DEFAULT_NODE_COUNT),
        tags: tag_map(model, fields::TAGS)?,
    })
}

pub fn describe_request(model: &ResourceModel) -> Result<ApiRequest, TranslateError> {
    Ok(ApiRequest::DescribeCluster {
        name: required_str(model, fields::NAME)?,
    })
}

pub fn update_request(model: &ResourceModel) -> Result<ApiRequest, TranslateError> {
    Ok(ApiRequest::UpdateCluster {
        name: required_str(model, fields::NAME)?,
        node_count: optional_u32(model, fields::NODE_COUNT)?.unwrap_or(DEFAULT_NODE_COUNT),
    })
}

pub fn delete_request(model: &ResourceModel) -> Result<ApiRequest, TranslateError> {
    Ok(ApiRequest::DeleteCluster {
        name: required_str(model, fields::NAME)?,
    })
}

pub fn list_tags_request(model: &ResourceModel) -> Result<ApiRequest, TranslateError> {
    Ok(ApiRequest::ListTagsForResource {
        arn: required_str(model, fields::ARN)?,
    })
}

pub fn tag_request(model: &ResourceModel, tags: &TagSet) -> Result<ApiRequest, TranslateError> {
    Ok(ApiRequest::TagResource {
        arn: required_str(model, fields::ARN)?,
        tags: tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
    })
}

pub fn untag_request(model: &ResourceModel, keys: &[String]) -> Result<ApiRequest, TranslateError> {
    Ok(ApiRequest::UntagResource {
        arn: required_str(model, fields::ARN)?,
        keys: keys.to_vec(),
    })
}

/// Whether an update changes anything the update call can change.
pub fn needs_update(previous: Option<&ResourceModel>, desired: &ResourceModel) -> Result<bool, TranslateError> {
    let Some(previous) = previous else {
        return Ok(true);
    };
    let before = optional_u32(previous, fields::NODE_COUNT)?.unwrap_or(DEFAULT_NODE_COUNT);
    let after = optional_u32(desired, fields::NODE_COUNT)?.unwrap_or(DEFAULT_NODE_COUNT);
    Ok(before != after)
}

pub fn to_model(cluster: &ClusterDescription) -> ResourceModel {
    ResourceModel::new()
        .with(fields::NAME, cluster.name.clone())
        .with(fields::ARN, cluster.arn.clone())
        .with(fields::ENGINE, cluster.engine.clone())
        .with(fields::NODE_COUNT, cluster.node_count)
        .with(fields::STATUS, cluster.status.as_str())
}

pub fn cluster_from(response: ApiResponse) -> Result<ClusterDescription, TranslateError> {
    match response {
        ApiResponse::Cluster(cluster) => Ok(cluster),
        _ => Err(TranslateError::UnexpectedResponse("cluster")),
    }
}

pub fn tags_from(response: ApiResponse) -> Result<TagSet, TranslateError> {
    match response {
        ApiResponse::Tags(tags) => Ok(tags.into_iter().collect()),
        _ => Err(TranslateError::UnexpectedResponse("tags")),
    }
}
