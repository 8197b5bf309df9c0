//! Target policy model ↔ wire translation.

use super::fields;
use crate::control_plane::{ApiRequest, ApiResponse, PolicyDescription};
use crate::translate::{optional_str, required_str, TranslateError};
use reconcile_framework::{IdentityToken, ListPage, ListedEntry, ResourceModel};
use serde_json::Value;

pub fn create_request(model: &ResourceModel) -> Result<ApiRequest, TranslateError> {
    Ok(ApiRequest::PutPolicy {
        target_id: required_str(model, fields::TARGET_ID)?,
        content: required_str(model, fields::CONTENT)?,
        policy_id: None,
        revision_id: None,
    })
}

/// The update always carries the identity token it was given.
pub fn update_request(model: &ResourceModel) -> Result<ApiRequest, TranslateError> {
    Ok(ApiRequest::PutPolicy {
        target_id: required_str(model, fields::TARGET_ID)?,
        content: required_str(model, fields::CONTENT)?,
        policy_id: Some(required_str(model, fields::POLICY_ID)?),
        revision_id: optional_str(model, fields::REVISION_ID)?,
    })
}

pub fn get_request(model: &ResourceModel) -> Result<ApiRequest, TranslateError> {
    Ok(ApiRequest::GetPolicy {
        policy_id: required_str(model, fields::POLICY_ID)?,
    })
}

pub fn delete_request(model: &ResourceModel) -> Result<ApiRequest, TranslateError> {
    Ok(ApiRequest::DeletePolicy {
        policy_id: required_str(model, fields::POLICY_ID)?,
        revision_id: required_str(model, fields::REVISION_ID)?,
    })
}

pub fn list_request(
    scope: &ResourceModel,
    next_token: Option<String>,
) -> Result<ApiRequest, TranslateError> {
    Ok(ApiRequest::ListPolicies {
        target_id: required_str(scope, fields::TARGET_ID)?,
        next_token,
    })
}

pub fn to_model(policy: &PolicyDescription) -> ResourceModel {
    ResourceModel::new()
        .with(fields::TARGET_ID, policy.target_id.clone())
        .with(fields::CONTENT, policy.content.clone())
        .with(fields::POLICY_ID, policy.policy_id.clone())
        .with(fields::REVISION_ID, policy.revision_id.clone())
}

pub fn policy_from(response: ApiResponse) -> Result<PolicyDescription, TranslateError> {
    match response {
        ApiResponse::Policy(policy) => Ok(policy),
        _ => Err(TranslateError::UnexpectedResponse("policy")),
    }
}

pub fn page_from(response: ApiResponse) -> Result<ListPage, TranslateError> {
    match response {
        ApiResponse::PolicyPage {
            policies,
            next_token,
        } => Ok(ListPage {
            entries: policies
                .into_iter()
                .map(|p| ListedEntry {
                    content: Value::String(p.content),
                    token: IdentityToken::new(p.policy_id, p.revision_id),
                })
                .collect(),
            next_token,
        }),
        _ => Err(TranslateError::UnexpectedResponse("policy page")),
    }
}
