//! Field helpers shared by the model translators.
//!
//! Translators read fields as `Option`s and decide per field whether absence
//! is an error. Anything that fails here never reaches the control plane.

use reconcile_framework::tags::TagFormatError;
use reconcile_framework::{RemoteError, ResourceModel, TagSet};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslateError {
    #[error("missing required field {0}")]
    Missing(&'static str),
    #[error("field {field} must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("field {field}: {source}")]
    Tags {
        field: &'static str,
        source: TagFormatError,
    },
    #[error("unexpected {0} response")]
    UnexpectedResponse(&'static str),
}

impl From<TranslateError> for RemoteError {
    fn from(error: TranslateError) -> Self {
        match error {
            TranslateError::UnexpectedResponse(_) => {
                RemoteError::unrecognized("UnexpectedResponse", error.to_string())
            }
            _ => RemoteError::invalid_request(error.to_string()),
        }
    }
}

/// A string field that must be present.
pub fn required_str(model: &ResourceModel, field: &'static str) -> Result<String, TranslateError> {
    optional_str(model, field)?.ok_or(TranslateError::Missing(field))
}

pub fn optional_str(
    model: &ResourceModel,
    field: &'static str,
) -> Result<Option<String>, TranslateError> {
    match model.get(field) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or(TranslateError::WrongType {
                field,
                expected: "a string",
            }),
    }
}

pub fn optional_u32(model: &ResourceModel, field: &'static str) -> Result<Option<u32>, TranslateError> {
    match model.get(field) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or(TranslateError::WrongType {
                field,
                expected: "a non-negative 32-bit integer",
            }),
    }
}

/// Tags as a wire map. An absent field is an empty map.
pub fn tag_map(
    model: &ResourceModel,
    field: &'static str,
) -> Result<BTreeMap<String, String>, TranslateError> {
    match model.get(field) {
        None => Ok(BTreeMap::new()),
        Some(value) => TagSet::from_value(value)
            .map(|tags| tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .map_err(|source| TranslateError::Tags { field, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile_framework::RemoteErrorKind;
    use serde_json::json;

    #[test]
    fn test_missing_and_mistyped_fields() {
        let model = ResourceModel::new().with("Name", 7).with("NodeCount", -1);
        assert_eq!(
            required_str(&model, "Engine"),
            Err(TranslateError::Missing("Engine"))
        );
        assert!(matches!(
            required_str(&model, "Name"),
            Err(TranslateError::WrongType { field: "Name", .. })
        ));
        assert!(optional_u32(&model, "NodeCount").is_err());
    }

    #[test]
    fn test_tags_accept_either_shape() {
        let model = ResourceModel::new().with("Tags", json!([{"Key": "env", "Value": "prod"}]));
        let tags = tag_map(&model, "Tags").unwrap();
        assert_eq!(tags.get("env").map(String::as_str), Some("prod"));
        assert!(tag_map(&ResourceModel::new(), "Tags").unwrap().is_empty());
    }

    #[test]
    fn test_translate_errors_become_invalid_requests() {
        let remote: RemoteError = TranslateError::Missing("Name").into();
        assert_eq!(remote.kind, RemoteErrorKind::InvalidRequest);
    }
}
