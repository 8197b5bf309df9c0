//! # Tag Reconciliation
//!
//! Tags are reconciled as a pure set difference over `(key, value)` pairs.
//! Remote tagging APIs only offer "tag" and "untag", never "retag", so a value
//! change on an existing key shows up as one removal plus one addition.
//!
//! A desired tag set of `None` means the caller expressed no tag intent, and
//! nothing is removed. `Some(empty)` is an explicit request to clear all tags.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Failure to read tags out of a model field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TagFormatError {
    #[error("tags must be an object or a list of Key/Value entries, got {0}")]
    UnsupportedShape(String),
    #[error("tag entry {0} is missing a string Key")]
    MissingKey(usize),
    #[error("duplicate tag key {0}")]
    DuplicateKey(String),
}

/// How tags are laid out inside a model field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TagShape {
    /// `{"env": "prod"}`
    #[default]
    Map,
    /// `[{"Key": "env", "Value": "prod"}]`
    KeyValueList,
}

impl TagShape {
    /// Detects the shape used by an existing tag value.
    pub fn of(value: &Value) -> TagShape {
        match value {
            Value::Array(_) => TagShape::KeyValueList,
            _ => TagShape::Map,
        }
    }
}

/// A set of tags: unique keys, one value each, order irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_pair(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pairs of `self` that are not present, with the same value, in `other`.
    pub fn difference(&self, other: &TagSet) -> TagSet {
        self.iter()
            .filter(|(k, v)| !other.contains_pair(k, v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Parses a tag field in either supported shape.
    pub fn from_value(value: &Value) -> Result<TagSet, TagFormatError> {
        match value {
            Value::Null => Ok(TagSet::new()),
            Value::Object(map) => Ok(map
                .iter()
                .map(|(k, v)| (k.clone(), scalar_to_string(v)))
                .collect()),
            Value::Array(entries) => {
                let mut tags = TagSet::new();
                for (index, entry) in entries.iter().enumerate() {
                    let key = entry
                        .get("Key")
                        .and_then(Value::as_str)
                        .ok_or(TagFormatError::MissingKey(index))?;
                    if tags.contains_key(key) {
                        return Err(TagFormatError::DuplicateKey(key.to_string()));
                    }
                    let value = entry.get("Value").map(scalar_to_string).unwrap_or_default();
                    tags.insert(key, value);
                }
                Ok(tags)
            }
            other => Err(TagFormatError::UnsupportedShape(other.to_string())),
        }
    }

    pub fn to_value(&self, shape: TagShape) -> Value {
        match shape {
            TagShape::Map => Value::Object(
                self.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect::<Map<_, _>>(),
            ),
            TagShape::KeyValueList => Value::Array(
                self.iter()
                    .map(|(k, v)| serde_json::json!({ "Key": k, "Value": v }))
                    .collect(),
            ),
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The changes needed to turn the observed tag set into the desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    pub to_add: TagSet,
    pub to_remove: TagSet,
}

impl TagDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Keys that have to be untagged.
    ///
    /// A key that is also being re-added with a new value is left out: tagging
    /// overwrites it, and untagging it after the add would drop the new value.
    pub fn keys_to_untag(&self) -> Vec<String> {
        self.to_remove
            .keys()
            .filter(|key| !self.to_add.contains_key(key))
            .cloned()
            .collect()
    }
}

/// Computes `(desired − observed, observed − desired)`.
pub fn diff(desired: Option<&TagSet>, observed: &TagSet) -> TagDelta {
    diff_with_reserved(desired, observed, &[])
}

/// Like [`diff`], but observed keys starting with one of `reserved_prefixes`
/// are owned by the remote system and are never scheduled for removal.
pub fn diff_with_reserved(
    desired: Option<&TagSet>,
    observed: &TagSet,
    reserved_prefixes: &[String],
) -> TagDelta {
    let Some(desired) = desired else {
        return TagDelta::default();
    };

    let to_remove = observed
        .difference(desired)
        .iter()
        .filter(|(key, _)| !reserved_prefixes.iter().any(|p| key.starts_with(p.as_str())))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    TagDelta {
        to_add: desired.difference(observed),
        to_remove,
    }
}
