//! # Resource Models
//!
//! A [`ResourceModel`] is the declarative description of one resource instance:
//! a map from field name to a JSON value (scalar, list or nested object).
//!
//! Two instances are in play on every invocation of the engine:
//!
//! - the **desired** model, which is what the caller wants to exist;
//! - the **previous** model, which is the last state the orchestrator knew about
//!   (possibly stale).
//!
//! Models are plain data. The engine never keeps one beyond a single invocation,
//! except inside a [`ContinuationState`](crate::outcome::ContinuationState).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// The lifecycle verb the orchestrator is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
    Read,
    Update,
    Delete,
}

impl Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verb::Create => "create",
            Verb::Read => "read",
            Verb::Update => "update",
            Verb::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Field map describing one resource instance.
///
/// Fields are kept in a `BTreeMap` so that debug output and serialized
/// continuation state are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceModel {
    fields: BTreeMap<String, Value>,
}

impl ResourceModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, handy for tests and translators.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Returns the value of `field`. An explicit JSON `null` counts as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn get_u64(&self, field: &str) -> Option<u64> {
        self.get(field).and_then(Value::as_u64)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overlays every non-null field of `server` onto a copy of `self`.
    ///
    /// Used at the end of a successful operation: the caller's desired model is
    /// kept, and anything the remote system assigned (identifiers, version
    /// tokens, computed attributes) wins.
    pub fn merged_with(&self, server: &ResourceModel) -> ResourceModel {
        let mut merged = self.clone();
        for (field, value) in server.fields.iter().filter(|(_, v)| !v.is_null()) {
            merged.fields.insert(field.clone(), value.clone());
        }
        merged
    }
}

impl From<BTreeMap<String, Value>> for ResourceModel {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, Value)> for ResourceModel {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
