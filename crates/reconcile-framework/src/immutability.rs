//! # Immutability Guard
//!
//! Some fields can only be set when a resource is created (a cluster's engine,
//! the target a policy is attached to). An update that changes one of them has
//! to be refused before anything is sent to the remote system.
//!
//! Values are compared structurally. Lists are compared as multisets because
//! remote systems do not promise to return list members in the order they were
//! sent.

use crate::model::ResourceModel;
use serde_json::Value;
use std::collections::BTreeSet;

/// Field names that may not change once a resource exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImmutableFieldSet(BTreeSet<String>);

impl ImmutableFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>) -> bool {
        self.0.insert(field.into())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> Extend<S> for ImmutableFieldSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl<S: Into<String>> FromIterator<S> for ImmutableFieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Returns `true` when `desired` changes any immutable field of `previous`.
///
/// Without a previous model this is a create, and the guard never fires.
pub fn check(
    previous: Option<&ResourceModel>,
    desired: &ResourceModel,
    fields: &ImmutableFieldSet,
) -> bool {
    !violations(previous, desired, fields).is_empty()
}

/// The immutable fields whose value differs between `previous` and `desired`.
pub fn violations(
    previous: Option<&ResourceModel>,
    desired: &ResourceModel,
    fields: &ImmutableFieldSet,
) -> Vec<String> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    fields
        .iter()
        .filter(|field| !optional_equivalent(previous.get(field), desired.get(field)))
        .cloned()
        .collect()
}

fn optional_equivalent(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => equivalent(a, b),
        _ => false,
    }
}

/// Structural equality with order-insensitive arrays.
pub fn equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(left), Value::Array(right)) => same_multiset(left, right),
        (Value::Object(left), Value::Object(right)) => {
            let present = |m: &serde_json::Map<String, Value>| {
                m.iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, _)| k.clone())
                    .collect::<BTreeSet<_>>()
            };
            present(left) == present(right)
                && left
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .all(|(k, v)| right.get(k).is_some_and(|w| equivalent(v, w)))
        }
        _ => a == b,
    }
}

fn same_multiset(left: &[Value], right: &[Value]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut unmatched: Vec<&Value> = right.iter().collect();
    for item in left {
        match unmatched.iter().position(|candidate| equivalent(item, candidate)) {
            Some(index) => {
                unmatched.swap_remove(index);
            }
            None => return false,
        }
    }
    true
}
