//! Static description of a resource kind: how it is addressed, which fields are
//! create-only, and whether (and where) it carries tags.

use crate::immutability::ImmutableFieldSet;

/// How the remote system identifies instances of a resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    /// The caller picks the primary key (e.g. a cluster name).
    CallerKeyed { primary_field: String },
    /// The remote system assigns an id and a version token, and instances are
    /// found again by comparing their content under a common parent.
    ContentAddressed {
        parent_field: String,
        content_field: String,
        id_field: String,
        version_field: String,
    },
}

#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub type_name: String,
    pub addressing: Addressing,
    pub immutable_fields: ImmutableFieldSet,
    /// Model field holding the tags, if the kind is taggable.
    pub tags_field: Option<String>,
}

impl ResourceSchema {
    /// The primary field is always create-only.
    pub fn caller_keyed(type_name: impl Into<String>, primary_field: impl Into<String>) -> Self {
        let primary_field = primary_field.into();
        let mut immutable_fields = ImmutableFieldSet::new();
        immutable_fields.insert(primary_field.clone());
        Self {
            type_name: type_name.into(),
            addressing: Addressing::CallerKeyed { primary_field },
            immutable_fields,
            tags_field: None,
        }
    }

    pub fn content_addressed(
        type_name: impl Into<String>,
        parent_field: impl Into<String>,
        content_field: impl Into<String>,
        id_field: impl Into<String>,
        version_field: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            addressing: Addressing::ContentAddressed {
                parent_field: parent_field.into(),
                content_field: content_field.into(),
                id_field: id_field.into(),
                version_field: version_field.into(),
            },
            immutable_fields: ImmutableFieldSet::new(),
            tags_field: None,
        }
    }

    /// Adds create-only fields to the ones the addressing already implies.
    pub fn with_immutable_fields<S: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.immutable_fields.extend(fields);
        self
    }

    pub fn with_tags(mut self, field: impl Into<String>) -> Self {
        self.tags_field = Some(field.into());
        self
    }

    pub fn is_content_addressed(&self) -> bool {
        matches!(self.addressing, Addressing::ContentAddressed { .. })
    }

    pub fn is_taggable(&self) -> bool {
        self.tags_field.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_field_is_create_only() {
        let schema = ResourceSchema::caller_keyed("Test::Widget", "Name")
            .with_immutable_fields(["Region"]);
        assert!(schema.immutable_fields.contains("Name"));
        assert!(schema.immutable_fields.contains("Region"));
    }

    #[test]
    fn test_content_addressed_starts_without_immutable_fields() {
        let schema = ResourceSchema::content_addressed("Test::Note", "Parent", "Body", "NoteId", "Revision");
        assert!(schema.immutable_fields.is_empty());
        assert!(schema.is_content_addressed());
    }
}
