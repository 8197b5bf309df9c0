//! # Identity Resolution
//!
//! Content-addressed resource kinds have no caller-chosen key. The remote system
//! hands out an id plus a version token when the resource is created, and the
//! only way to find the resource again without them is to list everything under
//! the same parent and compare content.
//!
//! [`IdentityResolver`] does exactly that. It runs before every create (so a
//! second create for the same content is refused instead of duplicated) and
//! before any update, delete or read whose model lacks the token.
//!
//! Two reconciliations racing on the same parent can both see "no match" and
//! both create. Nothing here locks across invocations; closing that gap needs a
//! conditional-create primitive on the remote side.

use crate::error::RemoteError;
use crate::handler::ResourceHandler;
use crate::model::ResourceModel;
use crate::schema::Addressing;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Server-issued identity of a content-addressed resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityToken {
    pub id: String,
    /// Version or revision hash used for optimistic concurrency.
    pub version: String,
}

impl IdentityToken {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }

    /// Reads a token out of `model` when both of its fields are present.
    pub fn from_model(model: &ResourceModel, addressing: &Addressing) -> Option<IdentityToken> {
        match addressing {
            Addressing::ContentAddressed {
                id_field,
                version_field,
                ..
            } => Some(IdentityToken::new(
                model.get_str(id_field)?,
                model.get_str(version_field)?,
            )),
            Addressing::CallerKeyed { .. } => None,
        }
    }

    /// Writes the token into the id and version fields of `model`.
    pub fn apply_to(&self, model: &mut ResourceModel, addressing: &Addressing) {
        if let Addressing::ContentAddressed {
            id_field,
            version_field,
            ..
        } = addressing
        {
            model.set(id_field.clone(), self.id.clone());
            model.set(version_field.clone(), self.version.clone());
        }
    }
}

/// Finds an existing resource whose content equals the desired content.
pub struct IdentityResolver<'a, H: ResourceHandler> {
    handler: &'a H,
    client: &'a H::Client,
    max_pages: usize,
}

impl<'a, H: ResourceHandler> IdentityResolver<'a, H> {
    pub fn new(handler: &'a H, client: &'a H::Client, max_pages: usize) -> Self {
        Self {
            handler,
            client,
            max_pages,
        }
    }

    /// Returns the token of the first listed entry whose content field equals
    /// the content field of `model`, walking at most `max_pages` pages.
    pub async fn resolve(&self, model: &ResourceModel) -> Result<Option<IdentityToken>, RemoteError> {
        let Addressing::ContentAddressed { content_field, .. } = &self.handler.schema().addressing
        else {
            return Ok(None);
        };
        let Some(content) = model.get(content_field) else {
            debug!(content_field = %content_field, "No content to match on");
            return Ok(None);
        };

        let mut next_token = None;
        for page_number in 0..self.max_pages {
            let page = self
                .handler
                .list_page(self.client, model, next_token.take())
                .await?;
            debug!(page_number, entries = page.entries.len(), "Listed page");

            if let Some(entry) = page.entries.into_iter().find(|e| &e.content == content) {
                debug!(id = %entry.token.id, "Matched existing resource");
                return Ok(Some(entry.token));
            }

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => return Ok(None),
            }
        }

        debug!(max_pages = self.max_pages, "Page limit reached without a match");
        Ok(None)
    }
}
