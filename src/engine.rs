//! Engine facade
//!
//! Bundles a [`ComponentRegistry`] with [`EngineOptions`] so callers hold one
//! value per application. The engine is immutable after construction and can
//! be shared across threads; each call works on the graph it is given.

use tracing::debug;

use crate::config::EngineOptions;
use crate::deserializer::{self, RestoredGraph};
use crate::document::SessionDocument;
use crate::error::Result;
use crate::node::{ComponentGraph, ComponentId};
use crate::registry::ComponentRegistry;
use crate::serializer::{self, Serialized};

#[derive(Debug, Clone, Default)]
pub struct StateEngine {
    registry: ComponentRegistry,
    options: EngineOptions,
}

impl StateEngine {
    pub fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Produce session and client documents for the graph rooted at `root`.
    pub fn serialize(&self, graph: &ComponentGraph, root: ComponentId) -> Result<Serialized> {
        serializer::serialize(graph, root, &self.options)
    }

    /// Like [`serialize`](Self::serialize), with several entry nodes that must
    /// all be the same root.
    pub fn serialize_entries(
        &self,
        graph: &ComponentGraph,
        entries: &[ComponentId],
    ) -> Result<Serialized> {
        serializer::serialize_entries(graph, entries, &self.options)
    }

    pub fn deserialize(&self, doc: &SessionDocument) -> Result<RestoredGraph> {
        deserializer::deserialize(doc, &self.registry, &self.options)
    }

    /// Serialize to `(session, client)` JSON text.
    pub fn serialize_to_strings(
        &self,
        graph: &ComponentGraph,
        root: ComponentId,
    ) -> Result<(String, String)> {
        let out = self.serialize(graph, root)?;
        let session = out.session.to_json_string(self.options.pretty)?;
        let client = out.client.to_json_string(self.options.pretty)?;
        debug!(
            session_bytes = session.len(),
            client_bytes = client.len(),
            "rendered documents"
        );
        Ok((session, client))
    }

    /// Restore a graph from session document text.
    pub fn deserialize_str(&self, session: &str) -> Result<RestoredGraph> {
        let doc = SessionDocument::from_json_str_with_depth(session, self.options.max_depth)?;
        self.deserialize(&doc)
    }
}
