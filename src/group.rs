//! Collapsed-group metadata.

use crate::attr::Metadata;
use crate::VertexIndex;

/// A set of vertices treated as one unit for visualisation.
///
/// The metadata carries free-form attributes describing the group's
/// collapsed appearance; the graph algorithms themselves only consume
/// the vertex membership (e.g. when computing intergroup edge metrics
/// through the external calculator).
#[derive(Debug, Clone, Default)]
pub struct GroupInfo {
    name: Option<String>,
    vertices: Vec<VertexIndex>,
    metadata: Metadata,
}

impl GroupInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn add_vertex(&mut self, vertex: VertexIndex) {
        self.vertices.push(vertex);
    }

    pub fn vertices(&self) -> &[VertexIndex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
