//! Decomposition of shapes into ordered, duplicate-free vertex/edge/face maps.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::brep::*;
use crate::error::ExploreError;

/// A handle to any topological entity that can take part in a distance query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Vertex(VertexId),
    Edge(EdgeId),
    Face(FaceId),
    Shell(ShellId),
    Solid(SolidId),
}

/// Sub-shapes of a shape, each listed once in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeMaps {
    pub vertices: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
    pub faces: Vec<FaceId>,
}

#[derive(Default)]
struct Collector {
    maps: ShapeMaps,
    seen_vertices: HashSet<VertexId>,
    seen_edges: HashSet<EdgeId>,
    seen_faces: HashSet<FaceId>,
}

impl Collector {
    fn vertex(&mut self, store: &EntityStore, id: VertexId) -> Result<(), ExploreError> {
        if !store.vertices.contains_key(id) {
            return Err(ExploreError::StaleKey { kind: "vertex" });
        }
        if self.seen_vertices.insert(id) {
            self.maps.vertices.push(id);
        }
        Ok(())
    }

    fn edge(&mut self, store: &EntityStore, id: EdgeId) -> Result<(), ExploreError> {
        let edge = store.edges.get(id).ok_or(ExploreError::StaleKey { kind: "edge" })?;
        if self.seen_edges.insert(id) {
            self.maps.edges.push(id);
            self.vertex(store, edge.start_vertex)?;
            self.vertex(store, edge.end_vertex)?;
        }
        Ok(())
    }

    fn face(&mut self, store: &EntityStore, id: FaceId) -> Result<(), ExploreError> {
        let face = store.faces.get(id).ok_or(ExploreError::StaleKey { kind: "face" })?;
        if self.seen_faces.insert(id) {
            self.maps.faces.push(id);
            for oriented in face.outer_wire.iter().chain(face.inner_wires.iter().flatten()) {
                self.edge(store, oriented.edge)?;
            }
        }
        Ok(())
    }

    fn shell(&mut self, store: &EntityStore, id: ShellId) -> Result<(), ExploreError> {
        let shell = store.shells.get(id).ok_or(ExploreError::StaleKey { kind: "shell" })?;
        for &face in &shell.faces {
            self.face(store, face)?;
        }
        Ok(())
    }
}

impl ShapeMaps {
    /// Decompose `shape`. Fails if any entity reachable from it has been removed.
    pub fn build(store: &EntityStore, shape: Shape) -> Result<Self, ExploreError> {
        let mut c = Collector::default();
        match shape {
            Shape::Vertex(id) => c.vertex(store, id)?,
            Shape::Edge(id) => c.edge(store, id)?,
            Shape::Face(id) => c.face(store, id)?,
            Shape::Shell(id) => c.shell(store, id)?,
            Shape::Solid(id) => {
                let solid = store.solids.get(id).ok_or(ExploreError::StaleKey { kind: "solid" })?;
                for &shell in &solid.shells {
                    c.shell(store, shell)?;
                }
            }
        }
        Ok(c.maps)
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty() && self.faces.is_empty()
    }
}
