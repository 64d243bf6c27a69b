use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::geometry::curves::{Curve, TrimmedCurve};
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{Surface, TrimmedSurface, UvBox};
use crate::geometry::vector::Vec3;
use crate::traits::CurveEval;

// ─── Entity Keys ─────────────────────────────────────────────────────────────

new_key_type! {
    pub struct VertexId;
    pub struct EdgeId;
    pub struct FaceId;
    pub struct ShellId;
    pub struct SolidId;
}

// ─── Topological Entities ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    pub point: Point3d,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub curve: Curve,
    /// Parameter range on `curve`; `t_start` maps to `start_vertex`.
    pub t_start: f64,
    pub t_end: f64,
    pub start_vertex: VertexId,
    pub end_vertex: VertexId,
}

/// An edge used by a wire, in its own or the reverse direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrientedEdge {
    pub edge: EdgeId,
    pub forward: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Face {
    pub surface: Surface,
    /// Parameter rectangle the face lives in; the wires trim it further.
    pub domain: UvBox,
    pub outer_wire: Vec<OrientedEdge>,
    pub inner_wires: Vec<Vec<OrientedEdge>>,
    /// true if the face normal agrees with the surface normal.
    pub same_sense: bool,
    pub shell: ShellId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShellOrientation {
    /// Outer shell (normals point outward).
    Outward,
    /// Void shell (normals point inward, represents a cavity).
    Inward,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shell {
    pub faces: Vec<FaceId>,
    pub orientation: ShellOrientation,
    pub solid: SolidId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solid {
    pub shells: Vec<ShellId>,
}

// ─── Entity Store ────────────────────────────────────────────────────────────

/// Arena-based storage for all topological entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStore {
    pub vertices: SlotMap<VertexId, Vertex>,
    pub edges: SlotMap<EdgeId, Edge>,
    pub faces: SlotMap<FaceId, Face>,
    pub shells: SlotMap<ShellId, Shell>,
    pub solids: SlotMap<SolidId, Solid>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, point: Point3d) -> VertexId {
        self.vertices.insert(Vertex {
            point,
            tolerance: crate::default_tolerance().coincidence,
        })
    }

    pub fn add_edge(&mut self, curve: Curve, t_start: f64, t_end: f64, start_vertex: VertexId, end_vertex: VertexId) -> EdgeId {
        self.edges.insert(Edge {
            curve,
            t_start,
            t_end,
            start_vertex,
            end_vertex,
        })
    }

    /// Add an empty solid with one outward shell.
    pub fn add_solid(&mut self) -> (SolidId, ShellId) {
        let solid_id = self.solids.insert(Solid { shells: vec![] });
        let shell_id = self.shells.insert(Shell {
            faces: vec![],
            orientation: ShellOrientation::Outward,
            solid: solid_id,
        });
        self.solids[solid_id].shells.push(shell_id);
        (solid_id, shell_id)
    }

    pub fn add_face(&mut self, shell_id: ShellId, surface: Surface, domain: UvBox, outer_wire: Vec<OrientedEdge>) -> FaceId {
        let face_id = self.faces.insert(Face {
            surface,
            domain,
            outer_wire,
            inner_wires: vec![],
            same_sense: true,
            shell: shell_id,
        });
        self.shells[shell_id].faces.push(face_id);
        face_id
    }

    /// The edge's curve restricted to its parameter range.
    pub fn edge_curve(&self, edge_id: EdgeId) -> Option<TrimmedCurve<'_, Curve>> {
        let edge = self.edges.get(edge_id)?;
        let (lo, hi) = if edge.t_start <= edge.t_end {
            (edge.t_start, edge.t_end)
        } else {
            (edge.t_end, edge.t_start)
        };
        Some(TrimmedCurve::new(&edge.curve, lo, hi))
    }

    /// The face's surface restricted to its parameter domain.
    pub fn face_surface(&self, face_id: FaceId) -> Option<TrimmedSurface<'_, Surface>> {
        let face = self.faces.get(face_id)?;
        Some(TrimmedSurface::new(&face.surface, face.domain))
    }

    /// Sample an oriented edge from its start to its end, `n + 1` points.
    pub fn sample_oriented_edge(&self, oriented: OrientedEdge, n: usize) -> Vec<Point3d> {
        let Some(edge) = self.edges.get(oriented.edge) else {
            return vec![];
        };
        let n = n.max(1);
        let (a, b) = if oriented.forward {
            (edge.t_start, edge.t_end)
        } else {
            (edge.t_end, edge.t_start)
        };
        (0..=n)
            .map(|i| edge.curve.d0(a + (b - a) * (i as f64 / n as f64)))
            .collect()
    }

    /// Get the outward-facing normal of a face at a parameter point.
    pub fn face_normal(&self, face_id: FaceId, u: f64, v: f64) -> Option<Vec3> {
        let face = self.faces.get(face_id)?;
        let n = face.surface.normal_at(u, v);
        Some(if face.same_sense { n } else { -n })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::curves::Line3d;
    use crate::geometry::surfaces::Plane;

    #[test]
    fn test_edge_curve_is_trimmed_to_range() {
        let mut store = EntityStore::new();
        let a = store.add_vertex(Point3d::new(1.0, 0.0, 0.0));
        let b = store.add_vertex(Point3d::new(1.0, 3.0, 0.0));
        let line = Line3d::from_points(Point3d::new(1.0, 0.0, 0.0), Point3d::new(1.0, 3.0, 0.0));
        let e = store.add_edge(Curve::Line(line), 0.0, 3.0, a, b);

        let curve = store.edge_curve(e).unwrap();
        assert_eq!((curve.first_parameter(), curve.last_parameter()), (0.0, 3.0));
        assert!(curve.d0(3.0).distance_to(&store.vertices[b].point) < 1e-12);
    }

    #[test]
    fn test_reversed_edge_sampling_runs_backwards() {
        let mut store = EntityStore::new();
        let a = store.add_vertex(Point3d::ORIGIN);
        let b = store.add_vertex(Point3d::new(2.0, 0.0, 0.0));
        let e = store.add_edge(Curve::Line(Line3d::new(Point3d::ORIGIN, Vec3::X)), 0.0, 2.0, a, b);

        let pts = store.sample_oriented_edge(OrientedEdge { edge: e, forward: false }, 2);
        assert_eq!(pts.len(), 3);
        assert!(pts[0].distance_to(&Point3d::new(2.0, 0.0, 0.0)) < 1e-12);
        assert!(pts[2].distance_to(&Point3d::ORIGIN) < 1e-12);
    }

    #[test]
    fn test_removed_entities_are_not_resolved() {
        let mut store = EntityStore::new();
        let (_, shell) = store.add_solid();
        let face = store.add_face(
            shell,
            Surface::Plane(Plane::new(Point3d::ORIGIN, Vec3::Z)),
            UvBox::new(0.0, 1.0, 0.0, 1.0),
            vec![],
        );
        assert!(store.face_surface(face).is_some());
        store.faces.remove(face);
        assert!(store.face_surface(face).is_none());
        assert!(store.face_normal(face, 0.0, 0.0).is_none());
    }
}
