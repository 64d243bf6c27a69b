//! Narrow phase: the extrema between one primitive of each shape.

use serde::{Deserialize, Serialize};

use cad_roots::Status;

use crate::bounds;
use crate::extrema::{
    curve_curve, curve_surface, surface_surface, ExtremaConfig, ExtremaMode, Extrema, Located, PointCurveExtrema,
    PointOnCurve, PointOnSurface, PointSurfaceExtrema,
};
use crate::geometry::bounding_box::BoundingBox;
use crate::geometry::point::Point3d;
use crate::topology::brep::{EdgeId, EntityStore, FaceId, VertexId};
use crate::topology::classify::{classify_uv, FaceState};

use super::solution::{DistanceSolution, SolutionPoint, Support, SupportKind};

/// A vertex, edge or face taking part in a distance query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Vertex(VertexId),
    Edge(EdgeId),
    Face(FaceId),
}

impl Primitive {
    pub fn kind(&self) -> SupportKind {
        match self {
            Primitive::Vertex(_) => SupportKind::Vertex,
            Primitive::Edge(_) => SupportKind::OnEdge,
            Primitive::Face(_) => SupportKind::InFace,
        }
    }

    pub fn bounding_box(&self, store: &EntityStore) -> BoundingBox {
        match *self {
            Primitive::Vertex(id) => bounds::vertex_box(store, id),
            Primitive::Edge(id) => bounds::edge_box(store, id),
            Primitive::Face(id) => bounds::face_box(store, id),
        }
    }
}

/// Extrema between `a` (on the first shape) and `b` (on the second).
///
/// Edge points at an edge end are reported on the end vertex; face points
/// are kept only strictly inside the face. A configuration with infinitely
/// many extrema (parallel lines, a point on a circle axis) contributes
/// nothing here: its distance is reached at the boundary of one of the
/// primitives and is found by the lower-dimensional passes.
pub fn evaluate_pair(
    store: &EntityStore,
    a: Primitive,
    b: Primitive,
    mode: ExtremaMode,
    config: &ExtremaConfig,
) -> Result<Vec<DistanceSolution>, Status> {
    use Primitive::*;
    match (a, b) {
        (Edge(_), Vertex(_)) | (Face(_), Vertex(_)) | (Face(_), Edge(_)) => {
            let solutions = evaluate_ordered(store, b, a, mode, config)?;
            Ok(solutions.into_iter().map(DistanceSolution::swapped).collect())
        }
        _ => evaluate_ordered(store, a, b, mode, config),
    }
}

/// Pairs with `a` of lower or equal dimension than `b`.
fn evaluate_ordered(
    store: &EntityStore,
    a: Primitive,
    b: Primitive,
    mode: ExtremaMode,
    config: &ExtremaConfig,
) -> Result<Vec<DistanceSolution>, Status> {
    let sides = Sides { store, tolerance: config.tolerance };
    match (a, b) {
        (Primitive::Vertex(v1), Primitive::Vertex(v2)) => {
            let p1 = sides.vertex(v1)?;
            let p2 = sides.vertex(v2)?;
            let mut out = Vec::new();
            if mode.wants_min() {
                out.push(DistanceSolution::new(p1, p2, true));
            }
            if mode.wants_max() {
                out.push(DistanceSolution::new(p1, p2, false));
            }
            Ok(out)
        }
        (Primitive::Vertex(v), Primitive::Edge(e)) => {
            let p = sides.vertex(v)?;
            let curve = store.edge_curve(e).ok_or(Status::InvalidInput)?;
            let ext = PointCurveExtrema::new(&curve, *config).perform(&p.point, mode);
            collect(ext, |_: &Point3d| Some(p), |c| Some(sides.edge_point(e, c)))
        }
        (Primitive::Vertex(v), Primitive::Face(f)) => {
            let p = sides.vertex(v)?;
            let surface = store.face_surface(f).ok_or(Status::InvalidInput)?;
            let ext = PointSurfaceExtrema::new(&surface, *config).perform(&p.point, mode);
            collect(ext, |_: &Point3d| Some(p), |s| sides.face_point(f, s))
        }
        (Primitive::Edge(e1), Primitive::Edge(e2)) => {
            let c1 = store.edge_curve(e1).ok_or(Status::InvalidInput)?;
            let c2 = store.edge_curve(e2).ok_or(Status::InvalidInput)?;
            let ext = curve_curve(&c1, &c2, mode, config);
            collect(ext, |c| Some(sides.edge_point(e1, c)), |c| Some(sides.edge_point(e2, c)))
        }
        (Primitive::Edge(e), Primitive::Face(f)) => {
            let curve = store.edge_curve(e).ok_or(Status::InvalidInput)?;
            let surface = store.face_surface(f).ok_or(Status::InvalidInput)?;
            let ext = curve_surface(&curve, &surface, mode, config);
            collect(ext, |c| Some(sides.edge_point(e, c)), |s| sides.face_point(f, s))
        }
        (Primitive::Face(f1), Primitive::Face(f2)) => {
            let s1 = store.face_surface(f1).ok_or(Status::InvalidInput)?;
            let s2 = store.face_surface(f2).ok_or(Status::InvalidInput)?;
            let ext = surface_surface(&s1, &s2, mode, config);
            collect(ext, |s| sides.face_point(f1, s), |s| sides.face_point(f2, s))
        }
        _ => Err(Status::InvalidInput),
    }
}

fn collect<A: Located, B: Located>(
    ext: Extrema<A, B>,
    first: impl Fn(&A) -> Option<SolutionPoint>,
    second: impl Fn(&B) -> Option<SolutionPoint>,
) -> Result<Vec<DistanceSolution>, Status> {
    if !ext.is_done() {
        return Err(ext.status);
    }
    Ok(ext
        .solutions
        .iter()
        .filter_map(|s| Some(DistanceSolution::new(first(&s.first)?, second(&s.second)?, s.is_min)))
        .collect())
}

/// Turns solver output into supported solution points.
struct Sides<'a> {
    store: &'a EntityStore,
    tolerance: f64,
}

impl Sides<'_> {
    fn vertex(&self, id: VertexId) -> Result<SolutionPoint, Status> {
        let v = self.store.vertices.get(id).ok_or(Status::InvalidInput)?;
        Ok(SolutionPoint {
            point: v.point,
            support: Support::Vertex(id),
        })
    }

    fn edge_point(&self, edge: EdgeId, on: &PointOnCurve) -> SolutionPoint {
        let at_end = self.store.edges.get(edge).and_then(|e| {
            [e.start_vertex, e.end_vertex].into_iter().find(|&v| {
                self.store
                    .vertices
                    .get(v)
                    .is_some_and(|v| v.point.distance_to(&on.point) <= self.tolerance.max(v.tolerance))
            })
        });
        SolutionPoint {
            point: on.point,
            support: match at_end {
                Some(v) => Support::Vertex(v),
                None => Support::OnEdge { edge, param: on.param },
            },
        }
    }

    fn face_point(&self, face: FaceId, on: &PointOnSurface) -> Option<SolutionPoint> {
        (classify_uv(self.store, face, on.u, on.v, self.tolerance) == FaceState::In).then_some(SolutionPoint {
            point: on.point,
            support: Support::InFace { face, u: on.u, v: on.v },
        })
    }
}
