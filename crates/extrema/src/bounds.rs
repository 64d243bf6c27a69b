//! Conservative bounding boxes for vertices, edges and faces.
//!
//! Sampled boxes are padded by a chord-error bound so that the true entity
//! always lies inside the returned box.

use crate::geometry::bounding_box::BoundingBox;
use crate::geometry::curves::Curve;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::Surface;
use crate::geometry::vector::Vec3;
use crate::topology::brep::*;
use crate::traits::SurfaceEval;

/// Segments used to sample a curved edge.
const EDGE_SAMPLES: usize = 32;
/// Samples per direction on a curved face.
const FACE_SAMPLES: usize = 16;

pub fn vertex_box(store: &EntityStore, id: VertexId) -> BoundingBox {
    match store.vertices.get(id) {
        Some(v) => BoundingBox::new(v.point, v.point).enlarged(v.tolerance),
        None => BoundingBox::void(),
    }
}

pub fn edge_box(store: &EntityStore, id: EdgeId) -> BoundingBox {
    let Some(edge) = store.edges.get(id) else {
        return BoundingBox::void();
    };
    if !edge.t_start.is_finite() || !edge.t_end.is_finite() {
        return BoundingBox::void();
    }
    let n = match edge.curve {
        Curve::Line(_) => 1,
        _ => EDGE_SAMPLES,
    };
    let pts = store.sample_oriented_edge(OrientedEdge { edge: id, forward: true }, n);
    let h = (edge.t_end - edge.t_start).abs() / n as f64;
    // Chord deviation is at most |C''| h^2 / 8.
    let sagitta = edge.curve.max_curvature_magnitude() * h * h / 8.0;
    BoundingBox::from_points(&pts).enlarged(sagitta + vertex_tolerance(store, edge))
}

pub fn face_box(store: &EntityStore, id: FaceId) -> BoundingBox {
    let Some(face) = store.faces.get(id) else {
        return BoundingBox::void();
    };
    let tol = crate::default_tolerance().coincidence;

    match &face.surface {
        // A planar face lies inside the hull of its outer boundary.
        Surface::Plane(_) => face
            .outer_wire
            .iter()
            .map(|&oe| edge_box(store, oe.edge))
            .fold(BoundingBox::void(), |acc, b| acc.union(&b))
            .enlarged(tol),
        Surface::Sphere(s) => {
            let r = Vec3::new(s.radius, s.radius, s.radius);
            let whole = BoundingBox::new(s.center - r, s.center + r);
            sampled_face_box(&face.surface, face).map_or(whole, |b| intersect(&whole, &b)).enlarged(tol)
        }
        _ => sampled_face_box(&face.surface, face).unwrap_or_else(BoundingBox::void).enlarged(tol),
    }
}

/// Grid-sampled box padded by the second-order Taylor remainder.
fn sampled_face_box(surface: &Surface, face: &Face) -> Option<BoundingBox> {
    let d = face.domain;
    if !d.is_finite() {
        return None;
    }
    let n = FACE_SAMPLES;
    let (hu, hv) = ((d.u_max - d.u_min) / n as f64, (d.v_max - d.v_min) / n as f64);
    let mut bb = BoundingBox::void();
    let mut curvature: f64 = 0.0;
    for i in 0..=n {
        for j in 0..=n {
            let der = surface.d2(d.u_min + hu * i as f64, d.v_min + hv * j as f64);
            bb.add_point(&der.point);
            curvature = curvature.max(der.duu.length() * hu * hu + 2.0 * der.duv.length() * hu * hv + der.dvv.length() * hv * hv);
        }
    }
    // Margin doubled since curvature is only sampled.
    Some(bb.enlarged(curvature / 4.0))
}

fn intersect(a: &BoundingBox, b: &BoundingBox) -> BoundingBox {
    BoundingBox::new(
        Point3d::new(a.min.x.max(b.min.x), a.min.y.max(b.min.y), a.min.z.max(b.min.z)),
        Point3d::new(a.max.x.min(b.max.x), a.max.y.min(b.max.y), a.max.z.min(b.max.z)),
    )
}

fn vertex_tolerance(store: &EntityStore, edge: &Edge) -> f64 {
    let t = |id| store.vertices.get(id).map_or(0.0, |v: &Vertex| v.tolerance);
    t(edge.start_vertex).max(t(edge.end_vertex))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitives::{make_box, make_cylinder, make_sphere};

    #[test]
    fn test_box_faces_are_tight() {
        let mut store = EntityStore::new();
        make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0);
        for (id, _) in &store.faces {
            let b = face_box(&store, id);
            assert!(b.min.x >= -1e-6 && b.max.x <= 1.0 + 1e-6);
            assert!(b.min.z >= -1e-6 && b.max.z <= 3.0 + 1e-6);
        }
    }

    #[test]
    fn test_circle_edge_box_contains_curve() {
        let mut store = EntityStore::new();
        make_cylinder(&mut store, Point3d::ORIGIN, 2.0, 1.0);
        for (id, edge) in &store.edges {
            let b = edge_box(&store, id);
            for k in 0..200 {
                let t = edge.t_start + (edge.t_end - edge.t_start) * k as f64 / 199.0;
                assert!(b.contains_point(&edge.curve.evaluate(t)));
            }
        }
    }

    #[test]
    fn test_sphere_face_box_contains_sphere() {
        let mut store = EntityStore::new();
        make_sphere(&mut store, Point3d::new(1.0, 0.0, 0.0), 2.0);
        let (id, _) = store.faces.iter().next().unwrap();
        let b = face_box(&store, id);
        for p in [Point3d::new(3.0, 0.0, 0.0), Point3d::new(-1.0, 0.0, 0.0), Point3d::new(1.0, 2.0, 0.0), Point3d::new(1.0, 0.0, -2.0)] {
            assert!(b.contains_point(&p));
        }
        assert!(b.max.x <= 3.0 + 1e-3);
    }

    #[test]
    fn test_stale_keys_give_void_boxes() {
        let mut store = EntityStore::new();
        let v = store.add_vertex(Point3d::ORIGIN);
        assert!(!vertex_box(&store, v).is_void());
        store.vertices.remove(v);
        assert!(vertex_box(&store, v).is_void());
    }
}
