use tracing::debug;

use super::brep::*;
use crate::geometry::intersection::{self, Ray};
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{Plane, Surface};
use crate::geometry::vector::Vec3;
use crate::traits::SurfaceEval;

/// Samples per curved wire edge when building a planar face polygon.
const CURVED_EDGE_SAMPLES: usize = 64;

// ─── Face classification ────────────────────────────────────────────────────

/// Position of a parameter point relative to a trimmed face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceState {
    In,
    On,
    Out,
}

/// Classify `(u, v)` against the face's trimming.
///
/// Planar faces are trimmed by their wires, tested as a polygon in the
/// plane's parameter space (which is metric, so `tolerance` is a length).
/// Other faces are trimmed by their parameter domain; a full-turn periodic
/// direction has no boundary.
pub fn classify_uv(store: &EntityStore, face_id: FaceId, u: f64, v: f64, tolerance: f64) -> FaceState {
    let Some(face) = store.faces.get(face_id) else {
        return FaceState::Out;
    };

    if let Surface::Plane(plane) = &face.surface {
        let outer = wire_polygon(store, plane, &face.outer_wire);
        if outer.len() < 3 {
            return FaceState::Out;
        }
        let mut state = classify_in_polygon(u, v, &outer, tolerance);
        for hole in &face.inner_wires {
            let hole = wire_polygon(store, plane, hole);
            if hole.len() < 3 {
                continue;
            }
            state = match (state, classify_in_polygon(u, v, &hole, tolerance)) {
                (FaceState::Out, _) => FaceState::Out,
                (_, FaceState::In) => FaceState::Out,
                (_, FaceState::On) => FaceState::On,
                (s, FaceState::Out) => s,
            };
        }
        return state;
    }

    let d = face.domain;
    if !d.contains(u, v, tolerance) {
        return FaceState::Out;
    }
    let b = face.surface.bounds();
    let u_closed = face.surface.is_u_periodic() && (d.u_max - d.u_min) >= (b.u_max - b.u_min) - tolerance;
    let near_u = !u_closed && ((u - d.u_min).abs() <= tolerance || (u - d.u_max).abs() <= tolerance);
    let near_v = (v - d.v_min).abs() <= tolerance || (v - d.v_max).abs() <= tolerance;
    if near_u || near_v { FaceState::On } else { FaceState::In }
}

/// Classify a 3D point lying on (or near) the face's surface.
pub fn classify_point_on_face(store: &EntityStore, face_id: FaceId, p: &Point3d, tolerance: f64) -> FaceState {
    match face_parameters(store, face_id, p) {
        Some((u, v)) => classify_uv(store, face_id, u, v, tolerance),
        None => FaceState::Out,
    }
}

/// Parameters of `p` on the face surface, for the surface kinds with a closed-form inverse.
fn face_parameters(store: &EntityStore, face_id: FaceId, p: &Point3d) -> Option<(f64, f64)> {
    match &store.faces.get(face_id)?.surface {
        Surface::Plane(plane) => Some(plane.parameters_of(p)),
        Surface::Sphere(sphere) => sphere.parameters_of(p),
        Surface::Cylinder(cyl) => cyl.parameters_of(p),
        _ => None,
    }
}

/// Outline of a wire in the plane's (u, v) coordinates.
fn wire_polygon(store: &EntityStore, plane: &Plane, wire: &[OrientedEdge]) -> Vec<(f64, f64)> {
    let mut polygon = Vec::new();
    for &oriented in wire {
        let n = match store.edges.get(oriented.edge).map(|e| &e.curve) {
            Some(crate::geometry::curves::Curve::Line(_)) => 1,
            Some(_) => CURVED_EDGE_SAMPLES,
            None => continue,
        };
        let pts = store.sample_oriented_edge(oriented, n);
        // Drop the end point; the next edge starts there.
        for p in &pts[..pts.len().saturating_sub(1)] {
            polygon.push(plane.parameters_of(p));
        }
    }
    polygon
}

fn classify_in_polygon(px: f64, py: f64, polygon: &[(f64, f64)], tolerance: f64) -> FaceState {
    let n = polygon.len();
    for i in 0..n {
        if segment_distance(px, py, polygon[i], polygon[(i + 1) % n]) <= tolerance {
            return FaceState::On;
        }
    }
    if point_in_polygon_2d(px, py, polygon) {
        FaceState::In
    } else {
        FaceState::Out
    }
}

/// 2D point-in-polygon test using ray casting.
fn point_in_polygon_2d(px: f64, py: f64, polygon: &[(f64, f64)]) -> bool {
    let n = polygon.len();
    let mut inside = false;

    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];

        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

fn segment_distance(px: f64, py: f64, a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((px - a.0) * dx + (py - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    ((px - a.0 - t * dx).powi(2) + (py - a.1 - t * dy).powi(2)).sqrt()
}

// ─── Solid classification ───────────────────────────────────────────────────

/// Classification of a point relative to a solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClassification {
    Inside,
    Outside,
    OnBoundary,
}

/// Classify a point relative to a solid using ray casting.
/// Shoots multiple rays and uses majority vote for robustness.
pub fn classify_point(store: &EntityStore, solid_id: SolidId, point: &Point3d, tolerance: f64) -> PointClassification {
    let faces = solid_faces(store, solid_id);

    for &face_id in &faces {
        if distance_to_face_surface(store, face_id, point).is_some_and(|d| d <= tolerance)
            && classify_point_on_face(store, face_id, point, tolerance) != FaceState::Out
        {
            return PointClassification::OnBoundary;
        }
    }

    let test_directions = [
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 0.5, 0.3),
    ];

    let mut inside_votes = 0;
    for dir in test_directions {
        let ray = Ray::new(*point, dir);
        if count_ray_crossings(store, &faces, &ray, tolerance) % 2 == 1 {
            inside_votes += 1;
        }
    }

    if inside_votes * 2 > test_directions.len() {
        PointClassification::Inside
    } else {
        PointClassification::Outside
    }
}

fn solid_faces(store: &EntityStore, solid_id: SolidId) -> Vec<FaceId> {
    store
        .solids
        .get(solid_id)
        .map(|solid| {
            solid
                .shells
                .iter()
                .filter_map(|&s| store.shells.get(s))
                .flat_map(|shell| shell.faces.iter().copied())
                .collect()
        })
        .unwrap_or_default()
}

fn distance_to_face_surface(store: &EntityStore, face_id: FaceId, p: &Point3d) -> Option<f64> {
    match &store.faces.get(face_id)?.surface {
        Surface::Plane(plane) => Some(plane.signed_distance(p).abs()),
        Surface::Sphere(sphere) => Some((p.distance_to(&sphere.center) - sphere.radius).abs()),
        Surface::Cylinder(cyl) => {
            let d = *p - cyl.origin;
            let radial = d - cyl.axis * d.dot(&cyl.axis);
            Some((radial.length() - cyl.radius).abs())
        }
        _ => None,
    }
}

/// Count distinct boundary crossings along a ray.
fn count_ray_crossings(store: &EntityStore, faces: &[FaceId], ray: &Ray, tolerance: f64) -> usize {
    let mut hit_ts: Vec<f64> = Vec::new();

    for &face_id in faces {
        let Some(face) = store.faces.get(face_id) else {
            continue;
        };
        let hits = match &face.surface {
            Surface::Plane(plane) => intersection::ray_plane(ray, plane).into_iter().collect(),
            Surface::Sphere(sphere) => intersection::ray_sphere(ray, sphere),
            Surface::Cylinder(cyl) => intersection::ray_cylinder(ray, cyl),
            other => {
                debug!(surface = other.surface_type_name(), "face skipped by ray casting");
                Vec::new()
            }
        };
        for hit in hits {
            if hit.t > tolerance && classify_point_on_face(store, face_id, &hit.point, tolerance) != FaceState::Out {
                hit_ts.push(hit.t);
            }
        }
    }

    deduplicate_crossings(&mut hit_ts, tolerance)
}

/// Sort hit parameters and merge clusters within `tolerance` of each other.
/// Returns the number of distinct crossings.
fn deduplicate_crossings(ts: &mut [f64], tolerance: f64) -> usize {
    if ts.is_empty() {
        return 0;
    }
    ts.sort_by(|a, b| a.total_cmp(b));

    let mut count = 1;
    let mut last = ts[0];
    for &t in ts.iter().skip(1) {
        if (t - last).abs() > tolerance {
            count += 1;
        }
        last = t;
    }
    count
}
