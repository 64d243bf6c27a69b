use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, TAU};

use tracing::{info, instrument};

use super::brep::*;
use crate::geometry::curves::{Circle3d, Curve, Line3d};
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{Cylinder, Plane, Sphere, Surface, UvBox};
use crate::geometry::vector::Vec3;

/// Build a box solid directly from corner coordinates.
/// The box is axis-aligned with one corner at (x0,y0,z0) and opposite at (x1,y1,z1).
#[instrument(skip(store))]
pub fn make_box(store: &mut EntityStore, x0: f64, y0: f64, z0: f64, x1: f64, y1: f64, z1: f64) -> SolidId {
    info!(
        min = ?[x0, y0, z0],
        max = ?[x1, y1, z1],
        "creating box primitive"
    );
    let v = [
        Point3d::new(x0, y0, z0),
        Point3d::new(x1, y0, z0),
        Point3d::new(x1, y1, z0),
        Point3d::new(x0, y1, z0),
        Point3d::new(x0, y0, z1),
        Point3d::new(x1, y0, z1),
        Point3d::new(x1, y1, z1),
        Point3d::new(x0, y1, z1),
    ];
    let vertex_ids: Vec<VertexId> = v.iter().map(|p| store.add_vertex(*p)).collect();
    let (solid_id, shell_id) = store.add_solid();

    // Corner indices wound counter-clockwise around the outward normal.
    let face_defs: [([usize; 4], Vec3); 6] = [
        ([0, 3, 2, 1], -Vec3::Z),
        ([4, 5, 6, 7], Vec3::Z),
        ([0, 4, 7, 3], -Vec3::X),
        ([1, 2, 6, 5], Vec3::X),
        ([0, 1, 5, 4], -Vec3::Y),
        ([3, 7, 6, 2], Vec3::Y),
    ];

    // One edge per unordered corner pair, oriented from the lower index.
    let mut edges: HashMap<(usize, usize), EdgeId> = HashMap::new();

    for (corners, normal) in face_defs {
        let center = v[corners[0]].midpoint(&v[corners[2]]);
        let plane = Plane::new(center, normal);

        let mut domain = UvBox::new(f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for &c in &corners {
            let (u, w) = plane.parameters_of(&v[c]);
            domain.u_min = domain.u_min.min(u);
            domain.u_max = domain.u_max.max(u);
            domain.v_min = domain.v_min.min(w);
            domain.v_max = domain.v_max.max(w);
        }

        let mut wire = Vec::with_capacity(4);
        for k in 0..4 {
            let (a, b) = (corners[k], corners[(k + 1) % 4]);
            let key = (a.min(b), a.max(b));
            let edge = *edges.entry(key).or_insert_with(|| {
                let (p, q) = (v[key.0], v[key.1]);
                store.add_edge(
                    Curve::Line(Line3d::from_points(p, q)),
                    0.0,
                    p.distance_to(&q),
                    vertex_ids[key.0],
                    vertex_ids[key.1],
                )
            });
            wire.push(OrientedEdge { edge, forward: a < b });
        }

        store.add_face(shell_id, Surface::Plane(plane), domain, wire);
    }

    solid_id
}

/// Build a sphere solid bounded by a single spherical face.
///
/// The face is closed by a meridian seam edge running from the south pole to
/// the north pole; both poles are vertices.
#[instrument(skip(store), fields(center = ?[center.x, center.y, center.z]))]
pub fn make_sphere(store: &mut EntityStore, center: Point3d, radius: f64) -> SolidId {
    info!(radius, "creating sphere primitive");
    let south = store.add_vertex(center - Vec3::Z * radius);
    let north = store.add_vertex(center + Vec3::Z * radius);

    // Meridian at u = 0 in the xz half-plane: center + r (cos t X + sin t Z).
    let meridian = Circle3d::with_axes(center, -Vec3::Y, Vec3::X, radius);
    let seam = store.add_edge(Curve::Circle(meridian), -FRAC_PI_2, FRAC_PI_2, south, north);

    let (solid_id, shell_id) = store.add_solid();
    store.add_face(
        shell_id,
        Surface::Sphere(Sphere::new(center, radius)),
        UvBox::new(0.0, TAU, -FRAC_PI_2, FRAC_PI_2),
        vec![
            OrientedEdge { edge: seam, forward: true },
            OrientedEdge { edge: seam, forward: false },
        ],
    );
    solid_id
}

/// Build a cylinder solid standing on `center` along +Z.
#[instrument(skip(store), fields(center = ?[center.x, center.y, center.z]))]
pub fn make_cylinder(store: &mut EntityStore, center: Point3d, radius: f64, height: f64) -> SolidId {
    info!(radius, height, "creating cylinder primitive");
    let lateral = Cylinder::new(center, Vec3::Z, radius);
    let top_center = center + Vec3::Z * height;

    let bottom_v = store.add_vertex(center + lateral.ref_dir * radius);
    let top_v = store.add_vertex(top_center + lateral.ref_dir * radius);

    let bottom_circle = Circle3d::with_axes(center, Vec3::Z, lateral.ref_dir, radius);
    let top_circle = Circle3d::with_axes(top_center, Vec3::Z, lateral.ref_dir, radius);
    let bottom = store.add_edge(Curve::Circle(bottom_circle), 0.0, TAU, bottom_v, bottom_v);
    let top = store.add_edge(Curve::Circle(top_circle), 0.0, TAU, top_v, top_v);
    let seam = store.add_edge(
        Curve::Line(Line3d::new(store.vertices[bottom_v].point, Vec3::Z)),
        0.0,
        height,
        bottom_v,
        top_v,
    );

    let (solid_id, shell_id) = store.add_solid();
    store.add_face(
        shell_id,
        Surface::Cylinder(lateral),
        UvBox::new(0.0, TAU, 0.0, height),
        vec![
            OrientedEdge { edge: bottom, forward: true },
            OrientedEdge { edge: seam, forward: true },
            OrientedEdge { edge: top, forward: false },
            OrientedEdge { edge: seam, forward: false },
        ],
    );

    let disk = UvBox::new(-radius, radius, -radius, radius);
    store.add_face(
        shell_id,
        Surface::Plane(Plane::new(center, -Vec3::Z)),
        disk,
        vec![OrientedEdge { edge: bottom, forward: false }],
    );
    store.add_face(
        shell_id,
        Surface::Plane(Plane::new(top_center, Vec3::Z)),
        disk,
        vec![OrientedEdge { edge: top, forward: true }],
    );

    solid_id
}
