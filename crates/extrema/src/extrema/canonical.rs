//! Closed-form extrema for recognized analytic pairs.
//!
//! Every function takes the parameter ranges the entities are trimmed to and
//! drops solutions falling outside them (with `param_tolerance` slack).

use std::f64::consts::TAU;

use crate::geometry::curves::Line3d;
use crate::geometry::intersection::solve_quadratic;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{Plane, Sphere, UvBox};
use crate::geometry::vector::Vec3;

use super::types::*;

/// Points of a sphere closer than this to its center are at the center.
const CENTER_TOLERANCE: f64 = 1e-12;

fn in_range(t: f64, range: (f64, f64), slack: f64) -> bool {
    t >= range.0 - slack && t <= range.1 + slack
}

/// Whether `(u, v)` lies in `domain`, also trying the `u + k * 2pi` aliases on
/// the sphere's periodic longitude.
fn sphere_uv_in(domain: &UvBox, u: f64, v: f64, slack: f64) -> Option<(f64, f64)> {
    [u, u - TAU, u + TAU]
        .into_iter()
        .find(|&u| domain.contains(u, v, slack))
        .map(|u| (u, v))
}

fn on_sphere(sphere: &Sphere, domain: &UvBox, point: Point3d, slack: f64) -> Option<PointOnSurface> {
    let (u, v) = sphere.parameters_of(&point)?;
    let (u, v) = sphere_uv_in(domain, u, v, slack)?;
    Some(PointOnSurface { u, v, point })
}

fn on_plane(plane: &Plane, domain: &UvBox, point: Point3d, slack: f64) -> Option<PointOnSurface> {
    let (u, v) = plane.parameters_of(&point);
    domain.contains(u, v, slack).then_some(PointOnSurface { u, v, point })
}

// ─── Point ──────────────────────────────────────────────────────────────────

/// Point vs sphere: the nearest and farthest points lie on the line through
/// the center. A point at the center is equidistant from the whole sphere.
pub fn point_sphere(
    p: &Point3d,
    sphere: &Sphere,
    domain: &UvBox,
    mode: ExtremaMode,
    config: &ExtremaConfig,
) -> Extrema<Point3d, PointOnSurface> {
    let offset = *p - sphere.center;
    let dist = offset.length();
    if dist <= CENTER_TOLERANCE {
        return Extrema::parallel(sphere.radius * sphere.radius);
    }
    let dir = offset / dist;
    let slack = config.param_tolerance;
    let mut result = Extrema::done();
    if mode.wants_min() {
        if let Some(near) = on_sphere(sphere, domain, sphere.center + dir * sphere.radius, slack) {
            result.push_unique(Extremum::new(*p, near, true), config);
        }
    }
    if mode.wants_max() {
        if let Some(far) = on_sphere(sphere, domain, sphere.center - dir * sphere.radius, slack) {
            result.push_unique(Extremum::new(*p, far, false), config);
        }
    }
    result
}

/// Point vs plane: one minimum at the orthogonal projection.
pub fn point_plane(
    p: &Point3d,
    plane: &Plane,
    domain: &UvBox,
    mode: ExtremaMode,
    config: &ExtremaConfig,
) -> Extrema<Point3d, PointOnSurface> {
    let mut result = Extrema::done();
    if mode.wants_min() {
        if let Some(foot) = on_plane(plane, domain, plane.project_point(p), config.param_tolerance) {
            result.push_unique(Extremum::new(*p, foot, true), config);
        }
    }
    result
}

// ─── Line ───────────────────────────────────────────────────────────────────

/// Line vs sphere.
///
/// The closest approach of the line to the center is one projection. A line
/// passing farther than the radius has a single minimum there; a tangent or
/// secant line touches the sphere at the roots of
/// `|O + tD - C|^2 = R^2`. The distance to a sphere is convex along a line,
/// so on a bounded range the maximum sits at the endpoint farther from the
/// center.
pub fn line_sphere(
    line: &Line3d,
    range: (f64, f64),
    sphere: &Sphere,
    domain: &UvBox,
    mode: ExtremaMode,
    config: &ExtremaConfig,
) -> Extrema<PointOnCurve, PointOnSurface> {
    let slack = config.param_tolerance;
    let center = sphere.center;
    let radius = sphere.radius;
    let mut result = Extrema::done();

    if mode.wants_min() {
        let t0 = line.parameter_of(&center);
        let foot = line.evaluate(t0);
        let dist = foot.distance_to(&center);

        if dist > radius + config.tolerance {
            let dir = (foot - center) / dist;
            if in_range(t0, range, slack) {
                if let Some(s) = on_sphere(sphere, domain, center + dir * radius, slack) {
                    let c = PointOnCurve { param: t0, point: foot };
                    result.push_unique(Extremum::new(c, s, true), config);
                }
            }
        } else if dist >= radius - config.tolerance {
            if in_range(t0, range, slack) {
                let touch = center + (foot - center).normalized_or(line.direction.any_perpendicular()) * radius;
                if let Some(s) = on_sphere(sphere, domain, touch, slack) {
                    let c = PointOnCurve { param: t0, point: foot };
                    result.push_unique(Extremum { square_distance: 0.0, ..Extremum::new(c, s, true) }, config);
                }
            }
        } else {
            let oc = line.origin - center;
            let b = 2.0 * line.direction.dot(&oc);
            let c = oc.length_squared() - radius * radius;
            for t in solve_quadratic(1.0, b, c) {
                if !in_range(t, range, slack) {
                    continue;
                }
                let point = line.evaluate(t);
                if let Some(s) = on_sphere(sphere, domain, point, slack) {
                    let c = PointOnCurve { param: t, point };
                    result.push_unique(Extremum { square_distance: 0.0, ..Extremum::new(c, s, true) }, config);
                }
            }
        }
    }

    if mode.wants_max() && range.0.is_finite() && range.1.is_finite() {
        let (pa, pb) = (line.evaluate(range.0), line.evaluate(range.1));
        let (t, p) = if pa.distance_to(&center) >= pb.distance_to(&center) {
            (range.0, pa)
        } else {
            (range.1, pb)
        };
        let dir = (p - center).normalized_or(Vec3::Z);
        if let Some(s) = on_sphere(sphere, domain, center + dir * radius, slack) {
            result.push_unique(Extremum::new(PointOnCurve { param: t, point: p }, s, false), config);
        }
    }

    result
}

/// Line vs plane: parallel at a constant distance, or a zero-distance
/// crossing.
pub fn line_plane(
    line: &Line3d,
    range: (f64, f64),
    plane: &Plane,
    domain: &UvBox,
    mode: ExtremaMode,
    config: &ExtremaConfig,
) -> Extrema<PointOnCurve, PointOnSurface> {
    let denom = line.direction.dot(&plane.normal);
    if denom.abs() <= crate::default_tolerance().angular {
        let d = plane.signed_distance(&line.origin);
        return Extrema::parallel(d * d);
    }
    let mut result = Extrema::done();
    if mode.wants_min() {
        let t = -plane.signed_distance(&line.origin) / denom;
        if in_range(t, range, config.param_tolerance) {
            let point = line.evaluate(t);
            if let Some(s) = on_plane(plane, domain, point, config.param_tolerance) {
                let c = PointOnCurve { param: t, point };
                result.push_unique(Extremum { square_distance: 0.0, ..Extremum::new(c, s, true) }, config);
            }
        }
    }
    result
}

// ─── Surfaces ───────────────────────────────────────────────────────────────

/// Plane vs plane: only parallel planes have a defined distance; crossing
/// planes meet along a line and carry no discrete extremum.
pub fn plane_plane(p1: &Plane, p2: &Plane) -> Extrema<PointOnSurface, PointOnSurface> {
    if p1.normal.is_parallel_to(&p2.normal, crate::default_tolerance().angular) {
        let d = p2.signed_distance(&p1.origin);
        Extrema::parallel(d * d)
    } else {
        Extrema::done()
    }
}

/// Plane vs sphere: the nearest sphere point lies on the normal through the
/// center. A sphere crossing the plane has no discrete minimum.
pub fn plane_sphere(
    plane: &Plane,
    plane_domain: &UvBox,
    sphere: &Sphere,
    sphere_domain: &UvBox,
    mode: ExtremaMode,
    config: &ExtremaConfig,
) -> Extrema<PointOnSurface, PointOnSurface> {
    let mut result = Extrema::done();
    let sd = plane.signed_distance(&sphere.center);
    if !mode.wants_min() || sd.abs() <= sphere.radius + config.tolerance {
        return result;
    }
    let slack = config.param_tolerance;
    let foot = on_plane(plane, plane_domain, plane.project_point(&sphere.center), slack);
    let near = on_sphere(sphere, sphere_domain, sphere.center - plane.normal * (sd.signum() * sphere.radius), slack);
    if let (Some(a), Some(b)) = (foot, near) {
        result.push_unique(Extremum::new(a, b, true), config);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn full_sphere() -> UvBox {
        UvBox::new(0.0, TAU, -FRAC_PI_2, FRAC_PI_2)
    }

    fn everywhere() -> UvBox {
        UvBox::new(f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY)
    }

    const UNBOUNDED: (f64, f64) = (f64::NEG_INFINITY, f64::INFINITY);

    #[test]
    fn test_line_through_sphere_center_hits_twice() {
        let line = Line3d::new(Point3d::ORIGIN, Vec3::X);
        let sphere = Sphere::new(Point3d::ORIGIN, 2.0);
        let config = ExtremaConfig::default();
        let ext = line_sphere(&line, UNBOUNDED, &sphere, &full_sphere(), ExtremaMode::Min, &config);
        assert!(ext.is_done());
        assert_eq!(ext.nb_ext(), 2);
        let mut ts: Vec<f64> = ext.solutions.iter().map(|s| s.first.param).collect();
        ts.sort_by(|a, b| a.total_cmp(b));
        assert!((ts[0] + 2.0).abs() < 1e-12);
        assert!((ts[1] - 2.0).abs() < 1e-12);
        assert!(ext.solutions.iter().all(|s| s.square_distance == 0.0 && s.is_min));
    }

    #[test]
    fn test_separated_line_has_one_minimum() {
        let line = Line3d::new(Point3d::new(0.0, 5.0, 0.0), Vec3::X);
        let sphere = Sphere::new(Point3d::ORIGIN, 2.0);
        let config = ExtremaConfig::default();
        let ext = line_sphere(&line, UNBOUNDED, &sphere, &full_sphere(), ExtremaMode::Min, &config);
        assert_eq!(ext.nb_ext(), 1);
        assert!((ext.solutions[0].distance() - 3.0).abs() < 1e-12);
        assert!(ext.solutions[0].second.point.distance_to(&Point3d::new(0.0, 2.0, 0.0)) < 1e-12);
    }

    #[test]
    fn test_bounded_line_maximum_at_farther_end() {
        let line = Line3d::new(Point3d::new(0.0, 5.0, 0.0), Vec3::X);
        let sphere = Sphere::new(Point3d::ORIGIN, 2.0);
        let config = ExtremaConfig::default();
        let ext = line_sphere(&line, (-1.0, 3.0), &sphere, &full_sphere(), ExtremaMode::Max, &config);
        assert_eq!(ext.nb_ext(), 1);
        let max = ext.solutions[0];
        assert!(!max.is_min);
        assert!((max.first.param - 3.0).abs() < 1e-12);
        let expected = (34f64.sqrt() - 2.0).powi(2);
        assert!((max.square_distance - expected).abs() < 1e-12);
    }

    #[test]
    fn test_tangent_line_touches_once() {
        let line = Line3d::new(Point3d::new(0.0, 2.0, 0.0), Vec3::X);
        let sphere = Sphere::new(Point3d::ORIGIN, 2.0);
        let ext = line_sphere(&line, UNBOUNDED, &sphere, &full_sphere(), ExtremaMode::Min, &ExtremaConfig::default());
        assert_eq!(ext.nb_ext(), 1);
        assert_eq!(ext.solutions[0].square_distance, 0.0);
    }

    #[test]
    fn test_out_of_range_minimum_is_dropped() {
        let line = Line3d::new(Point3d::new(0.0, 5.0, 0.0), Vec3::X);
        let sphere = Sphere::new(Point3d::ORIGIN, 2.0);
        let ext = line_sphere(&line, (1.0, 4.0), &sphere, &full_sphere(), ExtremaMode::Min, &ExtremaConfig::default());
        assert!(ext.is_done());
        assert_eq!(ext.nb_ext(), 0);
    }

    #[test]
    fn test_point_sphere_min_and_max() {
        let sphere = Sphere::new(Point3d::ORIGIN, 1.0);
        let p = Point3d::new(0.0, 0.0, 10.0);
        let ext = point_sphere(&p, &sphere, &full_sphere(), ExtremaMode::MinMax, &ExtremaConfig::default());
        assert_eq!(ext.nb_ext(), 2);
        let min = ext.solutions.iter().find(|s| s.is_min).unwrap();
        let max = ext.solutions.iter().find(|s| !s.is_min).unwrap();
        assert!(min.second.point.distance_to(&Point3d::new(0.0, 0.0, 1.0)) < 1e-12);
        assert!((min.square_distance - 81.0).abs() < 1e-9);
        assert!(max.second.point.distance_to(&Point3d::new(0.0, 0.0, -1.0)) < 1e-12);
        assert!((max.square_distance - 121.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_at_sphere_center_is_parallel() {
        let sphere = Sphere::new(Point3d::new(1.0, 2.0, 3.0), 2.0);
        let ext = point_sphere(&sphere.center, &sphere, &full_sphere(), ExtremaMode::Min, &ExtremaConfig::default());
        assert!(ext.is_done() && ext.is_parallel);
        assert_eq!(ext.nb_ext(), 0);
        assert_eq!(ext.parallel_square_distance, 4.0);
    }

    #[test]
    fn test_point_plane_respects_domain() {
        let plane = Plane::new(Point3d::ORIGIN, Vec3::Z);
        let config = ExtremaConfig::default();
        let p = Point3d::new(0.3, -0.2, 4.0);
        let ext = point_plane(&p, &plane, &everywhere(), ExtremaMode::Min, &config);
        assert!((ext.square_distance(0).unwrap() - 16.0).abs() < 1e-12);
        let tiny = UvBox::new(5.0, 6.0, 5.0, 6.0);
        assert_eq!(point_plane(&p, &plane, &tiny, ExtremaMode::Min, &config).nb_ext(), 0);
    }

    #[test]
    fn test_line_plane() {
        let plane = Plane::new(Point3d::ORIGIN, Vec3::Z);
        let config = ExtremaConfig::default();
        let flat = Line3d::new(Point3d::new(0.0, 0.0, 3.0), Vec3::X);
        let ext = line_plane(&flat, UNBOUNDED, &plane, &everywhere(), ExtremaMode::Min, &config);
        assert!(ext.is_parallel);
        assert_eq!(ext.parallel_square_distance, 9.0);

        let steep = Line3d::new(Point3d::new(1.0, 1.0, 3.0), Vec3::new(0.0, 0.0, -1.0));
        let ext = line_plane(&steep, UNBOUNDED, &plane, &everywhere(), ExtremaMode::Min, &config);
        assert_eq!(ext.nb_ext(), 1);
        assert!((ext.solutions[0].first.param - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_plane_sphere_gap() {
        let plane = Plane::new(Point3d::ORIGIN, Vec3::Z);
        let sphere = Sphere::new(Point3d::new(0.5, 0.5, 4.0), 1.0);
        let ext = plane_sphere(&plane, &everywhere(), &sphere, &full_sphere(), ExtremaMode::Min, &ExtremaConfig::default());
        assert_eq!(ext.nb_ext(), 1);
        assert!((ext.solutions[0].distance() - 3.0).abs() < 1e-12);
        assert!(ext.solutions[0].second.point.distance_to(&Point3d::new(0.5, 0.5, 3.0)) < 1e-12);
    }

    #[test]
    fn test_parallel_planes() {
        let a = Plane::new(Point3d::ORIGIN, Vec3::Z);
        let b = Plane::new(Point3d::new(0.0, 0.0, 2.0), -Vec3::Z);
        let ext = plane_plane(&a, &b);
        assert!(ext.is_parallel);
        assert!((ext.parallel_square_distance - 4.0).abs() < 1e-12);
        assert!(!plane_plane(&a, &Plane::new(Point3d::ORIGIN, Vec3::X)).is_parallel);
    }
}
