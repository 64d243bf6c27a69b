use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};

use super::point::Point3d;
use super::vector::Vec3;
use crate::traits::{SurfaceDerivatives, SurfaceEval};

/// All surface types supported by the kernel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Surface {
    Plane(Plane),
    Cylinder(Cylinder),
    Cone(Cone),
    Sphere(Sphere),
    Torus(Torus),
}

/// A rectangle in (u, v) parameter space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UvBox {
    pub u_min: f64,
    pub u_max: f64,
    pub v_min: f64,
    pub v_max: f64,
}

impl UvBox {
    pub fn new(u_min: f64, u_max: f64, v_min: f64, v_max: f64) -> Self {
        Self {
            u_min,
            u_max,
            v_min,
            v_max,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.u_min.is_finite() && self.u_max.is_finite() && self.v_min.is_finite() && self.v_max.is_finite()
    }

    pub fn contains(&self, u: f64, v: f64, tol: f64) -> bool {
        u >= self.u_min - tol && u <= self.u_max + tol && v >= self.v_min - tol && v <= self.v_max + tol
    }

    /// Intersection of two boxes (may be empty).
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            u_min: self.u_min.max(other.u_min),
            u_max: self.u_max.min(other.u_max),
            v_min: self.v_min.max(other.v_min),
            v_max: self.v_max.min(other.v_max),
        }
    }
}

// ─── Plane ──────────────────────────────────────────────────────────────────

/// An infinite plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3d,
    pub normal: Vec3,
    pub u_axis: Vec3,
    pub v_axis: Vec3,
}

impl Plane {
    pub fn new(origin: Point3d, normal: Vec3) -> Self {
        let normal = normal.normalized_or(Vec3::Z);
        let u_axis = normal.any_perpendicular();
        let v_axis = normal.cross(&u_axis);
        Self {
            origin,
            normal,
            u_axis,
            v_axis,
        }
    }

    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        self.origin + self.u_axis * u + self.v_axis * v
    }

    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.normal)
    }

    pub fn project_point(&self, p: &Point3d) -> Point3d {
        *p - self.normal * self.signed_distance(p)
    }

    /// (u, v) of the orthogonal projection of `p`.
    pub fn parameters_of(&self, p: &Point3d) -> (f64, f64) {
        let d = *p - self.origin;
        (d.dot(&self.u_axis), d.dot(&self.v_axis))
    }
}

// ─── Cylinder ───────────────────────────────────────────────────────────────

/// A cylinder surface, infinite along its axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cylinder {
    pub origin: Point3d,
    pub axis: Vec3,
    pub radius: f64,
    pub ref_dir: Vec3,
}

impl Cylinder {
    pub fn new(origin: Point3d, axis: Vec3, radius: f64) -> Self {
        let axis = axis.normalized_or(Vec3::Z);
        Self {
            origin,
            axis,
            radius,
            ref_dir: axis.any_perpendicular(),
        }
    }

    /// (u = angle, v = height along axis).
    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        self.derivatives(u, v).point
    }

    /// (u, v) of the radial projection of `p`; `None` on the axis.
    pub fn parameters_of(&self, p: &Point3d) -> Option<(f64, f64)> {
        let d = *p - self.origin;
        let v = d.dot(&self.axis);
        let radial = (d - self.axis * v).normalized()?;
        let y_dir = self.axis.cross(&self.ref_dir);
        let mut u = radial.dot(&y_dir).atan2(radial.dot(&self.ref_dir));
        if u < 0.0 {
            u += TAU;
        }
        Some((u, v))
    }

    pub fn derivatives(&self, u: f64, v: f64) -> SurfaceDerivatives {
        let (radial, tangent) = frame_at(self.ref_dir, self.axis, u);
        SurfaceDerivatives {
            point: self.origin + radial * self.radius + self.axis * v,
            du: tangent * self.radius,
            dv: self.axis,
            duu: radial * -self.radius,
            duv: Vec3::ZERO,
            dvv: Vec3::ZERO,
        }
    }
}

// ─── Cone ───────────────────────────────────────────────────────────────────

/// A cone surface with its apex at v = 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cone {
    pub apex: Point3d,
    pub axis: Vec3,
    pub half_angle: f64,
    pub ref_dir: Vec3,
}

impl Cone {
    pub fn new(apex: Point3d, axis: Vec3, half_angle: f64) -> Self {
        let axis = axis.normalized_or(Vec3::Z);
        Self {
            apex,
            axis,
            half_angle,
            ref_dir: axis.any_perpendicular(),
        }
    }

    /// (u = angle, v = distance from apex along axis).
    pub fn derivatives(&self, u: f64, v: f64) -> SurfaceDerivatives {
        let (radial, tangent) = frame_at(self.ref_dir, self.axis, u);
        let k = self.half_angle.tan();
        SurfaceDerivatives {
            point: self.apex + self.axis * v + radial * (k * v),
            du: tangent * (k * v),
            dv: self.axis + radial * k,
            duu: radial * (-k * v),
            duv: tangent * k,
            dvv: Vec3::ZERO,
        }
    }
}

// ─── Sphere ─────────────────────────────────────────────────────────────────

/// A sphere surface in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Point3d,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Point3d, radius: f64) -> Self {
        Self { center, radius }
    }

    /// (u = longitude in [0, 2pi], v = latitude in [-pi/2, pi/2]).
    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        let (su, cu) = u.sin_cos();
        let (sv, cv) = v.sin_cos();
        self.center + Vec3::new(cv * cu, cv * su, sv) * self.radius
    }

    pub fn derivatives(&self, u: f64, v: f64) -> SurfaceDerivatives {
        let r = self.radius;
        let (su, cu) = u.sin_cos();
        let (sv, cv) = v.sin_cos();
        SurfaceDerivatives {
            point: self.center + Vec3::new(cv * cu, cv * su, sv) * r,
            du: Vec3::new(-cv * su, cv * cu, 0.0) * r,
            dv: Vec3::new(-sv * cu, -sv * su, cv) * r,
            duu: Vec3::new(-cv * cu, -cv * su, 0.0) * r,
            duv: Vec3::new(sv * su, -sv * cu, 0.0) * r,
            dvv: Vec3::new(-cv * cu, -cv * su, -sv) * r,
        }
    }

    /// (u, v) of the radial projection of `p`; `None` at the center.
    pub fn parameters_of(&self, p: &Point3d) -> Option<(f64, f64)> {
        let d = (*p - self.center).normalized()?;
        let mut u = d.y.atan2(d.x);
        if u < 0.0 {
            u += TAU;
        }
        Some((u, d.z.clamp(-1.0, 1.0).asin()))
    }
}

// ─── Torus ──────────────────────────────────────────────────────────────────

/// A torus surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Torus {
    pub center: Point3d,
    pub axis: Vec3,
    pub ref_dir: Vec3,
    pub major_radius: f64,
    pub minor_radius: f64,
}

impl Torus {
    pub fn new(center: Point3d, axis: Vec3, major_radius: f64, minor_radius: f64) -> Self {
        let axis = axis.normalized_or(Vec3::Z);
        Self {
            center,
            axis,
            ref_dir: axis.any_perpendicular(),
            major_radius,
            minor_radius,
        }
    }

    /// (u = major angle, v = minor angle).
    pub fn derivatives(&self, u: f64, v: f64) -> SurfaceDerivatives {
        let (radial, tangent) = frame_at(self.ref_dir, self.axis, u);
        let (sv, cv) = v.sin_cos();
        let (big, small) = (self.major_radius, self.minor_radius);
        let ring = big + small * cv;
        SurfaceDerivatives {
            point: self.center + radial * ring + self.axis * (small * sv),
            du: tangent * ring,
            dv: radial * (-small * sv) + self.axis * (small * cv),
            duu: radial * -ring,
            duv: tangent * (-small * sv),
            dvv: radial * (-small * cv) + self.axis * (-small * sv),
        }
    }
}

/// Radial and tangential unit vectors at angle `u` around `axis`.
fn frame_at(ref_dir: Vec3, axis: Vec3, u: f64) -> (Vec3, Vec3) {
    let y_dir = axis.cross(&ref_dir);
    let (s, c) = u.sin_cos();
    (ref_dir * c + y_dir * s, ref_dir * -s + y_dir * c)
}

impl Surface {
    pub fn evaluate(&self, u: f64, v: f64) -> Point3d {
        self.d0(u, v)
    }

    /// Unit normal from du x dv; falls back to the plane/axis direction at singular points.
    pub fn normal_at(&self, u: f64, v: f64) -> Vec3 {
        let d = self.d2(u, v);
        let fallback = match self {
            Surface::Plane(p) => p.normal,
            Surface::Cylinder(c) => c.axis,
            Surface::Cone(c) => c.axis,
            Surface::Sphere(_) => if v > 0.0 { Vec3::Z } else { -Vec3::Z },
            Surface::Torus(t) => t.axis,
        };
        d.du.cross(&d.dv).normalized_or(fallback)
    }

    pub fn surface_type_name(&self) -> &'static str {
        match self {
            Surface::Plane(_) => "Plane",
            Surface::Cylinder(_) => "Cylinder",
            Surface::Cone(_) => "Cone",
            Surface::Sphere(_) => "Sphere",
            Surface::Torus(_) => "Torus",
        }
    }
}

impl SurfaceEval for Surface {
    fn bounds(&self) -> UvBox {
        match self {
            Surface::Plane(_) => UvBox::new(f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY),
            Surface::Cylinder(_) | Surface::Cone(_) => UvBox::new(0.0, TAU, f64::NEG_INFINITY, f64::INFINITY),
            Surface::Sphere(_) => UvBox::new(0.0, TAU, -FRAC_PI_2, FRAC_PI_2),
            Surface::Torus(_) => UvBox::new(0.0, TAU, 0.0, TAU),
        }
    }

    fn is_u_periodic(&self) -> bool {
        !matches!(self, Surface::Plane(_))
    }

    fn d0(&self, u: f64, v: f64) -> Point3d {
        match self {
            Surface::Plane(p) => p.evaluate(u, v),
            Surface::Sphere(s) => s.evaluate(u, v),
            _ => self.d2(u, v).point,
        }
    }

    fn d2(&self, u: f64, v: f64) -> SurfaceDerivatives {
        match self {
            Surface::Plane(p) => SurfaceDerivatives {
                point: p.evaluate(u, v),
                du: p.u_axis,
                dv: p.v_axis,
                duu: Vec3::ZERO,
                duv: Vec3::ZERO,
                dvv: Vec3::ZERO,
            },
            Surface::Cylinder(c) => c.derivatives(u, v),
            Surface::Cone(c) => c.derivatives(u, v),
            Surface::Sphere(s) => s.derivatives(u, v),
            Surface::Torus(t) => t.derivatives(u, v),
        }
    }

    fn as_plane(&self) -> Option<Plane> {
        match self {
            Surface::Plane(p) => Some(*p),
            _ => None,
        }
    }

    fn as_sphere(&self) -> Option<Sphere> {
        match self {
            Surface::Sphere(s) => Some(*s),
            _ => None,
        }
    }
}

/// A surface restricted to a (u, v) rectangle, e.g. the domain of a face.
#[derive(Debug, Clone, Copy)]
pub struct TrimmedSurface<'a, S: SurfaceEval + ?Sized> {
    pub surface: &'a S,
    pub domain: UvBox,
}

impl<'a, S: SurfaceEval + ?Sized> TrimmedSurface<'a, S> {
    pub fn new(surface: &'a S, domain: UvBox) -> Self {
        Self { surface, domain }
    }
}

impl<S: SurfaceEval + ?Sized> SurfaceEval for TrimmedSurface<'_, S> {
    fn bounds(&self) -> UvBox {
        self.domain
    }

    fn is_u_periodic(&self) -> bool {
        let b = self.surface.bounds();
        self.surface.is_u_periodic() && (self.domain.u_max - self.domain.u_min) >= (b.u_max - b.u_min)
    }

    fn d0(&self, u: f64, v: f64) -> Point3d {
        self.surface.d0(u, v)
    }

    fn d2(&self, u: f64, v: f64) -> SurfaceDerivatives {
        self.surface.d2(u, v)
    }

    fn as_plane(&self) -> Option<Plane> {
        self.surface.as_plane()
    }

    fn as_sphere(&self) -> Option<Sphere> {
        self.surface.as_sphere()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_derivatives_consistent(s: &Surface, u: f64, v: f64) {
        let h = 1e-6;
        let d = s.d2(u, v);
        let du = (s.d0(u + h, v) - s.d0(u - h, v)) / (2.0 * h);
        let dv = (s.d0(u, v + h) - s.d0(u, v - h)) / (2.0 * h);
        assert!((d.du - du).length() < 1e-6, "{} du", s.surface_type_name());
        assert!((d.dv - dv).length() < 1e-6, "{} dv", s.surface_type_name());
        let duu = (s.d2(u + h, v).du - s.d2(u - h, v).du) / (2.0 * h);
        let duv = (s.d2(u, v + h).du - s.d2(u, v - h).du) / (2.0 * h);
        let dvv = (s.d2(u, v + h).dv - s.d2(u, v - h).dv) / (2.0 * h);
        assert!((d.duu - duu).length() < 1e-5, "{} duu", s.surface_type_name());
        assert!((d.duv - duv).length() < 1e-5, "{} duv", s.surface_type_name());
        assert!((d.dvv - dvv).length() < 1e-5, "{} dvv", s.surface_type_name());
    }

    #[test]
    fn test_second_derivatives_for_every_surface_type() {
        let surfaces = [
            Surface::Plane(Plane::new(Point3d::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0))),
            Surface::Cylinder(Cylinder::new(Point3d::ORIGIN, Vec3::new(0.0, 1.0, 1.0), 2.0)),
            Surface::Cone(Cone::new(Point3d::ORIGIN, Vec3::Z, 0.4)),
            Surface::Sphere(Sphere::new(Point3d::new(1.0, 2.0, 3.0), 1.5)),
            Surface::Torus(Torus::new(Point3d::ORIGIN, Vec3::X, 5.0, 1.0)),
        ];
        for s in &surfaces {
            assert_derivatives_consistent(s, 0.4, 0.9);
        }
    }

    #[test]
    fn test_sphere_parameters_round_trip() {
        let s = Sphere::new(Point3d::new(0.0, 0.0, 1.0), 2.0);
        let p = s.evaluate(4.0, -0.3);
        let (u, v) = s.parameters_of(&p).unwrap();
        assert!((u - 4.0).abs() < 1e-12);
        assert!((v + 0.3).abs() < 1e-12);
        assert!(s.parameters_of(&s.center).is_none());
    }

    #[test]
    fn test_cylinder_parameters_round_trip() {
        let c = Cylinder::new(Point3d::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 1.0), 0.5);
        let p = c.evaluate(5.5, -2.0);
        let (u, v) = c.parameters_of(&p).unwrap();
        assert!((u - 5.5).abs() < 1e-12);
        assert!((v + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sphere_normal_is_outward() {
        let s = Surface::Sphere(Sphere::new(Point3d::ORIGIN, 2.0));
        let p = s.d0(0.5, 0.3);
        let n = s.normal_at(0.5, 0.3);
        assert!((n - p.to_vec3() / 2.0).length() < 1e-12);
    }

    #[test]
    fn test_plane_projection() {
        let p = Plane::new(Point3d::new(0.0, 0.0, 2.0), Vec3::Z);
        let q = Point3d::new(1.0, -2.0, 7.0);
        assert!((p.signed_distance(&q) - 5.0).abs() < 1e-12);
        let (u, v) = p.parameters_of(&q);
        assert!(p.evaluate(u, v).distance_to(&p.project_point(&q)) < 1e-12);
    }

    #[test]
    fn test_trimmed_surface_periodicity() {
        let s = Surface::Cylinder(Cylinder::new(Point3d::ORIGIN, Vec3::Z, 1.0));
        let full = TrimmedSurface::new(&s, UvBox::new(0.0, TAU, 0.0, 1.0));
        let half = TrimmedSurface::new(&s, UvBox::new(0.0, 3.0, 0.0, 1.0));
        assert!(full.is_u_periodic());
        assert!(!half.is_u_periodic());
    }
}
