//! Evaluation capabilities the extrema solvers are written against.
//!
//! Solvers only ever borrow an evaluable for the duration of a query and never
//! mutate it, so one curve or surface can be shared between concurrent queries.

use crate::geometry::curves::Line3d;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{Plane, Sphere, UvBox};
use crate::geometry::vector::Vec3;

/// A parametric curve with a (possibly infinite) parameter domain.
pub trait CurveEval {
    fn first_parameter(&self) -> f64;

    fn last_parameter(&self) -> f64;

    fn is_periodic(&self) -> bool {
        false
    }

    fn d0(&self, t: f64) -> Point3d;

    fn d1(&self, t: f64) -> (Point3d, Vec3) {
        let (p, d1, _) = self.d2(t);
        (p, d1)
    }

    /// Point, first and second derivative at `t`.
    fn d2(&self, t: f64) -> (Point3d, Vec3, Vec3);

    /// The underlying line, when the curve is one.
    fn as_line(&self) -> Option<Line3d> {
        None
    }
}

/// Point and partial derivatives of a surface at (u, v).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDerivatives {
    pub point: Point3d,
    pub du: Vec3,
    pub dv: Vec3,
    pub duu: Vec3,
    pub duv: Vec3,
    pub dvv: Vec3,
}

/// A parametric surface with a rectangular (possibly infinite) domain.
pub trait SurfaceEval {
    fn bounds(&self) -> UvBox;

    fn is_u_periodic(&self) -> bool {
        false
    }

    fn d0(&self, u: f64, v: f64) -> Point3d;

    fn d1(&self, u: f64, v: f64) -> (Point3d, Vec3, Vec3) {
        let d = self.d2(u, v);
        (d.point, d.du, d.dv)
    }

    fn d2(&self, u: f64, v: f64) -> SurfaceDerivatives;

    fn as_plane(&self) -> Option<Plane> {
        None
    }

    fn as_sphere(&self) -> Option<Sphere> {
        None
    }
}
