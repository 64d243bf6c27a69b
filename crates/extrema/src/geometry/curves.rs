use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use super::point::Point3d;
use super::vector::Vec3;
use crate::traits::CurveEval;

/// Analytic curve representations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Curve {
    Line(Line3d),
    Circle(Circle3d),
    Ellipse(Ellipse3d),
}

/// An infinite line parameterized by arc length from `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line3d {
    pub origin: Point3d,
    /// Unit direction.
    pub direction: Vec3,
}

impl Line3d {
    pub fn new(origin: Point3d, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalized_or(Vec3::X),
        }
    }

    pub fn from_points(a: Point3d, b: Point3d) -> Self {
        Self::new(a, b - a)
    }

    pub fn evaluate(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }

    /// Parameter of the foot of the perpendicular from `p`.
    pub fn parameter_of(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.direction)
    }

    pub fn distance_to_point(&self, p: &Point3d) -> f64 {
        p.distance_to(&self.evaluate(self.parameter_of(p)))
    }
}

/// A circle in 3D space, parameterized by angle from `x_axis`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle3d {
    pub center: Point3d,
    pub normal: Vec3,
    pub radius: f64,
    pub x_axis: Vec3,
}

impl Circle3d {
    pub fn new(center: Point3d, normal: Vec3, radius: f64) -> Self {
        let normal = normal.normalized_or(Vec3::Z);
        Self {
            center,
            normal,
            radius,
            x_axis: normal.any_perpendicular(),
        }
    }

    pub fn with_axes(center: Point3d, normal: Vec3, x_axis: Vec3, radius: f64) -> Self {
        Self {
            center,
            normal: normal.normalized_or(Vec3::Z),
            x_axis: x_axis.normalized_or(Vec3::X),
            radius,
        }
    }

    fn y_axis(&self) -> Vec3 {
        self.normal.cross(&self.x_axis)
    }

    fn radial(&self, t: f64) -> (Vec3, Vec3) {
        let y = self.y_axis();
        let (s, c) = t.sin_cos();
        (self.x_axis * c + y * s, self.x_axis * -s + y * c)
    }

    pub fn evaluate(&self, t: f64) -> Point3d {
        self.center + self.radial(t).0 * self.radius
    }

    pub fn derivatives(&self, t: f64) -> (Point3d, Vec3, Vec3) {
        let (r, dr) = self.radial(t);
        (self.center + r * self.radius, dr * self.radius, r * -self.radius)
    }
}

/// An ellipse in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse3d {
    pub center: Point3d,
    pub normal: Vec3,
    pub major_axis: Vec3,
    pub major_radius: f64,
    pub minor_radius: f64,
}

impl Ellipse3d {
    pub fn new(center: Point3d, normal: Vec3, major_axis: Vec3, major_radius: f64, minor_radius: f64) -> Self {
        Self {
            center,
            normal: normal.normalized_or(Vec3::Z),
            major_axis: major_axis.normalized_or(Vec3::X),
            major_radius,
            minor_radius,
        }
    }

    pub fn derivatives(&self, t: f64) -> (Point3d, Vec3, Vec3) {
        let minor_axis = self.normal.cross(&self.major_axis);
        let (s, c) = t.sin_cos();
        let a = self.major_axis * self.major_radius;
        let b = minor_axis * self.minor_radius;
        (self.center + a * c + b * s, a * -s + b * c, a * -c + b * -s)
    }

    pub fn evaluate(&self, t: f64) -> Point3d {
        self.derivatives(t).0
    }
}

impl Curve {
    pub fn evaluate(&self, t: f64) -> Point3d {
        match self {
            Curve::Line(l) => l.evaluate(t),
            Curve::Circle(c) => c.evaluate(t),
            Curve::Ellipse(e) => e.evaluate(t),
        }
    }

    /// Bound on |C''| over the whole curve, used to pad sampled boxes.
    pub fn max_curvature_magnitude(&self) -> f64 {
        match self {
            Curve::Line(_) => 0.0,
            Curve::Circle(c) => c.radius.abs(),
            Curve::Ellipse(e) => e.major_radius.abs().max(e.minor_radius.abs()),
        }
    }
}

impl CurveEval for Curve {
    fn first_parameter(&self) -> f64 {
        match self {
            Curve::Line(_) => f64::NEG_INFINITY,
            Curve::Circle(_) | Curve::Ellipse(_) => 0.0,
        }
    }

    fn last_parameter(&self) -> f64 {
        match self {
            Curve::Line(_) => f64::INFINITY,
            Curve::Circle(_) | Curve::Ellipse(_) => TAU,
        }
    }

    fn is_periodic(&self) -> bool {
        !matches!(self, Curve::Line(_))
    }

    fn d0(&self, t: f64) -> Point3d {
        self.evaluate(t)
    }

    fn d2(&self, t: f64) -> (Point3d, Vec3, Vec3) {
        match self {
            Curve::Line(l) => (l.evaluate(t), l.direction, Vec3::ZERO),
            Curve::Circle(c) => c.derivatives(t),
            Curve::Ellipse(e) => e.derivatives(t),
        }
    }

    fn as_line(&self) -> Option<Line3d> {
        match self {
            Curve::Line(l) => Some(*l),
            _ => None,
        }
    }
}

/// A curve restricted to `[first, last]`, e.g. the parameter range of an edge.
#[derive(Debug, Clone, Copy)]
pub struct TrimmedCurve<'a, C: CurveEval + ?Sized> {
    pub curve: &'a C,
    pub first: f64,
    pub last: f64,
}

impl<'a, C: CurveEval + ?Sized> TrimmedCurve<'a, C> {
    pub fn new(curve: &'a C, first: f64, last: f64) -> Self {
        Self { curve, first, last }
    }
}

impl<C: CurveEval + ?Sized> CurveEval for TrimmedCurve<'_, C> {
    fn first_parameter(&self) -> f64 {
        self.first
    }

    fn last_parameter(&self) -> f64 {
        self.last
    }

    fn d0(&self, t: f64) -> Point3d {
        self.curve.d0(t)
    }

    fn d2(&self, t: f64) -> (Point3d, Vec3, Vec3) {
        self.curve.d2(t)
    }

    fn as_line(&self) -> Option<Line3d> {
        self.curve.as_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_line_parameter_of() {
        let l = Line3d::new(Point3d::ORIGIN, Vec3::new(2.0, 0.0, 0.0));
        assert!((l.parameter_of(&Point3d::new(5.0, 3.0, 0.0)) - 5.0).abs() < 1e-12);
        assert!((l.distance_to_point(&Point3d::new(5.0, 3.0, 0.0)) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_circle_derivatives_match_finite_differences() {
        let c = Circle3d::new(Point3d::new(1.0, 2.0, 3.0), Vec3::new(0.0, 1.0, 1.0), 2.5);
        let t = 0.7;
        let h = 1e-6;
        let (_, d1, d2) = c.derivatives(t);
        let fd1 = (c.evaluate(t + h) - c.evaluate(t - h)) / (2.0 * h);
        assert!((d1 - fd1).length() < 1e-6);
        let (_, d1p, _) = c.derivatives(t + h);
        let (_, d1m, _) = c.derivatives(t - h);
        assert!((d2 - (d1p - d1m) / (2.0 * h)).length() < 1e-6);
    }

    #[test]
    fn test_ellipse_axes() {
        let e = Ellipse3d::new(Point3d::ORIGIN, Vec3::Z, Vec3::X, 10.0, 5.0);
        assert!(e.evaluate(0.0).distance_to(&Point3d::new(10.0, 0.0, 0.0)) < 1e-12);
        assert!(e.evaluate(FRAC_PI_2).distance_to(&Point3d::new(0.0, 5.0, 0.0)) < 1e-12);
    }

    #[test]
    fn test_trimmed_curve_domain() {
        let line = Curve::Line(Line3d::new(Point3d::ORIGIN, Vec3::Y));
        assert_eq!(line.first_parameter(), f64::NEG_INFINITY);
        let seg = TrimmedCurve::new(&line, -1.0, 4.0);
        assert_eq!((seg.first_parameter(), seg.last_parameter()), (-1.0, 4.0));
        assert!(seg.d0(4.0).distance_to(&Point3d::new(0.0, 4.0, 0.0)) < 1e-12);
        assert!(seg.as_line().is_some());
    }
}
