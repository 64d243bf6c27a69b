//! Point vs curve.
//!
//! Extrema of `|C(t) - P|^2` are the roots of its derivative
//! `f(t) = (C(t) - P) . C'(t)`; each root is a minimum when
//! `f'(t) = |C'|^2 + (C - P) . C''` is positive.

use cad_roots::{find_roots, EvalError, Function, FunctionWithDerivative, RootSearchConfig, Status};
use tracing::debug;

use crate::geometry::point::Point3d;
use crate::traits::CurveEval;

use super::types::*;

struct DistanceSlope<'a, C: ?Sized> {
    curve: &'a C,
    point: Point3d,
}

impl<C: CurveEval + ?Sized> Function for DistanceSlope<'_, C> {
    fn value(&self, t: f64) -> Result<f64, EvalError> {
        self.values(t).map(|(f, _)| f)
    }
}

impl<C: CurveEval + ?Sized> FunctionWithDerivative for DistanceSlope<'_, C> {
    fn values(&self, t: f64) -> Result<(f64, f64), EvalError> {
        let (c, d1, d2) = self.curve.d2(t);
        let d = c - self.point;
        let f = d.dot(&d1);
        let df = d1.length_squared() + d.dot(&d2);
        if f.is_finite() && df.is_finite() {
            Ok((f, df))
        } else {
            Err(EvalError::NonFinite { at: vec![t] })
        }
    }
}

/// Extrema between points and one borrowed curve.
pub struct PointCurveExtrema<'a, C: CurveEval + ?Sized> {
    curve: &'a C,
    config: ExtremaConfig,
}

impl<'a, C: CurveEval + ?Sized> PointCurveExtrema<'a, C> {
    pub fn new(curve: &'a C, config: ExtremaConfig) -> Self {
        Self { curve, config }
    }

    pub fn perform(&self, p: &Point3d, mode: ExtremaMode) -> Extrema<Point3d, PointOnCurve> {
        let (a, b) = (self.curve.first_parameter(), self.curve.last_parameter());
        if let Some(line) = self.curve.as_line() {
            let mut result = Extrema::done();
            let t = line.parameter_of(p);
            if mode.wants_min() && t >= a - self.config.param_tolerance && t <= b + self.config.param_tolerance {
                let on = PointOnCurve { param: t, point: line.evaluate(t) };
                result.push_unique(Extremum::new(*p, on, true), &self.config);
            }
            return result;
        }
        if !a.is_finite() || !b.is_finite() || a > b {
            return Extrema::failed(Status::InvalidInput);
        }

        let slope = DistanceSlope { curve: self.curve, point: *p };
        let search = RootSearchConfig {
            nb_samples: self.config.curve_samples,
            solver: self.config.solver,
        };

        // A point on the axis of a circle is equidistant from all of it.
        let scale = self.curve.d1(a).1.length_squared().max(1.0);
        let flat = samples(a, b, search.nb_samples).into_iter().all(|t| {
            slope
                .value(t)
                .is_ok_and(|f| f.abs() <= self.config.tolerance * self.config.tolerance * scale)
        });
        if flat {
            return Extrema::parallel(self.curve.d0(a).distance_squared_to(p));
        }

        let roots = find_roots(&slope, a, b, &search);
        if !roots.is_done() {
            debug!(status = ?roots.status, "point-curve root search failed");
            return Extrema::failed(roots.status);
        }

        let mut result = Extrema::done();
        for t in roots.roots {
            let Ok((_, df)) = slope.values(t) else {
                continue;
            };
            let is_min = df > 0.0;
            if (is_min && !mode.wants_min()) || (!is_min && !mode.wants_max()) || df == 0.0 {
                continue;
            }
            let on = PointOnCurve { param: t, point: self.curve.d0(t) };
            result.push_unique(Extremum::new(*p, on, is_min), &self.config);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::curves::{Circle3d, Curve, Ellipse3d, Line3d, TrimmedCurve};
    use crate::geometry::vector::Vec3;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn test_point_outside_circle() {
        let circle = Curve::Circle(Circle3d::with_axes(Point3d::ORIGIN, Vec3::Z, Vec3::X, 2.0));
        let solver = PointCurveExtrema::new(&circle, ExtremaConfig::default());
        let ext = solver.perform(&Point3d::new(5.0, 0.0, 0.0), ExtremaMode::MinMax);
        assert!(ext.is_done());
        assert_eq!(ext.nb_ext(), 2);
        let min = ext.solutions.iter().find(|s| s.is_min).unwrap();
        let max = ext.solutions.iter().find(|s| !s.is_min).unwrap();
        assert!((min.square_distance - 9.0).abs() < 1e-9);
        assert!((max.square_distance - 49.0).abs() < 1e-9);
        assert!((max.second.param - PI).abs() < 1e-7);
    }

    #[test]
    fn test_seam_duplicates_are_merged() {
        let circle = Curve::Circle(Circle3d::with_axes(Point3d::ORIGIN, Vec3::Z, Vec3::X, 1.0));
        let solver = PointCurveExtrema::new(&circle, ExtremaConfig::default());
        let ext = solver.perform(&Point3d::new(3.0, 0.0, 0.0), ExtremaMode::Min);
        assert_eq!(ext.nb_ext(), 1);
        assert!((ext.solutions[0].square_distance - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_on_circle_axis_is_parallel() {
        let circle = Curve::Circle(Circle3d::with_axes(Point3d::ORIGIN, Vec3::Z, Vec3::X, 1.0));
        let solver = PointCurveExtrema::new(&circle, ExtremaConfig::default());
        let ext = solver.perform(&Point3d::new(0.0, 0.0, 1.0), ExtremaMode::Min);
        assert!(ext.is_parallel);
        assert!((ext.parallel_square_distance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_ellipse_has_four_extrema_from_center() {
        let ellipse = Curve::Ellipse(Ellipse3d::new(Point3d::ORIGIN, Vec3::Z, Vec3::X, 3.0, 1.0));
        let solver = PointCurveExtrema::new(&ellipse, ExtremaConfig::default());
        let ext = solver.perform(&Point3d::new(0.0, 0.0, 0.0), ExtremaMode::MinMax);
        assert_eq!(ext.nb_ext(), 4);
        let mins: Vec<f64> = ext.solutions.iter().filter(|s| s.is_min).map(|s| s.square_distance).collect();
        assert_eq!(mins.len(), 2);
        assert!(mins.iter().all(|d| (d - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_trimmed_arc_drops_outside_roots() {
        let circle = Curve::Circle(Circle3d::with_axes(Point3d::ORIGIN, Vec3::Z, Vec3::X, 1.0));
        let arc = TrimmedCurve::new(&circle, 0.5, 0.5 * TAU);
        let solver = PointCurveExtrema::new(&arc, ExtremaConfig::default());
        // The closest point (t = 0) lies outside the arc; the farthest (t = pi) inside.
        let ext = solver.perform(&Point3d::new(4.0, 0.0, 0.0), ExtremaMode::MinMax);
        assert_eq!(ext.nb_ext(), 1);
        assert!(!ext.solutions[0].is_min);
    }

    #[test]
    fn test_line_projection() {
        let line = Curve::Line(Line3d::new(Point3d::ORIGIN, Vec3::X));
        let edge = TrimmedCurve::new(&line, 0.0, 2.0);
        let solver = PointCurveExtrema::new(&edge, ExtremaConfig::default());
        let ext = solver.perform(&Point3d::new(1.5, 2.0, 0.0), ExtremaMode::Min);
        assert_eq!(ext.nb_ext(), 1);
        assert!((ext.solutions[0].second.param - 1.5).abs() < 1e-12);
        assert_eq!(solver.perform(&Point3d::new(3.5, 2.0, 0.0), ExtremaMode::Min).nb_ext(), 0);
    }
}
