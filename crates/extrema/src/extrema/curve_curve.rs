//! Curve vs curve.
//!
//! The gradient of `|C1(t1) - C2(t2)|^2 / 2` is a symmetric 2x2 system.
//! Newton is started from every local extremum of the sampled distance over
//! the `(t1, t2)` rectangle, so several extrema can be recovered.

use nalgebra::Matrix2;
use tracing::debug;

use cad_roots::{newton_2d_symmetric, EvalError, Status, SymmetricSystem2};

use crate::geometry::curves::Line3d;
use crate::geometry::point::Point3d;
use crate::traits::CurveEval;

use super::types::*;

struct CurveCurveSystem<'a, C1: ?Sized, C2: ?Sized> {
    c1: &'a C1,
    c2: &'a C2,
}

impl<C1: CurveEval + ?Sized, C2: CurveEval + ?Sized> SymmetricSystem2 for CurveCurveSystem<'_, C1, C2> {
    fn values(&self, x: [f64; 2]) -> Result<([f64; 2], [f64; 3]), EvalError> {
        let (p1, d1, dd1) = self.c1.d2(x[0]);
        let (p2, d2, dd2) = self.c2.d2(x[1]);
        let d = p1 - p2;
        Ok((
            [d.dot(&d1), -d.dot(&d2)],
            [d1.length_squared() + d.dot(&dd1), -d1.dot(&d2), d2.length_squared() - d.dot(&dd2)],
        ))
    }
}

/// Closest points of two lines restricted to parameter ranges.
pub fn line_line(
    l1: &Line3d,
    r1: (f64, f64),
    l2: &Line3d,
    r2: (f64, f64),
    config: &ExtremaConfig,
) -> Extrema<PointOnCurve, PointOnCurve> {
    let b = l1.direction.dot(&l2.direction);
    let denom = 1.0 - b * b;
    if denom <= crate::default_tolerance().angular {
        return Extrema::parallel(l2.distance_to_point(&l1.origin).powi(2));
    }
    let w = l1.origin - l2.origin;
    let (dw, ew) = (l1.direction.dot(&w), l2.direction.dot(&w));
    let t1 = (b * ew - dw) / denom;
    let t2 = (ew - b * dw) / denom;

    let mut result = Extrema::done();
    let slack = config.param_tolerance;
    if t1 >= r1.0 - slack && t1 <= r1.1 + slack && t2 >= r2.0 - slack && t2 <= r2.1 + slack {
        let a = PointOnCurve { param: t1, point: l1.evaluate(t1) };
        let c = PointOnCurve { param: t2, point: l2.evaluate(t2) };
        result.push_unique(Extremum::new(a, c, true), config);
    }
    result
}

/// Parameter window of an unbounded line covering the projection of `others`.
fn line_window(line: &Line3d, others: &[Point3d]) -> (f64, f64) {
    let ts: Vec<f64> = others.iter().map(|p| line.parameter_of(p)).collect();
    let lo = ts.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = ts.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let pad = (hi - lo).max(1.0);
    (lo - pad, hi + pad)
}

fn finite_range<C: CurveEval + ?Sized>(curve: &C) -> Option<(f64, f64)> {
    let (a, b) = (curve.first_parameter(), curve.last_parameter());
    (a.is_finite() && b.is_finite() && a <= b).then_some((a, b))
}

pub fn curve_curve<C1: CurveEval + ?Sized, C2: CurveEval + ?Sized>(
    c1: &C1,
    c2: &C2,
    mode: ExtremaMode,
    config: &ExtremaConfig,
) -> Extrema<PointOnCurve, PointOnCurve> {
    let r1 = (c1.first_parameter(), c1.last_parameter());
    let r2 = (c2.first_parameter(), c2.last_parameter());
    if let (Some(l1), Some(l2)) = (c1.as_line(), c2.as_line()) {
        if !mode.wants_min() {
            return Extrema::done();
        }
        return line_line(&l1, r1, &l2, r2, config);
    }

    let n = config.curve_samples;
    let (r1, r2) = match (finite_range(c1), finite_range(c2)) {
        (Some(r1), Some(r2)) => (r1, r2),
        (None, Some(r2)) => match c1.as_line() {
            Some(l1) => {
                let pts: Vec<Point3d> = samples(r2.0, r2.1, n).into_iter().map(|t| c2.d0(t)).collect();
                (line_window(&l1, &pts), r2)
            }
            None => return Extrema::failed(Status::InvalidInput),
        },
        (Some(r1), None) => match c2.as_line() {
            Some(l2) => {
                let pts: Vec<Point3d> = samples(r1.0, r1.1, n).into_iter().map(|t| c1.d0(t)).collect();
                (r1, line_window(&l2, &pts))
            }
            None => return Extrema::failed(Status::InvalidInput),
        },
        (None, None) => return Extrema::failed(Status::InvalidInput),
    };

    let t1s = samples(r1.0, r1.1, n);
    let t2s = samples(r2.0, r2.1, n);
    let p1: Vec<Point3d> = t1s.iter().map(|&t| c1.d0(t)).collect();
    let p2: Vec<Point3d> = t2s.iter().map(|&t| c2.d0(t)).collect();
    let m = t2s.len();
    let dist: Vec<f64> = p1.iter().flat_map(|a| p2.iter().map(move |b| a.distance_squared_to(b))).collect();

    let mut starts = Vec::new();
    for i in 0..t1s.len() {
        for j in 0..m {
            let d = dist[i * m + j];
            let (mut is_min, mut is_max) = (true, true);
            for (ii, jj) in neighbors(i, j, t1s.len(), m) {
                let other = dist[ii * m + jj];
                is_min &= d <= other;
                is_max &= d >= other;
            }
            if (is_min && mode.wants_min()) || (is_max && mode.wants_max()) {
                starts.push([t1s[i], t2s[j]]);
            }
        }
    }

    let system = CurveCurveSystem { c1, c2 };
    let lower = [r1.0, r2.0];
    let upper = [r1.1, r2.1];
    let mut result = Extrema::done();
    for start in starts {
        let r = newton_2d_symmetric(&system, start, lower, upper, &config.solver);
        if !r.is_done() {
            debug!(t1 = start[0], t2 = start[1], status = ?r.status, "curve-curve start discarded");
            continue;
        }
        let Ok((_, [h11, h12, h22])) = system.values(r.point) else {
            continue;
        };
        let Some(is_min) = classify_hessian(Matrix2::new(h11, h12, h12, h22)) else {
            continue;
        };
        if (is_min && !mode.wants_min()) || (!is_min && !mode.wants_max()) {
            continue;
        }
        let [t1, t2] = r.point;
        let a = PointOnCurve { param: t1, point: c1.d0(t1) };
        let b = PointOnCurve { param: t2, point: c2.d0(t2) };
        result.push_unique(Extremum::new(a, b, is_min), config);
    }
    result
}

/// The up-to-eight grid neighbors of `(i, j)` in an `n x m` grid.
pub(crate) fn neighbors(i: usize, j: usize, n: usize, m: usize) -> impl Iterator<Item = (usize, usize)> {
    (-1i64..=1)
        .flat_map(|di| (-1i64..=1).map(move |dj| (di, dj)))
        .filter(|&(di, dj)| di != 0 || dj != 0)
        .filter_map(move |(di, dj)| {
            let (ii, jj) = (i as i64 + di, j as i64 + dj);
            (ii >= 0 && jj >= 0 && ii < n as i64 && jj < m as i64).then_some((ii as usize, jj as usize))
        })
}
