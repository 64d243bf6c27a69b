//! Curve vs surface.
//!
//! Recognized pairs (line vs sphere, line vs plane) are answered in closed
//! form. Otherwise the curve is sampled; each sample is matched against the
//! surface sample grid, node by node ([`ExtremaAlgo::Grid`]) or through the
//! cell-sphere hierarchy ([`ExtremaAlgo::Tree`]). The samples where the
//! matched distance is locally smallest (or largest) seed a 3-variable Newton
//! iteration on the gradient of `|C(t) - S(u, v)|^2 / 2`.

use nalgebra::{Matrix3, Vector3};
use tracing::debug;

use cad_roots::{newton_symmetric, EvalError, Status, SymmetricSystem};

use crate::geometry::point::Point3d;
use crate::spatial::sphere_tree::SphereTree;
use crate::traits::{CurveEval, SurfaceEval};

use super::canonical;
use super::point_surface::Grid;
use super::types::*;

/// Squared distance to a surface sample and its parameters.
type Match = (f64, [f64; 2]);

struct CurveSurfaceSystem<'a, C: ?Sized, S: ?Sized> {
    curve: &'a C,
    surface: &'a S,
}

impl<C: CurveEval + ?Sized, S: SurfaceEval + ?Sized> SymmetricSystem<3> for CurveSurfaceSystem<'_, C, S> {
    fn values(&self, x: &Vector3<f64>) -> Result<(Vector3<f64>, Matrix3<f64>), EvalError> {
        let (c, c1, c2) = self.curve.d2(x[0]);
        let s = self.surface.d2(x[1], x[2]);
        let d = c - s.point;
        let g = Vector3::new(d.dot(&c1), -d.dot(&s.du), -d.dot(&s.dv));
        let h_tt = c1.length_squared() + d.dot(&c2);
        let h_tu = -c1.dot(&s.du);
        let h_tv = -c1.dot(&s.dv);
        let h_uu = s.du.length_squared() - d.dot(&s.duu);
        let h_uv = s.du.dot(&s.dv) - d.dot(&s.duv);
        let h_vv = s.dv.length_squared() - d.dot(&s.dvv);
        #[rustfmt::skip]
        let h = Matrix3::new(
            h_tt, h_tu, h_tv,
            h_tu, h_uu, h_uv,
            h_tv, h_uv, h_vv,
        );
        Ok((g, h))
    }
}

pub fn curve_surface<C: CurveEval + ?Sized, S: SurfaceEval + ?Sized>(
    curve: &C,
    surface: &S,
    mode: ExtremaMode,
    config: &ExtremaConfig,
) -> Extrema<PointOnCurve, PointOnSurface> {
    let range = (curve.first_parameter(), curve.last_parameter());
    let domain = surface.bounds();
    if let Some(line) = curve.as_line() {
        if let Some(sphere) = surface.as_sphere() {
            return canonical::line_sphere(&line, range, &sphere, &domain, mode, config);
        }
        if let Some(plane) = surface.as_plane() {
            return canonical::line_plane(&line, range, &plane, &domain, mode, config);
        }
    }
    if !domain.is_finite() {
        return Extrema::failed(Status::InvalidInput);
    }

    let grid = Grid::sample(surface, &domain, config.surface_samples);

    let range = if range.0.is_finite() && range.1.is_finite() {
        range
    } else if let Some(line) = curve.as_line() {
        let ts: Vec<f64> = grid.points.iter().map(|p| line.parameter_of(p)).collect();
        let lo = ts.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = ts.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let pad = (hi - lo).max(1.0);
        (lo - pad, hi + pad)
    } else {
        return Extrema::failed(Status::InvalidInput);
    };

    // Per curve sample: nearest and farthest surface sample.
    let tree = (config.algo == ExtremaAlgo::Tree).then(|| grid.cell_tree(surface));
    let ts = samples(range.0, range.1, config.curve_samples);
    let matched: Vec<(Match, Match)> = ts
        .iter()
        .map(|&t| {
            let c = curve.d0(t);
            tree.as_ref()
                .and_then(|tree| match_cells(&grid, tree, surface, &c))
                .unwrap_or_else(|| match_nodes(&grid, &c))
        })
        .collect();

    let mut starts = Vec::new();
    for i in 0..ts.len() {
        let prev = i.checked_sub(1).map(|k| matched[k]);
        let next = matched.get(i + 1).copied();
        let (near, far) = matched[i];
        let local_min = prev.is_none_or(|p| near.0 <= p.0.0) && next.is_none_or(|n| near.0 <= n.0.0);
        let local_max = prev.is_none_or(|p| far.0 >= p.1.0) && next.is_none_or(|n| far.0 >= n.1.0);
        if local_min && mode.wants_min() {
            starts.push(Vector3::new(ts[i], near.1[0], near.1[1]));
        }
        if local_max && mode.wants_max() {
            starts.push(Vector3::new(ts[i], far.1[0], far.1[1]));
        }
    }

    let u_period = surface.is_u_periodic().then(|| domain.u_max - domain.u_min);
    let ([u_lo, v_lo], [u_hi, v_hi]) = newton_bounds(&domain, u_period);
    let lower = Vector3::new(range.0, u_lo, v_lo);
    let upper = Vector3::new(range.1, u_hi, v_hi);

    let system = CurveSurfaceSystem { curve, surface };
    let mut result = Extrema::done();
    for start in starts {
        let r = newton_symmetric(&system, start, lower, upper, &config.solver);
        if !r.is_done() {
            debug!(t = start[0], status = ?r.status, "curve-surface start discarded");
            continue;
        }
        let Ok((_, h)) = system.values(&r.point) else {
            continue;
        };
        let Some(is_min) = classify_hessian(h) else {
            continue;
        };
        if (is_min && !mode.wants_min()) || (!is_min && !mode.wants_max()) {
            continue;
        }
        let t = r.point[0];
        let u = u_period.map_or(r.point[1], |p| wrap_periodic(r.point[1], domain.u_min, p));
        let v = r.point[2];
        let on_curve = PointOnCurve { param: t, point: curve.d0(t) };
        let on_surface = PointOnSurface { u, v, point: surface.d0(u, v) };
        result.push_unique(Extremum::new(on_curve, on_surface, is_min), config);
    }
    result
}

fn match_nodes(grid: &Grid, c: &Point3d) -> (Match, Match) {
    let mut near = (f64::INFINITY, [0.0; 2]);
    let mut far = (f64::NEG_INFINITY, [0.0; 2]);
    for (k, p) in grid.points.iter().enumerate() {
        let d = c.distance_squared_to(p);
        if d < near.0 {
            near = (d, grid.node_uv(k));
        }
        if d > far.0 {
            far = (d, grid.node_uv(k));
        }
    }
    (near, far)
}

/// Nearest and farthest cells by their bounding spheres, measured at the cell centers.
fn match_cells<S: SurfaceEval + ?Sized>(
    grid: &Grid,
    tree: &SphereTree,
    surface: &S,
    c: &Point3d,
) -> Option<(Match, Match)> {
    let at = |cell: usize| {
        let [u, v] = grid.cell_center(cell);
        (c.distance_squared_to(&surface.d0(u, v)), [u, v])
    };
    Some((at(tree.nearest(c)?), at(tree.farthest(c)?)))
}
