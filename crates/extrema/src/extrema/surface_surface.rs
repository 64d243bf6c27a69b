//! Surface vs surface.
//!
//! Plane/plane and plane/sphere pairs are closed form. The general case
//! matches every sample of the first surface with its nearest and farthest
//! sample on the second, seeds a 4-variable Newton iteration from the local
//! extrema of that matched distance over the first grid, and classifies each
//! converged point by the Hessian.

use nalgebra::{Matrix4, Vector4};
use tracing::debug;

use cad_roots::{newton_symmetric, EvalError, Status, SymmetricSystem};

use crate::geometry::point::Point3d;
use crate::traits::SurfaceEval;

use super::canonical;
use super::curve_curve::neighbors;
use super::types::*;

struct SurfaceSurfaceSystem<'a, S1: ?Sized, S2: ?Sized> {
    s1: &'a S1,
    s2: &'a S2,
}

impl<S1: SurfaceEval + ?Sized, S2: SurfaceEval + ?Sized> SymmetricSystem<4> for SurfaceSurfaceSystem<'_, S1, S2> {
    fn values(&self, x: &Vector4<f64>) -> Result<(Vector4<f64>, Matrix4<f64>), EvalError> {
        let a = self.s1.d2(x[0], x[1]);
        let b = self.s2.d2(x[2], x[3]);
        let d = a.point - b.point;
        let g = Vector4::new(d.dot(&a.du), d.dot(&a.dv), -d.dot(&b.du), -d.dot(&b.dv));

        let h11 = a.du.length_squared() + d.dot(&a.duu);
        let h12 = a.du.dot(&a.dv) + d.dot(&a.duv);
        let h22 = a.dv.length_squared() + d.dot(&a.dvv);
        let h13 = -a.du.dot(&b.du);
        let h14 = -a.du.dot(&b.dv);
        let h23 = -a.dv.dot(&b.du);
        let h24 = -a.dv.dot(&b.dv);
        let h33 = b.du.length_squared() - d.dot(&b.duu);
        let h34 = b.du.dot(&b.dv) - d.dot(&b.duv);
        let h44 = b.dv.length_squared() - d.dot(&b.dvv);
        #[rustfmt::skip]
        let h = Matrix4::new(
            h11, h12, h13, h14,
            h12, h22, h23, h24,
            h13, h23, h33, h34,
            h14, h24, h34, h44,
        );
        Ok((g, h))
    }
}

struct SampledSurface {
    us: Vec<f64>,
    vs: Vec<f64>,
    points: Vec<Point3d>,
}

impl SampledSurface {
    fn new<S: SurfaceEval + ?Sized>(surface: &S, n: usize) -> Self {
        let domain = surface.bounds();
        let us = samples(domain.u_min, domain.u_max, n);
        let vs = samples(domain.v_min, domain.v_max, n);
        let points = us
            .iter()
            .flat_map(|&u| vs.iter().map(move |&v| (u, v)))
            .map(|(u, v)| surface.d0(u, v))
            .collect();
        Self { us, vs, points }
    }

    fn uv(&self, k: usize) -> (f64, f64) {
        let m = self.vs.len();
        (self.us[k / m], self.vs[k % m])
    }
}

pub fn surface_surface<S1: SurfaceEval + ?Sized, S2: SurfaceEval + ?Sized>(
    s1: &S1,
    s2: &S2,
    mode: ExtremaMode,
    config: &ExtremaConfig,
) -> Extrema<PointOnSurface, PointOnSurface> {
    let (dom1, dom2) = (s1.bounds(), s2.bounds());
    match (s1.as_plane(), s2.as_plane(), s1.as_sphere(), s2.as_sphere()) {
        (Some(p1), Some(p2), _, _) => return canonical::plane_plane(&p1, &p2),
        (Some(p), None, _, Some(s)) => return canonical::plane_sphere(&p, &dom1, &s, &dom2, mode, config),
        (None, Some(p), Some(s), _) => {
            return canonical::plane_sphere(&p, &dom2, &s, &dom1, mode, config).swapped();
        }
        _ => {}
    }
    if !dom1.is_finite() || !dom2.is_finite() {
        return Extrema::failed(Status::InvalidInput);
    }

    let n = config.surface_samples;
    let g1 = SampledSurface::new(s1, n);
    let g2 = SampledSurface::new(s2, n);

    // Nearest and farthest sample of the second grid for every sample of the first.
    let matched: Vec<((f64, usize), (f64, usize))> = g1
        .points
        .iter()
        .map(|p| {
            g2.points.iter().enumerate().fold(
                ((f64::INFINITY, 0), (f64::NEG_INFINITY, 0)),
                |(near, far), (k, q)| {
                    let d = p.distance_squared_to(q);
                    (
                        if d < near.0 { (d, k) } else { near },
                        if d > far.0 { (d, k) } else { far },
                    )
                },
            )
        })
        .collect();

    let (rows, cols) = (g1.us.len(), g1.vs.len());
    let mut starts = Vec::new();
    for i in 0..rows {
        for j in 0..cols {
            let (near, far) = matched[i * cols + j];
            let (mut is_min, mut is_max) = (true, true);
            for (ii, jj) in neighbors(i, j, rows, cols) {
                let (other_near, other_far) = matched[ii * cols + jj];
                is_min &= near.0 <= other_near.0;
                is_max &= far.0 >= other_far.0;
            }
            let (u1, v1) = (g1.us[i], g1.vs[j]);
            if is_min && mode.wants_min() {
                let (u2, v2) = g2.uv(near.1);
                starts.push(Vector4::new(u1, v1, u2, v2));
            }
            if is_max && mode.wants_max() {
                let (u2, v2) = g2.uv(far.1);
                starts.push(Vector4::new(u1, v1, u2, v2));
            }
        }
    }

    let period1 = s1.is_u_periodic().then(|| dom1.u_max - dom1.u_min);
    let period2 = s2.is_u_periodic().then(|| dom2.u_max - dom2.u_min);
    let (lo1, hi1) = newton_bounds(&dom1, period1);
    let (lo2, hi2) = newton_bounds(&dom2, period2);
    let lower = Vector4::new(lo1[0], lo1[1], lo2[0], lo2[1]);
    let upper = Vector4::new(hi1[0], hi1[1], hi2[0], hi2[1]);

    let system = SurfaceSurfaceSystem { s1, s2 };
    let mut result = Extrema::done();
    for start in starts {
        let r = newton_symmetric(&system, start, lower, upper, &config.solver);
        if !r.is_done() {
            debug!(u1 = start[0], v1 = start[1], status = ?r.status, "surface-surface start discarded");
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
        let u1 = period1.map_or(r.point[0], |p| wrap_periodic(r.point[0], dom1.u_min, p));
        let u2 = period2.map_or(r.point[2], |p| wrap_periodic(r.point[2], dom2.u_min, p));
        let (v1, v2) = (r.point[1], r.point[3]);
        let a = PointOnSurface { u: u1, v: v1, point: s1.d0(u1, v1) };
        let b = PointOnSurface { u: u2, v: v2, point: s2.d0(u2, v2) };
        result.push_unique(Extremum::new(a, b, is_min), config);
    }
    result
}
