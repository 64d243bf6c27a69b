//! Point vs surface.
//!
//! The surface domain is sampled once on construction. A query seeds 2D
//! Newton iterations on the gradient of `|S(u, v) - P|^2 / 2` either from
//! every local extremum of the sampled field ([`ExtremaAlgo::Grid`]) or from
//! the cells a sphere hierarchy picks as nearest and farthest
//! ([`ExtremaAlgo::Tree`]).

use nalgebra::Matrix2;
use tracing::debug;

use cad_roots::{newton_2d_symmetric, EvalError, Status, SymmetricSystem2};

use crate::geometry::point::Point3d;
use crate::geometry::surfaces::UvBox;
use crate::spatial::sphere_tree::{BoundingSphere, SphereTree};
use crate::traits::SurfaceEval;

use super::canonical;
use super::types::*;

struct PointSurfaceSystem<'a, S: ?Sized> {
    surface: &'a S,
    point: Point3d,
}

impl<S: SurfaceEval + ?Sized> SymmetricSystem2 for PointSurfaceSystem<'_, S> {
    fn values(&self, x: [f64; 2]) -> Result<([f64; 2], [f64; 3]), EvalError> {
        let s = self.surface.d2(x[0], x[1]);
        let d = s.point - self.point;
        Ok((
            [d.dot(&s.du), d.dot(&s.dv)],
            [
                s.du.length_squared() + d.dot(&s.duu),
                s.du.dot(&s.dv) + d.dot(&s.duv),
                s.dv.length_squared() + d.dot(&s.dvv),
            ],
        ))
    }
}

/// Sampled (u, v) grid of a surface.
#[derive(Debug, Clone)]
pub(super) struct Grid {
    pub(super) us: Vec<f64>,
    pub(super) vs: Vec<f64>,
    /// Node `(i, j)` at `i * vs.len() + j`.
    pub(super) points: Vec<Point3d>,
}

impl Grid {
    pub(super) fn sample<S: SurfaceEval + ?Sized>(surface: &S, domain: &UvBox, n: usize) -> Self {
        let us = samples(domain.u_min, domain.u_max, n);
        let vs = samples(domain.v_min, domain.v_max, n);
        let points = us
            .iter()
            .flat_map(|&u| vs.iter().map(move |&v| (u, v)))
            .map(|(u, v)| surface.d0(u, v))
            .collect();
        Self { us, vs, points }
    }

    fn at(&self, i: usize, j: usize) -> Point3d {
        self.points[i * self.vs.len() + j]
    }

    /// Parameters of node `k`.
    pub(super) fn node_uv(&self, k: usize) -> [f64; 2] {
        let nv = self.vs.len();
        [self.us[k / nv], self.vs[k % nv]]
    }

    /// Row and column of cell `c`.
    fn cell(&self, c: usize) -> (usize, usize) {
        let nv = self.vs.len() - 1;
        (c / nv, c % nv)
    }

    /// Parameters at the middle of cell `c`.
    pub(super) fn cell_center(&self, c: usize) -> [f64; 2] {
        let (i, j) = self.cell(c);
        [0.5 * (self.us[i] + self.us[i + 1]), 0.5 * (self.vs[j] + self.vs[j + 1])]
    }

    /// One bounding sphere per cell, cell `(i, j)` at `i * (nv - 1) + j`.
    pub(super) fn cell_tree<S: SurfaceEval + ?Sized>(&self, surface: &S) -> SphereTree {
        let (nu, nv) = (self.us.len(), self.vs.len());
        let mut cells = Vec::with_capacity((nu - 1) * (nv - 1));
        for c in 0..(nu - 1) * (nv - 1) {
            let (i, j) = self.cell(c);
            let [u, v] = self.cell_center(c);
            let corners = [self.at(i, j), self.at(i + 1, j), self.at(i, j + 1), self.at(i + 1, j + 1)];
            cells.push(BoundingSphere::around(surface.d0(u, v), &corners));
        }
        SphereTree::build(&cells)
    }

    /// Newton bracket of cell `(i, j)`: its corners padded by one cell, kept
    /// inside `domain` except across a periodic u seam.
    fn cell_bounds(&self, i: usize, j: usize, domain: &UvBox, u_periodic: bool) -> ([f64; 2], [f64; 2]) {
        let du = self.us[i + 1] - self.us[i];
        let dv = self.vs[j + 1] - self.vs[j];
        let (mut u_lo, mut u_hi) = (self.us[i] - du, self.us[i + 1] + du);
        if !u_periodic {
            u_lo = u_lo.max(domain.u_min);
            u_hi = u_hi.min(domain.u_max);
        }
        let v_lo = (self.vs[j] - dv).max(domain.v_min);
        let v_hi = (self.vs[j + 1] + dv).min(domain.v_max);
        ([u_lo, v_lo], [u_hi, v_hi])
    }
}

/// Extrema between points and one borrowed surface.
pub struct PointSurfaceExtrema<'a, S: SurfaceEval + ?Sized> {
    surface: &'a S,
    config: ExtremaConfig,
    domain: UvBox,
    u_period: Option<f64>,
    grid: Option<Grid>,
    tree: Option<SphereTree>,
}

impl<'a, S: SurfaceEval + ?Sized> PointSurfaceExtrema<'a, S> {
    pub fn new(surface: &'a S, config: ExtremaConfig) -> Self {
        let domain = surface.bounds();
        let u_period = surface.is_u_periodic().then(|| domain.u_max - domain.u_min);
        let canonical = surface.as_plane().is_some() || surface.as_sphere().is_some();
        let grid = (!canonical && domain.is_finite()).then(|| Grid::sample(surface, &domain, config.surface_samples));
        let tree = match (&grid, config.algo) {
            (Some(grid), ExtremaAlgo::Tree) => Some(grid.cell_tree(surface)),
            _ => None,
        };
        Self {
            surface,
            config,
            domain,
            u_period,
            grid,
            tree,
        }
    }

    pub fn perform(&self, p: &Point3d, mode: ExtremaMode) -> Extrema<Point3d, PointOnSurface> {
        if let Some(sphere) = self.surface.as_sphere() {
            return canonical::point_sphere(p, &sphere, &self.domain, mode, &self.config);
        }
        if let Some(plane) = self.surface.as_plane() {
            return canonical::point_plane(p, &plane, &self.domain, mode, &self.config);
        }
        let Some(grid) = &self.grid else {
            return Extrema::failed(Status::InvalidInput);
        };

        // Each start carries its own Newton bracket.
        let mut starts: Vec<([f64; 2], bool, [f64; 2], [f64; 2])> = Vec::new();
        match &self.tree {
            Some(tree) => {
                let seed = |c: usize, is_min: bool| {
                    let (i, j) = grid.cell(c);
                    let (lower, upper) = grid.cell_bounds(i, j, &self.domain, self.u_period.is_some());
                    (grid.cell_center(c), is_min, lower, upper)
                };
                if mode.wants_min() {
                    starts.extend(tree.nearest(p).map(|c| seed(c, true)));
                }
                if mode.wants_max() {
                    starts.extend(tree.farthest(p).map(|c| seed(c, false)));
                }
            }
            None => {
                let (lower, upper) = newton_bounds(&self.domain, self.u_period);
                starts = self
                    .grid_extrema(grid, p, mode)
                    .into_iter()
                    .map(|(start, is_min)| (start, is_min, lower, upper))
                    .collect();
            }
        }

        let system = PointSurfaceSystem { surface: self.surface, point: *p };
        let mut result = Extrema::done();
        for (start, seeded_min, lower, upper) in starts {
            let r = newton_2d_symmetric(&system, start, lower, upper, &self.config.solver);
            if !r.is_done() {
                debug!(u = start[0], v = start[1], status = ?r.status, "point-surface refinement discarded");
                continue;
            }
            let Ok((_, [h11, h12, h22])) = system.values(r.point) else {
                continue;
            };
            let Some(is_min) = classify_hessian(Matrix2::new(h11, h12, h12, h22)) else {
                continue;
            };
            if is_min != seeded_min && !(mode.wants_min() && mode.wants_max()) {
                continue;
            }
            let u = match self.u_period {
                Some(period) => wrap_periodic(r.point[0], self.domain.u_min, period),
                None => r.point[0],
            };
            let v = r.point[1];
            let on = PointOnSurface { u, v, point: self.surface.d0(u, v) };
            result.push_unique(Extremum::new(*p, on, is_min), &self.config);
        }
        result
    }

    /// Grid nodes whose squared distance is a local min (or max) among their neighbors.
    fn grid_extrema(&self, grid: &Grid, p: &Point3d, mode: ExtremaMode) -> Vec<([f64; 2], bool)> {
        let (nu, nv) = (grid.us.len(), grid.vs.len());
        // On a full periodic turn the last column repeats the first.
        let cols = if self.u_period.is_some() { nu - 1 } else { nu };
        let dist = |i: usize, j: usize| grid.at(i, j).distance_squared_to(p);

        let mut starts = Vec::new();
        for i in 0..cols {
            for j in 0..nv {
                let d = dist(i, j);
                let (mut is_min, mut is_max) = (true, true);
                for di in [-1i64, 0, 1] {
                    for dj in [-1i64, 0, 1] {
                        if di == 0 && dj == 0 {
                            continue;
                        }
                        let jj = j as i64 + dj;
                        if jj < 0 || jj >= nv as i64 {
                            continue;
                        }
                        let ii = i as i64 + di;
                        let ii = if self.u_period.is_some() {
                            ii.rem_euclid(cols as i64)
                        } else if ii < 0 || ii >= nu as i64 {
                            continue;
                        } else {
                            ii
                        };
                        let other = dist(ii as usize, jj as usize);
                        is_min &= d <= other;
                        is_max &= d >= other;
                    }
                }
                if is_min && mode.wants_min() {
                    starts.push(([grid.us[i], grid.vs[j]], true));
                }
                if is_max && mode.wants_max() {
                    starts.push(([grid.us[i], grid.vs[j]], false));
                }
            }
        }
        starts
    }
}
