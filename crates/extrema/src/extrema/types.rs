use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};

use cad_roots::{SolverConfig, Status};

use crate::geometry::point::Point3d;
use crate::geometry::surfaces::UvBox;

// ─── Configuration ──────────────────────────────────────────────────────────

/// Which extrema a query should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExtremaMode {
    #[default]
    Min,
    Max,
    MinMax,
}

impl ExtremaMode {
    pub fn wants_min(&self) -> bool {
        matches!(self, ExtremaMode::Min | ExtremaMode::MinMax)
    }

    pub fn wants_max(&self) -> bool {
        matches!(self, ExtremaMode::Max | ExtremaMode::MinMax)
    }
}

/// Search strategy for point-vs-surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtremaAlgo {
    /// Refine every local extremum of the sampled distance field.
    #[default]
    Grid,
    /// Let a sphere hierarchy pick the nearest and farthest cells.
    Tree,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExtremaConfig {
    /// Points closer than this are the same point.
    pub tolerance: f64,
    /// Parameters closer than this are the same parameter.
    pub param_tolerance: f64,
    /// Sub-intervals sampled along a curve.
    pub curve_samples: usize,
    /// Sub-intervals sampled along each surface direction.
    pub surface_samples: usize,
    pub algo: ExtremaAlgo,
    pub solver: SolverConfig,
}

impl Default for ExtremaConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-7,
            param_tolerance: 1e-9,
            curve_samples: 32,
            surface_samples: 20,
            algo: ExtremaAlgo::Grid,
            solver: SolverConfig::default(),
        }
    }
}

// ─── Solution types ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointOnCurve {
    pub param: f64,
    pub point: Point3d,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointOnSurface {
    pub u: f64,
    pub v: f64,
    pub point: Point3d,
}

/// One side of an extremum.
pub trait Located: Copy {
    fn point(&self) -> Point3d;
}

impl Located for Point3d {
    fn point(&self) -> Point3d {
        *self
    }
}

impl Located for PointOnCurve {
    fn point(&self) -> Point3d {
        self.point
    }
}

impl Located for PointOnSurface {
    fn point(&self) -> Point3d {
        self.point
    }
}

/// A local extremum of the distance between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extremum<A, B> {
    pub first: A,
    pub second: B,
    pub square_distance: f64,
    pub is_min: bool,
}

impl<A: Located, B: Located> Extremum<A, B> {
    pub fn new(first: A, second: B, is_min: bool) -> Self {
        Self {
            first,
            second,
            square_distance: first.point().distance_squared_to(&second.point()),
            is_min,
        }
    }

    pub fn distance(&self) -> f64 {
        self.square_distance.sqrt()
    }

    /// The same extremum seen from the other entity.
    pub fn swapped(self) -> Extremum<B, A> {
        Extremum {
            first: self.second,
            second: self.first,
            square_distance: self.square_distance,
            is_min: self.is_min,
        }
    }

    /// Same kind and same points on both sides. Parameters are not compared:
    /// across the seam of a periodic entity one point has two parameters.
    pub fn is_duplicate_of(&self, other: &Self, tolerance: f64) -> bool {
        self.is_min == other.is_min
            && self.first.point().distance_to(&other.first.point()) <= tolerance
            && self.second.point().distance_to(&other.second.point()) <= tolerance
    }
}

pub type PointCurveExtremum = Extremum<Point3d, PointOnCurve>;
pub type PointSurfaceExtremum = Extremum<Point3d, PointOnSurface>;
pub type CurveCurveExtremum = Extremum<PointOnCurve, PointOnCurve>;
pub type CurveSurfaceExtremum = Extremum<PointOnCurve, PointOnSurface>;
pub type SurfaceSurfaceExtremum = Extremum<PointOnSurface, PointOnSurface>;

/// Outcome of an extrema query between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extrema<A, B> {
    pub status: Status,
    /// Infinitely many extrema at a constant distance (parallel lines,
    /// point at the center of a sphere, ...); `solutions` is then empty.
    pub is_parallel: bool,
    /// Squared distance of the parallel configuration.
    pub parallel_square_distance: f64,
    pub solutions: Vec<Extremum<A, B>>,
}

impl<A: Located, B: Located> Extrema<A, B> {
    pub fn done() -> Self {
        Self {
            status: Status::Done,
            is_parallel: false,
            parallel_square_distance: f64::NAN,
            solutions: Vec::new(),
        }
    }

    pub fn failed(status: Status) -> Self {
        Self { status, ..Self::done() }
    }

    pub fn parallel(square_distance: f64) -> Self {
        Self {
            is_parallel: true,
            parallel_square_distance: square_distance,
            ..Self::done()
        }
    }

    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    pub fn nb_ext(&self) -> usize {
        self.solutions.len()
    }

    pub fn square_distance(&self, index: usize) -> Option<f64> {
        self.solutions.get(index).map(|s| s.square_distance)
    }

    pub fn is_min(&self, index: usize) -> Option<bool> {
        self.solutions.get(index).map(|s| s.is_min)
    }

    pub fn point(&self, index: usize) -> Option<&Extremum<A, B>> {
        self.solutions.get(index)
    }

    /// Append `ext` unless an equivalent solution is already present.
    pub fn push_unique(&mut self, ext: Extremum<A, B>, config: &ExtremaConfig) -> bool {
        if !ext.square_distance.is_finite()
            || self
                .solutions
                .iter()
                .any(|s| s.is_duplicate_of(&ext, config.tolerance))
        {
            return false;
        }
        self.solutions.push(ext);
        true
    }

    /// The same result with the roles of the two entities exchanged.
    pub fn swapped(self) -> Extrema<B, A> {
        Extrema {
            status: self.status,
            is_parallel: self.is_parallel,
            parallel_square_distance: self.parallel_square_distance,
            solutions: self.solutions.into_iter().map(Extremum::swapped).collect(),
        }
    }
}

// ─── Shared helpers ─────────────────────────────────────────────────────────

/// Min (`Some(true)`), max (`Some(false)`) or neither, from the definiteness
/// of a symmetric Hessian.
pub fn classify_hessian<const N: usize>(h: SMatrix<f64, N, N>) -> Option<bool> {
    if h.cholesky().is_some() {
        Some(true)
    } else if (-h).cholesky().is_some() {
        Some(false)
    } else {
        None
    }
}

/// Parameter `value` folded into `[lo, lo + period)` when the direction is periodic.
pub fn wrap_periodic(value: f64, lo: f64, period: f64) -> f64 {
    if period > 0.0 {
        lo + (value - lo).rem_euclid(period)
    } else {
        value
    }
}

/// `n + 1` evenly spaced samples of `[a, b]`.
pub fn samples(a: f64, b: f64, n: usize) -> Vec<f64> {
    let n = n.max(1);
    (0..=n).map(|i| a + (b - a) * (i as f64 / n as f64)).collect()
}

/// Parameter domain widened by half a period on periodic full-turn directions,
/// so a Newton step can cross the seam.
pub fn newton_bounds(domain: &UvBox, u_period: Option<f64>) -> ([f64; 2], [f64; 2]) {
    match u_period {
        Some(p) => (
            [domain.u_min - 0.5 * p, domain.v_min],
            [domain.u_max + 0.5 * p, domain.v_max],
        ),
        None => ([domain.u_min, domain.v_min], [domain.u_max, domain.v_max]),
    }
}
