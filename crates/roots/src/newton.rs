use nalgebra::{Const, DimMin, SMatrix, SVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::function::{EvalError, SymmetricSystem2};
use crate::solver::{SolverConfig, Status};

/// Determinants below this (relative to the Hessian scale) are treated as singular.
const SINGULAR_DET: f64 = 1e-20;

// ─── Two-variable symmetric Newton ──────────────────────────────────────────

/// Result of a two-variable Newton run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Newton2dResult {
    pub status: Status,
    pub point: [f64; 2],
    /// Euclidean norm of the gradient at `point`.
    pub f_norm: f64,
    pub iterations: usize,
}

impl Newton2dResult {
    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }
}

/// Newton iteration for `grad(phi) = 0` in two variables.
///
/// The 2x2 step is solved with Cramer's rule. Steps leaving `[lower, upper]`
/// are clamped to the box; a clamped step that no longer moves the iterate
/// ends the run with [`Status::NotConverged`].
pub fn newton_2d_symmetric<S: SymmetricSystem2 + ?Sized>(
    system: &S,
    start: [f64; 2],
    lower: [f64; 2],
    upper: [f64; 2],
    config: &SolverConfig,
) -> Newton2dResult {
    let bounds_ok = (0..2).all(|i| lower[i].is_finite() && upper[i].is_finite() && lower[i] <= upper[i]);
    if !config.is_valid() || !bounds_ok || !start.iter().all(|x| x.is_finite()) {
        return Newton2dResult {
            status: Status::InvalidInput,
            point: start,
            f_norm: f64::NAN,
            iterations: 0,
        };
    }

    let mut x = [
        start[0].clamp(lower[0], upper[0]),
        start[1].clamp(lower[1], upper[1]),
    ];
    let mut f_norm = f64::NAN;

    for iteration in 1..=config.max_iterations {
        let (g, h) = match eval2(system, x) {
            Ok(values) => values,
            Err(_) => {
                return Newton2dResult {
                    status: Status::NumericalError,
                    point: x,
                    f_norm,
                    iterations: iteration,
                };
            }
        };
        f_norm = (g[0] * g[0] + g[1] * g[1]).sqrt();
        if f_norm <= config.f_tolerance {
            return Newton2dResult {
                status: Status::Done,
                point: x,
                f_norm,
                iterations: iteration,
            };
        }

        // [h11 h12; h12 h22] * dx = -g
        let [h11, h12, h22] = h;
        let det = h11 * h22 - h12 * h12;
        let scale = (h11 * h11 + 2.0 * h12 * h12 + h22 * h22).max(f64::MIN_POSITIVE);
        if det.abs() <= SINGULAR_DET * scale {
            return Newton2dResult {
                status: Status::NumericalError,
                point: x,
                f_norm,
                iterations: iteration,
            };
        }
        let dx = [(-g[0] * h22 + g[1] * h12) / det, (-g[1] * h11 + g[0] * h12) / det];

        let next = [
            (x[0] + dx[0]).clamp(lower[0], upper[0]),
            (x[1] + dx[1]).clamp(lower[1], upper[1]),
        ];
        let clamped = next[0] != x[0] + dx[0] || next[1] != x[1] + dx[1];
        let moved = [(next[0] - x[0]).abs(), (next[1] - x[1]).abs()];
        x = next;

        let small = moved[0] < config.x_threshold(x[0]) && moved[1] < config.x_threshold(x[1]);
        if small {
            let status = if clamped { Status::NotConverged } else { Status::Done };
            if let Ok((g, _)) = eval2(system, x) {
                f_norm = (g[0] * g[0] + g[1] * g[1]).sqrt();
            }
            return Newton2dResult {
                status,
                point: x,
                f_norm,
                iterations: iteration,
            };
        }
    }

    debug!(u = x[0], v = x[1], f_norm, "2d newton exhausted its iteration budget");
    Newton2dResult {
        status: Status::MaxIterations,
        point: x,
        f_norm,
        iterations: config.max_iterations,
    }
}

fn eval2<S: SymmetricSystem2 + ?Sized>(system: &S, x: [f64; 2]) -> Result<([f64; 2], [f64; 3]), EvalError> {
    let (g, h) = system.values(x)?;
    if g.iter().chain(h.iter()).all(|v| v.is_finite()) {
        Ok((g, h))
    } else {
        Err(EvalError::NonFinite { at: x.to_vec() })
    }
}

// ─── N-variable symmetric Newton ────────────────────────────────────────────

/// An N-variable gradient system with a symmetric Jacobian.
pub trait SymmetricSystem<const N: usize> {
    /// Returns the gradient and the (symmetric) Hessian at `x`.
    fn values(&self, x: &SVector<f64, N>) -> Result<(SVector<f64, N>, SMatrix<f64, N, N>), EvalError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonResult<const N: usize> {
    pub status: Status,
    pub point: SVector<f64, N>,
    pub f_norm: f64,
    pub iterations: usize,
}

impl<const N: usize> NewtonResult<N> {
    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }
}

/// Same contract as [`newton_2d_symmetric`], with the linear step solved by LU.
pub fn newton_symmetric<const N: usize, S: SymmetricSystem<N> + ?Sized>(
    system: &S,
    start: SVector<f64, N>,
    lower: SVector<f64, N>,
    upper: SVector<f64, N>,
    config: &SolverConfig,
) -> NewtonResult<N>
where
    Const<N>: DimMin<Const<N>, Output = Const<N>>,
{
    let bounds_ok = (0..N).all(|i| lower[i].is_finite() && upper[i].is_finite() && lower[i] <= upper[i]);
    if !config.is_valid() || !bounds_ok || !start.iter().all(|x| x.is_finite()) {
        return NewtonResult {
            status: Status::InvalidInput,
            point: start,
            f_norm: f64::NAN,
            iterations: 0,
        };
    }

    let mut x = start.zip_zip_map(&lower, &upper, |v, lo, hi| v.clamp(lo, hi));
    let mut f_norm = f64::NAN;

    for iteration in 1..=config.max_iterations {
        let (g, h) = match system.values(&x) {
            Ok((g, h)) if g.iter().chain(h.iter()).all(|v| v.is_finite()) => (g, h),
            _ => {
                return NewtonResult {
                    status: Status::NumericalError,
                    point: x,
                    f_norm,
                    iterations: iteration,
                };
            }
        };
        f_norm = g.norm();
        if f_norm <= config.f_tolerance {
            return NewtonResult {
                status: Status::Done,
                point: x,
                f_norm,
                iterations: iteration,
            };
        }

        let Some(dx) = h.lu().solve(&(-g)) else {
            return NewtonResult {
                status: Status::NumericalError,
                point: x,
                f_norm,
                iterations: iteration,
            };
        };
        if !dx.iter().all(|v| v.is_finite()) {
            return NewtonResult {
                status: Status::NumericalError,
                point: x,
                f_norm,
                iterations: iteration,
            };
        }

        let raw = x + dx;
        let next = raw.zip_zip_map(&lower, &upper, |v, lo, hi| v.clamp(lo, hi));
        let clamped = next != raw;
        let small = (0..N).all(|i| (next[i] - x[i]).abs() < config.x_threshold(next[i]));
        x = next;

        if small {
            if let Ok((g, _)) = system.values(&x) {
                f_norm = g.norm();
            }
            return NewtonResult {
                status: if clamped { Status::NotConverged } else { Status::Done },
                point: x,
                f_norm,
                iterations: iteration,
            };
        }
    }

    debug!(n = N, f_norm, "newton exhausted its iteration budget");
    NewtonResult {
        status: Status::MaxIterations,
        point: x,
        f_norm,
        iterations: config.max_iterations,
    }
}
