use serde::{Deserialize, Serialize};

/// Outcome of a solver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Converged within the requested tolerances.
    Done,
    /// Malformed bracket, bad bounds or non-finite start; detected before iterating.
    InvalidInput,
    /// The function could not be evaluated, or the linear step was singular.
    NumericalError,
    /// Iteration budget exhausted; the result holds the best estimate.
    MaxIterations,
    /// Iteration stalled (for example pinned against a bound) without converging.
    NotConverged,
}

impl Status {
    pub fn is_done(&self) -> bool {
        matches!(self, Status::Done)
    }
}

/// Configuration shared by the scalar and Newton solvers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolverConfig {
    pub max_iterations: usize,
    /// Convergence threshold on |f|.
    pub f_tolerance: f64,
    /// Convergence threshold on the step or bracket width, relative to max(1, |x|).
    pub x_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            f_tolerance: 1e-12,
            x_tolerance: 1e-10,
        }
    }
}

impl SolverConfig {
    /// Width below which a bracket around `x` counts as converged.
    pub fn x_threshold(&self, x: f64) -> f64 {
        self.x_tolerance * x.abs().max(1.0)
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.max_iterations > 0
            && self.f_tolerance.is_finite()
            && self.f_tolerance >= 0.0
            && self.x_tolerance.is_finite()
            && self.x_tolerance >= 0.0
    }
}

/// Result of a scalar root search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootResult {
    pub status: Status,
    pub root: f64,
    /// f(root) as last evaluated.
    pub value: f64,
    pub iterations: usize,
}

impl RootResult {
    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    pub(crate) fn failed(status: Status, root: f64, iterations: usize) -> Self {
        Self {
            status,
            root,
            value: f64::NAN,
            iterations,
        }
    }
}
