use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bisection::{bisection, bisection_newton};
use crate::function::{EvalError, Function, FunctionWithDerivative};
use crate::solver::{SolverConfig, Status};

/// Configuration for [`find_roots`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RootSearchConfig {
    /// Number of sub-intervals the domain is sampled into.
    pub nb_samples: usize,
    pub solver: SolverConfig,
}

impl Default for RootSearchConfig {
    fn default() -> Self {
        Self {
            nb_samples: 32,
            solver: SolverConfig::default(),
        }
    }
}

/// All roots of a function over an interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootsResult {
    pub status: Status,
    /// Sorted, pairwise distinct roots.
    pub roots: Vec<f64>,
}

impl RootsResult {
    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    pub fn nb_roots(&self) -> usize {
        self.roots.len()
    }
}

/// Derivative of `F` seen as a plain function, for tangency detection.
struct Slope<'a, F: ?Sized>(&'a F);

impl<F: FunctionWithDerivative + ?Sized> Function for Slope<'_, F> {
    fn value(&self, x: f64) -> Result<f64, EvalError> {
        self.0.values(x).map(|(_, d)| d)
    }
}

/// Locate every root of `f` on `[a, b]`.
///
/// The interval is sampled; each sign change is refined with
/// [`bisection_newton`]. Even-multiplicity roots, where `f` touches zero
/// without crossing, are found by bisecting `f'` around sampled local minima
/// of `|f|` and kept when `|f|` there is below `f_tolerance`.
pub fn find_roots<F: FunctionWithDerivative + ?Sized>(f: &F, a: f64, b: f64, config: &RootSearchConfig) -> RootsResult {
    let solver = &config.solver;
    if config.nb_samples == 0 || !solver.is_valid() || !a.is_finite() || !b.is_finite() || a > b {
        return RootsResult {
            status: Status::InvalidInput,
            roots: vec![],
        };
    }

    let n = config.nb_samples;
    let xs: Vec<f64> = (0..=n).map(|i| a + (b - a) * (i as f64 / n as f64)).collect();
    let mut fs = Vec::with_capacity(xs.len());
    for &x in &xs {
        match f.values(x) {
            Ok((v, d)) if v.is_finite() && d.is_finite() => fs.push(v),
            _ => {
                debug!(x, "root search sample failed to evaluate");
                return RootsResult {
                    status: Status::NumericalError,
                    roots: vec![],
                };
            }
        }
    }

    let mut roots = Vec::new();
    for i in 0..=n {
        if fs[i].abs() <= solver.f_tolerance {
            roots.push(xs[i]);
        }
    }

    for i in 0..n {
        let (fa, fb) = (fs[i], fs[i + 1]);
        if fa.abs() <= solver.f_tolerance || fb.abs() <= solver.f_tolerance || fa * fb > 0.0 {
            continue;
        }
        let r = bisection_newton(f, xs[i], xs[i + 1], solver);
        match r.status {
            Status::Done | Status::MaxIterations => roots.push(r.root),
            _ => debug!(lo = xs[i], hi = xs[i + 1], status = ?r.status, "sign change not resolved"),
        }
    }

    // Tangent roots: |f| has a sampled local minimum with no sign change around it.
    for i in 1..n {
        let (prev, cur, next) = (fs[i - 1], fs[i], fs[i + 1]);
        let touches = cur.abs() <= prev.abs() && cur.abs() <= next.abs();
        if !touches || prev * cur <= 0.0 || cur * next <= 0.0 {
            continue;
        }
        let slope = Slope(f);
        let r = bisection(&slope, xs[i - 1], xs[i + 1], solver);
        if r.status == Status::InvalidInput || r.status == Status::NumericalError {
            continue;
        }
        if let Ok(v) = f.value(r.root) {
            if v.abs() <= solver.f_tolerance.max(1e-12) {
                roots.push(r.root);
            }
        }
    }

    roots.sort_by(|x, y| x.total_cmp(y));
    roots.dedup_by(|x, y| (*x - *y).abs() <= solver.x_threshold(*y).max(1e-12));

    RootsResult {
        status: Status::Done,
        roots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FnWithDerivative;
    use std::f64::consts::PI;

    #[test]
    fn test_finds_all_sine_roots() {
        let f = FnWithDerivative(|x: f64| (x.sin(), x.cos()));
        let result = find_roots(&f, 0.5, 10.0, &RootSearchConfig::default());
        assert!(result.is_done());
        assert_eq!(result.nb_roots(), 3);
        for (k, root) in result.roots.iter().enumerate() {
            assert!((root - (k as f64 + 1.0) * PI).abs() < 1e-9, "root {} = {}", k, root);
        }
    }

    #[test]
    fn test_finds_double_root() {
        let f = FnWithDerivative(|x: f64| ((x - 0.3) * (x - 0.3), 2.0 * (x - 0.3)));
        let result = find_roots(&f, -1.0, 1.0, &RootSearchConfig::default());
        assert!(result.is_done());
        assert_eq!(result.nb_roots(), 1);
        assert!((result.roots[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_root_on_sample_is_not_duplicated() {
        let f = FnWithDerivative(|x: f64| (x, 1.0));
        let result = find_roots(&f, -1.0, 1.0, &RootSearchConfig::default());
        assert_eq!(result.roots, vec![0.0]);
    }

    #[test]
    fn test_no_roots() {
        let f = FnWithDerivative(|x: f64| (x * x + 1.0, 2.0 * x));
        let result = find_roots(&f, -3.0, 3.0, &RootSearchConfig::default());
        assert!(result.is_done());
        assert!(result.roots.is_empty());
    }

    #[test]
    fn test_reversed_interval_is_invalid() {
        let f = FnWithDerivative(|x: f64| (x, 1.0));
        let result = find_roots(&f, 1.0, -1.0, &RootSearchConfig::default());
        assert_eq!(result.status, Status::InvalidInput);
    }
}
