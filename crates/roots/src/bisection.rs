use tracing::debug;

use crate::function::{checked_value, Function, FunctionWithDerivative};
use crate::solver::{RootResult, SolverConfig, Status};

// ─── Bracket validation ─────────────────────────────────────────────────────

/// Sign information about a validated bracket.
enum Bracket {
    /// One endpoint is already a root.
    Root(f64, f64),
    /// f(lo) and f(hi) have opposite signs; `neg_at_lo` records which side is negative.
    Straddles { neg_at_lo: bool },
}

fn check_bracket<F: Function + ?Sized>(
    f: &F,
    lo: f64,
    hi: f64,
    config: &SolverConfig,
) -> Result<Bracket, RootResult> {
    if !config.is_valid() || !lo.is_finite() || !hi.is_finite() || lo >= hi {
        debug!(lo, hi, "rejecting malformed bracket");
        return Err(RootResult::failed(Status::InvalidInput, lo, 0));
    }
    let f_lo = checked_value(f, lo).map_err(|_| RootResult::failed(Status::NumericalError, lo, 0))?;
    let f_hi = checked_value(f, hi).map_err(|_| RootResult::failed(Status::NumericalError, hi, 0))?;

    if f_lo.abs() <= config.f_tolerance {
        return Ok(Bracket::Root(lo, f_lo));
    }
    if f_hi.abs() <= config.f_tolerance {
        return Ok(Bracket::Root(hi, f_hi));
    }
    if f_lo * f_hi > 0.0 {
        debug!(lo, hi, f_lo, f_hi, "bracket does not straddle a root");
        return Err(RootResult::failed(Status::InvalidInput, lo, 0));
    }
    Ok(Bracket::Straddles {
        neg_at_lo: f_lo < 0.0,
    })
}

// ─── Bisection ──────────────────────────────────────────────────────────────

/// Plain bisection on `[lo, hi]`.
///
/// Requires `f(lo) * f(hi) <= 0`. Stops once `|f(mid)| < f_tolerance` or the
/// bracket is narrower than `x_tolerance * max(1, |mid|)`. On budget exhaustion
/// the last midpoint is returned with [`Status::MaxIterations`].
pub fn bisection<F: Function + ?Sized>(f: &F, lo: f64, hi: f64, config: &SolverConfig) -> RootResult {
    let neg_at_lo = match check_bracket(f, lo, hi, config) {
        Ok(Bracket::Root(root, value)) => {
            return RootResult {
                status: Status::Done,
                root,
                value,
                iterations: 0,
            };
        }
        Ok(Bracket::Straddles { neg_at_lo }) => neg_at_lo,
        Err(failed) => return failed,
    };

    let (mut a, mut b) = (lo, hi);
    let mut mid = 0.5 * (a + b);
    let mut f_mid = f64::NAN;

    for iteration in 1..=config.max_iterations {
        mid = a + 0.5 * (b - a);
        f_mid = match checked_value(f, mid) {
            Ok(v) => v,
            Err(_) => return RootResult::failed(Status::NumericalError, mid, iteration),
        };

        if f_mid.abs() < config.f_tolerance || (b - a) < config.x_threshold(mid) {
            return RootResult {
                status: Status::Done,
                root: mid,
                value: f_mid,
                iterations: iteration,
            };
        }

        // Keep the endpoint whose sign differs from f(mid).
        if (f_mid < 0.0) == neg_at_lo {
            a = mid;
        } else {
            b = mid;
        }
    }

    debug!(root = mid, value = f_mid, "bisection exhausted its iteration budget");
    RootResult {
        status: Status::MaxIterations,
        root: mid,
        value: f_mid,
        iterations: config.max_iterations,
    }
}

// ─── Bisection-Newton ───────────────────────────────────────────────────────

/// Hybrid Newton iteration safeguarded by a bisection bracket.
///
/// Each iteration tries a full Newton step and keeps it only when it lands
/// strictly inside the current bracket; otherwise the bracket is bisected.
pub fn bisection_newton<F: FunctionWithDerivative + ?Sized>(
    f: &F,
    lo: f64,
    hi: f64,
    config: &SolverConfig,
) -> RootResult {
    let neg_at_lo = match check_bracket(f, lo, hi, config) {
        Ok(Bracket::Root(root, value)) => {
            return RootResult {
                status: Status::Done,
                root,
                value,
                iterations: 0,
            };
        }
        Ok(Bracket::Straddles { neg_at_lo }) => neg_at_lo,
        Err(failed) => return failed,
    };

    let (mut a, mut b) = (lo, hi);
    let mut x = 0.5 * (a + b);
    let mut fx = f64::NAN;

    for iteration in 1..=config.max_iterations {
        let (value, slope) = match f.values(x) {
            Ok((v, d)) if v.is_finite() && d.is_finite() => (v, d),
            _ => return RootResult::failed(Status::NumericalError, x, iteration),
        };
        fx = value;

        if fx.abs() < config.f_tolerance {
            return RootResult {
                status: Status::Done,
                root: x,
                value: fx,
                iterations: iteration,
            };
        }

        if (fx < 0.0) == neg_at_lo {
            a = x;
        } else {
            b = x;
        }

        let newton = if slope != 0.0 { x - fx / slope } else { f64::NAN };
        let next = if newton > a && newton < b {
            newton
        } else {
            a + 0.5 * (b - a)
        };

        let step = (next - x).abs();
        x = next;
        if step < config.x_threshold(x) || (b - a) < config.x_threshold(x) {
            let value = match checked_value(f, x) {
                Ok(v) => v,
                Err(_) => return RootResult::failed(Status::NumericalError, x, iteration),
            };
            return RootResult {
                status: Status::Done,
                root: x,
                value,
                iterations: iteration,
            };
        }
    }

    debug!(root = x, value = fx, "bisection-newton exhausted its iteration budget");
    RootResult {
        status: Status::MaxIterations,
        root: x,
        value: fx,
        iterations: config.max_iterations,
    }
}
