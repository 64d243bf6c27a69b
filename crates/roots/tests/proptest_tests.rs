//! Property-based tests for the root solvers using the `proptest` crate.

use proptest::prelude::*;

use cad_roots::{bisection, bisection_newton, find_roots, FnWithDerivative, RootSearchConfig, SolverConfig, Status};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// A root location inside (-50, 50).
fn arb_root() -> impl Strategy<Value = f64> {
    -50.0f64..50.0
}

/// Half-width of the bracket around the root, kept away from zero.
fn arb_half_width() -> impl Strategy<Value = (f64, f64)> {
    (0.01f64..20.0, 0.01f64..20.0)
}

// ---------------------------------------------------------------------------
// 1. Both bracketed solvers converge on a monotone cubic
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn bracketed_solvers_find_the_root(r in arb_root(), (left, right) in arb_half_width()) {
        let f = FnWithDerivative(move |x: f64| {
            let d = x - r;
            (d * d * d + d, 3.0 * d * d + 1.0)
        });
        let config = SolverConfig { max_iterations: 200, ..SolverConfig::default() };

        let plain = bisection(&f, r - left, r + right, &config);
        prop_assert!(plain.is_done(), "status {:?}", plain.status);
        prop_assert!((plain.root - r).abs() < 1e-8, "bisection root {} vs {}", plain.root, r);

        let hybrid = bisection_newton(&f, r - left, r + right, &config);
        prop_assert!(hybrid.is_done(), "status {:?}", hybrid.status);
        prop_assert!((hybrid.root - r).abs() < 1e-8, "hybrid root {} vs {}", hybrid.root, r);
        prop_assert!(hybrid.root > r - left && hybrid.root < r + right);
    }
}

// ---------------------------------------------------------------------------
// 2. A bracket without a sign change is rejected before iterating
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn same_sign_bracket_is_rejected(lo in -10.0f64..10.0, width in 0.1f64..10.0) {
        let f = FnWithDerivative(|x: f64| (x * x + 1.0, 2.0 * x));
        let result = bisection(&f, lo, lo + width, &SolverConfig::default());
        prop_assert_eq!(result.status, Status::InvalidInput);
        prop_assert_eq!(result.iterations, 0);
    }
}

// ---------------------------------------------------------------------------
// 3. Multi-root search returns sorted, distinct roots of a product of factors
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn root_search_finds_separated_simple_roots(a in -5.0f64..-1.0, b in 1.0f64..5.0) {
        let f = FnWithDerivative(move |x: f64| ((x - a) * (x - b), 2.0 * x - a - b));
        let result = find_roots(&f, -6.0, 6.0, &RootSearchConfig::default());
        prop_assert!(result.is_done());
        prop_assert_eq!(result.roots.len(), 2);
        prop_assert!((result.roots[0] - a).abs() < 1e-8);
        prop_assert!((result.roots[1] - b).abs() < 1e-8);
    }
}
