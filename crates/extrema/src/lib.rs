pub mod bounds;
pub mod distance;
pub mod error;
pub mod extrema;
pub mod geometry;
pub mod spatial;
pub mod topology;
pub mod traits;

// Re-export the query surface at crate root for convenience.
pub use distance::{DistShapeShape, DistanceConfig, Support, SupportKind};
pub use error::{DistanceError, ExploreError, SpatialIndexError};
pub use extrema::{ExtremaConfig, ExtremaMode};
pub use topology::explore::Shape;
pub use traits::{CurveEval, SurfaceEval};

/// Global tolerance configuration for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Points closer than this are considered coincident.
    pub coincidence: f64,
    /// Angles smaller than this (radians) are considered zero.
    pub angular: f64,
    /// Parameter-space tolerance for curve/surface evaluations.
    pub parametric: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            coincidence: 1e-7,
            angular: 1e-10,
            parametric: 1e-9,
        }
    }
}

impl Tolerance {
    /// Equal within the coincidence tolerance, absolutely or relative to the
    /// larger magnitude.
    pub fn distances_equal(&self, a: f64, b: f64) -> bool {
        approx::relative_eq!(a, b, epsilon = self.coincidence, max_relative = self.coincidence)
    }
}

/// Default tolerance.
pub fn default_tolerance() -> Tolerance {
    Tolerance::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distances_equal() {
        let tol = default_tolerance();
        assert!(tol.distances_equal(2.0, 2.0 + 1e-9));
        assert!(tol.distances_equal(1e6, 1e6 + 1e-3));
        assert!(!tol.distances_equal(2.0, 2.001));
    }
}
