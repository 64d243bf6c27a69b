use serde::{Deserialize, Serialize};

use crate::extrema::ExtremaMode;
use crate::geometry::point::Point3d;
use crate::topology::brep::{EdgeId, FaceId, VertexId};
use crate::Tolerance;

/// Kind of topological entity a solution point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportKind {
    Vertex,
    OnEdge,
    InFace,
}

/// The entity a solution point lies on, with its parameters there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Support {
    Vertex(VertexId),
    OnEdge { edge: EdgeId, param: f64 },
    InFace { face: FaceId, u: f64, v: f64 },
}

impl Support {
    pub fn kind(&self) -> SupportKind {
        match self {
            Support::Vertex(_) => SupportKind::Vertex,
            Support::OnEdge { .. } => SupportKind::OnEdge,
            Support::InFace { .. } => SupportKind::InFace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolutionPoint {
    pub point: Point3d,
    pub support: Support,
}

/// One extremum of the distance between two shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceSolution {
    pub on_shape1: SolutionPoint,
    pub on_shape2: SolutionPoint,
    pub distance: f64,
    pub is_min: bool,
}

impl DistanceSolution {
    pub fn new(on_shape1: SolutionPoint, on_shape2: SolutionPoint, is_min: bool) -> Self {
        Self {
            on_shape1,
            on_shape2,
            distance: on_shape1.point.distance_to(&on_shape2.point),
            is_min,
        }
    }

    pub fn swapped(self) -> Self {
        Self {
            on_shape1: self.on_shape2,
            on_shape2: self.on_shape1,
            ..self
        }
    }

    fn is_duplicate_of(&self, other: &Self, tolerance: f64) -> bool {
        self.is_min == other.is_min
            && self.on_shape1.point.distance_to(&other.on_shape1.point) <= tolerance
            && self.on_shape2.point.distance_to(&other.on_shape2.point) <= tolerance
    }
}

/// Running set of the best solutions found so far.
///
/// A solution strictly better than the current best, and not equal to it
/// within the tolerance, replaces every solution of its kind; a tie is
/// appended unless it duplicates one already held.
#[derive(Debug, Clone)]
pub struct SolutionSet {
    mode: ExtremaMode,
    tolerance: Tolerance,
    best_min: f64,
    best_max: f64,
    solutions: Vec<DistanceSolution>,
}

impl SolutionSet {
    /// `bound` is an upper bound of the minimum distance already known.
    pub fn new(mode: ExtremaMode, tolerance: f64, bound: f64) -> Self {
        Self {
            mode,
            tolerance: Tolerance {
                coincidence: tolerance,
                ..Tolerance::default()
            },
            best_min: bound,
            best_max: f64::NEG_INFINITY,
            solutions: Vec::new(),
        }
    }

    /// Current bound on the minimum distance.
    pub fn best_min(&self) -> f64 {
        self.best_min
    }

    pub fn best_max(&self) -> f64 {
        self.best_max
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    /// Offer a solution; returns whether it was kept.
    pub fn offer(&mut self, solution: DistanceSolution) -> bool {
        let tol = self.tolerance;
        let d = solution.distance;
        if !d.is_finite() {
            return false;
        }
        if solution.is_min {
            if !self.mode.wants_min() {
                return false;
            }
            if tol.distances_equal(d, self.best_min) {
                if self.contains(&solution) {
                    return false;
                }
                self.best_min = self.best_min.min(d);
            } else if d < self.best_min {
                self.solutions.retain(|s| !s.is_min);
                self.best_min = d;
            } else {
                return false;
            }
        } else {
            if !self.mode.wants_max() {
                return false;
            }
            if tol.distances_equal(d, self.best_max) {
                if self.contains(&solution) {
                    return false;
                }
                self.best_max = self.best_max.max(d);
            } else if d > self.best_max {
                self.solutions.retain(|s| s.is_min);
                self.best_max = d;
            } else {
                return false;
            }
        }
        self.solutions.push(solution);
        true
    }

    fn contains(&self, solution: &DistanceSolution) -> bool {
        self.solutions
            .iter()
            .any(|s| s.is_duplicate_of(solution, self.tolerance.coincidence))
    }

    /// Final ranked list: minima by increasing distance, then maxima by
    /// decreasing distance. Index 0 is the global minimum, or the global
    /// maximum when only maxima were requested.
    pub fn into_ranked(mut self) -> Vec<DistanceSolution> {
        let (tol, best_min, best_max) = (self.tolerance, self.best_min, self.best_max);
        self.solutions.retain(|s| {
            if s.is_min {
                s.distance <= best_min || tol.distances_equal(s.distance, best_min)
            } else {
                s.distance >= best_max || tol.distances_equal(s.distance, best_max)
            }
        });
        self.solutions.sort_by(|a, b| match (a.is_min, b.is_min) {
            (true, true) => a.distance.total_cmp(&b.distance),
            (false, false) => b.distance.total_cmp(&a.distance),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
        });
        self.solutions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn solution(a: Point3d, b: Point3d, is_min: bool) -> DistanceSolution {
        let mut vertices: SlotMap<VertexId, ()> = SlotMap::with_key();
        let v = vertices.insert(());
        DistanceSolution::new(
            SolutionPoint { point: a, support: Support::Vertex(v) },
            SolutionPoint { point: b, support: Support::Vertex(v) },
            is_min,
        )
    }

    #[test]
    fn test_better_solution_clears_ties() {
        let mut set = SolutionSet::new(ExtremaMode::Min, 1e-7, f64::INFINITY);
        assert!(set.offer(solution(Point3d::ORIGIN, Point3d::new(3.0, 0.0, 0.0), true)));
        assert!(set.offer(solution(Point3d::new(0.0, 1.0, 0.0), Point3d::new(3.0, 1.0, 0.0), true)));
        assert_eq!(set.len(), 2);
        assert!(set.offer(solution(Point3d::ORIGIN, Point3d::new(2.0, 0.0, 0.0), true)));
        assert_eq!(set.len(), 1);
        assert!((set.best_min() - 2.0).abs() < 1e-12);
        assert!(!set.offer(solution(Point3d::ORIGIN, Point3d::new(5.0, 0.0, 0.0), true)));
    }

    #[test]
    fn test_far_ties_use_relative_tolerance() {
        let mut set = SolutionSet::new(ExtremaMode::Min, 1e-7, f64::INFINITY);
        assert!(set.offer(solution(Point3d::ORIGIN, Point3d::new(1e6, 0.0, 0.0), true)));
        // 0.05 apart in absolute terms, 5e-8 relative.
        assert!(set.offer(solution(Point3d::new(0.0, 1.0, 0.0), Point3d::new(1e6 + 0.05, 1.0, 0.0), true)));
        assert_eq!(set.len(), 2);
        assert!(set.offer(solution(Point3d::ORIGIN, Point3d::new(2e5, 0.0, 0.0), true)));
        assert_eq!(set.into_ranked().len(), 1);
    }

    #[test]
    fn test_duplicates_are_rejected() {
        let mut set = SolutionSet::new(ExtremaMode::Min, 1e-7, f64::INFINITY);
        assert!(set.offer(solution(Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0), true)));
        assert!(!set.offer(solution(Point3d::new(1e-9, 0.0, 0.0), Point3d::new(1.0, 0.0, 0.0), true)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_bound_rejects_farther_solutions() {
        let mut set = SolutionSet::new(ExtremaMode::Min, 1e-7, 1.0);
        assert!(!set.offer(solution(Point3d::ORIGIN, Point3d::new(2.0, 0.0, 0.0), true)));
        assert!(set.offer(solution(Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0), true)));
    }

    #[test]
    fn test_min_max_ranking() {
        let mut set = SolutionSet::new(ExtremaMode::MinMax, 1e-7, f64::INFINITY);
        set.offer(solution(Point3d::ORIGIN, Point3d::new(4.0, 0.0, 0.0), false));
        set.offer(solution(Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0), true));
        set.offer(solution(Point3d::ORIGIN, Point3d::new(6.0, 0.0, 0.0), false));
        let ranked = set.into_ranked();
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].is_min && (ranked[0].distance - 1.0).abs() < 1e-12);
        assert!(!ranked[1].is_min && (ranked[1].distance - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_mode_ignores_minima() {
        let mut set = SolutionSet::new(ExtremaMode::Max, 1e-7, f64::INFINITY);
        assert!(!set.offer(solution(Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0), true)));
        assert!(set.offer(solution(Point3d::ORIGIN, Point3d::new(3.0, 0.0, 0.0), false)));
        let ranked = set.into_ranked();
        assert_eq!(ranked.len(), 1);
        assert!(!ranked[0].is_min);
    }
}
