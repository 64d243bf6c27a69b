//! Distance between two shapes.
//!
//! Both shapes are decomposed into vertices, edges and faces. Primitive kinds
//! are paired from the highest dimension down; for each pair of kinds the
//! primitives of the second shape are bucketed in a voxel grid, and only the
//! pairs whose boxes can still beat the running minimum reach the extrema
//! solvers, nearest boxes first.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::DistanceError;
use crate::extrema::{ExtremaConfig, ExtremaMode};
use crate::geometry::bounding_box::BoundingBox;
use crate::geometry::point::Point3d;
use crate::spatial::{SpatialIndexConfig, VoxelBoxSorter};
use crate::topology::brep::EntityStore;
use crate::topology::classify::{classify_point, PointClassification};
use crate::topology::explore::{Shape, ShapeMaps};

use super::pair::{evaluate_pair, Primitive};
use super::solution::{DistanceSolution, SolutionSet, Support, SupportKind};

/// Kind pairs in evaluation order.
const PASSES: [(SupportKind, SupportKind); 9] = [
    (SupportKind::InFace, SupportKind::InFace),
    (SupportKind::InFace, SupportKind::OnEdge),
    (SupportKind::OnEdge, SupportKind::InFace),
    (SupportKind::OnEdge, SupportKind::OnEdge),
    (SupportKind::OnEdge, SupportKind::Vertex),
    (SupportKind::Vertex, SupportKind::OnEdge),
    (SupportKind::InFace, SupportKind::Vertex),
    (SupportKind::Vertex, SupportKind::InFace),
    (SupportKind::Vertex, SupportKind::Vertex),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DistanceConfig {
    /// Distances closer than this are equal; points closer than this coincide.
    pub tolerance: f64,
    pub mode: ExtremaMode,
    /// Tolerance of the point-in-solid test used for containment.
    pub inner_tolerance: f64,
    pub extrema: ExtremaConfig,
    pub index: SpatialIndexConfig,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-7,
            mode: ExtremaMode::Min,
            inner_tolerance: 1e-3,
            extrema: ExtremaConfig::default(),
            index: SpatialIndexConfig::default(),
        }
    }
}

/// Serializable summary of a completed query.
#[derive(Debug, Clone, Serialize)]
pub struct DistanceReport<'a> {
    pub done: bool,
    pub inner_solution: bool,
    pub value: f64,
    pub nb_solution: usize,
    pub solutions: &'a [DistanceSolution],
}

/// Primitives of one shape with their boxes, grouped by kind.
struct Primitives {
    vertices: Vec<(Primitive, BoundingBox)>,
    edges: Vec<(Primitive, BoundingBox)>,
    faces: Vec<(Primitive, BoundingBox)>,
}

impl Primitives {
    fn collect(store: &EntityStore, maps: &ShapeMaps) -> Self {
        let boxed = |p: Primitive| (p, p.bounding_box(store));
        Self {
            vertices: maps.vertices.iter().map(|&v| boxed(Primitive::Vertex(v))).collect(),
            edges: maps.edges.iter().map(|&e| boxed(Primitive::Edge(e))).collect(),
            faces: maps.faces.iter().map(|&f| boxed(Primitive::Face(f))).collect(),
        }
    }

    fn of(&self, kind: SupportKind) -> &[(Primitive, BoundingBox)] {
        match kind {
            SupportKind::Vertex => &self.vertices,
            SupportKind::OnEdge => &self.edges,
            SupportKind::InFace => &self.faces,
        }
    }
}

/// Minimum (and optionally maximum) distance between two shapes.
///
/// Solutions are ranked: index 0 holds the global minimum, or the global
/// maximum when only maxima are requested. With [`ExtremaMode::MinMax`] the
/// minima come first, then the maxima.
#[derive(Debug, Clone)]
pub struct DistShapeShape {
    config: DistanceConfig,
    done: bool,
    inner: bool,
    value: f64,
    solutions: Vec<DistanceSolution>,
}

impl Default for DistShapeShape {
    fn default() -> Self {
        Self::new(DistanceConfig::default())
    }
}

impl DistShapeShape {
    pub fn new(config: DistanceConfig) -> Self {
        Self {
            config,
            done: false,
            inner: false,
            value: f64::INFINITY,
            solutions: Vec::new(),
        }
    }

    pub fn config(&self) -> &DistanceConfig {
        &self.config
    }

    pub fn set_mode(&mut self, mode: ExtremaMode) {
        self.config.mode = mode;
    }

    fn reset(&mut self) {
        self.done = false;
        self.inner = false;
        self.value = f64::INFINITY;
        self.solutions.clear();
    }

    /// Run the query. Any result of a previous call is discarded first.
    #[instrument(skip(self, store))]
    pub fn perform(&mut self, store: &EntityStore, shape1: Shape, shape2: Shape) -> Result<(), DistanceError> {
        self.reset();
        let maps1 = ShapeMaps::build(store, shape1)?;
        let maps2 = ShapeMaps::build(store, shape2)?;
        if maps1.is_empty() {
            return Err(DistanceError::EmptyShape { which: 1 });
        }
        if maps2.is_empty() {
            return Err(DistanceError::EmptyShape { which: 2 });
        }

        let mode = self.config.mode;
        if mode.wants_min()
            && (self.contains_vertex_of(store, shape1, &maps2) || self.contains_vertex_of(store, shape2, &maps1))
        {
            self.inner = true;
            self.value = 0.0;
            self.done = true;
            info!(value = 0.0, nb_solution = 0, inner = true, "shape distance computed");
            return Ok(());
        }

        let bound = match (maps1.vertices.first(), maps2.vertices.first()) {
            (Some(&a), Some(&b)) => match (store.vertices.get(a), store.vertices.get(b)) {
                (Some(a), Some(b)) => a.point.distance_to(&b.point),
                _ => f64::INFINITY,
            },
            _ => f64::INFINITY,
        };
        let mut set = SolutionSet::new(mode, self.config.tolerance, bound);

        let prims1 = Primitives::collect(store, &maps1);
        let prims2 = Primitives::collect(store, &maps2);
        for (k1, k2) in PASSES {
            self.run_pass(store, prims1.of(k1), prims2.of(k2), &mut set)?;
            debug!(pass = ?(k1, k2), best = set.best_min(), nb = set.len(), "pass finished");
        }

        self.solutions = set.into_ranked();
        self.value = self.solutions.first().map_or(f64::INFINITY, |s| s.distance);
        self.done = true;
        info!(
            value = self.value,
            nb_solution = self.solutions.len(),
            inner = false,
            "shape distance computed"
        );
        Ok(())
    }

    /// Whether `solid` is a solid holding a vertex of `other` inside it.
    fn contains_vertex_of(&self, store: &EntityStore, solid: Shape, other: &ShapeMaps) -> bool {
        let Shape::Solid(id) = solid else {
            return false;
        };
        other
            .vertices
            .iter()
            .filter_map(|&v| store.vertices.get(v))
            .any(|v| classify_point(store, id, &v.point, self.config.inner_tolerance) == PointClassification::Inside)
    }

    fn run_pass(
        &self,
        store: &EntityStore,
        first: &[(Primitive, BoundingBox)],
        second: &[(Primitive, BoundingBox)],
        set: &mut SolutionSet,
    ) -> Result<(), DistanceError> {
        if first.is_empty() || second.is_empty() {
            return Ok(());
        }
        let tol = self.config.tolerance;
        // Maxima cannot be pruned by the running minimum.
        let prune = !self.config.mode.wants_max();

        let boxes: Vec<BoundingBox> = second.iter().map(|(_, b)| *b).collect();
        let enclosing = boxes.iter().fold(BoundingBox::void(), |acc, b| acc.union(b));
        let mut sorter = VoxelBoxSorter::new(self.config.index);
        sorter.initialize_with_boxes(enclosing, &boxes)?;

        let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
        for (i, (_, b1)) in first.iter().enumerate() {
            let reach = set.best_min() + tol;
            let hits = if prune && reach.is_finite() {
                sorter.compare(&b1.enlarged(reach))?
            } else {
                (0..second.len()).collect()
            };
            for j in hits {
                let gap = b1.distance(&second[j].1);
                if !prune || gap <= reach {
                    candidates.push((gap, i, j));
                }
            }
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (gap, i, j) in candidates {
            if prune && gap > set.best_min() + tol {
                break;
            }
            let (a, b) = (first[i].0, second[j].0);
            match evaluate_pair(store, a, b, self.config.mode, &self.config.extrema) {
                Ok(solutions) => {
                    for s in solutions {
                        set.offer(s);
                    }
                }
                Err(status) => warn!(?status, first = ?a, second = ?b, "pair skipped"),
            }
        }
        Ok(())
    }

    // ─── Results ────────────────────────────────────────────────────────────

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Distance of solution 0; zero for an inner solution, infinite when no
    /// extremum exists.
    pub fn value(&self) -> Result<f64, DistanceError> {
        self.check_done()?;
        Ok(self.value)
    }

    pub fn nb_solution(&self) -> Result<usize, DistanceError> {
        self.check_done()?;
        Ok(self.solutions.len())
    }

    /// One shape is a solid containing part of the other.
    pub fn inner_solution(&self) -> Result<bool, DistanceError> {
        self.check_done()?;
        Ok(self.inner)
    }

    pub fn solution(&self, index: usize) -> Result<&DistanceSolution, DistanceError> {
        self.check_done()?;
        self.solutions.get(index).ok_or(DistanceError::IndexOutOfRange {
            index,
            count: self.solutions.len(),
        })
    }

    pub fn solutions(&self) -> &[DistanceSolution] {
        &self.solutions
    }

    pub fn point_on_shape1(&self, index: usize) -> Result<Point3d, DistanceError> {
        Ok(self.solution(index)?.on_shape1.point)
    }

    pub fn point_on_shape2(&self, index: usize) -> Result<Point3d, DistanceError> {
        Ok(self.solution(index)?.on_shape2.point)
    }

    pub fn support_type_shape1(&self, index: usize) -> Result<SupportKind, DistanceError> {
        Ok(self.solution(index)?.on_shape1.support.kind())
    }

    pub fn support_type_shape2(&self, index: usize) -> Result<SupportKind, DistanceError> {
        Ok(self.solution(index)?.on_shape2.support.kind())
    }

    pub fn support_on_shape1(&self, index: usize) -> Result<Support, DistanceError> {
        Ok(self.solution(index)?.on_shape1.support)
    }

    pub fn support_on_shape2(&self, index: usize) -> Result<Support, DistanceError> {
        Ok(self.solution(index)?.on_shape2.support)
    }

    pub fn par_on_edge_s1(&self, index: usize) -> Result<f64, DistanceError> {
        edge_param(index, self.support_on_shape1(index)?)
    }

    pub fn par_on_edge_s2(&self, index: usize) -> Result<f64, DistanceError> {
        edge_param(index, self.support_on_shape2(index)?)
    }

    pub fn par_on_face_s1(&self, index: usize) -> Result<(f64, f64), DistanceError> {
        face_params(index, self.support_on_shape1(index)?)
    }

    pub fn par_on_face_s2(&self, index: usize) -> Result<(f64, f64), DistanceError> {
        face_params(index, self.support_on_shape2(index)?)
    }

    pub fn report(&self) -> DistanceReport<'_> {
        DistanceReport {
            done: self.done,
            inner_solution: self.inner,
            value: self.value,
            nb_solution: self.solutions.len(),
            solutions: &self.solutions,
        }
    }

    /// Human-readable JSON report of the last query.
    pub fn dump(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.report())
    }

    fn check_done(&self) -> Result<(), DistanceError> {
        if self.done { Ok(()) } else { Err(DistanceError::NotDone) }
    }
}

fn edge_param(index: usize, support: Support) -> Result<f64, DistanceError> {
    match support {
        Support::OnEdge { param, .. } => Ok(param),
        other => Err(DistanceError::IncompatibleSupport {
            index,
            expected: SupportKind::OnEdge,
            actual: other.kind(),
        }),
    }
}

fn face_params(index: usize, support: Support) -> Result<(f64, f64), DistanceError> {
    match support {
        Support::InFace { u, v, .. } => Ok((u, v)),
        other => Err(DistanceError::IncompatibleSupport {
            index,
            expected: SupportKind::InFace,
            actual: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitives::{make_box, make_cylinder, make_sphere};

    fn unit_cube(store: &mut EntityStore, cx: f64) -> Shape {
        Shape::Solid(make_box(store, cx - 0.5, -0.5, -0.5, cx + 0.5, 0.5, 0.5))
    }

    #[test]
    fn test_disjoint_cubes() {
        let mut store = EntityStore::new();
        let a = unit_cube(&mut store, 0.0);
        let b = unit_cube(&mut store, 3.0);
        let mut dist = DistShapeShape::default();
        dist.perform(&store, a, b).unwrap();
        assert!(dist.is_done());
        assert!((dist.value().unwrap() - 2.0).abs() < 1e-9);
        assert!(dist.nb_solution().unwrap() >= 1);
        assert!(!dist.inner_solution().unwrap());
        for i in 0..dist.nb_solution().unwrap() {
            assert!((dist.point_on_shape1(i).unwrap().x - 0.5).abs() < 1e-9);
            assert!((dist.point_on_shape2(i).unwrap().x - 2.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_sphere_inside_box() {
        let mut store = EntityStore::new();
        let outer = Shape::Solid(make_box(&mut store, -5.0, -5.0, -5.0, 5.0, 5.0, 5.0));
        let inner = Shape::Solid(make_sphere(&mut store, Point3d::ORIGIN, 1.0));
        let mut dist = DistShapeShape::default();
        dist.perform(&store, inner, outer).unwrap();
        assert!(dist.inner_solution().unwrap());
        assert_eq!(dist.nb_solution().unwrap(), 0);
        assert_eq!(dist.value().unwrap(), 0.0);
    }

    #[test]
    fn test_repeated_perform_is_bit_identical() {
        let mut store = EntityStore::new();
        let a = unit_cube(&mut store, 0.0);
        let b = Shape::Solid(make_cylinder(&mut store, Point3d::new(3.0, 0.0, -1.0), 0.5, 2.0));
        let mut dist = DistShapeShape::default();
        dist.perform(&store, a, b).unwrap();
        let first = dist.dump().unwrap();
        let bits: Vec<u64> = dist.solutions().iter().map(|s| s.distance.to_bits()).collect();
        dist.perform(&store, a, b).unwrap();
        assert_eq!(first, dist.dump().unwrap());
        let again: Vec<u64> = dist.solutions().iter().map(|s| s.distance.to_bits()).collect();
        assert_eq!(bits, again);
        assert!((dist.value().unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_perform_clears_previous_result() {
        let mut store = EntityStore::new();
        let outer = Shape::Solid(make_box(&mut store, -5.0, -5.0, -5.0, 5.0, 5.0, 5.0));
        let inner = Shape::Solid(make_sphere(&mut store, Point3d::ORIGIN, 1.0));
        let a = unit_cube(&mut store, 10.0);
        let mut dist = DistShapeShape::default();
        dist.perform(&store, inner, outer).unwrap();
        assert!(dist.inner_solution().unwrap());
        dist.perform(&store, a, outer).unwrap();
        assert!(!dist.inner_solution().unwrap());
        assert!((dist.value().unwrap() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_accessors_before_perform() {
        let dist = DistShapeShape::default();
        assert_eq!(dist.value(), Err(DistanceError::NotDone));
        assert_eq!(dist.point_on_shape1(0), Err(DistanceError::NotDone));
    }

    #[test]
    fn test_stale_shape_fails_the_query() {
        let mut store = EntityStore::new();
        let a = unit_cube(&mut store, 0.0);
        let v = store.add_vertex(Point3d::new(5.0, 0.0, 0.0));
        store.vertices.remove(v);
        let mut dist = DistShapeShape::default();
        assert!(matches!(
            dist.perform(&store, a, Shape::Vertex(v)),
            Err(DistanceError::Decomposition(_))
        ));
        assert!(!dist.is_done());
    }

    #[test]
    fn test_support_accessors() {
        let mut store = EntityStore::new();
        let a = unit_cube(&mut store, 0.0);
        let v = store.add_vertex(Point3d::new(0.0, 0.0, 3.0));
        let mut dist = DistShapeShape::default();
        dist.perform(&store, a, Shape::Vertex(v)).unwrap();
        assert_eq!(dist.nb_solution().unwrap(), 1);
        assert!((dist.value().unwrap() - 2.5).abs() < 1e-9);
        assert_eq!(dist.support_type_shape1(0).unwrap(), SupportKind::InFace);
        assert_eq!(dist.support_type_shape2(0).unwrap(), SupportKind::Vertex);
        assert!(dist.par_on_face_s1(0).is_ok());
        assert_eq!(
            dist.par_on_edge_s1(0),
            Err(DistanceError::IncompatibleSupport {
                index: 0,
                expected: SupportKind::OnEdge,
                actual: SupportKind::InFace,
            })
        );
        assert_eq!(
            dist.point_on_shape1(1),
            Err(DistanceError::IndexOutOfRange { index: 1, count: 1 })
        );
    }

    #[test]
    fn test_point_above_edge_is_supported_on_edge() {
        let mut store = EntityStore::new();
        let a = unit_cube(&mut store, 0.0);
        let v = store.add_vertex(Point3d::new(0.0, 1.5, 1.5));
        let mut dist = DistShapeShape::default();
        dist.perform(&store, a, Shape::Vertex(v)).unwrap();
        assert!((dist.value().unwrap() - 2f64.sqrt()).abs() < 1e-9);
        assert_eq!(dist.support_type_shape1(0).unwrap(), SupportKind::OnEdge);
        assert!(dist.par_on_edge_s1(0).is_ok());
    }

    #[test]
    fn test_max_mode_finds_farthest_corners() {
        let mut store = EntityStore::new();
        let a = unit_cube(&mut store, 0.0);
        let b = unit_cube(&mut store, 3.0);
        let mut dist = DistShapeShape::default();
        dist.set_mode(ExtremaMode::Max);
        dist.perform(&store, a, b).unwrap();
        assert!((dist.value().unwrap() - 18f64.sqrt()).abs() < 1e-9);
        assert!(dist.solutions().iter().all(|s| !s.is_min));
        assert_eq!(dist.nb_solution().unwrap(), 4);
    }

    #[test]
    fn test_min_max_ranks_minimum_first() {
        let mut store = EntityStore::new();
        let a = unit_cube(&mut store, 0.0);
        let b = unit_cube(&mut store, 3.0);
        let mut dist = DistShapeShape::default();
        dist.set_mode(ExtremaMode::MinMax);
        dist.perform(&store, a, b).unwrap();
        let sols = dist.solutions();
        assert!(sols[0].is_min && (sols[0].distance - 2.0).abs() < 1e-9);
        assert!(sols.iter().any(|s| !s.is_min && (s.distance - 18f64.sqrt()).abs() < 1e-9));
    }

    #[test]
    fn test_vertex_against_sphere() {
        let mut store = EntityStore::new();
        let ball = Shape::Solid(make_sphere(&mut store, Point3d::ORIGIN, 1.0));
        let v = store.add_vertex(Point3d::new(3.0, 0.0, 0.0));
        let mut dist = DistShapeShape::default();
        dist.perform(&store, Shape::Vertex(v), ball).unwrap();
        assert!(!dist.inner_solution().unwrap());
        assert!((dist.value().unwrap() - 2.0).abs() < 1e-9);
        assert!(dist.point_on_shape2(0).unwrap().distance_to(&Point3d::new(1.0, 0.0, 0.0)) < 1e-9);
    }
}
