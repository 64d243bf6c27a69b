//! Shape-to-shape distance: broad phase over voxel-sorted primitive boxes,
//! narrow phase through the extrema solvers.

pub mod pair;
pub mod shape_shape;
pub mod solution;

pub use pair::{evaluate_pair, Primitive};
pub use shape_shape::{DistShapeShape, DistanceConfig, DistanceReport};
pub use solution::{DistanceSolution, SolutionPoint, SolutionSet, Support, SupportKind};
