pub mod voxel;
pub mod sphere_tree;

pub use sphere_tree::{BoundingSphere, SphereTree};
pub use voxel::{SpatialIndexConfig, VoxelBoxSorter};
