//! Voxel-grid box sorter.
//!
//! Boxes are bucketed into the voxels of a regular grid laid over an
//! enclosing box. A box covering many voxels is kept once in a separate
//! large-box list instead of being copied into every voxel it touches.
//! Queries are answered at voxel resolution: a returned index is not
//! guaranteed to intersect the query, but an index whose box does is
//! always returned.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::SpatialIndexError;
use crate::geometry::bounding_box::BoundingBox;
use crate::geometry::surfaces::Plane;

/// Upper bound on the automatic resolution.
const MAX_AUTO_RESOLUTION: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialIndexConfig {
    /// Voxels per axis. Zero picks one from the number of boxes.
    pub resolution: usize,
    /// A box covering more than this fraction of all voxels is stored in the
    /// large-box list.
    pub large_box_fraction: f64,
}

impl Default for SpatialIndexConfig {
    fn default() -> Self {
        Self {
            resolution: 0,
            large_box_fraction: 0.125,
        }
    }
}

impl SpatialIndexConfig {
    fn resolution_for(&self, count: usize) -> usize {
        if self.resolution > 0 {
            return self.resolution;
        }
        let per_axis = (count.max(1) as f64).cbrt().ceil() as usize;
        (2 * per_axis).clamp(1, MAX_AUTO_RESOLUTION)
    }
}

/// Inclusive voxel range of a box along the three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VoxelRange {
    lo: [usize; 3],
    hi: [usize; 3],
}

impl VoxelRange {
    fn count(&self) -> usize {
        (0..3).map(|a| self.hi[a] - self.lo[a] + 1).product()
    }

    /// Flat indices of the covered cells in a grid of `resolution`³.
    fn cells(self, resolution: usize) -> impl Iterator<Item = usize> {
        let r = resolution;
        (self.lo[0]..=self.hi[0]).flat_map(move |i| {
            (self.lo[1]..=self.hi[1]).flat_map(move |j| (self.lo[2]..=self.hi[2]).map(move |k| (i * r + j) * r + k))
        })
    }
}

#[derive(Debug, Clone)]
pub struct VoxelBoxSorter {
    config: SpatialIndexConfig,
    enclosing: BoundingBox,
    resolution: usize,
    /// Voxels per unit length on each axis; zero on a degenerate axis.
    coeff: [f64; 3],
    boxes: Vec<Option<BoundingBox>>,
    voxels: Vec<Vec<usize>>,
    large: Vec<usize>,
    initialized: bool,
}

impl VoxelBoxSorter {
    pub fn new(config: SpatialIndexConfig) -> Self {
        Self {
            config,
            enclosing: BoundingBox::void(),
            resolution: 0,
            coeff: [0.0; 3],
            boxes: Vec::new(),
            voxels: Vec::new(),
            large: Vec::new(),
            initialized: false,
        }
    }

    /// Set up an empty grid over `enclosing` able to hold `capacity` boxes.
    /// Any previous content is discarded.
    #[instrument(skip(self, enclosing))]
    pub fn initialize(&mut self, enclosing: BoundingBox, capacity: usize) {
        let resolution = self.config.resolution_for(capacity);
        self.enclosing = enclosing;
        self.resolution = resolution;
        self.coeff = [0.0; 3];
        if !enclosing.is_void() {
            let size = enclosing.size();
            let extents = [size.x, size.y, size.z];
            let largest = extents.iter().cloned().fold(0.0, f64::max);
            for axis in 0..3 {
                let e = extents[axis];
                // Degenerate axes map onto a single voxel row.
                if e.is_finite() && e > 1e-12 * largest.max(1.0) {
                    self.coeff[axis] = resolution as f64 / e;
                }
            }
        }
        self.boxes = vec![None; capacity];
        self.voxels = vec![Vec::new(); resolution * resolution * resolution];
        self.large.clear();
        self.initialized = true;
        debug!(resolution, coeff = ?self.coeff, "voxel grid initialized");
    }

    /// Initialize and add every box, index `i` for `boxes[i]`.
    pub fn initialize_with_boxes(
        &mut self,
        enclosing: BoundingBox,
        boxes: &[BoundingBox],
    ) -> Result<(), SpatialIndexError> {
        self.initialize(enclosing, boxes.len());
        for (index, bbox) in boxes.iter().enumerate() {
            self.add(*bbox, index)?;
        }
        Ok(())
    }

    /// Bind `bbox` to `index`. Void boxes are bound but reach no voxel.
    pub fn add(&mut self, bbox: BoundingBox, index: usize) -> Result<(), SpatialIndexError> {
        if !self.initialized {
            return Err(SpatialIndexError::NotInitialized);
        }
        let capacity = self.boxes.len();
        let slot = self
            .boxes
            .get_mut(index)
            .ok_or(SpatialIndexError::OutOfRange { index, capacity })?;
        if slot.is_some() {
            return Err(SpatialIndexError::AlreadyBound { index });
        }
        *slot = Some(bbox);

        if bbox.is_void() {
            return Ok(());
        }
        let Some(range) = self.voxel_range(&bbox) else {
            self.large.push(index);
            return Ok(());
        };
        if range.count() > self.large_threshold() {
            self.large.push(index);
            return Ok(());
        }
        for v in range.cells(self.resolution) {
            self.voxels[v].push(index);
        }
        Ok(())
    }

    /// Indices of the boxes that may intersect `query`, ascending.
    pub fn compare(&self, query: &BoundingBox) -> Result<Vec<usize>, SpatialIndexError> {
        if !self.initialized {
            return Err(SpatialIndexError::NotInitialized);
        }
        if query.is_void() {
            return Ok(Vec::new());
        }
        let mut seen = vec![false; self.boxes.len()];
        let mut found = Vec::new();

        match self.voxel_range(query) {
            Some(range) => {
                for v in range.cells(self.resolution) {
                    for &index in &self.voxels[v] {
                        if !seen[index] {
                            seen[index] = true;
                            found.push(index);
                        }
                    }
                }
            }
            // An unbounded query reaches every bound box.
            None => {
                for (index, b) in self.boxes.iter().enumerate() {
                    if matches!(b, Some(b) if !b.is_void()) {
                        seen[index] = true;
                        found.push(index);
                    }
                }
            }
        }

        for &index in &self.large {
            if !seen[index] && self.boxes[index].is_some_and(|b| b.intersects(query)) {
                seen[index] = true;
                found.push(index);
            }
        }

        found.sort_unstable();
        Ok(found)
    }

    /// Indices of the boxes not strictly on one side of `plane`, ascending.
    pub fn compare_plane(&self, plane: &Plane) -> Result<Vec<usize>, SpatialIndexError> {
        if !self.initialized {
            return Err(SpatialIndexError::NotInitialized);
        }
        Ok(self
            .boxes
            .iter()
            .enumerate()
            .filter_map(|(index, b)| b.filter(|b| !b.is_out_of_plane(plane)).map(|_| index))
            .collect())
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Number of boxes held in the large-box list.
    pub fn nb_large(&self) -> usize {
        self.large.len()
    }

    fn large_threshold(&self) -> usize {
        let total = (self.resolution * self.resolution * self.resolution) as f64;
        ((self.config.large_box_fraction * total).ceil() as usize).max(1)
    }

    /// Voxel range of a non-void box, clamped to the grid. `None` when the
    /// box is not finite.
    fn voxel_range(&self, bbox: &BoundingBox) -> Option<VoxelRange> {
        if !bbox.min.is_finite() || !bbox.max.is_finite() {
            return None;
        }
        let last = self.resolution.saturating_sub(1) as f64;
        let mut range = VoxelRange { lo: [0; 3], hi: [0; 3] };
        for axis in 0..3 {
            let c = self.coeff[axis];
            if c == 0.0 {
                continue;
            }
            let origin = self.enclosing.min.coord(axis);
            let lo = ((bbox.min.coord(axis) - origin) * c).floor().clamp(0.0, last);
            let hi = ((bbox.max.coord(axis) - origin) * c).floor().clamp(0.0, last);
            range.lo[axis] = lo as usize;
            range.hi[axis] = hi as usize;
        }
        Some(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::Point3d;
    use crate::geometry::vector::Vec3;

    fn cube(x: f64, y: f64, z: f64, size: f64) -> BoundingBox {
        BoundingBox::new(Point3d::new(x, y, z), Point3d::new(x + size, y + size, z + size))
    }

    fn grid(resolution: usize) -> VoxelBoxSorter {
        VoxelBoxSorter::new(SpatialIndexConfig {
            resolution,
            ..SpatialIndexConfig::default()
        })
    }

    #[test]
    fn test_unit_boxes_more_than_a_voxel_apart_are_disjoint() {
        let mut index = grid(10);
        index.initialize_with_boxes(cube(0.0, 0.0, 0.0, 10.0), &[cube(0.2, 0.2, 0.2, 1.0)]).unwrap();
        assert!(index.compare(&cube(3.2, 0.2, 0.2, 1.0)).unwrap().is_empty());
        assert_eq!(index.compare(&cube(1.0, 0.5, 0.5, 1.0)).unwrap(), vec![0]);
    }

    #[test]
    fn test_overlapping_boxes_are_found() {
        let mut index = grid(8);
        let boxes = [cube(0.0, 0.0, 0.0, 1.0), cube(5.0, 5.0, 5.0, 1.0), cube(2.0, 0.0, 0.0, 1.0)];
        index.initialize_with_boxes(cube(0.0, 0.0, 0.0, 8.0), &boxes).unwrap();
        assert_eq!(index.compare(&cube(0.5, 0.5, 0.5, 2.0)).unwrap(), vec![0, 2]);
        assert_eq!(index.compare(&cube(5.5, 5.5, 5.5, 0.1)).unwrap(), vec![1]);
    }

    #[test]
    fn test_large_box_is_kept_once() {
        let mut index = grid(4);
        let boxes = [cube(0.0, 0.0, 0.0, 4.0), cube(0.0, 0.0, 0.0, 0.5)];
        index.initialize_with_boxes(cube(0.0, 0.0, 0.0, 4.0), &boxes).unwrap();
        assert_eq!(index.nb_large(), 1);
        assert_eq!(index.compare(&cube(3.0, 3.0, 3.0, 0.5)).unwrap(), vec![0]);
        assert_eq!(index.compare(&cube(0.1, 0.1, 0.1, 0.1)).unwrap(), vec![0, 1]);
        // Outside every box: large boxes are tested exactly.
        assert!(index.compare(&cube(6.0, 6.0, 6.0, 0.5)).unwrap().is_empty());
    }

    #[test]
    fn test_void_boxes_never_match() {
        let mut index = grid(4);
        let boxes = [BoundingBox::void(), cube(1.0, 1.0, 1.0, 1.0)];
        index.initialize_with_boxes(cube(0.0, 0.0, 0.0, 4.0), &boxes).unwrap();
        assert_eq!(index.compare(&cube(0.0, 0.0, 0.0, 4.0)).unwrap(), vec![1]);
        assert!(index.compare(&BoundingBox::void()).unwrap().is_empty());
    }

    #[test]
    fn test_added_box_reaches_every_covered_voxel() {
        let mut index = grid(8);
        index.initialize(cube(0.0, 0.0, 0.0, 8.0), 1);
        index.add(cube(1.2, 1.2, 1.2, 1.6), 0).unwrap();
        assert_eq!(index.nb_large(), 0);
        for corner in [1.1, 2.7] {
            assert_eq!(index.compare(&cube(corner, corner, corner, 0.1)).unwrap(), vec![0]);
        }
        assert_eq!(index.compare(&cube(1.1, 2.7, 1.1, 0.1)).unwrap(), vec![0]);
        assert!(index.compare(&cube(4.5, 4.5, 4.5, 0.1)).unwrap().is_empty());
    }

    #[test]
    fn test_add_errors_leave_index_unchanged() {
        let mut index = grid(4);
        assert_eq!(index.add(cube(0.0, 0.0, 0.0, 1.0), 0), Err(SpatialIndexError::NotInitialized));
        assert_eq!(index.compare(&cube(0.0, 0.0, 0.0, 1.0)), Err(SpatialIndexError::NotInitialized));

        index.initialize(cube(0.0, 0.0, 0.0, 4.0), 2);
        index.add(cube(0.0, 0.0, 0.0, 1.0), 1).unwrap();
        assert_eq!(
            index.add(cube(2.0, 2.0, 2.0, 1.0), 1),
            Err(SpatialIndexError::AlreadyBound { index: 1 })
        );
        assert_eq!(
            index.add(cube(2.0, 2.0, 2.0, 1.0), 2),
            Err(SpatialIndexError::OutOfRange { index: 2, capacity: 2 })
        );
        assert!(index.compare(&cube(2.0, 2.0, 2.0, 1.0)).unwrap().is_empty());
    }

    #[test]
    fn test_flat_enclosing_box() {
        let mut index = grid(8);
        let flat = |x: f64| BoundingBox::new(Point3d::new(x, 0.0, 1.0), Point3d::new(x + 1.0, 1.0, 1.0));
        index.initialize_with_boxes(flat(0.0).union(&flat(7.0)), &[flat(0.0), flat(7.0)]).unwrap();
        assert_eq!(index.compare(&flat(0.2)).unwrap(), vec![0]);
        assert_eq!(index.compare(&flat(6.5)).unwrap(), vec![1]);
    }

    #[test]
    fn test_boxes_outside_enclosing_are_clamped() {
        let mut index = grid(4);
        index.initialize_with_boxes(cube(0.0, 0.0, 0.0, 4.0), &[cube(10.0, 10.0, 10.0, 1.0)]).unwrap();
        assert_eq!(index.compare(&cube(10.5, 10.5, 10.5, 1.0)).unwrap(), vec![0]);
    }

    #[test]
    fn test_compare_plane() {
        let mut index = grid(4);
        let boxes = [cube(0.0, 0.0, 0.0, 1.0), cube(0.0, 0.0, 2.0, 1.0)];
        index.initialize_with_boxes(cube(0.0, 0.0, 0.0, 4.0), &boxes).unwrap();
        let plane = Plane::new(Point3d::new(0.0, 0.0, 2.5), Vec3::Z);
        assert_eq!(index.compare_plane(&plane).unwrap(), vec![1]);
    }

    #[test]
    fn test_automatic_resolution_grows_with_count() {
        let config = SpatialIndexConfig::default();
        assert_eq!(config.resolution_for(1), 2);
        assert!(config.resolution_for(1000) >= config.resolution_for(10));
        assert_eq!(config.resolution_for(10_000_000), MAX_AUTO_RESOLUTION);
    }
}
