use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::surfaces::Plane;
use super::vector::Vec3;

/// Axis-aligned bounding box.
///
/// A box whose `max` is below its `min` on any axis is void: it contains
/// nothing and is disjoint from every box, including itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::void()
    }
}

impl BoundingBox {
    pub fn new(min: Point3d, max: Point3d) -> Self {
        Self { min, max }
    }

    pub fn void() -> Self {
        Self {
            min: Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: &[Point3d]) -> Self {
        let mut bb = Self::void();
        for p in points {
            bb.add_point(p);
        }
        bb
    }

    pub fn is_void(&self) -> bool {
        !(self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z)
    }

    pub fn add_point(&mut self, p: &Point3d) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn union(&self, other: &Self) -> Self {
        if self.is_void() {
            return *other;
        }
        if other.is_void() {
            return *self;
        }
        Self {
            min: Point3d::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3d::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_void()
            && !other.is_void()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, p: &Point3d) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn center(&self) -> Point3d {
        self.min.midpoint(&self.max)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Grow the box by `gap` on every side. Void boxes stay void.
    pub fn enlarged(&self, gap: f64) -> Self {
        if self.is_void() {
            return *self;
        }
        let g = Vec3::new(gap, gap, gap);
        Self {
            min: self.min - g,
            max: self.max + g,
        }
    }

    /// Smallest Euclidean distance between the two boxes; zero when they overlap,
    /// infinite when either is void.
    pub fn distance(&self, other: &Self) -> f64 {
        if self.is_void() || other.is_void() {
            return f64::INFINITY;
        }
        let mut sq = 0.0;
        for axis in 0..3 {
            let gap = (other.min.coord(axis) - self.max.coord(axis))
                .max(self.min.coord(axis) - other.max.coord(axis))
                .max(0.0);
            sq += gap * gap;
        }
        sq.sqrt()
    }

    /// Smallest distance from the box to a point; infinite for a void box.
    pub fn distance_to_point(&self, p: &Point3d) -> f64 {
        self.distance(&Self::new(*p, *p))
    }

    /// True when the box lies strictly on one side of the plane.
    pub fn is_out_of_plane(&self, plane: &Plane) -> bool {
        if self.is_void() {
            return true;
        }
        let c = self.center();
        let half = self.size() * 0.5;
        let n = plane.normal;
        let radius = half.x * n.x.abs() + half.y * n.y.abs() + half.z * n.z.abs();
        plane.signed_distance(&c).abs() > radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box_at(x: f64, y: f64, z: f64) -> BoundingBox {
        BoundingBox::new(Point3d::new(x - 0.5, y - 0.5, z - 0.5), Point3d::new(x + 0.5, y + 0.5, z + 0.5))
    }

    #[test]
    fn test_void_box_is_disjoint_from_everything() {
        let void = BoundingBox::void();
        let a = unit_box_at(0.0, 0.0, 0.0);
        assert!(void.is_void());
        assert!(!void.intersects(&a));
        assert!(!a.intersects(&void));
        assert!(!void.intersects(&void));
        assert_eq!(void.distance(&a), f64::INFINITY);
    }

    #[test]
    fn test_union_ignores_void() {
        let a = unit_box_at(1.0, 2.0, 3.0);
        assert_eq!(a.union(&BoundingBox::void()), a);
        assert_eq!(BoundingBox::void().union(&a), a);
    }

    #[test]
    fn test_box_distance() {
        let a = unit_box_at(0.0, 0.0, 0.0);
        let b = unit_box_at(3.0, 0.0, 0.0);
        assert!((a.distance(&b) - 2.0).abs() < 1e-12);
        assert!((b.distance(&a) - 2.0).abs() < 1e-12);

        let c = unit_box_at(3.0, 4.0, 0.0);
        // gaps of 2 and 3 along x and y
        assert!((a.distance(&c) - 13f64.sqrt()).abs() < 1e-12);
        assert_eq!(a.distance(&unit_box_at(0.5, 0.5, 0.0)), 0.0);
    }

    #[test]
    fn test_enlarged_box_touches_neighbor() {
        let a = unit_box_at(0.0, 0.0, 0.0);
        let b = unit_box_at(3.0, 0.0, 0.0);
        assert!(!a.intersects(&b));
        assert!(a.enlarged(2.0).intersects(&b));
    }

    #[test]
    fn test_plane_straddle() {
        let a = unit_box_at(0.0, 0.0, 0.0);
        assert!(!a.is_out_of_plane(&Plane::new(Point3d::ORIGIN, Vec3::Z)));
        assert!(a.is_out_of_plane(&Plane::new(Point3d::new(0.0, 0.0, 2.0), Vec3::Z)));
        assert!(!a.is_out_of_plane(&Plane::new(Point3d::new(0.0, 0.0, 0.5), Vec3::new(1.0, 1.0, 1.0))));
    }
}
