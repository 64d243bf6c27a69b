//! Bounding-sphere hierarchy over a static set of items.
//!
//! Nodes live in one arena vector and refer to each other by index.

use crate::geometry::point::Point3d;
use crate::geometry::vector::Vec3;

/// Items per leaf before a node is split.
const LEAF_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Point3d,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: Point3d, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Smallest sphere centered at `center` containing all `points`.
    pub fn around(center: Point3d, points: &[Point3d]) -> Self {
        let radius = points.iter().map(|p| p.distance_to(&center)).fold(0.0, f64::max);
        Self { center, radius }
    }

    /// A sphere enclosing both.
    pub fn merged(&self, other: &Self) -> Self {
        let d = other.center - self.center;
        let dist = d.length();
        if dist + other.radius <= self.radius {
            return *self;
        }
        if dist + self.radius <= other.radius {
            return *other;
        }
        let radius = 0.5 * (dist + self.radius + other.radius);
        let center = self.center + d * ((radius - self.radius) / dist);
        Self { center, radius }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { sphere: BoundingSphere, first: usize, count: usize },
    Branch { sphere: BoundingSphere, left: usize, right: usize },
}

impl Node {
    fn sphere(&self) -> &BoundingSphere {
        match self {
            Node::Leaf { sphere, .. } | Node::Branch { sphere, .. } => sphere,
        }
    }
}

/// Sphere hierarchy answering nearest/farthest-center queries.
#[derive(Debug, Clone)]
pub struct SphereTree {
    nodes: Vec<Node>,
    /// Item spheres, reordered so each leaf owns a contiguous run.
    spheres: Vec<BoundingSphere>,
    /// Caller-side index of each entry in `spheres`.
    ids: Vec<usize>,
}

impl SphereTree {
    /// Build over `spheres`; item `i` is reported as `i`.
    pub fn build(spheres: &[BoundingSphere]) -> Self {
        let mut order: Vec<usize> = (0..spheres.len()).collect();
        let mut tree = Self {
            nodes: Vec::with_capacity(2 * spheres.len() / LEAF_SIZE + 1),
            spheres: Vec::new(),
            ids: Vec::new(),
        };
        if !spheres.is_empty() {
            tree.split(spheres, &mut order, 0);
            tree.ids = order;
            tree.spheres = tree.ids.iter().map(|&i| spheres[i]).collect();
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn split(&mut self, all: &[BoundingSphere], order: &mut [usize], first: usize) -> usize {
        let sphere = order[1..]
            .iter()
            .fold(all[order[0]], |acc, &i| acc.merged(&all[i]));

        let node = self.nodes.len();
        if order.len() <= LEAF_SIZE {
            self.nodes.push(Node::Leaf { sphere, first, count: order.len() });
            return node;
        }

        // Median split along the widest spread of centers.
        let (lo, hi) = order.iter().fold(
            (Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY), Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY)),
            |(lo, hi), &i| {
                let c = all[i].center;
                (
                    Vec3::new(lo.x.min(c.x), lo.y.min(c.y), lo.z.min(c.z)),
                    Vec3::new(hi.x.max(c.x), hi.y.max(c.y), hi.z.max(c.z)),
                )
            },
        );
        let spread = hi - lo;
        let axis = if spread.x >= spread.y && spread.x >= spread.z {
            0
        } else if spread.y >= spread.z {
            1
        } else {
            2
        };
        let mid = order.len() / 2;
        order.select_nth_unstable_by(mid, |&a, &b| all[a].center.coord(axis).total_cmp(&all[b].center.coord(axis)));

        self.nodes.push(Node::Leaf { sphere, first, count: 0 });
        let (left_items, right_items) = order.split_at_mut(mid);
        let left = self.split(all, left_items, first);
        let right = self.split(all, right_items, first + mid);
        self.nodes[node] = Node::Branch { sphere, left, right };
        node
    }

    /// Item whose sphere center is closest to `p`.
    pub fn nearest(&self, p: &Point3d) -> Option<usize> {
        self.search(p, true)
    }

    /// Item whose sphere center is farthest from `p`.
    pub fn farthest(&self, p: &Point3d) -> Option<usize> {
        self.search(p, false)
    }

    fn search(&self, p: &Point3d, nearest: bool) -> Option<usize> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best: Option<(usize, f64)> = None;
        let mut stack = vec![0usize];
        while let Some(n) = stack.pop() {
            let node = &self.nodes[n];
            let s = node.sphere();
            let dist = p.distance_to(&s.center);
            if let Some((_, best_dist)) = best {
                let prune = if nearest {
                    dist - s.radius > best_dist
                } else {
                    dist + s.radius < best_dist
                };
                if prune {
                    continue;
                }
            }
            match *node {
                Node::Leaf { first, count, .. } => {
                    for k in first..first + count {
                        let d = p.distance_to(&self.spheres[k].center);
                        let better = match best {
                            None => true,
                            Some((_, b)) => if nearest { d < b } else { d > b },
                        };
                        if better {
                            best = Some((self.ids[k], d));
                        }
                    }
                }
                Node::Branch { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        best.map(|(id, _)| id)
    }
}
