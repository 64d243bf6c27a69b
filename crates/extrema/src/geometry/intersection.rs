use super::point::Point3d;
use super::surfaces::{Cylinder, Plane, Sphere};
use super::vector::Vec3;

/// A half-line for inside/outside tests.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3d,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Point3d, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalized_or(Vec3::X),
        }
    }

    pub fn at(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }
}

/// A ray-surface crossing at ray parameter `t >= 0`.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub point: Point3d,
    pub t: f64,
}

/// Real roots of `a x^2 + b x + c`, ascending. A double root is reported once.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a.abs() < 1e-15 {
        if b.abs() < 1e-15 {
            return vec![];
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return vec![];
    }
    if disc == 0.0 {
        return vec![-b / (2.0 * a)];
    }
    // Avoid cancellation between -b and sqrt(disc).
    let q = -0.5 * (b + b.signum() * disc.sqrt());
    let (r1, r2) = if q == 0.0 { (0.0, 0.0) } else { (q / a, c / q) };
    let mut roots = vec![r1, r2];
    roots.sort_by(|x, y| x.total_cmp(y));
    roots.dedup();
    roots
}

pub fn ray_plane(ray: &Ray, plane: &Plane) -> Option<RayHit> {
    let denom = ray.direction.dot(&plane.normal);
    if denom.abs() < 1e-15 {
        return None;
    }
    let t = (plane.origin - ray.origin).dot(&plane.normal) / denom;
    (t >= 0.0).then(|| RayHit { point: ray.at(t), t })
}

pub fn ray_sphere(ray: &Ray, sphere: &Sphere) -> Vec<RayHit> {
    let oc = ray.origin - sphere.center;
    let b = 2.0 * oc.dot(&ray.direction);
    let c = oc.length_squared() - sphere.radius * sphere.radius;
    hits_from_roots(ray, solve_quadratic(ray.direction.length_squared(), b, c))
}

pub fn ray_cylinder(ray: &Ray, cyl: &Cylinder) -> Vec<RayHit> {
    let oc = ray.origin - cyl.origin;
    let d = ray.direction - cyl.axis * ray.direction.dot(&cyl.axis);
    let o = oc - cyl.axis * oc.dot(&cyl.axis);
    let a = d.length_squared();
    if a < 1e-15 {
        return vec![];
    }
    hits_from_roots(ray, solve_quadratic(a, 2.0 * d.dot(&o), o.length_squared() - cyl.radius * cyl.radius))
}

fn hits_from_roots(ray: &Ray, roots: Vec<f64>) -> Vec<RayHit> {
    roots
        .into_iter()
        .filter(|t| *t >= 0.0)
        .map(|t| RayHit { point: ray.at(t), t })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_roots_sorted() {
        assert_eq!(solve_quadratic(1.0, 0.0, -4.0), vec![-2.0, 2.0]);
        assert_eq!(solve_quadratic(1.0, -2.0, 1.0), vec![1.0]);
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_empty());
        assert_eq!(solve_quadratic(0.0, 2.0, -4.0), vec![2.0]);
    }

    #[test]
    fn test_quadratic_small_root_is_accurate() {
        let roots = solve_quadratic(1.0, -1e8, 1.0);
        assert!((roots[0] - 1e-8).abs() < 1e-20);
    }

    #[test]
    fn test_ray_plane_behind_is_none() {
        let plane = Plane::new(Point3d::new(0.0, 0.0, -1.0), Vec3::Z);
        assert!(ray_plane(&Ray::new(Point3d::ORIGIN, Vec3::Z), &plane).is_none());
        let hit = ray_plane(&Ray::new(Point3d::ORIGIN, -Vec3::Z), &plane).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ray_from_inside_sphere_hits_once() {
        let sphere = Sphere::new(Point3d::ORIGIN, 2.0);
        let hits = ray_sphere(&Ray::new(Point3d::ORIGIN, Vec3::X), &sphere);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].point.x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_ray_cylinder_crossings() {
        let cyl = Cylinder::new(Point3d::ORIGIN, Vec3::Z, 1.0);
        let hits = ray_cylinder(&Ray::new(Point3d::new(-5.0, 0.0, 3.0), Vec3::X), &cyl);
        assert_eq!(hits.len(), 2);
        assert!((hits[0].t - 4.0).abs() < 1e-12);
        assert!((hits[1].t - 6.0).abs() < 1e-12);
    }
}
