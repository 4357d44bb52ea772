/// Ray with a normalized direction, for octree raycasts.

use glam::Vec3;
use super::{BoundingBox, Sphere};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray. The direction is normalized; a zero direction yields
    /// a ray that hits nothing.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction: direction.normalize_or_zero() }
    }

    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Distance to the box along the ray, `f32::INFINITY` on a miss.
    /// Zero when the origin is inside the box.
    pub fn hit_distance_box(&self, bbox: &BoundingBox) -> f32 {
        if !bbox.is_defined() || self.direction == Vec3::ZERO {
            return f32::INFINITY;
        }
        if bbox.contains_point(self.origin) {
            return 0.0;
        }

        // Slab test
        let inv = self.direction.recip();
        let t0 = (bbox.min - self.origin) * inv;
        let t1 = (bbox.max - self.origin) * inv;
        let t_near = t0.min(t1).max_element();
        let t_far = t0.max(t1).min_element();

        if t_near.is_nan() || t_far < t_near.max(0.0) {
            f32::INFINITY
        } else {
            t_near.max(0.0)
        }
    }

    /// Distance to the sphere along the ray, `f32::INFINITY` on a miss.
    pub fn hit_distance_sphere(&self, sphere: &Sphere) -> f32 {
        if self.direction == Vec3::ZERO {
            return f32::INFINITY;
        }

        let centered = self.origin - sphere.center;
        let squared_radius = sphere.radius * sphere.radius;
        if centered.length_squared() <= squared_radius {
            return 0.0;
        }

        let b = 2.0 * centered.dot(self.direction);
        let c = centered.length_squared() - squared_radius;
        let d = b * b - 4.0 * c;
        if d < 0.0 {
            return f32::INFINITY;
        }

        let d_sqrt = d.sqrt();
        let dist = (-b - d_sqrt) * 0.5;
        if dist >= 0.0 {
            dist
        } else {
            let far = (-b + d_sqrt) * 0.5;
            if far >= 0.0 { far } else { f32::INFINITY }
        }
    }

    /// Distance to a triangle (either winding), `f32::INFINITY` on a miss.
    ///
    /// Möller-Trumbore intersection.
    pub fn hit_distance_triangle(&self, v0: Vec3, v1: Vec3, v2: Vec3) -> f32 {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < f32::EPSILON {
            return f32::INFINITY;
        }

        let inv_det = 1.0 / det;
        let t_vec = self.origin - v0;
        let u = t_vec.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return f32::INFINITY;
        }
        let q = t_vec.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return f32::INFINITY;
        }

        let distance = edge2.dot(q) * inv_det;
        if distance >= 0.0 { distance } else { f32::INFINITY }
    }
}
