/// Bounding sphere. Point-light volumes and cluster tests use it.

use glam::Vec3;
use super::{BoundingBox, Intersection};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Enclosing axis-aligned box.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_center_half_size(self.center, Vec3::splat(self.radius))
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        (point - self.center).length_squared() < self.radius * self.radius
    }

    /// Classify a box against this sphere.
    pub fn is_inside(&self, bbox: &BoundingBox) -> Intersection {
        let radius_squared = self.radius * self.radius;
        let closest = self.center.clamp(bbox.min, bbox.max);
        if (closest - self.center).length_squared() >= radius_squared {
            return Intersection::Outside;
        }

        // Farthest corner decides full containment
        let near = (self.center - bbox.min).abs();
        let far = (self.center - bbox.max).abs();
        let farthest = near.max(far);
        if farthest.length_squared() >= radius_squared {
            Intersection::Intersects
        } else {
            Intersection::Inside
        }
    }

    /// Whether the sphere overlaps the box at all.
    pub fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        self.is_inside(bbox) != Intersection::Outside
    }

    /// Classify another sphere against this sphere.
    pub fn is_inside_sphere(&self, other: &Sphere) -> Intersection {
        let dist = (other.center - self.center).length();
        if dist >= self.radius + other.radius {
            Intersection::Outside
        } else if dist + other.radius < self.radius {
            Intersection::Inside
        } else {
            Intersection::Intersects
        }
    }
}
