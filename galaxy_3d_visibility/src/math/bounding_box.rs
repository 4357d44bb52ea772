/// Axis-aligned bounding box in world or local space.
///
/// A box with `min > max` on any axis is *undefined*: it contains nothing,
/// merging into it adopts the other operand, and the octree treats it as a
/// zero-size box that lands at the root.

use glam::{Mat4, Vec3};
use super::{Intersection, Sphere};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Undefined box (min = +inf, max = -inf).
    pub fn undefined() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Box covering all representable space. Used for directional lights.
    pub fn infinite() -> Self {
        Self {
            min: Vec3::splat(-f32::MAX),
            max: Vec3::splat(f32::MAX),
        }
    }

    pub fn from_center_half_size(center: Vec3, half_size: Vec3) -> Self {
        Self { min: center - half_size, max: center + half_size }
    }

    /// Smallest box containing all points. Undefined for an empty slice.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut result = Self::undefined();
        for point in points {
            result.merge_point(*point);
        }
        result
    }

    /// Whether min <= max on every axis.
    pub fn is_defined(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.max + self.min) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Half extents. Computed per corner so the infinite box does not overflow.
    pub fn half_size(&self) -> Vec3 {
        self.max * 0.5 - self.min * 0.5
    }

    /// Grow to include `point`.
    pub fn merge_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow to include `other`. Merging an undefined box is a no-op.
    pub fn merge(&mut self, other: &BoundingBox) {
        if other.is_defined() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Intersection of both boxes; undefined when they do not overlap.
    pub fn clipped(&self, other: &BoundingBox) -> BoundingBox {
        let clipped = BoundingBox {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        if clipped.is_defined() { clipped } else { BoundingBox::undefined() }
    }

    /// Transform this box by a matrix, returning the enclosing box.
    ///
    /// Arvo's method: projects each matrix axis onto the box extents instead
    /// of transforming all 8 corners. Undefined boxes stay undefined.
    pub fn transformed(&self, matrix: &Mat4) -> BoundingBox {
        if !self.is_defined() {
            return *self;
        }

        let translation = matrix.col(3).truncate();
        let mut new_min = translation;
        let mut new_max = translation;

        for i in 0..3 {
            let axis = matrix.col(i).truncate();
            let a = axis * self.min[i];
            let b = axis * self.max[i];
            new_min += a.min(b);
            new_max += a.max(b);
        }

        BoundingBox { min: new_min, max: new_max }
    }

    /// Test if this box fully contains `other` (boundaries touching count).
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.min.x && self.max.x >= other.max.x
        && self.min.y <= other.min.y && self.max.y >= other.max.y
        && self.min.z <= other.min.z && self.max.z >= other.max.z
    }

    /// Test if the two boxes overlap or touch.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
        && self.min.y <= other.max.y && self.max.y >= other.min.y
        && self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Classify `other` against this box.
    pub fn is_inside(&self, other: &BoundingBox) -> Intersection {
        if !self.intersects(other) {
            Intersection::Outside
        } else if self.contains(other) {
            Intersection::Inside
        } else {
            Intersection::Intersects
        }
    }

    /// Classify a sphere against this box.
    pub fn is_inside_sphere(&self, sphere: &Sphere) -> Intersection {
        let closest = sphere.center.clamp(self.min, self.max);
        let dist_squared = (closest - sphere.center).length_squared();
        if dist_squared >= sphere.radius * sphere.radius {
            return Intersection::Outside;
        }

        let radius = Vec3::splat(sphere.radius);
        if (sphere.center - radius).cmpge(self.min).all() && (sphere.center + radius).cmple(self.max).all() {
            Intersection::Inside
        } else {
            Intersection::Intersects
        }
    }

    /// The 8 corners. Bit 0 selects max x, bit 1 max y, bit 2 max z.
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| Vec3::new(
            if i & 1 == 0 { self.min.x } else { self.max.x },
            if i & 2 == 0 { self.min.y } else { self.max.y },
            if i & 4 == 0 { self.min.z } else { self.max.z },
        ))
    }

    /// The 12 edges as line segments, for debug drawing.
    pub fn edges(&self) -> [(Vec3, Vec3); 12] {
        let c = self.corners();
        [
            (c[0], c[1]), (c[2], c[3]), (c[4], c[5]), (c[6], c[7]),
            (c[0], c[2]), (c[1], c[3]), (c[4], c[6]), (c[5], c[7]),
            (c[0], c[4]), (c[1], c[5]), (c[2], c[6]), (c[3], c[7]),
        ]
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::undefined()
    }
}

#[cfg(test)]
#[path = "bounding_box_tests.rs"]
mod tests;
