//! Math collaborators - bounding volumes and integer rectangles.
//!
//! Vectors and matrices come from `glam`. This module adds the value types
//! the visibility pipeline tests against each other: boxes, spheres, rays
//! and atlas rectangles, plus the shared three-state `Intersection` result.

mod bounding_box;
mod sphere;
mod ray;
mod rect;

pub use bounding_box::BoundingBox;
pub use sphere::Sphere;
pub use ray::Ray;
pub use rect::IntRect;

/// Result of a containment test between two volumes.
///
/// Spatial queries use it to prune work:
/// - `Outside` → skip the whole subtree
/// - `Inside` → accept all contents without further tests
/// - `Intersects` → test contents individually and recurse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// Entirely outside
    Outside,
    /// Partially overlapping
    Intersects,
    /// Entirely inside
    Inside,
}

/// Tolerance used by approximate float comparisons.
pub const EPSILON: f32 = 1e-6;
