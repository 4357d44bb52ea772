/// Volumes the octree can be queried with.
///
/// Implemented for frustums, spheres and boxes. Octant culling boxes are
/// classified with the three-state `is_inside`; contained drawables are
/// then checked with the cheaper two-state `is_inside_fast`.

use crate::camera::Frustum;
use crate::math::{BoundingBox, Intersection, Sphere};

pub trait CullingVolume: Send + Sync {
    /// Classify a box: outside, intersecting, or fully inside the volume.
    fn is_inside(&self, bbox: &BoundingBox) -> Intersection;

    /// Two-state test: `Outside` or `Inside`.
    fn is_inside_fast(&self, bbox: &BoundingBox) -> Intersection {
        match self.is_inside(bbox) {
            Intersection::Outside => Intersection::Outside,
            _ => Intersection::Inside,
        }
    }
}

impl CullingVolume for Frustum {
    fn is_inside(&self, bbox: &BoundingBox) -> Intersection {
        Frustum::is_inside(self, bbox)
    }

    fn is_inside_fast(&self, bbox: &BoundingBox) -> Intersection {
        Frustum::is_inside_fast(self, bbox)
    }
}

impl CullingVolume for Sphere {
    fn is_inside(&self, bbox: &BoundingBox) -> Intersection {
        Sphere::is_inside(self, bbox)
    }
}

impl CullingVolume for BoundingBox {
    fn is_inside(&self, bbox: &BoundingBox) -> Intersection {
        BoundingBox::is_inside(self, bbox)
    }
}
