/// Occluder - CPU-side mesh rasterized into the software occlusion buffer.
///
/// Occluders are never drawn on the GPU. They only hide octants and
/// geometry behind them, so they should be cheap, closed and solid
/// (walls, terrain blocks, large buildings).

use std::sync::Arc;
use glam::Vec3;
use crate::math::BoundingBox;

#[derive(Debug, Clone)]
pub struct Occluder {
    vertices: Arc<[Vec3]>,
    /// Triangle list indices; `None` means consecutive vertex triples
    indices: Option<Arc<[u32]>>,
    local_bounding_box: BoundingBox,
    /// Beyond this camera distance the occluder is skipped, 0 = unlimited
    max_distance: f32,
}

impl Occluder {
    pub fn new(vertices: Vec<Vec3>, indices: Option<Vec<u32>>) -> Self {
        let local_bounding_box = BoundingBox::from_points(&vertices);
        Self {
            vertices: vertices.into(),
            indices: indices.map(Into::into),
            local_bounding_box,
            max_distance: 0.0,
        }
    }

    /// Axis-aligned box occluder centered on the origin.
    pub fn cuboid(half_size: Vec3) -> Self {
        let bbox = BoundingBox::from_center_half_size(Vec3::ZERO, half_size);
        let vertices = bbox.corners().to_vec();
        // Counter-clockwise seen from outside; corner bit 0 = +x, bit 1 = +y, bit 2 = +z
        let indices = vec![
            0, 2, 3, 0, 3, 1, // -z
            4, 5, 7, 4, 7, 6, // +z
            0, 4, 6, 0, 6, 2, // -x
            1, 3, 7, 1, 7, 5, // +x
            0, 1, 5, 0, 5, 4, // -y
            2, 6, 7, 2, 7, 3, // +y
        ];
        Self::new(vertices, Some(indices))
    }

    pub fn set_max_distance(&mut self, distance: f32) {
        self.max_distance = distance.max(0.0);
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn num_triangles(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.vertices.len() / 3,
        }
    }

    pub fn local_bounding_box(&self) -> BoundingBox {
        self.local_bounding_box
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }
}
