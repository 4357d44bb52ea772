/// GeometryNode - renderable geometry drawable.
///
/// Holds one source batch per sub-mesh: a geometry plus the material whose
/// passes decide which queues the sub-mesh lands in. The batch collector
/// turns each source batch into one `Batch` per frame.

use std::sync::Arc;
use crate::engine_error;
use crate::math::BoundingBox;
use crate::resource::{Geometry, Material};

/// How the vertex shader sources the world transform. Anything but
/// `Static` carries per-instance shader state and is never instanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeometryType {
    #[default]
    Static,
    Skinned,
    Instanced,
    Custom,
}

impl GeometryType {
    /// Bits stored in a batch: 0 for plain static geometry
    pub fn bits(self) -> u8 {
        match self {
            GeometryType::Static => 0,
            GeometryType::Skinned => 1,
            GeometryType::Instanced => 2,
            GeometryType::Custom => 3,
        }
    }
}

/// One sub-mesh of a geometry node
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub geometry: Arc<Geometry>,
    pub material: Arc<Material>,
}

#[derive(Debug, Clone)]
pub struct GeometryNode {
    batches: Vec<SourceBatch>,
    local_bounding_box: BoundingBox,
    geometry_type: GeometryType,
}

impl GeometryNode {
    pub fn new(local_bounding_box: BoundingBox) -> Self {
        Self {
            batches: Vec::new(),
            local_bounding_box,
            geometry_type: GeometryType::Static,
        }
    }

    /// Node with a single sub-mesh.
    pub fn with_batch(local_bounding_box: BoundingBox, geometry: Arc<Geometry>, material: Arc<Material>) -> Self {
        let mut node = Self::new(local_bounding_box);
        node.add_batch(geometry, material);
        node
    }

    /// Append a sub-mesh. Returns its index.
    pub fn add_batch(&mut self, geometry: Arc<Geometry>, material: Arc<Material>) -> usize {
        self.batches.push(SourceBatch { geometry, material });
        self.batches.len() - 1
    }

    /// Replace the geometry of sub-mesh `index`.
    ///
    /// A missing geometry or an out-of-range index is logged and ignored;
    /// the sub-mesh keeps its previous geometry.
    pub fn set_geometry(&mut self, index: usize, geometry: Option<Arc<Geometry>>) {
        let Some(geometry) = geometry else {
            engine_error!("galaxy3d::GeometryNode", "Null geometry assigned to sub-mesh {}", index);
            return;
        };
        match self.batches.get_mut(index) {
            Some(batch) => batch.geometry = geometry,
            None => engine_error!("galaxy3d::GeometryNode",
                "Sub-mesh index {} out of range ({} sub-meshes)", index, self.batches.len()),
        }
    }

    /// Replace the material of sub-mesh `index`, same failure rules as `set_geometry`.
    pub fn set_material(&mut self, index: usize, material: Option<Arc<Material>>) {
        let Some(material) = material else {
            engine_error!("galaxy3d::GeometryNode", "Null material assigned to sub-mesh {}", index);
            return;
        };
        match self.batches.get_mut(index) {
            Some(batch) => batch.material = material,
            None => engine_error!("galaxy3d::GeometryNode",
                "Sub-mesh index {} out of range ({} sub-meshes)", index, self.batches.len()),
        }
    }

    /// Use one material on every sub-mesh.
    pub fn set_material_all(&mut self, material: Option<Arc<Material>>) {
        let Some(material) = material else {
            engine_error!("galaxy3d::GeometryNode", "Null material assigned to all sub-meshes");
            return;
        };
        for batch in &mut self.batches {
            batch.material = material.clone();
        }
    }

    pub fn set_local_bounding_box(&mut self, bbox: BoundingBox) {
        self.local_bounding_box = bbox;
    }

    pub fn set_geometry_type(&mut self, geometry_type: GeometryType) {
        self.geometry_type = geometry_type;
    }

    pub fn batches(&self) -> &[SourceBatch] {
        &self.batches
    }

    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    pub fn local_bounding_box(&self) -> BoundingBox {
        self.local_bounding_box
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }
}
