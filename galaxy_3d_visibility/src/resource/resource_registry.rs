/// Central registry for render resources.
///
/// Creates geometries, materials and passes and hands each a 16-bit sort
/// id from a per-kind pool. Ids return to their pool when the last `Arc`
/// to the resource drops, so the key space is recycled.

use std::sync::{Arc, Mutex};
use crate::error::Result;
use crate::engine_err;
use crate::utils::SlotAllocator;
use super::geometry::{Geometry, GeometryDesc};
use super::material::{Material, MaterialDesc};
use super::pass::Pass;
use super::sort_id::{SortId, SortIdPool};

pub struct ResourceRegistry {
    geometry_ids: SortIdPool,
    material_ids: SortIdPool,
    pass_ids: SortIdPool,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            geometry_ids: Arc::new(Mutex::new(SlotAllocator::new())),
            material_ids: Arc::new(Mutex::new(SlotAllocator::new())),
            pass_ids: Arc::new(Mutex::new(SlotAllocator::new())),
        }
    }

    pub fn create_geometry(&self, desc: GeometryDesc) -> Result<Arc<Geometry>> {
        let sort_id = Self::lease(&self.geometry_ids, "geometry")?;
        Ok(Arc::new(Geometry::from_desc(desc, sort_id)?))
    }

    pub fn create_material(&self, desc: MaterialDesc) -> Result<Arc<Material>> {
        let sort_id = Self::lease(&self.material_ids, "material")?;
        let pass_ids = &self.pass_ids;
        let material = Material::from_desc(desc, sort_id, |pass_desc| {
            Pass::from_desc(pass_desc, Self::lease(pass_ids, "pass")?)
        })?;
        Ok(Arc::new(material))
    }

    /// Live geometries
    pub fn geometry_count(&self) -> u32 {
        Self::live(&self.geometry_ids)
    }

    /// Live materials
    pub fn material_count(&self) -> u32 {
        Self::live(&self.material_ids)
    }

    /// Live passes
    pub fn pass_count(&self) -> u32 {
        Self::live(&self.pass_ids)
    }

    fn lease(pool: &SortIdPool, kind: &str) -> Result<SortId> {
        SortId::lease(pool).ok_or_else(|| {
            engine_err!("galaxy3d::ResourceRegistry", "All 65536 {} sort ids are in use", kind)
        })
    }

    fn live(pool: &SortIdPool) -> u32 {
        pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "resource_registry_tests.rs"]
mod tests;
