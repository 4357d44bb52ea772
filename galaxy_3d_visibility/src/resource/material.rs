/// Resource-level material type.
///
/// A Material groups up to one pass per `PassType` with the textures the
/// passes sample. Batches reference the pass; the material is bound when
/// the pass changes to one belonging to a different material.

use std::sync::Arc;
use crate::error::Result;
use crate::engine_bail;
use crate::graphics_device::TextureHandle;
use super::pass::{Pass, PassDesc, PassType, NUM_PASS_TYPES};
use super::sort_id::SortId;

/// Maximum texture units a material can bind
pub const MAX_MATERIAL_TEXTURE_UNITS: usize = 8;

// ===== MATERIAL =====

#[derive(Debug)]
pub struct Material {
    sort_id: SortId,
    passes: [Option<Arc<Pass>>; NUM_PASS_TYPES],
    textures: Vec<(u32, TextureHandle)>,
}

// ===== DESCRIPTORS =====

/// Material creation descriptor
#[derive(Debug, Clone, Default)]
pub struct MaterialDesc {
    pub passes: Vec<PassDesc>,
    /// (texture unit, texture)
    pub textures: Vec<(u32, TextureHandle)>,
}

// ===== MATERIAL IMPLEMENTATION =====

impl Material {
    /// Create material from descriptor and already-built passes
    /// (internal use by ResourceRegistry)
    pub(crate) fn from_desc(
        desc: MaterialDesc,
        sort_id: SortId,
        mut build_pass: impl FnMut(PassDesc) -> Result<Pass>,
    ) -> Result<Self> {

        // ========== VALIDATION 1: At least one pass ==========
        if desc.passes.is_empty() {
            engine_bail!("galaxy3d::Material", "Material must define at least one pass");
        }

        // ========== VALIDATION 2: Texture units in range and unique ==========
        let mut used_units = 0u32;
        for &(unit, _) in &desc.textures {
            if unit as usize >= MAX_MATERIAL_TEXTURE_UNITS {
                engine_bail!("galaxy3d::Material",
                    "Texture unit {} out of range (max {})", unit, MAX_MATERIAL_TEXTURE_UNITS - 1);
            }
            if used_units & (1 << unit) != 0 {
                engine_bail!("galaxy3d::Material", "Duplicate texture unit {}", unit);
            }
            used_units |= 1 << unit;
        }

        // ========== BUILD PASSES ==========
        let mut passes: [Option<Arc<Pass>>; NUM_PASS_TYPES] = Default::default();
        for pass_desc in desc.passes {
            let slot = &mut passes[pass_desc.pass_type.index()];
            if slot.is_some() {
                engine_bail!("galaxy3d::Material",
                    "Duplicate {:?} pass", pass_desc.pass_type);
            }
            *slot = Some(Arc::new(build_pass(pass_desc)?));
        }

        Ok(Self {
            sort_id,
            passes,
            textures: desc.textures,
        })
    }

    // ===== ACCESSORS =====

    pub fn id(&self) -> u16 {
        self.sort_id.get()
    }

    /// Pass by type, `None` when the material does not render in it
    pub fn pass(&self, pass_type: PassType) -> Option<&Arc<Pass>> {
        self.passes[pass_type.index()].as_ref()
    }

    pub fn has_pass(&self, pass_type: PassType) -> bool {
        self.passes[pass_type.index()].is_some()
    }

    /// (texture unit, texture) pairs
    pub fn textures(&self) -> &[(u32, TextureHandle)] {
        &self.textures
    }
}
