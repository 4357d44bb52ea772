/// Resource-level geometry type.
///
/// A Geometry is one draw range inside backend vertex (and optionally
/// index) buffers. Drawables that render the same object share one
/// `Arc<Geometry>`, which is what lets the batch queue merge their draws
/// into a single instanced call.

use crate::error::Result;
use crate::engine_bail;
use crate::graphics_device::BufferHandle;
use super::sort_id::SortId;

// ===== GEOMETRY =====

#[derive(Debug)]
pub struct Geometry {
    sort_id: SortId,
    vertex_buffer: BufferHandle,
    index_buffer: Option<BufferHandle>,
    draw_start: u32,
    draw_count: u32,
    lod_distance: f32,
}

// ===== DESCRIPTOR =====

/// Geometry creation descriptor
#[derive(Debug, Clone)]
pub struct GeometryDesc {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: Option<BufferHandle>,
    /// Index start when indexed, vertex start otherwise
    pub draw_start: u32,
    /// Index count when indexed, vertex count otherwise
    pub draw_count: u32,
    /// LOD transition distance, 0 = always used
    pub lod_distance: f32,
}

impl Default for GeometryDesc {
    fn default() -> Self {
        Self {
            vertex_buffer: BufferHandle(0),
            index_buffer: None,
            draw_start: 0,
            draw_count: 0,
            lod_distance: 0.0,
        }
    }
}

// ===== GEOMETRY IMPLEMENTATION =====

impl Geometry {
    /// Create geometry from descriptor (internal use by ResourceRegistry)
    pub(crate) fn from_desc(desc: GeometryDesc, sort_id: SortId) -> Result<Self> {

        // ========== VALIDATION 1: Non-empty draw range ==========
        if desc.draw_count == 0 {
            engine_bail!("galaxy3d::Geometry", "Geometry draw count must be non-zero");
        }

        // ========== VALIDATION 2: Draw range does not overflow ==========
        if desc.draw_start.checked_add(desc.draw_count).is_none() {
            engine_bail!("galaxy3d::Geometry",
                "Draw range {}+{} overflows", desc.draw_start, desc.draw_count);
        }

        // ========== VALIDATION 3: LOD distance ==========
        if !(desc.lod_distance >= 0.0) {
            engine_bail!("galaxy3d::Geometry",
                "LOD distance must be a non-negative number, got {}", desc.lod_distance);
        }

        Ok(Self {
            sort_id,
            vertex_buffer: desc.vertex_buffer,
            index_buffer: desc.index_buffer,
            draw_start: desc.draw_start,
            draw_count: desc.draw_count,
            lod_distance: desc.lod_distance,
        })
    }

    // ===== ACCESSORS =====

    /// 16-bit id packed into batch sort keys
    pub fn id(&self) -> u16 {
        self.sort_id.get()
    }

    pub fn vertex_buffer(&self) -> BufferHandle {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> Option<BufferHandle> {
        self.index_buffer
    }

    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }

    pub fn draw_start(&self) -> u32 {
        self.draw_start
    }

    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }

    pub fn lod_distance(&self) -> f32 {
        self.lod_distance
    }
}
