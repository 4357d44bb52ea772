/// GraphicsDevice trait - semantic draw interface consumed by the renderer
///
/// The visibility pipeline never touches GPU objects directly. It issues
/// semantic calls ("bind this pass", "draw this geometry instanced",
/// "define a shadow map of this size") against a backend implementing this
/// trait. Buffers, textures and shader programs appear only as opaque handles.

use glam::{IVec2, Mat4, Vec3, Vec4};
use crate::error::Result;
use crate::math::{BoundingBox, IntRect};
use crate::resource::{Geometry, Material, Pass};

// ============================================================================
// Opaque handles
// ============================================================================

/// Vertex, index or uniform buffer owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Texture owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Linked shader program owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderProgramHandle(pub u32);

// ============================================================================
// Common types
// ============================================================================

/// Render target selected before drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// Backbuffer / main view target
    Main,
    /// Shadow map atlas (0 = directional lights, 1 = local lights)
    ShadowMap(usize),
    /// Static caster cache paired with a shadow map atlas
    StaticShadowCache(usize),
}

/// Uniform block slots written by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformSlot {
    /// `PerViewUniforms` for the main camera or a shadow camera
    PerView,
    /// Array of `LightData`
    Lights,
    /// One light count byte per cluster cell
    ClusterCounts,
    /// `MAX_LIGHTS_CLUSTER` light index bytes per cluster cell
    ClusterIndices,
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Graphics backend used by the renderer for submission
///
/// Implementations record or execute the calls in order. All calls happen
/// on the thread that drives the frame; the renderer holds the device
/// behind a mutex.
pub trait GraphicsDevice: Send + Sync {
    /// Create or resize a depth shadow map atlas
    ///
    /// # Arguments
    ///
    /// * `index` - Atlas index (0 = directional, 1 = local lights)
    /// * `size` - Atlas size in texels
    /// * `static_cache` - Also create a static caster cache target of the same size
    fn define_shadow_map(&mut self, index: usize, size: IVec2, static_cache: bool) -> Result<()>;

    /// Select the target for subsequent draws
    fn bind_render_target(&mut self, target: RenderTarget) -> Result<()>;

    /// Set the viewport rectangle in target texels
    fn set_viewport(&mut self, rect: IntRect) -> Result<()>;

    /// Clear depth inside a rectangle of the bound target
    fn clear_depth(&mut self, rect: IntRect) -> Result<()>;

    /// Copy a depth rectangle between targets
    ///
    /// # Arguments
    ///
    /// * `source` - Target to read from
    /// * `destination` - Target to write to
    /// * `rect` - Region, identical in both targets
    fn copy_depth_region(&mut self, source: RenderTarget, destination: RenderTarget, rect: IntRect) -> Result<()>;

    /// Set rasterizer depth bias for subsequent draws
    fn set_depth_bias(&mut self, constant: f32, slope_scaled: f32) -> Result<()>;

    /// Upload a uniform block
    fn update_uniforms(&mut self, slot: UniformSlot, data: &[u8]) -> Result<()>;

    /// Upload the instance transform buffer used by `draw_instanced`
    fn set_instance_transforms(&mut self, transforms: &[Mat4]) -> Result<()>;

    /// Bind shader program and render state of a pass
    fn bind_pass(&mut self, pass: &Pass) -> Result<()>;

    /// Bind material textures
    fn bind_material(&mut self, material: &Material) -> Result<()>;

    /// Set the world transform for the next non-instanced draw
    fn set_world_transform(&mut self, transform: &Mat4) -> Result<()>;

    /// Draw a geometry once
    fn draw(&mut self, geometry: &Geometry) -> Result<()>;

    /// Draw a geometry once per instance transform
    ///
    /// # Arguments
    ///
    /// * `geometry` - Geometry to draw
    /// * `start` - First index into the uploaded instance transforms
    /// * `count` - Number of instances
    fn draw_instanced(&mut self, geometry: &Geometry, start: u32, count: u32) -> Result<()>;

    /// Begin a GPU occlusion query
    ///
    /// # Arguments
    ///
    /// * `tag` - Caller value returned with the result
    ///
    /// # Returns
    ///
    /// Backend query id
    fn begin_occlusion_query(&mut self, tag: u64) -> Result<u32>;

    /// End the currently open occlusion query
    fn end_occlusion_query(&mut self) -> Result<()>;

    /// Collect finished occlusion queries as `(tag, visible)` pairs
    ///
    /// Results may lag one or more frames behind the query.
    fn check_occlusion_query_results(&mut self) -> Result<Vec<(u64, bool)>>;

    /// Draw a box with depth test on and color/depth writes off (query proxy)
    fn draw_bounding_box(&mut self, bbox: &BoundingBox, view_projection: &Mat4) -> Result<()>;

    /// Draw debug line segments
    fn draw_debug_lines(&mut self, lines: &[(Vec3, Vec3)], color: Vec4, view_projection: &Mat4) -> Result<()>;
}
