/// GPU data layouts uploaded through `GraphicsDevice::update_uniforms`.
///
/// Every field is a `Vec4` or `Mat4` so the `#[repr(C)]` layout has no
/// padding and matches std140 without manual packing.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Number of directional light shadow cascades
pub const NUM_CASCADES: usize = 4;

/// Per-view block: one upload per distinct camera
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PerViewUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    /// near, far, 1 when orthographic, 0
    pub depth_parameters: Vec4,
    pub ambient_color: Vec4,
    pub fog_color: Vec4,
    /// fog start, fog end, 1 / (end - start), 0
    pub fog_parameters: Vec4,
    /// xyz = direction toward the light, w = 1 when a directional light is active
    pub dir_light_direction: Vec4,
    pub dir_light_color: Vec4,
    /// texel size x, texel size y, fade start distance, max shadow distance
    pub dir_light_shadow_parameters: Vec4,
    /// cascade split distances, 0 = unused
    pub dir_light_shadow_splits: Vec4,
    pub dir_light_shadow_matrices: [Mat4; NUM_CASCADES],
}

impl Default for PerViewUniforms {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

/// One local light as seen by the clustered forward shader
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightData {
    /// xyz = world position, w = 1 / range
    pub position: Vec4,
    /// xyz = direction toward the light, w = spot cutoff (cos of half angle), 2 for point lights
    pub direction: Vec4,
    /// rgb = color, a = 1 when spot
    pub color: Vec4,
    /// texel size x, texel size y, 0 when unshadowed, unused
    pub shadow_parameters: Vec4,
    pub shadow_matrix: Mat4,
}

impl Default for LightData {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}
