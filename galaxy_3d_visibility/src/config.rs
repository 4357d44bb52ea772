//! Configuration for the octree, the software occlusion buffer and the renderer.
//!
//! Compile-time constants bound fixed-size GPU tables; the runtime configs
//! carry tuning values and are clamped to those bounds.

// ===== COMPILE-TIME CAPACITIES =====

/// Cluster grid cells along screen X
pub const NUM_CLUSTER_X: usize = 16;
/// Cluster grid cells along screen Y
pub const NUM_CLUSTER_Y: usize = 8;
/// Cluster grid slices along view depth
pub const NUM_CLUSTER_Z: usize = 8;
/// Total cluster cells
pub const NUM_CLUSTERS: usize = NUM_CLUSTER_X * NUM_CLUSTER_Y * NUM_CLUSTER_Z;
/// Light index slots per cluster cell
pub const MAX_LIGHTS_CLUSTER: usize = 16;
/// Local lights uploaded per frame (index 0 is reserved as "no light")
pub const MAX_LIGHTS: usize = 255;

/// Default re-query interval for visible octants, about 8 frames at 60 fps
pub const OCCLUSION_QUERY_INTERVAL: f32 = 0.133333;
/// Frame time assumed until the application reports one
pub const DEFAULT_FRAME_TIME: f32 = 1.0 / 60.0;

/// Smallest occlusion mip level dimension
pub const OCCLUSION_MIN_SIZE: i32 = 8;
/// Fixed-point scale of occlusion screen X coordinates
pub const OCCLUSION_X_SCALE: f32 = 65536.0;
/// Fixed-point scale of occlusion depth values
pub const OCCLUSION_Z_SCALE: f32 = 1073741824.0;

/// Maximum octree subdivision levels
pub const MAX_OCTREE_LEVELS: u32 = 255;

// ===== OCTREE =====

#[derive(Debug, Clone, PartialEq)]
pub struct OctreeConfig {
    /// Half extent of the root box on every axis
    pub size: f32,
    /// Subdivision levels including the root
    pub num_levels: u32,
    /// Queue length below which reinsertion checks run serially
    pub min_threaded_update: usize,
    /// Reinsertion chunk size divisor: chunk = max(min, queue / threads / divisor)
    pub update_chunk_divisor: usize,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            size: 1000.0,
            num_levels: 8,
            min_threaded_update: 16,
            update_chunk_divisor: 4,
        }
    }
}

// ===== OCCLUSION =====

#[derive(Debug, Clone, PartialEq)]
pub struct OcclusionConfig {
    pub width: i32,
    pub height: i32,
    /// Triangles rasterized per frame before further draws are refused
    pub max_triangles: usize,
    /// Margin subtracted from a tested box's depth, in fixed-point depth units
    pub depth_bias: i32,
}

impl Default for OcclusionConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 128,
            max_triangles: 8192,
            depth_bias: 1,
        }
    }
}

// ===== RENDERER =====

#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Local lights kept after distance sorting, at most `MAX_LIGHTS`
    pub max_lights: usize,
    /// Light indices stored per cluster cell, at most `MAX_LIGHTS_CLUSTER`
    pub max_lights_per_cluster: usize,
    /// Geometry drawables accumulated by a collect task before it spawns a batch task
    pub drawables_per_batch_task: usize,
    /// Directional light shadow atlas size
    pub dir_light_shadow_size: i32,
    /// Local light shadow atlas size
    pub light_atlas_size: i32,
    /// Keep a static caster copy of each atlas for cached shadow rendering
    pub static_shadow_cache: bool,
    pub shadow_depth_bias_mul: f32,
    pub shadow_slope_scale_bias_mul: f32,
    /// Max per-element difference for a shadow matrix to count as unchanged
    pub shadow_matrix_epsilon: f32,
    /// Merge identical consecutive opaque/shadow batches into instanced draws
    pub instancing: bool,
    /// Rasterize occluders on the CPU and cull against the result
    pub software_occlusion: bool,
    /// Seconds between re-queries of an octant already known visible
    pub occlusion_query_interval: f32,
    pub occlusion: OcclusionConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_lights: MAX_LIGHTS,
            max_lights_per_cluster: MAX_LIGHTS_CLUSTER,
            drawables_per_batch_task: 128,
            dir_light_shadow_size: 1024,
            light_atlas_size: 2048,
            static_shadow_cache: true,
            shadow_depth_bias_mul: 1.0,
            shadow_slope_scale_bias_mul: 1.0,
            shadow_matrix_epsilon: 1e-4,
            instancing: true,
            software_occlusion: true,
            occlusion_query_interval: OCCLUSION_QUERY_INTERVAL,
            occlusion: OcclusionConfig::default(),
        }
    }
}

impl RendererConfig {
    /// Copy with every value clamped to its compile-time capacity
    pub fn clamped(&self) -> Self {
        Self {
            max_lights: self.max_lights.min(MAX_LIGHTS),
            max_lights_per_cluster: self.max_lights_per_cluster.min(MAX_LIGHTS_CLUSTER),
            drawables_per_batch_task: self.drawables_per_batch_task.max(1),
            dir_light_shadow_size: self.dir_light_shadow_size.max(0),
            light_atlas_size: self.light_atlas_size.max(0),
            shadow_matrix_epsilon: self.shadow_matrix_epsilon.max(0.0),
            occlusion_query_interval: self.occlusion_query_interval.max(0.0),
            occlusion: OcclusionConfig {
                width: self.occlusion.width.max(1),
                height: self.occlusion.height.max(1),
                ..self.occlusion.clone()
            },
            ..self.clone()
        }
    }
}

impl OctreeConfig {
    /// Copy with levels clamped to 1..=`MAX_OCTREE_LEVELS`
    pub fn clamped(&self) -> Self {
        Self {
            size: self.size.abs().max(f32::EPSILON),
            num_levels: self.num_levels.clamp(1, MAX_OCTREE_LEVELS),
            min_threaded_update: self.min_threaded_update.max(1),
            update_chunk_divisor: self.update_chunk_divisor.max(1),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
