/// Renderer module - per-frame culling, batching, shadows and light clusters

// Module declarations
pub mod batch;
pub mod cluster;
pub mod occlusion_buffer;
pub mod shadow;
mod collect;
mod renderer;
mod submit;

// Re-export the frame driver
pub use renderer::{next_frame_number, FrameStats, Renderer};

// Re-export from other modules
pub use batch::{Batch, BatchQueue, BatchTransform, SortMode};
pub use cluster::{ClusterCell, ClusterGrid, ClusterLight, SliceLights, CLUSTERS_PER_SLICE};
pub use occlusion_buffer::{DepthValue, OcclusionBuffer};
pub use shadow::{
    ShadowAllocation, ShadowChanges, ShadowMap, ShadowRenderMode, ShadowView, ShadowViewHistory,
    DIR_LIGHT_ATLAS, LOCAL_LIGHT_ATLAS, NUM_SHADOW_MAPS,
};
