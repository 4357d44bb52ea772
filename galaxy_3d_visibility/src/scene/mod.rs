//! Scene module
//!
//! Drawables (geometry, lights, occluders), the loose octree that indexes
//! them, and the scene that owns the octree and the lighting environment.

mod culling_volume;
mod drawable;
mod geometry_node;
mod light;
mod occluder;
mod octant;
mod octree;
mod scene;

pub use culling_volume::CullingVolume;
pub use drawable::{BoundsSource, Drawable, DrawableFlags, DrawableKey, DrawableKind};
pub use geometry_node::{GeometryNode, GeometryType, SourceBatch};
pub use light::{
    light_direction, rotation_toward, Light, LightType,
    DEFAULT_LIGHT_COLOR, DEFAULT_RANGE, DEFAULT_SPOT_FOV, DEFAULT_SHADOW_MAP_SIZE,
    DEFAULT_SHADOW_SPLITS, DEFAULT_FADE_START, DEFAULT_DEPTH_BIAS, DEFAULT_SLOPE_SCALE_BIAS,
    MAX_SHADOW_SPLITS, NUM_POINT_FACES, SHADOW_NEAR_CLIP_RATIO,
};
pub use occluder::Occluder;
pub use octant::{Octant, OctantKey, OctantVisibility, NUM_OCTANTS};
pub use octree::{occlusion_query_tag, octant_from_query_tag, Octree, RaycastResult};
pub use scene::{Scene, DEFAULT_AMBIENT_COLOR, DEFAULT_FOG_COLOR, DEFAULT_FOG_START, DEFAULT_FOG_END};
