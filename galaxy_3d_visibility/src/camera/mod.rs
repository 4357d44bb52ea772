//! Camera module - view parameters and frustum volumes.
//!
//! Cameras are values owned by the caller; the renderer receives a copy
//! each frame and derives its frustums from it.

mod camera;
mod frustum;

pub use camera::{
    Camera,
    DEFAULT_FAR_CLIP, DEFAULT_FOV, DEFAULT_NEAR_CLIP, DEFAULT_ORTHO_SIZE,
};
pub use frustum::{
    Frustum, SatData,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
    NUM_FRUSTUM_PLANES, NUM_FRUSTUM_VERTICES, PLANE_MASK_ALL, PLANE_MASK_OUTSIDE,
};
