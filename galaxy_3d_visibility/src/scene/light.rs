/// Light - directional, point or spot light source.
///
/// Lights are drawables: they live in the octree like geometry and are
/// collected by the same frustum walk. A light points down its local -Z
/// axis; its position and orientation come from the owning drawable's
/// world transform.

use glam::{IVec2, Mat4, Quat, Vec3, Vec4};
use crate::camera::Frustum;
use crate::math::{BoundingBox, Sphere};

pub const DEFAULT_LIGHT_COLOR: Vec4 = Vec4::new(1.0, 1.0, 1.0, 0.5);
pub const DEFAULT_RANGE: f32 = 10.0;
pub const DEFAULT_SPOT_FOV: f32 = 30.0;
pub const DEFAULT_SHADOW_MAP_SIZE: i32 = 512;
pub const DEFAULT_SHADOW_SPLITS: Vec4 = Vec4::new(10.0, 50.0, 150.0, 0.0);
pub const DEFAULT_FADE_START: f32 = 0.9;
pub const DEFAULT_DEPTH_BIAS: f32 = 5.0;
pub const DEFAULT_SLOPE_SCALE_BIAS: f32 = 0.5;

/// Point light shadow faces
pub const NUM_POINT_FACES: usize = 6;
/// Directional light cascade limit
pub const MAX_SHADOW_SPLITS: usize = 4;

/// Near clip of local light shadow cameras, relative to range
pub const SHADOW_NEAR_CLIP_RATIO: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    Directional,
    Point,
    Spot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    light_type: LightType,
    /// rgb = color, a = specular intensity
    color: Vec4,
    range: f32,
    /// Spot cone in degrees
    fov: f32,
    cast_shadows: bool,
    shadow_map_size: i32,
    /// Directional cascade end distances, 0 = unused
    shadow_splits: Vec4,
    shadow_fade_start: f32,
    depth_bias: f32,
    slope_scale_bias: f32,
}

impl Light {
    pub fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            color: DEFAULT_LIGHT_COLOR,
            range: DEFAULT_RANGE,
            fov: DEFAULT_SPOT_FOV,
            cast_shadows: false,
            shadow_map_size: DEFAULT_SHADOW_MAP_SIZE,
            shadow_splits: DEFAULT_SHADOW_SPLITS,
            shadow_fade_start: DEFAULT_FADE_START,
            depth_bias: DEFAULT_DEPTH_BIAS,
            slope_scale_bias: DEFAULT_SLOPE_SCALE_BIAS,
        }
    }

    pub fn directional() -> Self {
        Self::new(LightType::Directional)
    }

    pub fn point(range: f32) -> Self {
        let mut light = Self::new(LightType::Point);
        light.set_range(range);
        light
    }

    pub fn spot(range: f32, fov: f32) -> Self {
        let mut light = Self::new(LightType::Spot);
        light.set_range(range);
        light.set_fov(fov);
        light
    }

    // ===== SETTERS =====

    pub fn set_light_type(&mut self, light_type: LightType) {
        self.light_type = light_type;
    }

    pub fn set_color(&mut self, color: Vec4) {
        self.color = color;
    }

    pub fn set_range(&mut self, range: f32) {
        self.range = range.max(0.0);
    }

    /// Spot cone angle, clamped to 0..180 degrees
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov.clamp(0.0, 180.0);
    }

    pub fn set_cast_shadows(&mut self, enable: bool) {
        self.cast_shadows = enable;
    }

    /// Requested shadow map tile size. Rounded down to a power of two, minimum 1.
    pub fn set_shadow_map_size(&mut self, size: i32) {
        let size = size.max(1) as u32;
        self.shadow_map_size = (1u32 << (31 - size.leading_zeros())) as i32;
    }

    pub fn set_shadow_splits(&mut self, splits: Vec4) {
        self.shadow_splits = splits;
    }

    pub fn set_shadow_fade_start(&mut self, start: f32) {
        self.shadow_fade_start = start.clamp(0.0, 1.0);
    }

    pub fn set_depth_bias(&mut self, constant: f32, slope_scale: f32) {
        self.depth_bias = constant;
        self.slope_scale_bias = slope_scale;
    }

    // ===== ACCESSORS =====

    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    pub fn shadow_map_size(&self) -> i32 {
        self.shadow_map_size
    }

    pub fn shadow_splits(&self) -> Vec4 {
        self.shadow_splits
    }

    pub fn shadow_fade_start(&self) -> f32 {
        self.shadow_fade_start
    }

    pub fn depth_bias(&self) -> f32 {
        self.depth_bias
    }

    pub fn slope_scale_bias(&self) -> f32 {
        self.slope_scale_bias
    }

    /// Brightness used to pick the dominant directional light
    pub fn intensity(&self) -> f32 {
        self.color.x * 0.299 + self.color.y * 0.587 + self.color.z * 0.114
    }

    // ===== SHADOWS =====

    /// Number of directional cascades: the first zero split ends the list.
    pub fn num_shadow_splits(&self) -> usize {
        if self.shadow_splits.y <= 0.0 {
            1
        } else if self.shadow_splits.z <= 0.0 {
            2
        } else if self.shadow_splits.w <= 0.0 {
            3
        } else {
            4
        }
    }

    /// End distance of cascade `index`.
    pub fn shadow_split(&self, index: usize) -> f32 {
        match index {
            0 => self.shadow_splits.x,
            1 => self.shadow_splits.y,
            2 => self.shadow_splits.z,
            _ => self.shadow_splits.w,
        }
    }

    /// Distance at which shadows end.
    pub fn max_shadow_distance(&self) -> f32 {
        match self.light_type {
            LightType::Directional => self.shadow_split(self.num_shadow_splits() - 1),
            LightType::Point | LightType::Spot => self.range,
        }
    }

    /// Shadow cameras this light needs: one per cascade, six cube faces, or one.
    pub fn num_shadow_views(&self) -> usize {
        if !self.cast_shadows {
            return 0;
        }
        match self.light_type {
            LightType::Directional => self.num_shadow_splits(),
            LightType::Point => NUM_POINT_FACES,
            LightType::Spot => 1,
        }
    }

    /// Atlas footprint for a given tile size.
    ///
    /// Directional: 1x1, 2x1 or 2x2 tiles by cascade count. Point: 3x2 tiles. Spot: 1 tile.
    pub fn shadow_map_footprint(&self, tile: i32) -> IVec2 {
        match self.light_type {
            LightType::Directional => match self.num_shadow_splits() {
                1 => IVec2::new(tile, tile),
                2 => IVec2::new(tile * 2, tile),
                _ => IVec2::new(tile * 2, tile * 2),
            },
            LightType::Point => IVec2::new(tile * 3, tile * 2),
            LightType::Spot => IVec2::new(tile, tile),
        }
    }

    /// Atlas footprint at the requested tile size.
    pub fn total_shadow_map_size(&self) -> IVec2 {
        self.shadow_map_footprint(self.shadow_map_size)
    }

    // ===== WORLD SPACE =====

    /// Spot light cone as a frustum.
    pub fn world_frustum(&self, world_transform: &Mat4) -> Frustum {
        Frustum::perspective(self.fov, 1.0, 1.0, 0.0, self.range, &rigid(world_transform))
    }

    pub fn world_sphere(&self, world_transform: &Mat4) -> Sphere {
        Sphere::new(world_transform.w_axis.truncate(), self.range)
    }

    pub fn world_bounding_box(&self, world_transform: &Mat4) -> BoundingBox {
        match self.light_type {
            LightType::Directional => BoundingBox::infinite(),
            LightType::Point => self.world_sphere(world_transform).bounding_box(),
            LightType::Spot => self.world_frustum(world_transform).bounding_box(),
        }
    }
}

/// World-space forward direction of a light transform.
pub fn light_direction(world_transform: &Mat4) -> Vec3 {
    let (_, rotation, _) = world_transform.to_scale_rotation_translation();
    (rotation * Vec3::NEG_Z).normalize_or_zero()
}

/// Rotation and translation of a transform, scale removed.
pub(crate) fn rigid(world_transform: &Mat4) -> Mat4 {
    let (_, rotation, translation) = world_transform.to_scale_rotation_translation();
    Mat4::from_rotation_translation(rotation.normalize(), translation)
}

/// Rotation that turns -Z toward `direction`. Zero-length directions keep the identity.
pub fn rotation_toward(direction: Vec3) -> Quat {
    let direction = direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(Vec3::NEG_Z, direction)
    }
}

#[cfg(test)]
#[path = "light_tests.rs"]
mod tests;
