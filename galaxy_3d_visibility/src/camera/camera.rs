/// Camera - view parameters for the visibility pipeline.
///
/// A camera is a value: the caller owns it, moves it, and hands a copy to
/// `Renderer::prepare_view` each frame. It looks down its local -Z axis,
/// Y up, and derives view, projection and frustums on demand.

use glam::{Mat4, Quat, Vec3};
use crate::math::Ray;
use super::frustum::Frustum;

pub const DEFAULT_NEAR_CLIP: f32 = 0.1;
pub const DEFAULT_FAR_CLIP: f32 = 1000.0;
pub const DEFAULT_FOV: f32 = 45.0;
pub const DEFAULT_ORTHO_SIZE: f32 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    rotation: Quat,
    near_clip: f32,
    far_clip: f32,
    /// Vertical field of view in degrees
    fov: f32,
    ortho_size: f32,
    aspect_ratio: f32,
    zoom: f32,
    orthographic: bool,
    view_mask: u32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            near_clip: DEFAULT_NEAR_CLIP,
            far_clip: DEFAULT_FAR_CLIP,
            fov: DEFAULT_FOV,
            ortho_size: DEFAULT_ORTHO_SIZE,
            aspect_ratio: 1.0,
            zoom: 1.0,
            orthographic: false,
            view_mask: u32::MAX,
        }
    }
}

impl Camera {
    /// Perspective camera.
    pub fn perspective(fov: f32, aspect_ratio: f32, near_clip: f32, far_clip: f32) -> Self {
        let mut camera = Self::default();
        camera.set_fov(fov);
        camera.set_aspect_ratio(aspect_ratio);
        camera.set_near_clip(near_clip);
        camera.set_far_clip(far_clip);
        camera
    }

    /// Orthographic camera with a uniform view size.
    pub fn orthographic(ortho_size: f32, far_clip: f32) -> Self {
        let mut camera = Self::default();
        camera.set_orthographic(true);
        camera.set_ortho_size(ortho_size);
        camera.set_far_clip(far_clip);
        camera
    }

    // ===== SETTERS =====

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
    }

    /// Place the camera at `eye`, looking at `target`.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.position = eye;
        let view = Mat4::look_at_rh(eye, target, up);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        self.rotation = rotation.normalize();
    }

    pub fn set_near_clip(&mut self, distance: f32) {
        self.near_clip = distance.max(f32::EPSILON);
    }

    pub fn set_far_clip(&mut self, distance: f32) {
        self.far_clip = distance.max(f32::EPSILON);
    }

    /// Vertical field of view in degrees, clamped to 0..180.
    pub fn set_fov(&mut self, degrees: f32) {
        self.fov = degrees.clamp(0.0, 180.0);
    }

    /// Uniform orthographic view size. Resets the aspect ratio to 1.
    pub fn set_ortho_size(&mut self, size: f32) {
        self.ortho_size = size;
        self.aspect_ratio = 1.0;
    }

    pub fn set_aspect_ratio(&mut self, ratio: f32) {
        self.aspect_ratio = ratio.max(f32::EPSILON);
    }

    /// Zoom level, 1 = no zoom.
    pub fn set_zoom(&mut self, level: f32) {
        self.zoom = level.max(f32::EPSILON);
    }

    pub fn set_orthographic(&mut self, enable: bool) {
        self.orthographic = enable;
    }

    /// Layer mask tested against each drawable's layer mask.
    pub fn set_view_mask(&mut self, mask: u32) {
        self.view_mask = mask;
    }

    // ===== GETTERS =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Orthographic cameras always report a near clip of 0.
    pub fn near_clip(&self) -> f32 {
        if self.orthographic { 0.0 } else { self.near_clip }
    }

    pub fn far_clip(&self) -> f32 {
        self.far_clip
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn ortho_size(&self) -> f32 {
        self.ortho_size
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn is_orthographic(&self) -> bool {
        self.orthographic
    }

    pub fn view_mask(&self) -> u32 {
        self.view_mask
    }

    /// World-space forward direction.
    pub fn direction(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn distance(&self, point: Vec3) -> f32 {
        if self.orthographic {
            // Depth along the view axis
            (point - self.position).dot(self.direction()).abs()
        } else {
            (point - self.position).length()
        }
    }

    /// Half of the view height at unit distance (perspective) or in world units (ortho).
    pub fn half_view_size(&self) -> f32 {
        if self.orthographic {
            self.ortho_size * 0.5 / self.zoom
        } else {
            (self.fov.to_radians() * 0.5).tan() / self.zoom
        }
    }

    // ===== MATRICES =====

    /// Camera-to-world transform (rotation and translation only).
    pub fn world_transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.world_transform().inverse()
    }

    /// Right-handed projection with a 0..1 depth range.
    pub fn projection_matrix(&self) -> Mat4 {
        let half = self.half_view_size();
        if self.orthographic {
            let half_x = half * self.aspect_ratio;
            Mat4::orthographic_rh(-half_x, half_x, -half, half, 0.0, self.far_clip)
        } else {
            Mat4::perspective_rh(2.0 * half.atan(), self.aspect_ratio, self.near_clip, self.far_clip)
        }
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    // ===== FRUSTUMS =====

    pub fn world_frustum(&self) -> Frustum {
        self.split_frustum(self.near_clip(), self.far_clip, &self.world_transform())
    }

    /// World frustum restricted to `near..far`, clamped to the camera's own range.
    pub fn world_split_frustum(&self, near: f32, far: f32) -> Frustum {
        self.split_frustum(near, far, &self.world_transform())
    }

    pub fn view_space_frustum(&self) -> Frustum {
        self.split_frustum(self.near_clip(), self.far_clip, &Mat4::IDENTITY)
    }

    pub fn view_space_split_frustum(&self, near: f32, far: f32) -> Frustum {
        self.split_frustum(near, far, &Mat4::IDENTITY)
    }

    fn split_frustum(&self, near: f32, far: f32, transform: &Mat4) -> Frustum {
        let near = near.max(self.near_clip());
        let far = far.min(self.far_clip).max(near);
        if self.orthographic {
            Frustum::orthographic(self.ortho_size, self.aspect_ratio, self.zoom, near, far, transform)
        } else {
            Frustum::perspective(self.fov, self.aspect_ratio, self.zoom, near, far, transform)
        }
    }

    /// Ray through normalized screen coordinates (0..1, origin top-left).
    pub fn screen_ray(&self, x: f32, y: f32) -> Ray {
        let inverse = self.view_projection_matrix().inverse();
        let ndc_x = x * 2.0 - 1.0;
        let ndc_y = 1.0 - y * 2.0;
        let near = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        Ray::new(near, far - near)
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
