/// Scene: the octree plus the lighting environment of a world.
///
/// The octree is held in an `Arc` so the worker tasks of `prepare_view`
/// can query it. The renderer drops its clone before `prepare_view`
/// returns; mutating while another clone is alive fails with
/// `Error::InvalidOperation`.

use std::sync::Arc;
use glam::{Mat4, Vec4};
use crate::config::OctreeConfig;
use crate::error::{Error, Result};
use super::drawable::{Drawable, DrawableFlags, DrawableKey};
use super::octree::Octree;

pub const DEFAULT_AMBIENT_COLOR: Vec4 = Vec4::new(0.1, 0.1, 0.1, 1.0);
pub const DEFAULT_FOG_COLOR: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);
pub const DEFAULT_FOG_START: f32 = 500.0;
pub const DEFAULT_FOG_END: f32 = 1000.0;

pub struct Scene {
    octree: Arc<Octree>,
    ambient_color: Vec4,
    fog_color: Vec4,
    /// Linear fog start distance
    fog_start: f32,
    /// Linear fog end distance
    fog_end: f32,
}

impl Scene {
    pub fn new(config: OctreeConfig) -> Self {
        Self {
            octree: Arc::new(Octree::new(config)),
            ambient_color: DEFAULT_AMBIENT_COLOR,
            fog_color: DEFAULT_FOG_COLOR,
            fog_start: DEFAULT_FOG_START,
            fog_end: DEFAULT_FOG_END,
        }
    }

    // ===== OCTREE =====

    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Shared handle for the tasks of one frame
    pub(crate) fn share_octree(&self) -> Arc<Octree> {
        self.octree.clone()
    }

    /// Exclusive access to the octree.
    ///
    /// Fails while another handle to it is alive, which only happens
    /// inside `prepare_view`.
    pub fn octree_mut(&mut self) -> Result<&mut Octree> {
        Arc::get_mut(&mut self.octree).ok_or_else(|| {
            Error::InvalidOperation("Octree is in use by an in-flight frame".to_string())
        })
    }

    pub fn add_drawable(&mut self, drawable: Drawable) -> Result<DrawableKey> {
        Ok(self.octree_mut()?.add_drawable(drawable))
    }

    pub fn remove_drawable(&mut self, key: DrawableKey) -> Result<Option<Drawable>> {
        Ok(self.octree_mut()?.remove_drawable(key))
    }

    pub fn set_transform(&mut self, key: DrawableKey, transform: Mat4) -> Result<()> {
        self.octree_mut()?.set_transform(key, transform)
    }

    pub fn set_flags(&mut self, key: DrawableKey, flags: DrawableFlags) -> Result<()> {
        self.octree_mut()?.set_flags(key, flags)
    }

    pub fn modify<R>(&mut self, key: DrawableKey, f: impl FnOnce(&mut Drawable) -> R) -> Result<R> {
        self.octree_mut()?.modify(key, f)
    }

    // ===== LIGHTING ENVIRONMENT =====

    pub fn set_ambient_color(&mut self, color: Vec4) {
        self.ambient_color = color;
    }

    pub fn set_fog_color(&mut self, color: Vec4) {
        self.fog_color = color;
    }

    /// Set the linear fog range. `end` is kept above `start`.
    pub fn set_fog_range(&mut self, start: f32, end: f32) {
        self.fog_start = start.max(0.0);
        let margin = (self.fog_start * f32::EPSILON).max(f32::EPSILON);
        self.fog_end = end.max(self.fog_start + margin);
    }

    pub fn ambient_color(&self) -> Vec4 {
        self.ambient_color
    }

    pub fn fog_color(&self) -> Vec4 {
        self.fog_color
    }

    pub fn fog_start(&self) -> f32 {
        self.fog_start
    }

    pub fn fog_end(&self) -> f32 {
        self.fog_end
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(OctreeConfig::default())
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
