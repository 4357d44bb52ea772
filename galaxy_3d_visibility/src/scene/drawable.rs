/// Drawable - anything the octree indexes: geometry, lights and occluders.
///
/// A drawable owns its world transform and a cached world bounding box.
/// The cache is refreshed by `Octree::update`; between a transform change
/// and the next update `world_bounding_box()` recomputes on demand.

use bitflags::bitflags;
use glam::{Mat4, Vec3};
use slotmap::new_key_type;
use crate::camera::Frustum;
use crate::math::{BoundingBox, Sphere};
use super::geometry_node::GeometryNode;
use super::light::{rigid, Light, LightType};
use super::occluder::Occluder;
use super::octant::OctantKey;

new_key_type! {
    /// Stable key for a drawable in its octree
    pub struct DrawableKey;
}

bitflags! {
    /// Drawable classification used by query filters.
    ///
    /// The kind bits (`GEOMETRY`, `LIGHT`, `OCCLUDER`) follow the drawable's
    /// kind; `STATIC` and `CAST_SHADOWS` are set by the caller.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DrawableFlags: u8 {
        const GEOMETRY = 1 << 0;
        const LIGHT = 1 << 1;
        const OCCLUDER = 1 << 2;
        /// Never moves; shadow maps may cache it
        const STATIC = 1 << 3;
        const CAST_SHADOWS = 1 << 4;
    }
}

const KIND_FLAGS: DrawableFlags = DrawableFlags::GEOMETRY
    .union(DrawableFlags::LIGHT)
    .union(DrawableFlags::OCCLUDER);

#[derive(Debug, Clone)]
pub enum DrawableKind {
    Geometry(GeometryNode),
    Light(Light),
    Occluder(Occluder),
}

impl DrawableKind {
    fn flag(&self) -> DrawableFlags {
        match self {
            DrawableKind::Geometry(_) => DrawableFlags::GEOMETRY,
            DrawableKind::Light(_) => DrawableFlags::LIGHT,
            DrawableKind::Occluder(_) => DrawableFlags::OCCLUDER,
        }
    }
}

/// Everything needed to compute a drawable's world box, detached from the
/// drawable so reinsertion checks can run on worker threads.
#[derive(Debug, Clone, Copy)]
pub enum BoundsSource {
    Box { local: BoundingBox, transform: Mat4 },
    Sphere(Sphere),
    /// Spot light cone: rigid transform, vertical fov in degrees, range
    Cone { transform: Mat4, fov: f32, range: f32 },
    Infinite,
}

impl BoundsSource {
    pub fn world_bounding_box(&self) -> BoundingBox {
        match self {
            BoundsSource::Box { local, transform } => local.transformed(transform),
            BoundsSource::Sphere(sphere) => sphere.bounding_box(),
            BoundsSource::Cone { transform, fov, range } => {
                Frustum::perspective(*fov, 1.0, 1.0, 0.0, *range, transform).bounding_box()
            }
            BoundsSource::Infinite => BoundingBox::infinite(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Drawable {
    kind: DrawableKind,
    flags: DrawableFlags,
    layer_mask: u32,
    world_transform: Mat4,
    world_bounding_box: BoundingBox,
    bounding_box_dirty: bool,
    /// Camera distance beyond which the drawable is skipped, 0 = unlimited
    max_distance: f32,
    pub(crate) octant: Option<OctantKey>,
    pub(crate) last_update_frame: u16,
    pub(crate) reinsert_queued: bool,
}

impl Drawable {
    pub fn new(kind: DrawableKind) -> Self {
        let mut drawable = Self {
            flags: DrawableFlags::empty(),
            kind,
            layer_mask: u32::MAX,
            world_transform: Mat4::IDENTITY,
            world_bounding_box: BoundingBox::undefined(),
            bounding_box_dirty: true,
            max_distance: 0.0,
            octant: None,
            last_update_frame: 0,
            reinsert_queued: false,
        };
        drawable.sync_kind_flags();
        drawable
    }

    pub fn geometry(node: GeometryNode) -> Self {
        Self::new(DrawableKind::Geometry(node))
    }

    pub fn light(light: Light) -> Self {
        Self::new(DrawableKind::Light(light))
    }

    pub fn occluder(occluder: Occluder) -> Self {
        let max_distance = occluder.max_distance();
        let mut drawable = Self::new(DrawableKind::Occluder(occluder));
        drawable.max_distance = max_distance;
        drawable
    }

    /// Builder: set the world transform.
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.set_world_transform(transform);
        self
    }

    /// Builder: add caller flags (`STATIC`, `CAST_SHADOWS`).
    pub fn with_flags(mut self, flags: DrawableFlags) -> Self {
        self.set_flags(self.flags | flags);
        self
    }

    pub fn with_layer_mask(mut self, mask: u32) -> Self {
        self.layer_mask = mask;
        self
    }

    // ===== MUTATION (through Octree so the drawable is requeued) =====

    pub(crate) fn set_world_transform(&mut self, transform: Mat4) {
        self.world_transform = transform;
        self.bounding_box_dirty = true;
    }

    /// Replace caller flags; kind bits always follow the kind.
    pub(crate) fn set_flags(&mut self, flags: DrawableFlags) {
        self.flags = flags;
        self.sync_kind_flags();
    }

    pub fn set_layer_mask(&mut self, mask: u32) {
        self.layer_mask = mask;
    }

    pub fn set_max_distance(&mut self, distance: f32) {
        self.max_distance = distance.max(0.0);
    }

    pub fn kind_mut(&mut self) -> &mut DrawableKind {
        self.bounding_box_dirty = true;
        &mut self.kind
    }

    pub(crate) fn mark_bounding_box_dirty(&mut self) {
        self.bounding_box_dirty = true;
    }

    /// Kind bits follow the kind; lights carry their own shadow switch.
    pub(crate) fn sync_kind_flags(&mut self) {
        self.flags = (self.flags - KIND_FLAGS) | self.kind.flag();
        if let DrawableKind::Light(light) = &self.kind {
            self.flags.set(DrawableFlags::CAST_SHADOWS, light.cast_shadows());
        }
    }

    pub(crate) fn set_cached_bounding_box(&mut self, bbox: BoundingBox) {
        self.world_bounding_box = bbox;
        self.bounding_box_dirty = false;
    }

    // ===== ACCESSORS =====

    pub fn kind(&self) -> &DrawableKind {
        &self.kind
    }

    pub fn as_geometry(&self) -> Option<&GeometryNode> {
        match &self.kind {
            DrawableKind::Geometry(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_light(&self) -> Option<&Light> {
        match &self.kind {
            DrawableKind::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn as_occluder(&self) -> Option<&Occluder> {
        match &self.kind {
            DrawableKind::Occluder(occluder) => Some(occluder),
            _ => None,
        }
    }

    pub fn flags(&self) -> DrawableFlags {
        self.flags
    }

    pub fn has_flags(&self, flags: DrawableFlags) -> bool {
        self.flags.contains(flags)
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(DrawableFlags::STATIC)
    }

    pub fn is_light(&self) -> bool {
        self.flags.contains(DrawableFlags::LIGHT)
    }

    pub fn casts_shadows(&self) -> bool {
        self.flags.contains(DrawableFlags::CAST_SHADOWS)
    }

    pub fn layer_mask(&self) -> u32 {
        self.layer_mask
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    pub fn world_transform(&self) -> &Mat4 {
        &self.world_transform
    }

    pub fn world_position(&self) -> Vec3 {
        self.world_transform.w_axis.truncate()
    }

    /// Octant currently holding the drawable, `None` until the first update
    pub fn octant(&self) -> Option<OctantKey> {
        self.octant
    }

    /// Frame number of the last update that touched this drawable
    pub fn last_update_frame(&self) -> u16 {
        self.last_update_frame
    }

    /// Whether the drawable was moved or modified by the update of `frame_number`
    pub fn updated_on_frame(&self, frame_number: u16) -> bool {
        self.last_update_frame == frame_number
    }

    pub fn is_bounding_box_dirty(&self) -> bool {
        self.bounding_box_dirty
    }

    pub fn bounds_source(&self) -> BoundsSource {
        match &self.kind {
            DrawableKind::Geometry(node) => BoundsSource::Box {
                local: node.local_bounding_box(),
                transform: self.world_transform,
            },
            DrawableKind::Occluder(occluder) => BoundsSource::Box {
                local: occluder.local_bounding_box(),
                transform: self.world_transform,
            },
            DrawableKind::Light(light) => match light.light_type() {
                LightType::Directional => BoundsSource::Infinite,
                LightType::Point => BoundsSource::Sphere(light.world_sphere(&self.world_transform)),
                LightType::Spot => BoundsSource::Cone {
                    transform: rigid(&self.world_transform),
                    fov: light.fov(),
                    range: light.range(),
                },
            },
        }
    }

    /// World bounding box; cached after each octree update.
    pub fn world_bounding_box(&self) -> BoundingBox {
        if self.bounding_box_dirty {
            self.bounds_source().world_bounding_box()
        } else {
            self.world_bounding_box
        }
    }

    /// Whether `distance` from the camera is within the draw distance.
    pub fn in_draw_distance(&self, distance: f32) -> bool {
        self.max_distance <= 0.0 || distance <= self.max_distance
    }
}

#[cfg(test)]
#[path = "drawable_tests.rs"]
mod tests;
