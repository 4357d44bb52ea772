/// Shadow maps, shadow views and the shadow caching policy.
///
/// Two atlases exist: one for the dominant directional light and one shared
/// by all shadowed point and spot lights. Each light gets a rectangle of its
/// atlas per frame and splits it into tiles, one per cascade or cube face.
/// A `ShadowView` is one such tile with its own shadow camera.

use glam::{IVec2, Mat4, Quat, Vec3};
use crate::camera::{Camera, Frustum};
use crate::config::RendererConfig;
use crate::math::{BoundingBox, IntRect, Intersection};
use crate::scene::{rotation_toward, DrawableKey, Light, LightType, NUM_POINT_FACES, SHADOW_NEAR_CLIP_RATIO};
use crate::utils::AreaAllocator;
use super::batch::BatchQueue;

/// Atlas used by the dominant directional light
pub const DIR_LIGHT_ATLAS: usize = 0;
/// Atlas shared by shadowed point and spot lights
pub const LOCAL_LIGHT_ATLAS: usize = 1;
pub const NUM_SHADOW_MAPS: usize = 2;

/// Times a failed atlas request is retried at half the tile size
pub const MAX_SHADOW_SIZE_HALVINGS: u32 = 3;

/// Zoom of point light face cameras, leaving a border for filtering
pub const POINT_FACE_ZOOM: f32 = 0.99;

/// Point light face directions, in tile order
const POINT_FACE_DIRECTIONS: [Vec3; NUM_POINT_FACES] = [
    Vec3::X,
    Vec3::NEG_X,
    Vec3::Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
];

// ============================================================================
// Render mode
// ============================================================================

/// How a shadow view is rendered this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadowRenderMode {
    /// Clear and render every caster
    #[default]
    Dynamic,
    /// Render static casters, copy them to the static cache, then render dynamic casters
    StoreStatic,
    /// Copy the static cache back, then render dynamic casters only
    RestoreStatic,
    /// Keep last frame's contents untouched
    Cached,
}

impl ShadowRenderMode {
    /// Whether the view draws anything this frame
    pub fn renders(self) -> bool {
        self != ShadowRenderMode::Cached
    }
}

/// Frame-to-frame changes that decide a shadow view's render mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShadowChanges {
    /// Light carries the `STATIC` flag
    pub static_light: bool,
    /// The atlas has a static caster cache
    pub has_static_cache: bool,
    pub viewport_changed: bool,
    pub matrix_changed: bool,
    pub static_count_changed: bool,
    /// A static caster was modified by this frame's octree update
    pub static_caster_updated: bool,
    /// The view was not rendered on the previous frame
    pub missed_last_frame: bool,
    /// A dynamic caster was moved by this frame's octree update
    pub dynamic_caster_moved: bool,
    pub dynamic_count_changed: bool,
}

impl ShadowChanges {
    pub fn render_mode(&self) -> ShadowRenderMode {
        if !self.static_light || !self.has_static_cache {
            return ShadowRenderMode::Dynamic;
        }

        if self.viewport_changed
            || self.matrix_changed
            || self.static_count_changed
            || self.static_caster_updated
            || self.missed_last_frame
        {
            ShadowRenderMode::StoreStatic
        } else if self.dynamic_caster_moved || self.dynamic_count_changed {
            ShadowRenderMode::RestoreStatic
        } else {
            ShadowRenderMode::Cached
        }
    }
}

/// Whether two shadow matrices differ by more than `epsilon` in any element
pub fn shadow_matrix_changed(previous: &Mat4, current: &Mat4, epsilon: f32) -> bool {
    !previous.abs_diff_eq(*current, epsilon)
}

// ============================================================================
// Shadow map atlas
// ============================================================================

/// A light's rectangle in an atlas and the tile size it was cut for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowAllocation {
    pub rect: IntRect,
    pub tile_size: i32,
}

#[derive(Debug)]
pub struct ShadowMap {
    index: usize,
    size: IVec2,
    static_cache: bool,
    allocator: AreaAllocator,
    /// Size last sent to the device, zero until defined
    defined_size: IVec2,
    /// Views rendering into this atlas this frame, as indices into the renderer's view list
    pub(crate) views: Vec<usize>,
}

impl ShadowMap {
    pub fn new(index: usize, size: i32, static_cache: bool) -> Self {
        let size = IVec2::splat(size.max(0));
        Self {
            index,
            size,
            static_cache,
            allocator: AreaAllocator::new(size.x, size.y),
            defined_size: IVec2::ZERO,
            views: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> IVec2 {
        self.size
    }

    pub fn has_static_cache(&self) -> bool {
        self.static_cache
    }

    pub(crate) fn needs_define(&self) -> bool {
        self.defined_size != self.size && self.size.x > 0
    }

    pub(crate) fn mark_defined(&mut self) {
        self.defined_size = self.size;
    }

    /// Free every rectangle and forget this frame's views
    pub fn clear(&mut self) {
        self.allocator.reset(self.size.x, self.size.y);
        self.views.clear();
    }

    /// Reserve a rectangle for `light`.
    ///
    /// Last frame's rectangle is kept when the light still asks for the
    /// same tile size and the rectangle is free. Otherwise the request is
    /// retried at half the tile size up to `MAX_SHADOW_SIZE_HALVINGS` times.
    pub fn allocate(&mut self, light: &Light, previous: Option<ShadowAllocation>) -> Option<ShadowAllocation> {
        let requested = light.shadow_map_size().min(self.size.x.min(self.size.y));
        if requested <= 0 {
            return None;
        }

        if let Some(previous) = previous {
            if previous.tile_size == requested
                && previous.rect.size() == light.shadow_map_footprint(requested)
                && self.allocator.allocate_specific(previous.rect)
            {
                return Some(previous);
            }
        }

        let mut tile_size = requested;
        for _ in 0..=MAX_SHADOW_SIZE_HALVINGS {
            if tile_size <= 0 {
                break;
            }
            let footprint = light.shadow_map_footprint(tile_size);
            if let Some(position) = self.allocator.allocate(footprint.x, footprint.y) {
                return Some(ShadowAllocation {
                    rect: IntRect::from_pos_size(position, footprint),
                    tile_size,
                });
            }
            tile_size /= 2;
        }
        None
    }
}

// ============================================================================
// Shadow view
// ============================================================================

/// What a view looked like when it was last rendered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowViewHistory {
    pub viewport: IntRect,
    pub shadow_matrix: Mat4,
    pub num_static_casters: usize,
    pub num_dynamic_casters: usize,
    pub frame_number: u16,
}

#[derive(Debug, Clone)]
pub struct ShadowView {
    pub light: DrawableKey,
    /// Cascade or cube face
    pub index: usize,
    pub atlas: usize,
    pub camera: Camera,
    /// Tile inside the atlas
    pub viewport: IntRect,
    /// Atlas texture coordinates from world space
    pub shadow_matrix: Mat4,
    pub depth_bias: f32,
    pub slope_scale_bias: f32,
    pub render_mode: ShadowRenderMode,
    /// Main view frustum in this shadow camera's view space
    pub receiver_frustum: Frustum,
    pub static_queue: BatchQueue,
    pub dynamic_queue: BatchQueue,
    /// Instanced draws of both queues index into this
    pub instance_transforms: Vec<Mat4>,
    pub num_static_casters: usize,
    pub num_dynamic_casters: usize,
}

impl ShadowView {
    pub fn new(light: DrawableKey, index: usize, atlas: usize, camera: Camera, viewport: IntRect) -> Self {
        let receiver_frustum = camera.view_space_frustum();
        Self {
            light,
            index,
            atlas,
            camera,
            viewport,
            shadow_matrix: Mat4::IDENTITY,
            depth_bias: 0.0,
            slope_scale_bias: 0.0,
            render_mode: ShadowRenderMode::Dynamic,
            receiver_frustum,
            static_queue: BatchQueue::new(),
            dynamic_queue: BatchQueue::new(),
            instance_transforms: Vec::new(),
            num_static_casters: 0,
            num_dynamic_casters: 0,
        }
    }

    /// Shadow camera frustum in world space
    pub fn world_frustum(&self) -> Frustum {
        self.camera.world_frustum()
    }

    /// Whether a caster the main camera cannot see may still throw a shadow
    /// into the view: its box, extruded away from the shadow camera to the
    /// far plane, must reach the main view frustum.
    pub fn extruded_caster_visible(&self, caster: &BoundingBox) -> bool {
        let view_box = caster.transformed(&self.camera.view_matrix());
        let far = self.camera.far_clip();

        let extruded = if self.camera.is_orthographic() {
            BoundingBox::new(
                Vec3::new(view_box.min.x, view_box.min.y, view_box.min.z.min(-far)),
                view_box.max,
            )
        } else {
            // Touching or behind the light: cannot tell, keep it
            if view_box.max.z >= 0.0 {
                return true;
            }
            let mut extruded = view_box;
            for corner in view_box.corners() {
                extruded.merge_point(corner * (far / -corner.z));
            }
            extruded
        };

        self.receiver_frustum.is_inside_fast(&extruded) != Intersection::Outside
    }

    /// History entry describing this frame's render
    pub fn history(&self, frame_number: u16) -> ShadowViewHistory {
        ShadowViewHistory {
            viewport: self.viewport,
            shadow_matrix: self.shadow_matrix,
            num_static_casters: self.num_static_casters,
            num_dynamic_casters: self.num_dynamic_casters,
            frame_number,
        }
    }

    /// Changes against the last render, caster fields left for the caster walk
    pub fn changes(&self, history: Option<&ShadowViewHistory>, static_light: bool, has_static_cache: bool, frame_number: u16, epsilon: f32) -> ShadowChanges {
        let Some(history) = history else {
            return ShadowChanges {
                static_light,
                has_static_cache,
                missed_last_frame: true,
                ..Default::default()
            };
        };

        ShadowChanges {
            static_light,
            has_static_cache,
            viewport_changed: history.viewport != self.viewport,
            matrix_changed: shadow_matrix_changed(&history.shadow_matrix, &self.shadow_matrix, epsilon),
            static_count_changed: history.num_static_casters != self.num_static_casters,
            missed_last_frame: history.frame_number != previous_frame(frame_number),
            dynamic_count_changed: history.num_dynamic_casters != self.num_dynamic_casters,
            ..Default::default()
        }
    }
}

/// Frame number preceding `frame_number`, skipping 0
pub fn previous_frame(frame_number: u16) -> u16 {
    match frame_number.wrapping_sub(1) {
        0 => u16::MAX,
        previous => previous,
    }
}

// ============================================================================
// Shadow view setup
// ============================================================================

/// Per-light inputs for building its shadow views
#[derive(Debug, Clone, Copy)]
pub struct ShadowSetup<'a> {
    pub light: &'a Light,
    pub light_key: DrawableKey,
    pub world_transform: &'a Mat4,
    pub allocation: ShadowAllocation,
    pub atlas: usize,
    pub atlas_size: IVec2,
}

/// Build one view per cascade or face of a shadowed light.
///
/// `geometry_z_range` and `geometry_bounds` describe the visible geometry of
/// the main view and tighten directional cascades.
pub fn setup_shadow_views(
    setup: &ShadowSetup<'_>,
    main_camera: &Camera,
    geometry_z_range: (f32, f32),
    geometry_bounds: &BoundingBox,
    config: &RendererConfig,
) -> Vec<ShadowView> {
    let light = setup.light;
    let tile = setup.allocation.tile_size;
    let origin = IVec2::new(setup.allocation.rect.left, setup.allocation.rect.top);
    let (_, rotation, position) = setup.world_transform.to_scale_rotation_translation();
    let rotation = rotation.normalize();

    let mut views = Vec::with_capacity(light.num_shadow_views());
    for index in 0..light.num_shadow_views() {
        let (tile_origin, camera, receiver) = match light.light_type() {
            LightType::Directional => {
                let mut offset = IVec2::ZERO;
                if index & 1 != 0 {
                    offset.x += tile;
                }
                if index & 2 != 0 {
                    offset.y += tile;
                }

                let split_start = if index == 0 { 0.0 } else { light.shadow_split(index - 1) };
                let split_start = split_start.max(main_camera.near_clip()).max(geometry_z_range.0);
                let split_end = light.shadow_split(index).min(main_camera.far_clip()).min(geometry_z_range.1);

                let camera = fit_directional_cascade(
                    main_camera,
                    rotation,
                    split_start,
                    split_end.max(split_start),
                    geometry_bounds,
                    tile,
                );
                let receiver = main_camera.world_split_frustum(split_start, split_end.max(split_start));
                (origin + offset, camera, receiver)
            }
            LightType::Point => {
                let offset = IVec2::new((index as i32 >> 1) * tile, (index as i32 & 1) * tile);
                let camera = point_face_camera(position, index, light.range());
                (origin + offset, camera, main_camera.world_frustum())
            }
            LightType::Spot => {
                let camera = spot_camera(position, rotation, light.fov(), light.range());
                (origin, camera, main_camera.world_frustum())
            }
        };

        let viewport = IntRect::from_pos_size(tile_origin, IVec2::splat(tile));
        let mut view = ShadowView::new(setup.light_key, index, setup.atlas, camera, viewport);
        view.receiver_frustum = receiver.transformed(&view.camera.view_matrix());
        view.shadow_matrix = shadow_map_adjust(&viewport, setup.atlas_size) * view.camera.view_projection_matrix();
        view.depth_bias = light.depth_bias() * config.shadow_depth_bias_mul;
        view.slope_scale_bias = light.slope_scale_bias() * config.shadow_slope_scale_bias_mul;
        views.push(view);
    }
    views
}

/// Orthographic camera covering one cascade of the main view.
///
/// The camera starts far behind the main camera along the light direction,
/// is pulled closer when the cascade is far from it, centered on the
/// cascade's light-space box and snapped to whole texels so the shadow
/// does not shimmer as the main camera moves.
pub fn fit_directional_cascade(
    main_camera: &Camera,
    light_rotation: Quat,
    split_start: f32,
    split_end: f32,
    geometry_bounds: &BoundingBox,
    tile_size: i32,
) -> Camera {
    let light_direction = light_rotation * Vec3::NEG_Z;
    let extrusion = main_camera.far_clip();

    let mut camera = Camera::default();
    camera.set_orthographic(true);
    camera.set_rotation(light_rotation);
    camera.set_position(main_camera.position() - light_direction * extrusion);

    let light_view = camera.view_matrix();
    let mut shadow_box = main_camera.world_split_frustum(split_start, split_end).transformed(&light_view).bounding_box();

    // Only the part of the cascade that holds visible geometry matters
    let geometry_box = geometry_bounds.transformed(&light_view);
    if geometry_box.is_defined() {
        let clipped = BoundingBox::new(
            Vec3::new(shadow_box.min.x.max(geometry_box.min.x), shadow_box.min.y.max(geometry_box.min.y), shadow_box.min.z),
            Vec3::new(shadow_box.max.x.min(geometry_box.max.x), shadow_box.max.y.min(geometry_box.max.y), shadow_box.max.z),
        );
        if clipped.is_defined() {
            shadow_box = clipped;
        }
    }

    // View space looks down -Z: nearest depth is -max.z
    let min_distance = main_camera.far_clip() * 0.25;
    let nearest = -shadow_box.max.z;
    if nearest > min_distance {
        let shift = nearest - min_distance;
        camera.set_position(camera.position() + light_direction * shift);
        shadow_box.min.z += shift;
        shadow_box.max.z += shift;
    }

    camera.set_far_clip(-shadow_box.min.z);

    let center = shadow_box.center();
    let size = shadow_box.size().max(Vec3::splat(f32::EPSILON));
    camera.set_ortho_size(size.y);
    camera.set_aspect_ratio(size.x / size.y);
    camera.set_zoom(1.0);
    camera.set_position(camera.position() + light_rotation * Vec3::new(center.x, center.y, 0.0));

    let texel = Vec3::new(size.x, size.y, 1.0) / tile_size.max(1) as f32;
    let view_position = light_rotation.inverse() * camera.position();
    let snap = Vec3::new(-(view_position.x % texel.x), -(view_position.y % texel.y), 0.0);
    camera.set_position(camera.position() + light_rotation * snap);

    camera
}

/// 90 degree camera for one cube face of a point light
pub fn point_face_camera(position: Vec3, face: usize, range: f32) -> Camera {
    let mut camera = Camera::perspective(90.0, 1.0, range * SHADOW_NEAR_CLIP_RATIO, range);
    camera.set_position(position);
    camera.set_rotation(rotation_toward(POINT_FACE_DIRECTIONS[face % NUM_POINT_FACES]));
    camera.set_zoom(POINT_FACE_ZOOM);
    camera
}

pub fn spot_camera(position: Vec3, rotation: Quat, fov: f32, range: f32) -> Camera {
    let mut camera = Camera::perspective(fov, 1.0, range * SHADOW_NEAR_CLIP_RATIO, range);
    camera.set_position(position);
    camera.set_rotation(rotation);
    camera
}

/// Maps clip space of a view into its tile's atlas texture coordinates
pub fn shadow_map_adjust(viewport: &IntRect, atlas_size: IVec2) -> Mat4 {
    let width = atlas_size.x.max(1) as f32;
    let height = atlas_size.y.max(1) as f32;

    let scale = Vec3::new(
        0.5 * viewport.width() as f32 / width,
        -0.5 * viewport.height() as f32 / height,
        1.0,
    );
    let offset = Vec3::new(
        viewport.left as f32 / width + scale.x,
        viewport.top as f32 / height - scale.y,
        0.0,
    );
    Mat4::from_translation(offset) * Mat4::from_scale(scale)
}

#[cfg(test)]
#[path = "shadow_tests.rs"]
mod tests;
