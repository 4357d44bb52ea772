/// Worker-side collection for one frame.
///
/// Collect tasks walk one root branch of the octree each, running the
/// frustum and occlusion state machine per octant, gathering lights and
/// handing geometry to batch tasks in chunks. Everything a task needs is
/// reachable from an `Arc<FrameContext>`; per-thread results are kept in
/// slots indexed by `WorkQueue::thread_index()`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use glam::Mat4;
use crate::camera::{Camera, Frustum, SatData, PLANE_MASK_OUTSIDE};
use crate::math::{BoundingBox, Intersection, Sphere};
use crate::resource::{Pass, PassType};
use crate::scene::{
    Drawable, DrawableFlags, DrawableKey, GeometryNode, LightType, OctantKey, OctantVisibility, Octree,
    SourceBatch,
};
use crate::thread::{lock, Task, WorkQueue};
use super::batch::{Batch, SortMode};
use super::occlusion_buffer::OcclusionBuffer;
use super::shadow::{ShadowRenderMode, ShadowView, ShadowViewHistory};

// ============================================================================
// Frame state
// ============================================================================

/// Results gathered by one thread
#[derive(Debug)]
pub(super) struct ThreadResult {
    pub lights: Vec<DrawableKey>,
    /// Octants to test with GPU occlusion queries
    pub queries: Vec<OctantKey>,
    /// Culling boxes of visited octants
    pub octant_boxes: Vec<BoundingBox>,
    pub opaque: Vec<Batch>,
    pub alpha: Vec<Batch>,
    /// View depth range of visible geometry
    pub min_z: f32,
    pub max_z: f32,
    pub geometry_bounds: BoundingBox,
    pub num_geometries: usize,
}

impl ThreadResult {
    pub fn new() -> Self {
        Self {
            lights: Vec::new(),
            queries: Vec::new(),
            octant_boxes: Vec::new(),
            opaque: Vec::new(),
            alpha: Vec::new(),
            min_z: f32::INFINITY,
            max_z: f32::NEG_INFINITY,
            geometry_bounds: BoundingBox::undefined(),
            num_geometries: 0,
        }
    }
}

/// Lights that survived the frustum walk
#[derive(Debug, Default, Clone)]
pub(super) struct ProcessedLights {
    /// Brightest directional light
    pub directional: Option<DrawableKey>,
    /// Point and spot lights, nearest first
    pub locals: Vec<DrawableKey>,
}

pub(super) struct FrameContext {
    pub octree: Arc<Octree>,
    pub camera: Camera,
    pub frustum: Frustum,
    pub sat: SatData,
    pub view: Mat4,
    pub frame_number: u16,
    pub use_occlusion: bool,
    /// Seconds since the previous frame, advancing visible octants' query timers
    pub frame_time: f32,
    pub query_interval: f32,
    pub occlusion_buffer: Option<Arc<OcclusionBuffer>>,
    pub drawables_per_task: usize,
    pub max_lights: usize,
    pub work_queue: Arc<WorkQueue>,
    pub threads: Vec<Mutex<ThreadResult>>,
    /// Collect and batch tasks not yet finished
    pub pending_tasks: AtomicUsize,
    pub lights: Mutex<ProcessedLights>,
    pub lights_ready: AtomicBool,
}

impl FrameContext {
    /// Whether every collect and batch task has finished and lights are processed
    pub fn is_collected(&self) -> bool {
        self.pending_tasks.load(Ordering::Acquire) == 0 && self.lights_ready.load(Ordering::Acquire)
    }

    fn thread_slot(&self) -> &Mutex<ThreadResult> {
        let index = WorkQueue::thread_index().min(self.threads.len().saturating_sub(1));
        &self.threads[index]
    }
}

// ============================================================================
// Octant walk
// ============================================================================

/// What to do with an octant after the frustum and occlusion tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum OctantAction {
    Skip,
    /// Visit children, leave own drawables
    ChildrenOnly(u8),
    /// Collect own drawables and visit children
    Collect(u8),
}

/// Per-task accumulator, merged into the thread slot when the task ends
struct CollectState {
    lights: Vec<DrawableKey>,
    queries: Vec<OctantKey>,
    octant_boxes: Vec<BoundingBox>,
    geometries: Vec<DrawableKey>,
}

impl CollectState {
    fn new() -> Self {
        Self { lights: Vec::new(), queries: Vec::new(), octant_boxes: Vec::new(), geometries: Vec::new() }
    }
}

/// Frustum test plus the occlusion state machine for one octant.
pub(super) fn classify_octant(
    ctx: &FrameContext,
    key: OctantKey,
    plane_mask: u8,
    queries: &mut Vec<OctantKey>,
) -> OctantAction {
    let Some(octant) = ctx.octree.octant(key) else {
        return OctantAction::Skip;
    };
    let culling_box = octant.culling_box();

    let mut plane_mask = plane_mask;
    if plane_mask != 0 {
        plane_mask = ctx.frustum.is_inside_masked(&culling_box, plane_mask);
        if plane_mask == PLANE_MASK_OUTSIDE {
            if ctx.use_occlusion && octant.visibility() != OctantVisibility::OutsideFrustum {
                ctx.octree.set_subtree_visibility(key, OctantVisibility::OutsideFrustum);
            }
            return OctantAction::Skip;
        }
    }

    if let Some(buffer) = &ctx.occlusion_buffer {
        if !buffer.is_visible(&culling_box) {
            return OctantAction::Skip;
        }
    }

    if !ctx.use_occlusion {
        octant.set_visibility(OctantVisibility::VisibleUnknown);
        return OctantAction::Collect(plane_mask);
    }

    if octant.visibility() == OctantVisibility::OutsideFrustum {
        octant.set_visibility(OctantVisibility::VisibleUnknown);
    }

    match octant.visibility() {
        OctantVisibility::Occluded => {
            add_query(ctx, key, &culling_box, plane_mask, queries);
            OctantAction::Skip
        }
        OctantVisibility::OccludedUnknown => {
            add_query(ctx, key, &culling_box, plane_mask, queries);
            OctantAction::ChildrenOnly(plane_mask)
        }
        OctantVisibility::VisibleUnknown => {
            add_query(ctx, key, &culling_box, plane_mask, queries);
            OctantAction::Collect(plane_mask)
        }
        OctantVisibility::Visible | OctantVisibility::OutsideFrustum => {
            let parent_visible = octant
                .parent()
                .and_then(|parent| ctx.octree.octant(parent))
                .map_or(true, |parent| parent.visibility() == OctantVisibility::Visible);
            if (!octant.drawables().is_empty() || !parent_visible)
                && octant.check_new_query(ctx.frame_time, ctx.query_interval)
            {
                add_query(ctx, key, &culling_box, plane_mask, queries);
            }
            OctantAction::Collect(plane_mask)
        }
    }
}

fn add_query(ctx: &FrameContext, key: OctantKey, culling_box: &BoundingBox, plane_mask: u8, queries: &mut Vec<OctantKey>) {
    let Some(octant) = ctx.octree.octant(key) else {
        return;
    };
    if octant.is_query_pending() {
        return;
    }

    // A box around the camera would be clipped by the near plane
    let near_margin = BoundingBox::new(
        culling_box.min - glam::Vec3::splat(ctx.camera.near_clip() * 2.0),
        culling_box.max + glam::Vec3::splat(ctx.camera.near_clip() * 2.0),
    );
    if near_margin.contains_point(ctx.camera.position()) {
        ctx.octree.on_occlusion_query_result(key, true);
        return;
    }

    if plane_mask != 0 && ctx.frustum.is_inside_sat(culling_box, &ctx.sat) == Intersection::Outside {
        return;
    }

    octant.set_query_pending(true);
    queries.push(key);
}

/// Collect task body: walk a branch, or only the given octant's own drawables.
pub(super) fn collect_branch(ctx: &Arc<FrameContext>, key: OctantKey, plane_mask: u8, own_drawables_only: bool) {
    let mut state = CollectState::new();

    if own_drawables_only {
        collect_drawables(ctx, key, plane_mask, &mut state);
    } else {
        walk_octant(ctx, key, plane_mask, &mut state);
    }

    if !state.geometries.is_empty() {
        spawn_batch_task(ctx, std::mem::take(&mut state.geometries));
    }

    {
        let mut slot = lock(ctx.thread_slot());
        slot.lights.append(&mut state.lights);
        slot.queries.append(&mut state.queries);
        slot.octant_boxes.append(&mut state.octant_boxes);
    }
    ctx.pending_tasks.fetch_sub(1, Ordering::AcqRel);
}

fn walk_octant(ctx: &Arc<FrameContext>, key: OctantKey, plane_mask: u8, state: &mut CollectState) {
    let plane_mask = match classify_octant(ctx, key, plane_mask, &mut state.queries) {
        OctantAction::Skip => return,
        OctantAction::ChildrenOnly(mask) => mask,
        OctantAction::Collect(mask) => {
            collect_drawables(ctx, key, mask, state);
            mask
        }
    };

    let Some(octant) = ctx.octree.octant(key) else {
        return;
    };
    for child in octant.children() {
        walk_octant(ctx, child, plane_mask, state);
    }
}

fn collect_drawables(ctx: &Arc<FrameContext>, key: OctantKey, plane_mask: u8, state: &mut CollectState) {
    let Some(octant) = ctx.octree.octant(key) else {
        return;
    };
    state.octant_boxes.push(octant.culling_box());
    let view_mask = ctx.camera.view_mask();

    for drawable_key in octant.drawables() {
        let Some(drawable) = ctx.octree.drawable(*drawable_key) else {
            continue;
        };
        if drawable.layer_mask() & view_mask == 0 {
            continue;
        }

        // Directional lights have an infinite box
        let directional = drawable.as_light().is_some_and(|light| light.light_type() == LightType::Directional);
        let bbox = drawable.world_bounding_box();
        if !directional && plane_mask != 0 && ctx.frustum.is_inside_masked_fast(&bbox, plane_mask) == Intersection::Outside {
            continue;
        }

        if drawable.is_light() {
            if drawable.in_draw_distance(ctx.camera.distance(drawable.world_position())) {
                state.lights.push(*drawable_key);
            }
        } else if drawable.has_flags(DrawableFlags::GEOMETRY) {
            state.geometries.push(*drawable_key);
            if state.geometries.len() >= ctx.drawables_per_task {
                spawn_batch_task(ctx, std::mem::take(&mut state.geometries));
            }
        }
    }
}

fn spawn_batch_task(ctx: &Arc<FrameContext>, geometries: Vec<DrawableKey>) {
    ctx.pending_tasks.fetch_add(1, Ordering::AcqRel);
    let task_ctx = ctx.clone();
    ctx.work_queue.queue_task(Task::new(move |_| {
        collect_batches(&task_ctx, &geometries);
        task_ctx.pending_tasks.fetch_sub(1, Ordering::AcqRel);
    }));
}

// ============================================================================
// Batches
// ============================================================================

/// Turn visible geometry drawables into opaque and alpha batches.
pub(super) fn collect_batches(ctx: &FrameContext, geometries: &[DrawableKey]) {
    let mut opaque = Vec::new();
    let mut alpha = Vec::new();
    let mut min_z = f32::INFINITY;
    let mut max_z = f32::NEG_INFINITY;
    let mut bounds = BoundingBox::undefined();
    let mut num_geometries = 0;

    for key in geometries {
        let Some(drawable) = ctx.octree.drawable(*key) else {
            continue;
        };
        let Some(node) = drawable.as_geometry() else {
            continue;
        };

        let bbox = drawable.world_bounding_box();
        let distance = ctx.camera.distance(bbox.center());
        if !drawable.in_draw_distance(distance) {
            continue;
        }
        if let Some(buffer) = &ctx.occlusion_buffer {
            if !buffer.is_visible(&bbox) {
                continue;
            }
        }

        let view_box = bbox.transformed(&ctx.view);
        min_z = min_z.min(-view_box.max.z);
        max_z = max_z.max(-view_box.min.z);
        bounds.merge(&bbox);
        num_geometries += 1;

        for source in node.batches() {
            if let Some(pass) = source.material.pass(PassType::Opaque) {
                opaque.push(make_batch(*key, drawable, node, source, pass.clone(), distance));
            } else if let Some(pass) = source.material.pass(PassType::Alpha) {
                alpha.push(make_batch(*key, drawable, node, source, pass.clone(), distance));
            }
        }
    }

    let mut slot = lock(ctx.thread_slot());
    slot.opaque.append(&mut opaque);
    slot.alpha.append(&mut alpha);
    slot.min_z = slot.min_z.min(min_z);
    slot.max_z = slot.max_z.max(max_z);
    slot.geometry_bounds.merge(&bounds);
    slot.num_geometries += num_geometries;
}

fn make_batch(
    key: DrawableKey,
    drawable: &Drawable,
    node: &GeometryNode,
    source: &SourceBatch,
    pass: Arc<Pass>,
    distance: f32,
) -> Batch {
    Batch::new(
        key,
        source.geometry.clone(),
        source.material.clone(),
        pass,
        node.geometry_type(),
        *drawable.world_transform(),
        distance,
    )
}

// ============================================================================
// Lights
// ============================================================================

/// Merge per-thread light lists, pick the brightest directional light and
/// keep the nearest local lights.
pub(super) fn process_lights(ctx: &FrameContext) {
    let mut collected = Vec::new();
    for slot in &ctx.threads {
        collected.append(&mut lock(slot).lights);
    }

    let mut directional: Option<(DrawableKey, f32)> = None;
    let mut locals: Vec<(DrawableKey, f32)> = Vec::new();
    for key in collected {
        let Some(drawable) = ctx.octree.drawable(key) else {
            continue;
        };
        let Some(light) = drawable.as_light() else {
            continue;
        };
        match light.light_type() {
            LightType::Directional => {
                let intensity = light.intensity();
                let brighter = directional.map_or(true, |(best_key, best)| {
                    intensity > best || (intensity == best && key < best_key)
                });
                if brighter {
                    directional = Some((key, intensity));
                }
            }
            LightType::Point | LightType::Spot => {
                locals.push((key, ctx.camera.distance(drawable.world_position())));
            }
        }
    }

    locals.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    locals.truncate(ctx.max_lights);

    *lock(&ctx.lights) = ProcessedLights {
        directional: directional.map(|(key, _)| key),
        locals: locals.into_iter().map(|(key, _)| key).collect(),
    };
    ctx.lights_ready.store(true, Ordering::Release);
}

// ============================================================================
// Shadow casters
// ============================================================================

/// One shadowed light's views and what they looked like last time
#[derive(Debug)]
pub(super) struct ShadowJob {
    pub light: DrawableKey,
    pub views: Vec<ShadowView>,
    pub histories: Vec<Option<ShadowViewHistory>>,
    /// Point lights query their sphere once for all faces
    pub light_sphere: Option<Sphere>,
    pub light_mask: u32,
    pub static_light: bool,
    pub has_static_cache: bool,
    pub matrix_epsilon: f32,
    pub instancing: bool,
}

/// Find the casters of every view, pick its render mode and build the
/// batch queues that mode needs.
pub(super) fn collect_shadow_casters(octree: &Octree, frame_number: u16, job: &mut ShadowJob) {
    let flags = DrawableFlags::GEOMETRY | DrawableFlags::CAST_SHADOWS;

    let mut sphere_casters = Vec::new();
    if let Some(sphere) = &job.light_sphere {
        octree.find_drawables(&mut sphere_casters, sphere, flags, job.light_mask);
    }

    for (view, history) in job.views.iter_mut().zip(job.histories.iter()) {
        let frustum = view.world_frustum();
        let mut candidates = Vec::new();
        if job.light_sphere.is_some() {
            candidates.extend(sphere_casters.iter().copied().filter(|key| {
                octree
                    .drawable(*key)
                    .is_some_and(|drawable| frustum.is_inside_fast(&drawable.world_bounding_box()) != Intersection::Outside)
            }));
        } else {
            octree.find_drawables_masked(&mut candidates, &frustum, flags, job.light_mask);
        }

        let mut static_casters = Vec::new();
        let mut dynamic_casters = Vec::new();
        let mut static_updated = false;
        let mut dynamic_moved = false;
        for key in candidates {
            let Some(drawable) = octree.drawable(key) else {
                continue;
            };
            if !view.extruded_caster_visible(&drawable.world_bounding_box()) {
                continue;
            }
            let updated = drawable.updated_on_frame(frame_number);
            if drawable.is_static() {
                static_updated |= updated;
                static_casters.push(key);
            } else {
                dynamic_moved |= updated;
                dynamic_casters.push(key);
            }
        }

        view.num_static_casters = static_casters.len();
        view.num_dynamic_casters = dynamic_casters.len();

        let mut changes = view.changes(history.as_ref(), job.static_light, job.has_static_cache, frame_number, job.matrix_epsilon);
        changes.static_caster_updated = static_updated;
        changes.dynamic_caster_moved = dynamic_moved;
        view.render_mode = changes.render_mode();

        // Receivers must sample with the matrix the cached contents were rendered with
        if matches!(view.render_mode, ShadowRenderMode::Cached | ShadowRenderMode::RestoreStatic) {
            if let Some(history) = history {
                view.shadow_matrix = history.shadow_matrix;
            }
        }

        let (static_keys, dynamic_keys) = match view.render_mode {
            ShadowRenderMode::Dynamic => {
                let mut all = static_casters;
                all.append(&mut dynamic_casters);
                (Vec::new(), all)
            }
            ShadowRenderMode::StoreStatic => (static_casters, dynamic_casters),
            ShadowRenderMode::RestoreStatic => (Vec::new(), dynamic_casters),
            ShadowRenderMode::Cached => (Vec::new(), Vec::new()),
        };

        let mut static_batches = shadow_batches(octree, view, &static_keys);
        let mut dynamic_batches = shadow_batches(octree, view, &dynamic_keys);
        view.static_queue.clear();
        view.dynamic_queue.clear();
        view.static_queue.append(&mut static_batches);
        view.dynamic_queue.append(&mut dynamic_batches);

        let mut instance_transforms = std::mem::take(&mut view.instance_transforms);
        instance_transforms.clear();
        view.static_queue.sort(&mut instance_transforms, SortMode::State, job.instancing);
        view.dynamic_queue.sort(&mut instance_transforms, SortMode::State, job.instancing);
        view.instance_transforms = instance_transforms;
    }
}

fn shadow_batches(octree: &Octree, view: &ShadowView, casters: &[DrawableKey]) -> Vec<Batch> {
    let mut batches = Vec::new();
    for key in casters {
        let Some(drawable) = octree.drawable(*key) else {
            continue;
        };
        let Some(node) = drawable.as_geometry() else {
            continue;
        };
        let distance = view.camera.distance(drawable.world_bounding_box().center());
        for source in node.batches() {
            if let Some(pass) = source.material.pass(PassType::Shadow) {
                batches.push(make_batch(*key, drawable, node, source, pass.clone(), distance));
            }
        }
    }
    batches
}

#[cfg(test)]
#[path = "collect_tests.rs"]
mod tests;
