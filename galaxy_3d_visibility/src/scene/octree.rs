/// Octree - loose octree with incremental reinsertion.
///
/// Each drawable lives in exactly one octant: the deepest one that accepts
/// its world box (see `Octant::fit_bounding_box`). Child octants are
/// created on demand and freed as soon as their subtree holds nothing;
/// the root is permanent.
///
/// Moving a drawable only queues it. `update` drains the queue once per
/// frame: the containment checks run in parallel chunks on the work
/// queue, then the moves that actually change octant are applied
/// serially, since the topology is not safe to mutate concurrently.
/// Queries take `&self` and may run from many tasks at once between
/// updates.

use std::sync::{Arc, Mutex};
use glam::{Mat4, Vec3};
use slotmap::{Key, KeyData, SlotMap};
use crate::camera::{Frustum, PLANE_MASK_ALL, PLANE_MASK_OUTSIDE};
use crate::config::OctreeConfig;
use crate::error::{Error, Result};
use crate::math::{BoundingBox, Intersection, Ray};
use crate::thread::{lock, Task, WorkQueue};
use crate::{engine_debug, engine_info, engine_trace};
use super::culling_volume::CullingVolume;
use super::drawable::{BoundsSource, Drawable, DrawableFlags, DrawableKey, DrawableKind};
use super::light::LightType;
use super::octant::{Octant, OctantKey, OctantVisibility};

/// One raycast hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastResult {
    pub drawable: DrawableKey,
    pub distance: f32,
    pub position: Vec3,
}

/// Snapshot of a queued drawable, checked on a worker thread
#[derive(Debug, Clone, Copy)]
struct UpdateEntry {
    key: DrawableKey,
    source: BoundsSource,
    /// Fitting box of the current octant, `None` when not inserted yet
    fitting_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, Copy)]
struct UpdateResult {
    key: DrawableKey,
    world_bounding_box: BoundingBox,
    needs_reinsert: bool,
}

impl UpdateEntry {
    fn check(&self) -> UpdateResult {
        let world_bounding_box = self.source.world_bounding_box();
        let needs_reinsert = match self.fitting_box {
            Some(fitting_box) => !world_bounding_box.is_defined() || !fitting_box.contains(&world_bounding_box),
            None => true,
        };
        UpdateResult { key: self.key, world_bounding_box, needs_reinsert }
    }
}

pub struct Octree {
    config: OctreeConfig,
    drawables: SlotMap<DrawableKey, Drawable>,
    octants: SlotMap<OctantKey, Octant>,
    root: OctantKey,
    /// Drawables whose transform or bounds changed since the last update
    update_queue: Vec<DrawableKey>,
    /// Octants whose drawable lists need re-sorting (lights first)
    sort_dirty: Vec<OctantKey>,
    frame_number: u16,
}

impl Octree {
    pub fn new(config: OctreeConfig) -> Self {
        let config = config.clamped();
        let mut octants = SlotMap::with_key();
        let root = octants.insert(Self::root_octant(&config));
        engine_info!("galaxy3d::Octree", "Created octree: size {}, {} levels", config.size, config.num_levels);

        Self {
            config,
            drawables: SlotMap::with_key(),
            octants,
            root,
            update_queue: Vec::new(),
            sort_dirty: Vec::new(),
            frame_number: 0,
        }
    }

    fn root_octant(config: &OctreeConfig) -> Octant {
        let world_box = BoundingBox::from_center_half_size(Vec3::ZERO, Vec3::splat(config.size));
        Octant::new(None, world_box, config.num_levels, 0)
    }

    // ===== DRAWABLES =====

    /// Add a drawable. It is placed in an octant on the next `update`.
    pub fn add_drawable(&mut self, mut drawable: Drawable) -> DrawableKey {
        drawable.octant = None;
        drawable.reinsert_queued = false;
        drawable.mark_bounding_box_dirty();
        let key = self.drawables.insert(drawable);
        self.queue_update(key);
        key
    }

    /// Remove a drawable, freeing octants left empty. Returns it detached.
    pub fn remove_drawable(&mut self, key: DrawableKey) -> Option<Drawable> {
        let mut drawable = self.drawables.remove(key)?;
        if let Some(octant) = drawable.octant.take() {
            self.remove_from_octant(key, octant);
        }
        if drawable.reinsert_queued {
            self.update_queue.retain(|queued| *queued != key);
            drawable.reinsert_queued = false;
        }
        Some(drawable)
    }

    pub fn set_transform(&mut self, key: DrawableKey, transform: Mat4) -> Result<()> {
        self.modify(key, |drawable| drawable.set_world_transform(transform))
    }

    /// Replace the caller flags (`STATIC`, `CAST_SHADOWS`) of a drawable.
    pub fn set_flags(&mut self, key: DrawableKey, flags: DrawableFlags) -> Result<()> {
        self.modify(key, |drawable| drawable.set_flags(flags))
    }

    /// Mutate a drawable and queue it for reinsertion.
    pub fn modify<R>(&mut self, key: DrawableKey, f: impl FnOnce(&mut Drawable) -> R) -> Result<R> {
        let Some(drawable) = self.drawables.get_mut(key) else {
            return Err(Error::InvalidResource(format!("Drawable {:?} not found", key)));
        };

        let was_light = drawable.is_light();
        let result = f(drawable);
        drawable.sync_kind_flags();
        drawable.mark_bounding_box_dirty();

        // Light ordering inside the octant may have changed
        if drawable.is_light() != was_light {
            if let Some(octant) = drawable.octant {
                self.mark_sort_dirty(octant);
            }
        }
        self.queue_update(key);
        Ok(result)
    }

    fn queue_update(&mut self, key: DrawableKey) {
        if let Some(drawable) = self.drawables.get_mut(key) {
            if !drawable.reinsert_queued {
                drawable.reinsert_queued = true;
                self.update_queue.push(key);
            }
        }
    }

    // ===== UPDATE =====

    /// Drain the reinsertion queue.
    ///
    /// Every queued drawable gets its world box recomputed and its
    /// `last_update_frame` set to `frame_number`. Drawables still inside
    /// their octant's fitting box stay put; the rest are reinserted.
    pub fn update(&mut self, frame_number: u16, work_queue: &WorkQueue) {
        self.frame_number = frame_number;
        if self.update_queue.is_empty() {
            return;
        }

        let queue = std::mem::take(&mut self.update_queue);
        let entries: Vec<UpdateEntry> = queue
            .iter()
            .filter_map(|&key| {
                let drawable = self.drawables.get(key)?;
                let fitting_box = drawable.octant
                    .and_then(|octant| self.octants.get(octant))
                    .map(|octant| octant.fitting_box());
                Some(UpdateEntry { key, source: drawable.bounds_source(), fitting_box })
            })
            .collect();

        let results = if entries.len() < self.config.min_threaded_update || work_queue.num_threads() <= 1 {
            entries.iter().map(UpdateEntry::check).collect()
        } else {
            self.check_threaded(entries, work_queue)
        };

        let mut num_moved = 0;
        for result in &results {
            let Some(drawable) = self.drawables.get_mut(result.key) else {
                continue;
            };
            drawable.set_cached_bounding_box(result.world_bounding_box);
            drawable.last_update_frame = frame_number;
            drawable.reinsert_queued = false;
            if result.needs_reinsert && self.reinsert_drawable(result.key) {
                num_moved += 1;
            }
        }

        self.sort_octant_drawables();
        engine_trace!("galaxy3d::Octree", "Frame {}: updated {} drawables, {} changed octant",
            frame_number, results.len(), num_moved);
    }

    /// Containment checks in chunks of `max(min_threaded_update, n / threads / divisor)`.
    fn check_threaded(&self, entries: Vec<UpdateEntry>, work_queue: &WorkQueue) -> Vec<UpdateResult> {
        let num_entries = entries.len();
        let num_threads = work_queue.num_threads();
        let chunk_size = self.config.min_threaded_update
            .max(num_entries / num_threads / self.config.update_chunk_divisor)
            .max(1);

        let entries = Arc::new(entries);
        let scratch: Arc<Vec<Mutex<Vec<UpdateResult>>>> =
            Arc::new((0..num_threads).map(|_| Mutex::new(Vec::new())).collect());

        let tasks: Vec<Arc<Task>> = (0..num_entries)
            .step_by(chunk_size)
            .map(|start| {
                let entries = entries.clone();
                let scratch = scratch.clone();
                let end = (start + chunk_size).min(num_entries);
                Task::new(move |thread_index| {
                    let checked: Vec<UpdateResult> = entries[start..end].iter().map(UpdateEntry::check).collect();
                    if let Some(slot) = scratch.get(thread_index) {
                        lock(slot).extend(checked);
                    }
                })
            })
            .collect();

        work_queue.queue_tasks(&tasks);
        work_queue.complete();

        let mut results = Vec::with_capacity(num_entries);
        for slot in scratch.iter() {
            results.append(&mut lock(slot));
        }
        results
    }

    /// Walk down from the root to the octant that accepts the drawable's
    /// box. Returns whether the drawable changed octant.
    fn reinsert_drawable(&mut self, key: DrawableKey) -> bool {
        let Some(drawable) = self.drawables.get(key) else {
            return false;
        };
        let bbox = drawable.world_bounding_box();
        let old_octant = drawable.octant;
        let new_octant = self.find_octant_for(&bbox);

        if old_octant == Some(new_octant) {
            if new_octant == self.root {
                if let Some(root) = self.octants.get_mut(self.root) {
                    root.expand_culling_box(&bbox);
                }
            }
            return false;
        }
        // Add first: removing the last drawable of a branch frees its octants
        self.add_to_octant(key, new_octant, &bbox);
        if let Some(old_octant) = old_octant {
            self.remove_from_octant(key, old_octant);
        }
        true
    }

    fn find_octant_for(&mut self, bbox: &BoundingBox) -> OctantKey {
        // Undefined boxes are treated as zero-size and stay at the root
        if !bbox.is_defined() {
            return self.root;
        }

        let box_size = bbox.size();
        let mut current = self.root;
        loop {
            let Some(octant) = self.octants.get(current) else {
                return self.root;
            };
            let insert_here = if current == self.root {
                // A box not inside the root must remain in it
                !octant.fitting_box().contains(bbox) || octant.fit_bounding_box(bbox, box_size)
            } else {
                octant.fit_bounding_box(bbox, box_size)
            };
            if insert_here {
                return current;
            }
            let index = octant.child_index_for(bbox.center());
            current = self.create_child_octant(current, index);
        }
    }

    fn create_child_octant(&mut self, parent_key: OctantKey, index: usize) -> OctantKey {
        let Some(parent) = self.octants.get(parent_key) else {
            return self.root;
        };
        if let Some(child) = parent.child(index) {
            return child;
        }

        let child = Octant::new(Some(parent_key), parent.child_world_box(index), parent.level() - 1, index as u8);
        let child_key = self.octants.insert(child);
        if let Some(parent) = self.octants.get_mut(parent_key) {
            parent.children[index] = Some(child_key);
            parent.num_children += 1;
        }
        child_key
    }

    fn add_to_octant(&mut self, key: DrawableKey, octant_key: OctantKey, bbox: &BoundingBox) {
        let Some(octant) = self.octants.get_mut(octant_key) else {
            return;
        };
        octant.drawables.push(key);
        if octant_key == self.root {
            octant.expand_culling_box(bbox);
        }
        if let Some(drawable) = self.drawables.get_mut(key) {
            drawable.octant = Some(octant_key);
        }
        self.mark_sort_dirty(octant_key);
    }

    /// Remove from an octant, then free the chain of empty octants above it.
    fn remove_from_octant(&mut self, key: DrawableKey, octant_key: OctantKey) {
        let Some(octant) = self.octants.get_mut(octant_key) else {
            return;
        };
        if let Some(position) = octant.drawables.iter().position(|drawable| *drawable == key) {
            octant.drawables.remove(position);
        }
        if octant_key == self.root {
            self.recompute_root_culling_box();
            return;
        }

        let mut current = octant_key;
        while current != self.root {
            let Some(octant) = self.octants.get(current) else {
                break;
            };
            if !octant.is_empty() {
                break;
            }
            let parent_key = octant.parent();
            let child_index = octant.child_index();
            self.octants.remove(current);

            let Some(parent_key) = parent_key else {
                break;
            };
            if let Some(parent) = self.octants.get_mut(parent_key) {
                parent.children[child_index] = None;
                parent.num_children -= 1;
            }
            current = parent_key;
        }
    }

    /// Root culling box: the fitting box grown by every root drawable
    /// that does not fit it.
    fn recompute_root_culling_box(&mut self) {
        let Some(root) = self.octants.get(self.root) else {
            return;
        };
        let mut culling_box = root.fitting_box();
        for key in root.drawables() {
            if let Some(drawable) = self.drawables.get(*key) {
                let bbox = drawable.world_bounding_box();
                if bbox.is_defined() {
                    culling_box.merge(&bbox);
                }
            }
        }
        if let Some(root) = self.octants.get_mut(self.root) {
            root.reset_culling_box(culling_box);
        }
    }

    fn mark_sort_dirty(&mut self, octant_key: OctantKey) {
        if let Some(octant) = self.octants.get_mut(octant_key) {
            if !octant.sort_dirty {
                octant.sort_dirty = true;
                self.sort_dirty.push(octant_key);
            }
        }
    }

    /// Lights first, then by key, so light collection can stop at the
    /// first non-light.
    fn sort_octant_drawables(&mut self) {
        let drawables = &self.drawables;
        for octant_key in self.sort_dirty.drain(..) {
            if let Some(octant) = self.octants.get_mut(octant_key) {
                octant.drawables.sort_by_key(|key| {
                    let is_light = drawables.get(*key).is_some_and(|drawable| drawable.is_light());
                    (!is_light, *key)
                });
                octant.sort_dirty = false;
            }
        }
    }

    // ===== RESIZE =====

    /// Redefine the root as `±size` with `num_levels` levels.
    ///
    /// Every inserted drawable is detached and queued; they are placed
    /// again on the next `update`.
    pub fn resize(&mut self, size: f32, num_levels: u32) {
        self.config = OctreeConfig { size, num_levels, ..self.config.clone() }.clamped();

        for (key, drawable) in self.drawables.iter_mut() {
            drawable.octant = None;
            if !drawable.reinsert_queued {
                drawable.reinsert_queued = true;
                self.update_queue.push(key);
            }
        }

        self.octants.clear();
        self.sort_dirty.clear();
        self.root = self.octants.insert(Self::root_octant(&self.config));
        engine_info!("galaxy3d::Octree", "Resized octree: size {}, {} levels, {} drawables queued",
            self.config.size, self.config.num_levels, self.update_queue.len());
    }

    // ===== ACCESSORS =====

    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    pub fn root(&self) -> OctantKey {
        self.root
    }

    pub fn octant(&self, key: OctantKey) -> Option<&Octant> {
        self.octants.get(key)
    }

    pub fn octants(&self) -> impl Iterator<Item = (OctantKey, &Octant)> {
        self.octants.iter()
    }

    pub fn num_octants(&self) -> usize {
        self.octants.len()
    }

    pub fn drawable(&self, key: DrawableKey) -> Option<&Drawable> {
        self.drawables.get(key)
    }

    pub fn drawables(&self) -> impl Iterator<Item = (DrawableKey, &Drawable)> {
        self.drawables.iter()
    }

    pub fn num_drawables(&self) -> usize {
        self.drawables.len()
    }

    /// Drawables waiting for the next `update`
    pub fn num_queued(&self) -> usize {
        self.update_queue.len()
    }

    /// Frame number of the last `update`
    pub fn frame_number(&self) -> u16 {
        self.frame_number
    }

    // ===== QUERIES =====

    /// Every inserted drawable matching `flags` and `layer_mask`.
    pub fn find_all_drawables(&self, result: &mut Vec<DrawableKey>, flags: DrawableFlags, layer_mask: u32) {
        self.collect_all(self.root, result, flags, layer_mask);
    }

    /// Drawables whose world box is not outside `volume`.
    pub fn find_drawables<V: CullingVolume + ?Sized>(
        &self,
        result: &mut Vec<DrawableKey>,
        volume: &V,
        flags: DrawableFlags,
        layer_mask: u32,
    ) {
        self.collect_in_volume(self.root, result, volume, flags, layer_mask);
    }

    /// Frustum query that stops testing planes an ancestor octant is
    /// already fully inside.
    pub fn find_drawables_masked(
        &self,
        result: &mut Vec<DrawableKey>,
        frustum: &Frustum,
        flags: DrawableFlags,
        layer_mask: u32,
    ) {
        self.collect_masked(self.root, result, frustum, PLANE_MASK_ALL, flags, layer_mask);
    }

    /// All hits closer than `max_distance`, nearest first.
    pub fn raycast(&self, ray: &Ray, flags: DrawableFlags, max_distance: f32, layer_mask: u32) -> Vec<RaycastResult> {
        let mut candidates = Vec::new();
        self.collect_ray_candidates(self.root, &mut candidates, ray, flags, max_distance, layer_mask);

        let mut result: Vec<RaycastResult> = candidates
            .into_iter()
            .filter_map(|(key, _)| {
                let distance = self.drawable_hit_distance(key, ray);
                (distance < max_distance).then(|| RaycastResult { drawable: key, distance, position: ray.point_at(distance) })
            })
            .collect();
        result.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        result
    }

    /// Closest hit. Candidates are visited in box-distance order and the
    /// walk stops once no remaining box can beat the best hit.
    pub fn raycast_single(&self, ray: &Ray, flags: DrawableFlags, max_distance: f32, layer_mask: u32) -> Option<RaycastResult> {
        let mut candidates = Vec::new();
        self.collect_ray_candidates(self.root, &mut candidates, ray, flags, max_distance, layer_mask);
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut closest: Option<RaycastResult> = None;
        for (key, box_distance) in candidates {
            let limit = closest.map_or(max_distance, |hit| hit.distance.min(max_distance));
            if box_distance >= limit {
                break;
            }
            let distance = self.drawable_hit_distance(key, ray);
            if distance < limit {
                closest = Some(RaycastResult { drawable: key, distance, position: ray.point_at(distance) });
            }
        }
        closest
    }

    fn matches(drawable: &Drawable, flags: DrawableFlags, layer_mask: u32) -> bool {
        drawable.has_flags(flags) && drawable.layer_mask() & layer_mask != 0
    }

    fn collect_all(&self, octant_key: OctantKey, result: &mut Vec<DrawableKey>, flags: DrawableFlags, layer_mask: u32) {
        let Some(octant) = self.octants.get(octant_key) else {
            return;
        };
        for key in octant.drawables() {
            if self.drawables.get(*key).is_some_and(|drawable| Self::matches(drawable, flags, layer_mask)) {
                result.push(*key);
            }
        }
        for child in octant.children() {
            self.collect_all(child, result, flags, layer_mask);
        }
    }

    fn collect_in_volume<V: CullingVolume + ?Sized>(
        &self,
        octant_key: OctantKey,
        result: &mut Vec<DrawableKey>,
        volume: &V,
        flags: DrawableFlags,
        layer_mask: u32,
    ) {
        let Some(octant) = self.octants.get(octant_key) else {
            return;
        };
        match volume.is_inside(&octant.culling_box()) {
            Intersection::Outside => {}
            Intersection::Inside => self.collect_all(octant_key, result, flags, layer_mask),
            Intersection::Intersects => {
                for key in octant.drawables() {
                    let Some(drawable) = self.drawables.get(*key) else {
                        continue;
                    };
                    if Self::matches(drawable, flags, layer_mask)
                        && volume.is_inside_fast(&drawable.world_bounding_box()) != Intersection::Outside
                    {
                        result.push(*key);
                    }
                }
                for child in octant.children() {
                    self.collect_in_volume(child, result, volume, flags, layer_mask);
                }
            }
        }
    }

    fn collect_masked(
        &self,
        octant_key: OctantKey,
        result: &mut Vec<DrawableKey>,
        frustum: &Frustum,
        plane_mask: u8,
        flags: DrawableFlags,
        layer_mask: u32,
    ) {
        let Some(octant) = self.octants.get(octant_key) else {
            return;
        };
        let plane_mask = if plane_mask != 0 {
            frustum.is_inside_masked(&octant.culling_box(), plane_mask)
        } else {
            0
        };
        if plane_mask == PLANE_MASK_OUTSIDE {
            return;
        }

        for key in octant.drawables() {
            let Some(drawable) = self.drawables.get(*key) else {
                continue;
            };
            if Self::matches(drawable, flags, layer_mask)
                && (plane_mask == 0
                    || frustum.is_inside_masked_fast(&drawable.world_bounding_box(), plane_mask) != Intersection::Outside)
            {
                result.push(*key);
            }
        }
        for child in octant.children() {
            self.collect_masked(child, result, frustum, plane_mask, flags, layer_mask);
        }
    }

    fn collect_ray_candidates(
        &self,
        octant_key: OctantKey,
        result: &mut Vec<(DrawableKey, f32)>,
        ray: &Ray,
        flags: DrawableFlags,
        max_distance: f32,
        layer_mask: u32,
    ) {
        let Some(octant) = self.octants.get(octant_key) else {
            return;
        };
        if ray.hit_distance_box(&octant.culling_box()) >= max_distance {
            return;
        }

        for key in octant.drawables() {
            let Some(drawable) = self.drawables.get(*key) else {
                continue;
            };
            if Self::matches(drawable, flags, layer_mask) {
                let distance = ray.hit_distance_box(&drawable.world_bounding_box());
                if distance < max_distance {
                    result.push((*key, distance));
                }
            }
        }
        for child in octant.children() {
            self.collect_ray_candidates(child, result, ray, flags, max_distance, layer_mask);
        }
    }

    /// Precise hit distance: occluder triangles, point light spheres,
    /// world boxes for everything else.
    fn drawable_hit_distance(&self, key: DrawableKey, ray: &Ray) -> f32 {
        let Some(drawable) = self.drawables.get(key) else {
            return f32::INFINITY;
        };
        match drawable.kind() {
            DrawableKind::Occluder(occluder) => {
                let transform = drawable.world_transform();
                let vertex = |index: u32| {
                    occluder.vertices()
                        .get(index as usize)
                        .map(|v| transform.transform_point3(*v))
                };
                let num_triangles = occluder.num_triangles() as u32;
                let mut closest = f32::INFINITY;
                for triangle in 0..num_triangles {
                    let corner = |i: u32| match occluder.indices() {
                        Some(indices) => indices.get((triangle * 3 + i) as usize).and_then(|index| vertex(*index)),
                        None => vertex(triangle * 3 + i),
                    };
                    if let (Some(v0), Some(v1), Some(v2)) = (corner(0), corner(1), corner(2)) {
                        closest = closest.min(ray.hit_distance_triangle(v0, v1, v2));
                    }
                }
                closest
            }
            DrawableKind::Light(light) if light.light_type() == LightType::Point => {
                ray.hit_distance_sphere(&light.world_sphere(drawable.world_transform()))
            }
            _ => ray.hit_distance_box(&drawable.world_bounding_box()),
        }
    }

    // ===== OCCLUSION STATE =====

    /// Apply a GPU occlusion query result to an octant.
    ///
    /// Stale keys (octants freed since the query was issued) are ignored.
    /// Octants outside the frustum keep their state.
    pub fn on_occlusion_query_result(&self, octant_key: OctantKey, visible: bool) {
        let Some(octant) = self.octants.get(octant_key) else {
            engine_debug!("galaxy3d::Octree", "Dropped occlusion result for freed octant {:?}", octant_key);
            return;
        };
        octant.set_query_pending(false);

        let last = octant.visibility();
        if last == OctantVisibility::OutsideFrustum {
            return;
        }

        if visible {
            octant.set_visibility(OctantVisibility::Visible);

            // Back in view after being occluded: children are tested along the hierarchy
            if last <= OctantVisibility::OccludedUnknown {
                for child in octant.children() {
                    self.set_subtree_visibility(child, OctantVisibility::OccludedUnknown);
                }
            }

            let mut parent = octant.parent();
            while let Some(parent_octant) = parent.and_then(|key| self.octants.get(key)) {
                if parent_octant.visibility() == OctantVisibility::Visible {
                    break;
                }
                parent_octant.set_visibility(OctantVisibility::Visible);
                parent = parent_octant.parent();
            }
        } else {
            octant.set_visibility(OctantVisibility::Occluded);

            // Newly occluded: test the parent next
            if last != OctantVisibility::Occluded {
                if let Some(parent_octant) = octant.parent().and_then(|key| self.octants.get(key)) {
                    if parent_octant.visibility() == OctantVisibility::Visible {
                        parent_octant.set_visibility(OctantVisibility::VisibleUnknown);
                    }
                }
            }
        }
    }

    /// Set the visibility of an octant and all its descendants.
    pub fn set_subtree_visibility(&self, octant_key: OctantKey, visibility: OctantVisibility) {
        let Some(octant) = self.octants.get(octant_key) else {
            return;
        };
        octant.set_visibility(visibility);
        for child in octant.children() {
            self.set_subtree_visibility(child, visibility);
        }
    }
}

/// Tag identifying an octant in GPU occlusion queries.
pub fn occlusion_query_tag(octant: OctantKey) -> u64 {
    octant.data().as_ffi()
}

/// Octant key from an occlusion query tag.
pub fn octant_from_query_tag(tag: u64) -> OctantKey {
    OctantKey::from(KeyData::from_ffi(tag))
}

#[cfg(test)]
#[path = "octree_tests.rs"]
mod tests;
