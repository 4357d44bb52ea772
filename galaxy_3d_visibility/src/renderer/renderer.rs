/// Renderer - per-frame visibility pipeline for one camera.
///
/// A frame is four calls made in order by the game loop:
/// `prepare_view`, `render_shadow_maps`, `render_opaque`, `render_alpha`,
/// optionally followed by `render_debug`.
///
/// `prepare_view` does all the work that touches the octree: it applies
/// last frame's occlusion query results, reinserts moved drawables,
/// rasterizes occluders, runs the collect and batch tasks, sets up shadow
/// views and their casters, and fills the light cluster grid. The render
/// calls only submit what was prepared, so the scene may be edited again
/// as soon as `prepare_view` returns.

use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::{Arc, Mutex};
use glam::{Mat4, Vec4};
use rustc_hash::FxHashMap;
use crate::camera::{Camera, Frustum, SatData, PLANE_MASK_ALL};
use crate::config::{RendererConfig, DEFAULT_FRAME_TIME, NUM_CLUSTER_Z};
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, LightData, PerViewUniforms, NUM_CASCADES};
use crate::math::BoundingBox;
use crate::scene::{
    light_direction, occlusion_query_tag, octant_from_query_tag, DrawableFlags, DrawableKey, LightType, OctantKey,
    Octree, Scene,
};
use crate::thread::{lock, Task, WorkQueue};
use crate::{engine_bail, engine_debug, engine_info, engine_trace, engine_warn};
use super::batch::{BatchQueue, SortMode};
use super::cluster::{cull_slice, ClusterGrid, ClusterLight, SliceLights};
use super::collect::{
    classify_octant, collect_branch, collect_shadow_casters, process_lights, FrameContext, OctantAction,
    ProcessedLights, ShadowJob, ThreadResult,
};
use super::occlusion_buffer::OcclusionBuffer;
use super::shadow::{
    setup_shadow_views, ShadowAllocation, ShadowMap, ShadowSetup, ShadowView, ShadowViewHistory, DIR_LIGHT_ATLAS,
    LOCAL_LIGHT_ATLAS,
};

// ============================================================================
// Stats
// ============================================================================

/// Counters of the last prepared frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub num_octants: usize,
    pub num_geometries: usize,
    pub num_lights: usize,
    pub num_opaque_batches: usize,
    pub num_alpha_batches: usize,
    pub num_shadow_views: usize,
    pub num_shadow_batches: usize,
    pub num_occlusion_queries: usize,
    pub num_occluder_triangles: usize,
}

/// Shadow state a light keeps between frames
#[derive(Debug, Clone, Default)]
struct LightShadowState {
    atlas: usize,
    allocation: Option<ShadowAllocation>,
    /// Indexed by view index
    histories: Vec<Option<ShadowViewHistory>>,
    frame_number: u16,
}

/// Next frame number, skipping 0 on wrap
pub fn next_frame_number(frame_number: u16) -> u16 {
    frame_number.wrapping_add(1).max(1)
}

// ============================================================================
// Renderer
// ============================================================================

pub struct Renderer {
    pub(super) device: Arc<Mutex<dyn GraphicsDevice>>,
    pub(super) work_queue: Arc<WorkQueue>,
    pub(super) config: RendererConfig,
    pub(super) frame_number: u16,
    frame_time: f32,
    pub(super) camera: Camera,
    occlusion_buffer: Option<OcclusionBuffer>,

    pub(super) opaque_queue: BatchQueue,
    pub(super) alpha_queue: BatchQueue,
    pub(super) instance_transforms: Vec<Mat4>,

    pub(super) shadow_maps: Vec<ShadowMap>,
    pub(super) shadow_views: Vec<ShadowView>,
    light_states: FxHashMap<DrawableKey, LightShadowState>,

    pub(super) cluster_grid: ClusterGrid,
    pub(super) light_data: Vec<LightData>,
    pub(super) per_view: PerViewUniforms,

    /// Octants to query after opaque rendering, with their culling boxes
    pub(super) pending_queries: Vec<(OctantKey, BoundingBox)>,
    pub(super) debug_octant_boxes: Vec<BoundingBox>,
    pub(super) debug_light_boxes: Vec<BoundingBox>,
    pub(super) stats: FrameStats,
}

impl Renderer {
    /// Create a renderer submitting to `device` and running tasks on `work_queue`.
    ///
    /// Atlas sizes must be 0 (disabled) or a power of two.
    pub fn new(
        device: Arc<Mutex<dyn GraphicsDevice>>,
        work_queue: Arc<WorkQueue>,
        config: RendererConfig,
    ) -> Result<Self> {
        let config = config.clamped();
        for (name, size) in [("Directional", config.dir_light_shadow_size), ("Local light", config.light_atlas_size)] {
            if size != 0 && (size as u32).count_ones() != 1 {
                engine_bail!("galaxy3d::Renderer", "{} shadow atlas size {} is not a power of two", name, size);
            }
        }

        let shadow_maps = vec![
            ShadowMap::new(DIR_LIGHT_ATLAS, config.dir_light_shadow_size, config.static_shadow_cache),
            ShadowMap::new(LOCAL_LIGHT_ATLAS, config.light_atlas_size, config.static_shadow_cache),
        ];

        engine_info!("galaxy3d::Renderer", "Renderer created: {} threads, shadow atlases {} / {}, instancing {}",
            work_queue.num_threads(), config.dir_light_shadow_size, config.light_atlas_size, config.instancing);

        Ok(Self {
            device,
            work_queue,
            config,
            frame_number: 0,
            frame_time: DEFAULT_FRAME_TIME,
            camera: Camera::default(),
            occlusion_buffer: None,
            opaque_queue: BatchQueue::new(),
            alpha_queue: BatchQueue::new(),
            instance_transforms: Vec::new(),
            shadow_maps,
            shadow_views: Vec::new(),
            light_states: FxHashMap::default(),
            cluster_grid: ClusterGrid::new(),
            light_data: Vec::new(),
            per_view: PerViewUniforms::default(),
            pending_queries: Vec::new(),
            debug_octant_boxes: Vec::new(),
            debug_light_boxes: Vec::new(),
            stats: FrameStats::default(),
        })
    }

    // ===== ACCESSORS =====

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn frame_number(&self) -> u16 {
        self.frame_number
    }

    /// Seconds the last frame took; paces re-queries of visible octants
    pub fn set_frame_time(&mut self, seconds: f32) {
        self.frame_time = seconds.max(0.0);
    }

    pub fn frame_time(&self) -> f32 {
        self.frame_time
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn opaque_queue(&self) -> &BatchQueue {
        &self.opaque_queue
    }

    pub fn alpha_queue(&self) -> &BatchQueue {
        &self.alpha_queue
    }

    pub fn instance_transforms(&self) -> &[Mat4] {
        &self.instance_transforms
    }

    pub fn shadow_views(&self) -> &[ShadowView] {
        &self.shadow_views
    }

    pub fn shadow_map(&self, index: usize) -> Option<&ShadowMap> {
        self.shadow_maps.get(index)
    }

    pub fn cluster_grid(&self) -> &ClusterGrid {
        &self.cluster_grid
    }

    /// Uploaded light array; entry 0 is unused
    pub fn light_data(&self) -> &[LightData] {
        &self.light_data
    }

    pub fn per_view_uniforms(&self) -> &PerViewUniforms {
        &self.per_view
    }

    /// Octants awaiting an occlusion query this frame
    pub fn pending_queries(&self) -> impl Iterator<Item = OctantKey> + '_ {
        self.pending_queries.iter().map(|(key, _)| *key)
    }

    // ===== PREPARE =====

    /// Cull, batch and set up lighting for one camera.
    pub fn prepare_view(&mut self, scene: &mut Scene, camera: &Camera, draw_shadows: bool, use_occlusion: bool) -> Result<()> {
        self.apply_occlusion_results(scene.octree())?;

        self.frame_number = next_frame_number(self.frame_number);
        let frame_number = self.frame_number;
        scene.octree_mut()?.update(frame_number, &self.work_queue);
        let octree = scene.share_octree();

        self.camera = camera.clone();
        self.reset_frame();

        let frustum = camera.world_frustum();
        let occlusion_buffer = if use_occlusion && self.config.software_occlusion {
            self.draw_occluders(&octree, camera, &frustum)
        } else {
            None
        };

        let ctx = Arc::new(FrameContext {
            octree: octree.clone(),
            camera: camera.clone(),
            sat: SatData::new(&frustum),
            frustum,
            view: camera.view_matrix(),
            frame_number,
            use_occlusion,
            frame_time: self.frame_time,
            query_interval: self.config.occlusion_query_interval,
            occlusion_buffer: occlusion_buffer.clone(),
            drawables_per_task: self.config.drawables_per_batch_task,
            max_lights: self.config.max_lights,
            work_queue: self.work_queue.clone(),
            threads: (0..self.work_queue.num_threads()).map(|_| Mutex::new(ThreadResult::new())).collect(),
            pending_tasks: AtomicUsize::new(0),
            lights: Mutex::new(ProcessedLights::default()),
            lights_ready: AtomicBool::new(false),
        });

        self.run_collect_tasks(&ctx);
        let geometry = self.merge_thread_results(&ctx);
        let lights = lock(&ctx.lights).clone();
        drop(ctx);

        if draw_shadows {
            self.prepare_shadows(&octree, &lights, &geometry);
        }
        self.light_states.retain(|_, state| state.frame_number == frame_number);

        self.prepare_lights(&octree, &lights);
        self.prepare_view_uniforms(scene, &octree, &lights);
        self.work_queue.complete();

        self.stats.num_lights = lights.locals.len() + usize::from(lights.directional.is_some());
        self.stats.num_opaque_batches = self.opaque_queue.len();
        self.stats.num_alpha_batches = self.alpha_queue.len();
        self.stats.num_shadow_views = self.shadow_views.len();
        self.stats.num_shadow_batches = self
            .shadow_views
            .iter()
            .map(|view| view.static_queue.len() + view.dynamic_queue.len())
            .sum();
        self.stats.num_occlusion_queries = self.pending_queries.len();

        if let Some(buffer) = occlusion_buffer {
            self.occlusion_buffer = Arc::try_unwrap(buffer).ok();
        }

        engine_trace!("galaxy3d::Renderer", "Frame {}: {} opaque, {} alpha, {} lights, {} shadow views, {} queries",
            frame_number, self.stats.num_opaque_batches, self.stats.num_alpha_batches,
            self.stats.num_lights, self.stats.num_shadow_views, self.stats.num_occlusion_queries);
        Ok(())
    }

    /// Feed finished GPU queries back into the octants and release queries
    /// that were collected but never issued.
    fn apply_occlusion_results(&mut self, octree: &Octree) -> Result<()> {
        let results = lock(&self.device).check_occlusion_query_results()?;
        for (tag, visible) in results {
            octree.on_occlusion_query_result(octant_from_query_tag(tag), visible);
        }

        for (key, _) in self.pending_queries.drain(..) {
            if let Some(octant) = octree.octant(key) {
                octant.set_query_pending(false);
            }
        }
        Ok(())
    }

    fn reset_frame(&mut self) {
        self.opaque_queue.clear();
        self.alpha_queue.clear();
        self.instance_transforms.clear();
        self.shadow_views.clear();
        self.light_data.clear();
        self.debug_octant_boxes.clear();
        self.debug_light_boxes.clear();
        self.stats = FrameStats::default();
        for shadow_map in &mut self.shadow_maps {
            shadow_map.clear();
        }
    }

    /// Rasterize occluders front to back into the software depth buffer.
    fn draw_occluders(&mut self, octree: &Octree, camera: &Camera, frustum: &Frustum) -> Option<Arc<OcclusionBuffer>> {
        let mut keys = Vec::new();
        octree.find_drawables_masked(&mut keys, frustum, DrawableFlags::OCCLUDER, camera.view_mask());

        let mut occluders: Vec<(f32, DrawableKey)> = keys
            .into_iter()
            .filter_map(|key| {
                let drawable = octree.drawable(key)?;
                let occluder = drawable.as_occluder()?;
                let distance = camera.distance(drawable.world_bounding_box().center());
                let in_range = occluder.max_distance() <= 0.0 || distance <= occluder.max_distance();
                (in_range && drawable.in_draw_distance(distance)).then_some((distance, key))
            })
            .collect();
        if occluders.is_empty() {
            return None;
        }
        occluders.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut buffer = self
            .occlusion_buffer
            .take()
            .unwrap_or_else(|| OcclusionBuffer::new(&self.config.occlusion));
        buffer.set_view(camera);
        buffer.clear();

        for (_, key) in &occluders {
            let Some(drawable) = octree.drawable(*key) else {
                continue;
            };
            let Some(occluder) = drawable.as_occluder() else {
                continue;
            };
            if !buffer.draw(drawable.world_transform(), occluder.vertices(), occluder.indices()) {
                engine_debug!("galaxy3d::Renderer", "Occluder triangle budget of {} reached", buffer.max_triangles());
                break;
            }
        }
        buffer.build_depth_hierarchy();
        self.stats.num_occluder_triangles = buffer.num_triangles();
        Some(Arc::new(buffer))
    }

    /// Queue one collect task per root branch and wait until every batch
    /// task has finished and lights are processed.
    fn run_collect_tasks(&mut self, ctx: &Arc<FrameContext>) {
        let root = ctx.octree.root();
        let mut queries = Vec::new();
        let action = classify_octant(ctx, root, PLANE_MASK_ALL, &mut queries);
        lock(&ctx.threads[0]).queries.append(&mut queries);

        let mut tasks = Vec::new();
        let mut spawn_collect = |key: OctantKey, plane_mask: u8, own_drawables_only: bool| {
            let task_ctx = ctx.clone();
            tasks.push(Task::new(move |_| collect_branch(&task_ctx, key, plane_mask, own_drawables_only)));
        };

        if let Some(root_octant) = ctx.octree.octant(root) {
            match action {
                OctantAction::Skip => {}
                OctantAction::ChildrenOnly(plane_mask) => {
                    for child in root_octant.children() {
                        spawn_collect(child, plane_mask, false);
                    }
                }
                OctantAction::Collect(plane_mask) => {
                    if !root_octant.drawables().is_empty() {
                        spawn_collect(root, plane_mask, true);
                    }
                    for child in root_octant.children() {
                        spawn_collect(child, plane_mask, false);
                    }
                }
            }
        }

        let lights_ctx = ctx.clone();
        let process = Task::new(move |_| process_lights(&lights_ctx));
        ctx.pending_tasks.fetch_add(tasks.len(), std::sync::atomic::Ordering::AcqRel);
        if tasks.is_empty() {
            self.work_queue.queue_task(process);
        } else {
            for task in &tasks {
                self.work_queue.add_dependency(&process, task);
            }
            self.work_queue.queue_tasks(&tasks);
        }

        // Collect, batch and light tasks are the only work in flight here
        self.work_queue.complete();
        if !ctx.is_collected() {
            engine_warn!("galaxy3d::Renderer", "Frame {} collected partially; a collect task failed", ctx.frame_number);
        }
    }

    /// Move per-thread batches, queries and debug boxes into the renderer and
    /// sort the main queues. Returns the visible geometry depth range and bounds.
    fn merge_thread_results(&mut self, ctx: &FrameContext) -> VisibleGeometry {
        let mut geometry = VisibleGeometry {
            min_z: f32::INFINITY,
            max_z: f32::NEG_INFINITY,
            bounds: BoundingBox::undefined(),
        };

        for slot in &ctx.threads {
            let mut result = lock(slot);
            self.opaque_queue.append(&mut result.opaque);
            self.alpha_queue.append(&mut result.alpha);
            for key in result.queries.drain(..) {
                if let Some(octant) = ctx.octree.octant(key) {
                    self.pending_queries.push((key, octant.culling_box()));
                }
            }
            self.debug_octant_boxes.append(&mut result.octant_boxes);
            geometry.min_z = geometry.min_z.min(result.min_z);
            geometry.max_z = geometry.max_z.max(result.max_z);
            geometry.bounds.merge(&result.geometry_bounds);
            self.stats.num_geometries += result.num_geometries;
        }
        self.stats.num_octants = self.debug_octant_boxes.len();
        self.pending_queries.sort_by_key(|(key, _)| occlusion_query_tag(*key));

        self.opaque_queue.sort(&mut self.instance_transforms, SortMode::State, self.config.instancing);
        self.alpha_queue.sort(&mut self.instance_transforms, SortMode::BackToFront, false);
        geometry
    }

    // ===== SHADOWS =====

    /// Allocate atlas space for shadowed lights, set up their views, then
    /// find casters and pick each view's render mode in one task per light.
    fn prepare_shadows(&mut self, octree: &Arc<Octree>, lights: &ProcessedLights, geometry: &VisibleGeometry) {
        let frame_number = self.frame_number;
        let mut jobs = Vec::new();

        let candidates = lights
            .directional
            .iter()
            .map(|key| (*key, DIR_LIGHT_ATLAS))
            .chain(lights.locals.iter().map(|key| (*key, LOCAL_LIGHT_ATLAS)));

        for (key, atlas) in candidates {
            let Some(drawable) = octree.drawable(key) else {
                continue;
            };
            let Some(light) = drawable.as_light() else {
                continue;
            };
            if !drawable.casts_shadows() || light.num_shadow_views() == 0 {
                continue;
            }
            if light.light_type() == LightType::Directional && geometry.min_z > geometry.max_z {
                continue;
            }

            let state = self.light_states.entry(key).or_default();
            let previous = state.allocation.filter(|_| state.atlas == atlas);
            let shadow_map = &mut self.shadow_maps[atlas];
            let Some(allocation) = shadow_map.allocate(light, previous) else {
                engine_debug!("galaxy3d::Renderer", "No shadow atlas space for light {:?}", key);
                state.allocation = None;
                continue;
            };
            state.atlas = atlas;
            state.allocation = Some(allocation);
            state.frame_number = frame_number;

            let setup = ShadowSetup {
                light,
                light_key: key,
                world_transform: drawable.world_transform(),
                allocation,
                atlas,
                atlas_size: shadow_map.size(),
            };
            let views = setup_shadow_views(
                &setup,
                &self.camera,
                (geometry.min_z, geometry.max_z),
                &geometry.bounds,
                &self.config,
            );
            let histories = views
                .iter()
                .map(|view| state.histories.get(view.index).copied().flatten())
                .collect();

            jobs.push(ShadowJob {
                light: key,
                views,
                histories,
                light_sphere: (light.light_type() == LightType::Point)
                    .then(|| light.world_sphere(drawable.world_transform())),
                light_mask: drawable.layer_mask(),
                static_light: drawable.is_static(),
                has_static_cache: shadow_map.has_static_cache(),
                matrix_epsilon: self.config.shadow_matrix_epsilon,
                instancing: self.config.instancing,
            });
        }

        let jobs = self.run_shadow_jobs(octree, jobs);

        for job in jobs {
            let Some(state) = self.light_states.get_mut(&job.light) else {
                continue;
            };
            for view in job.views {
                if state.histories.len() <= view.index {
                    state.histories.resize(view.index + 1, None);
                }
                state.histories[view.index] = Some(view.history(frame_number));
                self.shadow_maps[view.atlas].views.push(self.shadow_views.len());
                self.shadow_views.push(view);
            }
        }
    }

    fn run_shadow_jobs(&self, octree: &Arc<Octree>, jobs: Vec<ShadowJob>) -> Vec<ShadowJob> {
        let frame_number = self.frame_number;
        if jobs.len() <= 1 || self.work_queue.num_threads() == 1 {
            let mut jobs = jobs;
            for job in &mut jobs {
                collect_shadow_casters(octree, frame_number, job);
            }
            return jobs;
        }

        let slots: Arc<Vec<Mutex<Option<ShadowJob>>>> = Arc::new(jobs.into_iter().map(|job| Mutex::new(Some(job))).collect());
        let tasks: Vec<Arc<Task>> = (0..slots.len())
            .map(|index| {
                let slots = slots.clone();
                let octree = octree.clone();
                Task::new(move |_| {
                    let mut slot = lock(&slots[index]);
                    if let Some(job) = slot.as_mut() {
                        collect_shadow_casters(&octree, frame_number, job);
                    }
                })
            })
            .collect();
        self.work_queue.queue_tasks(&tasks);
        self.work_queue.complete();

        slots.iter().filter_map(|slot| lock(slot).take()).collect()
    }

    // ===== LIGHTS =====

    /// Build the uploaded light array and assign lights to cluster cells.
    fn prepare_lights(&mut self, octree: &Octree, lights: &ProcessedLights) {
        let view = self.camera.view_matrix();
        let mut first_view: FxHashMap<DrawableKey, usize> = FxHashMap::default();
        for (index, shadow_view) in self.shadow_views.iter().enumerate() {
            first_view.entry(shadow_view.light).or_insert(index);
        }

        self.light_data.push(LightData::default());
        let mut cluster_lights = Vec::with_capacity(lights.locals.len());

        for key in &lights.locals {
            let Some(drawable) = octree.drawable(*key) else {
                continue;
            };
            let Some(light) = drawable.as_light() else {
                continue;
            };
            let Ok(index) = u8::try_from(self.light_data.len()) else {
                break;
            };
            let transform = drawable.world_transform();
            self.debug_light_boxes.push(drawable.world_bounding_box());

            let (cutoff, spot) = match light.light_type() {
                LightType::Spot => ((light.fov() * 0.5).to_radians().cos(), 1.0),
                _ => (2.0, 0.0),
            };
            let mut data = LightData {
                position: drawable.world_position().extend(1.0 / light.range().max(f32::EPSILON)),
                direction: (-light_direction(transform)).extend(cutoff),
                color: light.color().truncate().extend(spot),
                shadow_parameters: Vec4::ZERO,
                shadow_matrix: Mat4::IDENTITY,
            };

            if let Some(shadow_view) = first_view.get(key).map(|index| &self.shadow_views[*index]) {
                let atlas_size = self.shadow_maps[shadow_view.atlas].size().as_vec2();
                data.shadow_parameters = Vec4::new(1.0 / atlas_size.x, 1.0 / atlas_size.y, 1.0, 0.0);
                data.shadow_matrix = match light.light_type() {
                    LightType::Point => {
                        // x axis: atlas rect in texture coordinates, y axis: face near and far
                        let rect = self
                            .light_states
                            .get(key)
                            .and_then(|state| state.allocation)
                            .map(|allocation| allocation.rect)
                            .unwrap_or(shadow_view.viewport);
                        Mat4::from_cols(
                            Vec4::new(
                                rect.left as f32 / atlas_size.x,
                                rect.top as f32 / atlas_size.y,
                                rect.width() as f32 / atlas_size.x,
                                rect.height() as f32 / atlas_size.y,
                            ),
                            Vec4::new(shadow_view.camera.near_clip(), shadow_view.camera.far_clip(), 0.0, 0.0),
                            Vec4::ZERO,
                            Vec4::ZERO,
                        )
                    }
                    _ => shadow_view.shadow_matrix,
                };
            }
            self.light_data.push(data);

            cluster_lights.push(match light.light_type() {
                LightType::Spot => ClusterLight::spot(index, &light.world_frustum(transform), &view),
                _ => ClusterLight::point(index, &light.world_sphere(transform), &view),
            });
        }

        self.cull_cluster_lights(cluster_lights);
    }

    /// One task per depth slice
    fn cull_cluster_lights(&mut self, lights: Vec<ClusterLight>) {
        if self.cluster_grid.define(&self.camera) {
            engine_debug!("galaxy3d::Renderer", "Cluster grid rebuilt for a new projection");
        }
        self.cluster_grid.clear();
        if lights.is_empty() {
            return;
        }

        let cells = self.cluster_grid.cells();
        let lights = Arc::new(lights);
        let max_per_cell = self.config.max_lights_per_cluster;
        let slots: Arc<Vec<Mutex<Option<SliceLights>>>> = Arc::new((0..NUM_CLUSTER_Z).map(|_| Mutex::new(None)).collect());

        let tasks: Vec<Arc<Task>> = (0..NUM_CLUSTER_Z)
            .map(|slice| {
                let cells = cells.clone();
                let lights = lights.clone();
                let slots = slots.clone();
                Task::new(move |_| {
                    let result = cull_slice(&cells, slice, &lights, max_per_cell);
                    *lock(&slots[slice]) = Some(result);
                })
            })
            .collect();
        self.work_queue.queue_tasks(&tasks);
        self.work_queue.complete();

        for slot in slots.iter() {
            if let Some(result) = lock(slot).take() {
                self.cluster_grid.store_slice(&result);
            }
        }
    }

    /// Main camera uniforms plus the environment and directional light.
    fn prepare_view_uniforms(&mut self, scene: &Scene, octree: &Octree, lights: &ProcessedLights) {
        let mut uniforms = camera_uniforms(&self.camera);
        uniforms.ambient_color = scene.ambient_color();
        uniforms.fog_color = scene.fog_color();
        let fog_range = (scene.fog_end() - scene.fog_start()).max(f32::EPSILON);
        uniforms.fog_parameters = Vec4::new(scene.fog_start(), scene.fog_end(), 1.0 / fog_range, 0.0);

        let directional = lights
            .directional
            .and_then(|key| octree.drawable(key).map(|drawable| (key, drawable)))
            .and_then(|(key, drawable)| drawable.as_light().map(|light| (key, drawable, light)));
        if let Some((key, drawable, light)) = directional {
            uniforms.dir_light_direction = (-light_direction(drawable.world_transform())).extend(1.0);
            uniforms.dir_light_color = light.color();

            let mut shadowed = false;
            for view in self.shadow_views.iter().filter(|view| view.light == key && view.index < NUM_CASCADES) {
                uniforms.dir_light_shadow_matrices[view.index] = view.shadow_matrix;
                shadowed = true;
            }
            if shadowed {
                let atlas_size = self.shadow_maps[DIR_LIGHT_ATLAS].size().as_vec2();
                let max_distance = light.max_shadow_distance();
                uniforms.dir_light_shadow_parameters = Vec4::new(
                    1.0 / atlas_size.x,
                    1.0 / atlas_size.y,
                    max_distance * light.shadow_fade_start(),
                    max_distance,
                );
                uniforms.dir_light_shadow_splits = light.shadow_splits();
            }
        }

        self.per_view = uniforms;
    }
}

/// Depth range and bounds of the geometry visible this frame
#[derive(Debug, Clone, Copy)]
struct VisibleGeometry {
    min_z: f32,
    max_z: f32,
    bounds: BoundingBox,
}

/// Matrices and depth parameters of one camera
pub(super) fn camera_uniforms(camera: &Camera) -> PerViewUniforms {
    PerViewUniforms {
        view: camera.view_matrix(),
        projection: camera.projection_matrix(),
        view_projection: camera.view_projection_matrix(),
        depth_parameters: Vec4::new(
            camera.near_clip(),
            camera.far_clip(),
            if camera.is_orthographic() { 1.0 } else { 0.0 },
            0.0,
        ),
        ..PerViewUniforms::default()
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
