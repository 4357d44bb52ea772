/// Submission of a prepared frame to the graphics device.

use std::sync::Arc;
use glam::{Mat4, Vec3, Vec4};
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, RenderTarget, UniformSlot};
use crate::resource::{Material, Pass};
use crate::scene::occlusion_query_tag;
use crate::thread::lock;
use crate::engine_debug;
use super::batch::{BatchQueue, BatchTransform};
use super::renderer::{camera_uniforms, Renderer};
use super::shadow::ShadowRenderMode;

const DEBUG_OCTANT_COLOR: Vec4 = Vec4::new(0.25, 0.25, 1.0, 1.0);
const DEBUG_LIGHT_COLOR: Vec4 = Vec4::new(1.0, 1.0, 0.25, 1.0);
const DEBUG_SHADOW_COLOR: Vec4 = Vec4::new(1.0, 0.25, 1.0, 1.0);

/// Last bound pass and material, so consecutive batches skip rebinding
#[derive(Default)]
struct BindState {
    pass: Option<Arc<Pass>>,
    material: Option<Arc<Material>>,
}

fn draw_queue(device: &mut dyn GraphicsDevice, queue: &BatchQueue, state: &mut BindState) -> Result<()> {
    for batch in queue.batches() {
        if !state.pass.as_ref().is_some_and(|pass| Arc::ptr_eq(pass, &batch.pass)) {
            device.bind_pass(&batch.pass)?;
            state.pass = Some(batch.pass.clone());
        }
        if !state.material.as_ref().is_some_and(|material| Arc::ptr_eq(material, &batch.material)) {
            device.bind_material(&batch.material)?;
            state.material = Some(batch.material.clone());
        }

        match batch.transform {
            BatchTransform::World(transform) => {
                device.set_world_transform(&transform)?;
                device.draw(&batch.geometry)?;
            }
            BatchTransform::Instances { start, count } => {
                device.draw_instanced(&batch.geometry, start, count)?;
            }
        }
    }
    Ok(())
}

impl Renderer {
    /// Render every shadow view whose mode needs it.
    ///
    /// Static casters are drawn once into the atlas and copied to the
    /// static cache; later frames restore that copy and draw only dynamic
    /// casters, or skip the view entirely when nothing changed.
    pub fn render_shadow_maps(&mut self) -> Result<()> {
        let mut device = lock(&self.device);

        for shadow_map in &mut self.shadow_maps {
            if shadow_map.needs_define() {
                device.define_shadow_map(shadow_map.index(), shadow_map.size(), shadow_map.has_static_cache())?;
                shadow_map.mark_defined();
                engine_debug!("galaxy3d::Renderer", "Defined shadow map {} at {}x{}",
                    shadow_map.index(), shadow_map.size().x, shadow_map.size().y);
            }
        }

        let mut rendered = false;
        for view in &self.shadow_views {
            if !view.render_mode.renders() {
                continue;
            }
            rendered = true;

            let target = RenderTarget::ShadowMap(view.atlas);
            let cache = RenderTarget::StaticShadowCache(view.atlas);
            device.bind_render_target(target)?;
            device.set_viewport(view.viewport)?;
            device.update_uniforms(UniformSlot::PerView, bytemuck::bytes_of(&camera_uniforms(&view.camera)))?;
            device.set_depth_bias(view.depth_bias, view.slope_scale_bias)?;
            if !view.instance_transforms.is_empty() {
                device.set_instance_transforms(&view.instance_transforms)?;
            }

            let mut state = BindState::default();
            match view.render_mode {
                ShadowRenderMode::Dynamic => {
                    device.clear_depth(view.viewport)?;
                    draw_queue(&mut *device, &view.dynamic_queue, &mut state)?;
                }
                ShadowRenderMode::StoreStatic => {
                    device.clear_depth(view.viewport)?;
                    draw_queue(&mut *device, &view.static_queue, &mut state)?;
                    device.copy_depth_region(target, cache, view.viewport)?;
                    draw_queue(&mut *device, &view.dynamic_queue, &mut state)?;
                }
                ShadowRenderMode::RestoreStatic => {
                    device.copy_depth_region(cache, target, view.viewport)?;
                    draw_queue(&mut *device, &view.dynamic_queue, &mut state)?;
                }
                ShadowRenderMode::Cached => {}
            }
        }

        if rendered {
            device.set_depth_bias(0.0, 0.0)?;
        }
        Ok(())
    }

    /// Upload per-view data, draw opaque batches, then issue this frame's
    /// octant occlusion queries against the fresh depth buffer.
    pub fn render_opaque(&mut self) -> Result<()> {
        let mut device = lock(&self.device);
        device.bind_render_target(RenderTarget::Main)?;
        device.update_uniforms(UniformSlot::PerView, bytemuck::bytes_of(&self.per_view))?;
        device.update_uniforms(UniformSlot::Lights, bytemuck::cast_slice(&self.light_data))?;
        device.update_uniforms(UniformSlot::ClusterCounts, self.cluster_grid.counts())?;
        device.update_uniforms(UniformSlot::ClusterIndices, self.cluster_grid.indices())?;
        if !self.instance_transforms.is_empty() {
            device.set_instance_transforms(&self.instance_transforms)?;
        }

        draw_queue(&mut *device, &self.opaque_queue, &mut BindState::default())?;

        let view_projection = self.per_view.view_projection;
        let queries = std::mem::take(&mut self.pending_queries);
        for (index, (key, bbox)) in queries.iter().enumerate() {
            let issued = device
                .begin_occlusion_query(occlusion_query_tag(*key))
                .and_then(|_| device.draw_bounding_box(bbox, &view_projection))
                .and_then(|_| device.end_occlusion_query());
            if let Err(err) = issued {
                // Unissued queries are released at the next prepare
                self.pending_queries.extend_from_slice(&queries[index..]);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Draw alpha batches back to front.
    pub fn render_alpha(&mut self) -> Result<()> {
        let mut device = lock(&self.device);
        draw_queue(&mut *device, &self.alpha_queue, &mut BindState::default())
    }

    /// Line boxes for visited octants and visible lights, and shadow camera frustums.
    pub fn render_debug(&mut self) -> Result<()> {
        let view_projection = self.per_view.view_projection;
        let mut device = lock(&self.device);

        let octant_lines = box_lines(self.debug_octant_boxes.iter().map(|bbox| bbox.edges()));
        draw_lines(&mut *device, &octant_lines, DEBUG_OCTANT_COLOR, &view_projection)?;

        let light_lines = box_lines(self.debug_light_boxes.iter().map(|bbox| bbox.edges()));
        draw_lines(&mut *device, &light_lines, DEBUG_LIGHT_COLOR, &view_projection)?;

        let shadow_lines = box_lines(self.shadow_views.iter().map(|view| view.world_frustum().edges()));
        draw_lines(&mut *device, &shadow_lines, DEBUG_SHADOW_COLOR, &view_projection)
    }
}

fn box_lines(edges: impl Iterator<Item = [(Vec3, Vec3); 12]>) -> Vec<(Vec3, Vec3)> {
    edges.flatten().collect()
}

fn draw_lines(device: &mut dyn GraphicsDevice, lines: &[(Vec3, Vec3)], color: Vec4, view_projection: &Mat4) -> Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    device.draw_debug_lines(lines, color, view_projection)
}
