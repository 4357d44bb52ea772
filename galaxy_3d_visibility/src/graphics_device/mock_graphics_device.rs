/// Mock graphics device for unit tests (no GPU required)
///
/// Records every semantic call so tests can assert submission order,
/// rebinding short-circuits and occlusion query traffic.

#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use glam::{IVec2, Mat4, Vec3, Vec4};
#[cfg(test)]
use rustc_hash::FxHashMap;
#[cfg(test)]
use crate::error::Result;
#[cfg(test)]
use crate::engine_bail;
#[cfg(test)]
use crate::graphics_device::{GraphicsDevice, RenderTarget, UniformSlot};
#[cfg(test)]
use crate::math::{BoundingBox, IntRect};
#[cfg(test)]
use crate::resource::{Geometry, Material, Pass};

// ============================================================================
// Recorded calls
// ============================================================================

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    DefineShadowMap { index: usize, size: IVec2, static_cache: bool },
    BindRenderTarget(RenderTarget),
    SetViewport(IntRect),
    ClearDepth(IntRect),
    CopyDepthRegion { source: RenderTarget, destination: RenderTarget, rect: IntRect },
    SetDepthBias { constant: f32, slope_scaled: f32 },
    UpdateUniforms { slot: UniformSlot, size: usize },
    SetInstanceTransforms(usize),
    BindPass(u16),
    BindMaterial(u16),
    SetWorldTransform(Mat4),
    Draw { geometry: u16 },
    DrawInstanced { geometry: u16, start: u32, count: u32 },
    BeginOcclusionQuery(u64),
    EndOcclusionQuery,
    DrawBoundingBox,
    DrawDebugLines(usize),
}

// ============================================================================
// Mock Graphics Device
// ============================================================================

#[cfg(test)]
pub struct MockGraphicsDevice {
    /// Every call, in order
    pub calls: Arc<Mutex<Vec<DeviceCall>>>,
    /// Last uploaded bytes per uniform slot
    pub uniforms: Arc<Mutex<FxHashMap<UniformSlot, Vec<u8>>>>,
    /// Tags of queries ended but not yet reported
    pending_queries: Vec<u64>,
    open_query: Option<u64>,
    next_query_id: u32,
    /// Scripted query results by tag; unknown tags report visible
    pub query_visibility: Arc<Mutex<FxHashMap<u64, bool>>>,
    /// Fail every call after this many calls, when set
    pub fail_after: Option<usize>,
}

#[cfg(test)]
impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            uniforms: Arc::new(Mutex::new(FxHashMap::default())),
            pending_queries: Vec::new(),
            open_query: None,
            next_query_id: 0,
            query_visibility: Arc::new(Mutex::new(FxHashMap::default())),
            fail_after: None,
        }
    }

    /// Get recorded calls (for testing)
    pub fn get_calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Get the last upload of a uniform slot (for testing)
    pub fn get_uniforms(&self, slot: UniformSlot) -> Option<Vec<u8>> {
        self.uniforms.lock().unwrap().get(&slot).cloned()
    }

    /// Script the result of a future occlusion query
    pub fn set_query_visibility(&self, tag: u64, visible: bool) {
        self.query_visibility.lock().unwrap().insert(tag, visible);
    }

    /// Count calls matching a predicate
    pub fn count_calls(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| predicate(call)).count()
    }

    fn record(&mut self, call: DeviceCall) -> Result<()> {
        let mut calls = self.calls.lock().unwrap();
        if let Some(limit) = self.fail_after {
            if calls.len() >= limit {
                drop(calls);
                engine_bail!("galaxy3d::MockGraphicsDevice", "Simulated device failure on {:?}", call);
            }
        }
        calls.push(call);
        Ok(())
    }
}

#[cfg(test)]
impl GraphicsDevice for MockGraphicsDevice {
    fn define_shadow_map(&mut self, index: usize, size: IVec2, static_cache: bool) -> Result<()> {
        self.record(DeviceCall::DefineShadowMap { index, size, static_cache })
    }

    fn bind_render_target(&mut self, target: RenderTarget) -> Result<()> {
        self.record(DeviceCall::BindRenderTarget(target))
    }

    fn set_viewport(&mut self, rect: IntRect) -> Result<()> {
        self.record(DeviceCall::SetViewport(rect))
    }

    fn clear_depth(&mut self, rect: IntRect) -> Result<()> {
        self.record(DeviceCall::ClearDepth(rect))
    }

    fn copy_depth_region(&mut self, source: RenderTarget, destination: RenderTarget, rect: IntRect) -> Result<()> {
        self.record(DeviceCall::CopyDepthRegion { source, destination, rect })
    }

    fn set_depth_bias(&mut self, constant: f32, slope_scaled: f32) -> Result<()> {
        self.record(DeviceCall::SetDepthBias { constant, slope_scaled })
    }

    fn update_uniforms(&mut self, slot: UniformSlot, data: &[u8]) -> Result<()> {
        self.record(DeviceCall::UpdateUniforms { slot, size: data.len() })?;
        self.uniforms.lock().unwrap().insert(slot, data.to_vec());
        Ok(())
    }

    fn set_instance_transforms(&mut self, transforms: &[Mat4]) -> Result<()> {
        self.record(DeviceCall::SetInstanceTransforms(transforms.len()))
    }

    fn bind_pass(&mut self, pass: &Pass) -> Result<()> {
        self.record(DeviceCall::BindPass(pass.id()))
    }

    fn bind_material(&mut self, material: &Material) -> Result<()> {
        self.record(DeviceCall::BindMaterial(material.id()))
    }

    fn set_world_transform(&mut self, transform: &Mat4) -> Result<()> {
        self.record(DeviceCall::SetWorldTransform(*transform))
    }

    fn draw(&mut self, geometry: &Geometry) -> Result<()> {
        self.record(DeviceCall::Draw { geometry: geometry.id() })
    }

    fn draw_instanced(&mut self, geometry: &Geometry, start: u32, count: u32) -> Result<()> {
        self.record(DeviceCall::DrawInstanced { geometry: geometry.id(), start, count })
    }

    fn begin_occlusion_query(&mut self, tag: u64) -> Result<u32> {
        if self.open_query.is_some() {
            engine_bail!("galaxy3d::MockGraphicsDevice", "Occlusion query already open");
        }
        self.record(DeviceCall::BeginOcclusionQuery(tag))?;
        self.open_query = Some(tag);
        let id = self.next_query_id;
        self.next_query_id += 1;
        Ok(id)
    }

    fn end_occlusion_query(&mut self) -> Result<()> {
        let Some(tag) = self.open_query.take() else {
            engine_bail!("galaxy3d::MockGraphicsDevice", "No occlusion query open");
        };
        self.record(DeviceCall::EndOcclusionQuery)?;
        self.pending_queries.push(tag);
        Ok(())
    }

    fn check_occlusion_query_results(&mut self) -> Result<Vec<(u64, bool)>> {
        let scripted = self.query_visibility.lock().unwrap();
        Ok(self.pending_queries
            .drain(..)
            .map(|tag| (tag, scripted.get(&tag).copied().unwrap_or(true)))
            .collect())
    }

    fn draw_bounding_box(&mut self, _bbox: &BoundingBox, _view_projection: &Mat4) -> Result<()> {
        self.record(DeviceCall::DrawBoundingBox)
    }

    fn draw_debug_lines(&mut self, lines: &[(Vec3, Vec3)], _color: Vec4, _view_projection: &Mat4) -> Result<()> {
        self.record(DeviceCall::DrawDebugLines(lines.len()))
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
