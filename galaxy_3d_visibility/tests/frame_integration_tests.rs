//! Integration tests for the per-frame pipeline
//!
//! These tests drive whole frames through the public API against a
//! recording graphics device. No GPU required.
//!
//! Run with: cargo test --test frame_integration_tests

use std::sync::{Arc, Mutex};
use galaxy_3d_visibility::galaxy3d::camera::Camera;
use galaxy_3d_visibility::galaxy3d::config::{OctreeConfig, RendererConfig};
use galaxy_3d_visibility::galaxy3d::math::{BoundingBox, IntRect, Ray};
use galaxy_3d_visibility::galaxy3d::render::{GraphicsDevice, RenderTarget, UniformSlot, BufferHandle, ShaderProgramHandle};
use galaxy_3d_visibility::galaxy3d::resource::{
    Geometry, GeometryDesc, Material, MaterialDesc, Pass, PassDesc, ResourceRegistry,
};
use galaxy_3d_visibility::galaxy3d::scene::{Drawable, DrawableFlags, DrawableKey, GeometryNode, Light, Scene};
use galaxy_3d_visibility::galaxy3d::thread::WorkQueue;
use galaxy_3d_visibility::galaxy3d::{Renderer, Result};
use galaxy_3d_visibility::glam::{IVec2, Mat4, Vec3, Vec4};

// ============================================================================
// RECORDING DEVICE
// ============================================================================

/// Device that records call names and reports every query visible
#[derive(Default)]
struct RecordingDevice {
    calls: Arc<Mutex<Vec<&'static str>>>,
    ended_queries: Vec<u64>,
    open_query: Option<u64>,
}

impl RecordingDevice {
    fn record(&self, name: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(name);
        Ok(())
    }
}

impl GraphicsDevice for RecordingDevice {
    fn define_shadow_map(&mut self, _index: usize, _size: IVec2, _static_cache: bool) -> Result<()> {
        self.record("define_shadow_map")
    }
    fn bind_render_target(&mut self, _target: RenderTarget) -> Result<()> {
        self.record("bind_render_target")
    }
    fn set_viewport(&mut self, _rect: IntRect) -> Result<()> {
        self.record("set_viewport")
    }
    fn clear_depth(&mut self, _rect: IntRect) -> Result<()> {
        self.record("clear_depth")
    }
    fn copy_depth_region(&mut self, _source: RenderTarget, _destination: RenderTarget, _rect: IntRect) -> Result<()> {
        self.record("copy_depth_region")
    }
    fn set_depth_bias(&mut self, _constant: f32, _slope_scaled: f32) -> Result<()> {
        self.record("set_depth_bias")
    }
    fn update_uniforms(&mut self, _slot: UniformSlot, _data: &[u8]) -> Result<()> {
        self.record("update_uniforms")
    }
    fn set_instance_transforms(&mut self, _transforms: &[Mat4]) -> Result<()> {
        self.record("set_instance_transforms")
    }
    fn bind_pass(&mut self, _pass: &Pass) -> Result<()> {
        self.record("bind_pass")
    }
    fn bind_material(&mut self, _material: &Material) -> Result<()> {
        self.record("bind_material")
    }
    fn set_world_transform(&mut self, _transform: &Mat4) -> Result<()> {
        self.record("set_world_transform")
    }
    fn draw(&mut self, _geometry: &Geometry) -> Result<()> {
        self.record("draw")
    }
    fn draw_instanced(&mut self, _geometry: &Geometry, _start: u32, _count: u32) -> Result<()> {
        self.record("draw_instanced")
    }
    fn begin_occlusion_query(&mut self, tag: u64) -> Result<u32> {
        self.open_query = Some(tag);
        self.record("begin_occlusion_query")?;
        Ok(self.ended_queries.len() as u32)
    }
    fn end_occlusion_query(&mut self) -> Result<()> {
        if let Some(tag) = self.open_query.take() {
            self.ended_queries.push(tag);
        }
        self.record("end_occlusion_query")
    }
    fn check_occlusion_query_results(&mut self) -> Result<Vec<(u64, bool)>> {
        Ok(self.ended_queries.drain(..).map(|tag| (tag, true)).collect())
    }
    fn draw_bounding_box(&mut self, _bbox: &BoundingBox, _view_projection: &Mat4) -> Result<()> {
        self.record("draw_bounding_box")
    }
    fn draw_debug_lines(&mut self, _lines: &[(Vec3, Vec3)], _color: Vec4, _view_projection: &Mat4) -> Result<()> {
        self.record("draw_debug_lines")
    }
}

// ============================================================================
// HELPERS
// ============================================================================

struct World {
    calls: Arc<Mutex<Vec<&'static str>>>,
    renderer: Renderer,
    scene: Scene,
    geometry: Arc<Geometry>,
    opaque: Arc<Material>,
    alpha: Arc<Material>,
}

fn world(num_threads: usize) -> World {
    let device = RecordingDevice::default();
    let calls = device.calls.clone();
    let device: Arc<Mutex<dyn GraphicsDevice>> = Arc::new(Mutex::new(device));
    let renderer = Renderer::new(device, Arc::new(WorkQueue::new(num_threads)), RendererConfig::default()).unwrap();

    let registry = ResourceRegistry::new();
    let geometry = registry
        .create_geometry(GeometryDesc { vertex_buffer: BufferHandle(1), draw_count: 36, ..Default::default() })
        .unwrap();
    let opaque = registry
        .create_material(MaterialDesc {
            passes: vec![PassDesc::opaque(ShaderProgramHandle(1)), PassDesc::shadow(ShaderProgramHandle(2))],
            textures: Vec::new(),
        })
        .unwrap();
    let alpha = registry
        .create_material(MaterialDesc { passes: vec![PassDesc::alpha(ShaderProgramHandle(3))], textures: Vec::new() })
        .unwrap();

    World {
        calls,
        renderer,
        scene: Scene::new(OctreeConfig { size: 200.0, num_levels: 5, ..Default::default() }),
        geometry,
        opaque,
        alpha,
    }
}

impl World {
    fn cube(&self, material: &Arc<Material>, center: Vec3) -> Drawable {
        let node = GeometryNode::with_batch(
            BoundingBox::from_center_half_size(Vec3::ZERO, Vec3::ONE),
            self.geometry.clone(),
            material.clone(),
        );
        Drawable::geometry(node).with_transform(Mat4::from_translation(center))
    }

    fn add_opaque(&mut self, center: Vec3) -> DrawableKey {
        let cube = self.cube(&self.opaque.clone(), center);
        self.scene.add_drawable(cube).unwrap()
    }

    fn frame(&mut self, camera: &Camera) {
        self.renderer.prepare_view(&mut self.scene, camera, true, true).unwrap();
        self.renderer.render_shadow_maps().unwrap();
        self.renderer.render_opaque().unwrap();
        self.renderer.render_alpha().unwrap();
    }

    fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| **call == name).count()
    }
}

fn camera() -> Camera {
    Camera::perspective(60.0, 16.0 / 9.0, 0.1, 300.0)
}

// ============================================================================
// FRAME TESTS
// ============================================================================

#[test]
fn test_integration_threaded_frame_draws_visible_geometry() {
    let mut w = world(4);
    for i in 0..50 {
        w.add_opaque(Vec3::new((i % 10) as f32 * 1.5 - 6.75, 0.0, -10.0 - (i / 10) as f32 * 10.0));
    }
    for i in 0..50 {
        w.add_opaque(Vec3::new((i % 10) as f32 * 1.5 - 6.75, 0.0, 10.0 + (i / 10) as f32 * 10.0));
    }
    w.scene
        .add_drawable(Drawable::light(Light::point(8.0)).with_transform(Mat4::from_translation(Vec3::new(0.0, 2.0, -20.0))))
        .unwrap();

    for _ in 0..3 {
        w.frame(&camera());
    }

    let stats = w.renderer.stats();
    assert_eq!(stats.num_geometries, 50);
    assert_eq!(stats.num_lights, 1);
    assert!(w.count("draw_instanced") + w.count("draw") > 0);
    assert!(w.renderer.frame_number() == 3);
}

#[test]
fn test_integration_layer_mask_hides_drawables() {
    let mut w = world(1);
    w.add_opaque(Vec3::new(0.0, 0.0, -10.0));
    let masked = w.cube(&w.opaque.clone(), Vec3::new(2.0, 0.0, -10.0)).with_layer_mask(0x2);
    w.scene.add_drawable(masked).unwrap();

    let mut camera = camera();
    camera.set_view_mask(0x1);
    w.frame(&camera);
    assert_eq!(w.renderer.stats().num_geometries, 1);
}

#[test]
fn test_integration_removed_drawable_disappears() {
    let mut w = world(2);
    let key = w.add_opaque(Vec3::new(0.0, 0.0, -10.0));
    w.frame(&camera());
    assert_eq!(w.renderer.stats().num_geometries, 1);

    assert!(w.scene.remove_drawable(key).unwrap().is_some());
    w.frame(&camera());
    assert_eq!(w.renderer.stats().num_geometries, 0);
}

#[test]
fn test_integration_alpha_drawn_back_to_front() {
    let mut w = world(1);
    let near = w.cube(&w.alpha.clone(), Vec3::new(0.0, 0.0, -10.0));
    let far = w.cube(&w.alpha.clone(), Vec3::new(0.0, 0.0, -30.0));
    let near = w.scene.add_drawable(near).unwrap();
    let far = w.scene.add_drawable(far).unwrap();
    w.frame(&camera());

    let order: Vec<DrawableKey> = w.renderer.alpha_queue().batches().iter().map(|batch| batch.drawable).collect();
    assert_eq!(order, vec![far, near]);
    assert!(w.renderer.opaque_queue().is_empty());
}

#[test]
fn test_integration_raycast_hits_nearest_geometry() {
    let mut w = world(1);
    w.add_opaque(Vec3::new(0.0, 0.0, -30.0));
    let front = w.add_opaque(Vec3::new(0.0, 0.0, -10.0));
    w.frame(&camera());

    let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
    let hit = w.scene.octree().raycast_single(&ray, DrawableFlags::GEOMETRY, 100.0, u32::MAX).unwrap();
    assert_eq!(hit.drawable, front);
    assert!((hit.distance - 9.0).abs() < 1e-3);
}
