/// Tests for batch sorting and instancing conversion

use super::*;
use glam::Vec3;
use crate::graphics_device::{BufferHandle, ShaderProgramHandle};
use crate::resource::{GeometryDesc, MaterialDesc, PassDesc, PassType, ResourceRegistry};

// ============================================================================
// Helper Functions
// ============================================================================

fn geometry(registry: &ResourceRegistry) -> Arc<Geometry> {
    registry.create_geometry(GeometryDesc {
        vertex_buffer: BufferHandle(1),
        draw_count: 36,
        ..Default::default()
    }).unwrap()
}

fn material(registry: &ResourceRegistry, program: u32) -> Arc<Material> {
    registry.create_material(MaterialDesc {
        passes: vec![PassDesc::opaque(ShaderProgramHandle(program))],
        textures: Vec::new(),
    }).unwrap()
}

fn batch(geometry: &Arc<Geometry>, material: &Arc<Material>, x: f32, distance: f32) -> Batch {
    let pass = material.pass(PassType::Opaque).unwrap().clone();
    Batch::new(
        DrawableKey::default(),
        geometry.clone(),
        material.clone(),
        pass,
        GeometryType::Static,
        Mat4::from_translation(Vec3::X * x),
        distance,
    )
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn test_state_sort_groups_by_key_then_distance() {
    let registry = ResourceRegistry::new();
    let geometry = geometry(&registry);
    let (a, b) = (material(&registry, 1), material(&registry, 2));

    let mut queue = BatchQueue::new();
    queue.push(batch(&geometry, &b, 0.0, 3.0));
    queue.push(batch(&geometry, &a, 0.0, 9.0));
    queue.push(batch(&geometry, &b, 0.0, 1.0));
    queue.push(batch(&geometry, &a, 0.0, 2.0));

    let mut instances = Vec::new();
    queue.sort(&mut instances, SortMode::State, false);

    let keys: Vec<u64> = queue.batches().iter().map(|batch| batch.sort_key).collect();
    assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));
    // Within one state key, nearer first
    for pair in queue.batches().windows(2) {
        if pair[0].sort_key == pair[1].sort_key {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }
    assert!(instances.is_empty());
}

#[test]
fn test_sort_key_packs_shader_hash_highest() {
    let registry = ResourceRegistry::new();
    let geometry = geometry(&registry);
    let material = material(&registry, 0x0003);
    let pass = material.pass(PassType::Opaque).unwrap();

    let key = state_sort_key(pass, &material, &geometry);
    assert_eq!(key >> 48, pass.shader_hash() as u64);
    assert_eq!((key >> 32) & 0xffff, pass.id() as u64);
    assert_eq!((key >> 16) & 0xffff, material.id() as u64);
    assert_eq!(key & 0xffff, geometry.id() as u64);
}

#[test]
fn test_distance_sorts() {
    let registry = ResourceRegistry::new();
    let geometry = geometry(&registry);
    let material = material(&registry, 1);

    let mut queue = BatchQueue::new();
    for distance in [5.0, 1.0, 9.0, 3.0] {
        queue.push(batch(&geometry, &material, 0.0, distance));
    }
    let mut instances = Vec::new();

    queue.sort(&mut instances, SortMode::BackToFront, false);
    let distances: Vec<f32> = queue.batches().iter().map(|batch| batch.distance).collect();
    assert_eq!(distances, vec![9.0, 5.0, 3.0, 1.0]);

    queue.sort(&mut instances, SortMode::FrontToBack, false);
    let distances: Vec<f32> = queue.batches().iter().map(|batch| batch.distance).collect();
    assert_eq!(distances, vec![1.0, 3.0, 5.0, 9.0]);
}

// ============================================================================
// Instancing
// ============================================================================

#[test]
fn test_identical_batches_merge_into_one() {
    let registry = ResourceRegistry::new();
    let geometry = geometry(&registry);
    let material = material(&registry, 1);

    let mut queue = BatchQueue::new();
    for i in 0..5 {
        queue.push(batch(&geometry, &material, i as f32, i as f32));
    }
    let mut instances = vec![Mat4::IDENTITY];
    queue.sort(&mut instances, SortMode::State, true);

    assert_eq!(queue.len(), 1);
    assert_eq!(queue.batches()[0].transform, BatchTransform::Instances { start: 1, count: 5 });
    assert_eq!(queue.batches()[0].instance_count(), 5);
    assert_eq!(instances.len(), 6);
    // Transforms follow the sorted order
    assert_eq!(instances[1].w_axis.x, 0.0);
    assert_eq!(instances[5].w_axis.x, 4.0);
}

#[test]
fn test_distinct_geometry_not_merged() {
    let registry = ResourceRegistry::new();
    let material = material(&registry, 1);
    let geometries: Vec<Arc<Geometry>> = (0..4).map(|_| geometry(&registry)).collect();

    let mut queue = BatchQueue::new();
    for (i, geometry) in geometries.iter().enumerate() {
        queue.push(batch(geometry, &material, 0.0, i as f32));
    }
    let mut instances = Vec::new();
    queue.sort(&mut instances, SortMode::State, true);

    assert_eq!(queue.len(), 4);
    assert!(queue.batches().iter().all(|batch| !batch.is_instanced()));
    assert!(instances.is_empty());
}

#[test]
fn test_geometry_bits_block_instancing() {
    let registry = ResourceRegistry::new();
    let geometry = geometry(&registry);
    let material = material(&registry, 1);

    let mut queue = BatchQueue::new();
    for _ in 0..3 {
        let mut skinned = batch(&geometry, &material, 0.0, 1.0);
        skinned.geometry_bits = GeometryType::Skinned.bits();
        queue.push(skinned);
    }
    let mut instances = Vec::new();
    queue.sort(&mut instances, SortMode::State, true);
    assert_eq!(queue.len(), 3);
    assert!(instances.is_empty());
}

#[test]
fn test_instancing_disabled_keeps_batches() {
    let registry = ResourceRegistry::new();
    let geometry = geometry(&registry);
    let material = material(&registry, 1);

    let mut queue = BatchQueue::new();
    queue.push(batch(&geometry, &material, 0.0, 1.0));
    queue.push(batch(&geometry, &material, 1.0, 2.0));
    let mut instances = Vec::new();
    queue.sort(&mut instances, SortMode::State, false);
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_empty_and_single_queues() {
    let mut instances = Vec::new();
    let mut queue = BatchQueue::new();
    queue.sort(&mut instances, SortMode::State, true);
    assert!(queue.is_empty());

    let registry = ResourceRegistry::new();
    queue.push(batch(&geometry(&registry), &material(&registry, 1), 0.0, 1.0));
    queue.sort(&mut instances, SortMode::State, true);
    assert_eq!(queue.len(), 1);
    assert!(!queue.batches()[0].is_instanced());

    queue.clear();
    assert!(queue.is_empty());
}
