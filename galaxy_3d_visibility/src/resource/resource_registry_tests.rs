/// Tests for ResourceRegistry and the resources it creates

use super::*;
use crate::graphics_device::{BufferHandle, ShaderProgramHandle, TextureHandle};
use crate::resource::{BlendMode, PassDesc, PassType, MAX_MATERIAL_TEXTURE_UNITS};

// ============================================================================
// Helper Functions
// ============================================================================

fn geometry_desc(count: u32) -> GeometryDesc {
    GeometryDesc {
        vertex_buffer: BufferHandle(1),
        index_buffer: Some(BufferHandle(2)),
        draw_start: 0,
        draw_count: count,
        lod_distance: 0.0,
    }
}

fn opaque_material_desc() -> MaterialDesc {
    MaterialDesc {
        passes: vec![
            PassDesc::opaque(ShaderProgramHandle(10)),
            PassDesc::shadow(ShaderProgramHandle(11)),
        ],
        textures: vec![(0, TextureHandle(5))],
    }
}

// ============================================================================
// Geometry
// ============================================================================

#[test]
fn test_create_geometry() {
    let registry = ResourceRegistry::new();
    let geometry = registry.create_geometry(geometry_desc(36)).unwrap();

    assert_eq!(geometry.id(), 0);
    assert_eq!(geometry.draw_count(), 36);
    assert!(geometry.is_indexed());
    assert_eq!(registry.geometry_count(), 1);
}

#[test]
fn test_geometry_rejects_empty_draw_range() {
    let registry = ResourceRegistry::new();
    assert!(registry.create_geometry(geometry_desc(0)).is_err());
    // A failed creation does not leak its id
    assert_eq!(registry.geometry_count(), 0);
}

#[test]
fn test_geometry_rejects_overflowing_range() {
    let registry = ResourceRegistry::new();
    let desc = GeometryDesc { draw_start: u32::MAX, ..geometry_desc(3) };
    assert!(registry.create_geometry(desc).is_err());
}

#[test]
fn test_geometry_ids_are_recycled_on_drop() {
    let registry = ResourceRegistry::new();
    let first = registry.create_geometry(geometry_desc(3)).unwrap();
    let second = registry.create_geometry(geometry_desc(3)).unwrap();
    assert_eq!((first.id(), second.id()), (0, 1));

    drop(first);
    assert_eq!(registry.geometry_count(), 1);
    let third = registry.create_geometry(geometry_desc(3)).unwrap();
    assert_eq!(third.id(), 0);
}

// ============================================================================
// Material and passes
// ============================================================================

#[test]
fn test_create_material_with_passes() {
    let registry = ResourceRegistry::new();
    let material = registry.create_material(opaque_material_desc()).unwrap();

    assert!(material.has_pass(PassType::Opaque));
    assert!(!material.has_pass(PassType::Alpha));
    let shadow = material.pass(PassType::Shadow).unwrap();
    assert!(!shadow.is_lit());
    assert_eq!(shadow.shader_program(), ShaderProgramHandle(11));
    assert_eq!(material.textures(), &[(0, TextureHandle(5))]);
    assert_eq!(registry.pass_count(), 2);
}

#[test]
fn test_material_requires_a_pass() {
    let registry = ResourceRegistry::new();
    assert!(registry.create_material(MaterialDesc::default()).is_err());
}

#[test]
fn test_material_rejects_duplicate_pass_type() {
    let registry = ResourceRegistry::new();
    let desc = MaterialDesc {
        passes: vec![
            PassDesc::opaque(ShaderProgramHandle(1)),
            PassDesc::opaque(ShaderProgramHandle(2)),
        ],
        textures: vec![],
    };
    assert!(registry.create_material(desc).is_err());
    assert_eq!(registry.pass_count(), 0);
    assert_eq!(registry.material_count(), 0);
}

#[test]
fn test_material_rejects_bad_texture_units() {
    let registry = ResourceRegistry::new();
    let out_of_range = MaterialDesc {
        textures: vec![(MAX_MATERIAL_TEXTURE_UNITS as u32, TextureHandle(1))],
        ..opaque_material_desc()
    };
    assert!(registry.create_material(out_of_range).is_err());

    let duplicate = MaterialDesc {
        textures: vec![(2, TextureHandle(1)), (2, TextureHandle(3))],
        ..opaque_material_desc()
    };
    assert!(registry.create_material(duplicate).is_err());
}

#[test]
fn test_pass_validation() {
    let registry = ResourceRegistry::new();

    let blended_opaque = MaterialDesc {
        passes: vec![PassDesc { blend_mode: BlendMode::Add, ..PassDesc::opaque(ShaderProgramHandle(1)) }],
        textures: vec![],
    };
    assert!(registry.create_material(blended_opaque).is_err());

    let lit_shadow = MaterialDesc {
        passes: vec![PassDesc { lit: true, ..PassDesc::shadow(ShaderProgramHandle(1)) }],
        textures: vec![],
    };
    assert!(registry.create_material(lit_shadow).is_err());
}

#[test]
fn test_alpha_pass_defaults() {
    let desc = PassDesc::alpha(ShaderProgramHandle(4));
    assert_eq!(desc.pass_type, PassType::Alpha);
    assert_eq!(desc.blend_mode, BlendMode::Alpha);
    assert!(!desc.depth_write);
    assert!(desc.lit);
}

#[test]
fn test_shader_hash_groups_same_program() {
    let registry = ResourceRegistry::new();
    let a = registry.create_material(opaque_material_desc()).unwrap();
    let b = registry.create_material(opaque_material_desc()).unwrap();

    let pass_a = a.pass(PassType::Opaque).unwrap();
    let pass_b = b.pass(PassType::Opaque).unwrap();
    assert_eq!(pass_a.shader_hash(), pass_b.shader_hash());
    assert_ne!(pass_a.id(), pass_b.id());
}

#[test]
fn test_pass_ids_outlive_material_while_shared() {
    let registry = ResourceRegistry::new();
    let material = registry.create_material(opaque_material_desc()).unwrap();
    let pass = material.pass(PassType::Opaque).unwrap().clone();

    drop(material);
    assert_eq!(registry.material_count(), 0);
    // The cloned pass still holds its id; the shadow pass was released
    assert_eq!(registry.pass_count(), 1);
    drop(pass);
    assert_eq!(registry.pass_count(), 0);
}
