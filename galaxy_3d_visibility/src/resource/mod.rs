//! Resource module
//!
//! Geometries, materials and their passes. Each carries a 16-bit sort id
//! used by the batch queue's state sort.

mod resource_registry;
mod sort_id;
pub mod geometry;
pub mod material;
pub mod pass;

pub use resource_registry::ResourceRegistry;
pub use geometry::{Geometry, GeometryDesc};
pub use material::{Material, MaterialDesc, MAX_MATERIAL_TEXTURE_UNITS};
pub use pass::{
    Pass, PassDesc, PassType,
    BlendMode, CullMode, NUM_PASS_TYPES,
};
