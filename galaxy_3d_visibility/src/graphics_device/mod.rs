//! Graphics device module - the backend seam of the visibility pipeline.
//!
//! The renderer issues semantic calls through `GraphicsDevice`; buffers,
//! textures and shader programs are opaque handles owned by the backend.

mod graphics_device;
mod uniforms;

#[cfg(test)]
pub mod mock_graphics_device;

pub use graphics_device::{
    GraphicsDevice,
    BufferHandle, TextureHandle, ShaderProgramHandle,
    RenderTarget, UniformSlot,
};
pub use uniforms::{PerViewUniforms, LightData, NUM_CASCADES};
