//! Small allocators shared by the resource registry and the renderer.

mod area_allocator;
mod slot_allocator;

pub use area_allocator::AreaAllocator;
pub use slot_allocator::SlotAllocator;
