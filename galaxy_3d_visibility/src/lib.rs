/*!
# Galaxy 3D Visibility

Per-frame visibility and submission pipeline for the Galaxy 3D engine.

The crate decides, for one camera and one frame, what must be drawn and how:
it indexes drawables in a loose octree, culls them against the view frustum,
a software occlusion buffer and last frame's hardware occlusion queries,
batches the survivors, sets up cached shadow views and assigns local lights
to a clustered froxel grid. Draw calls go through the `GraphicsDevice`
trait, so any backend can sit underneath.

## Architecture

- **Scene**: loose octree of geometries, lights and occluders
- **Renderer**: frame driver (`prepare_view`, `render_shadow_maps`,
  `render_opaque`, `render_alpha`, `render_debug`)
- **WorkQueue**: worker threads running the frame's task graph
- **GraphicsDevice**: backend seam receiving semantic draw calls
- **ResourceRegistry**: geometries, materials and their passes
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod math;
pub mod camera;
pub mod utils;
pub mod thread;
pub mod graphics_device;
pub mod resource;
pub mod scene;
pub mod renderer;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Frame driver
    pub use crate::renderer::Renderer;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Render sub-module with batching, shadows and clusters
    pub mod render {
        pub use crate::renderer::*;
        pub use crate::graphics_device::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    pub mod math {
        pub use crate::math::*;
    }

    pub mod camera {
        pub use crate::camera::*;
    }

    pub mod config {
        pub use crate::config::*;
    }

    pub mod thread {
        pub use crate::thread::{Task, WorkQueue, MAX_THREADS};
    }
}

// Re-export math library at crate root
pub use glam;
