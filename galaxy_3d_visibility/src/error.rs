//! Error types for the Galaxy3D visibility pipeline
//!
//! The per-frame pipeline itself never fails: capacity exhaustion and
//! degenerate input are handled by dropping work. Errors only surface at
//! the boundaries (graphics device calls, scene mutation while a frame
//! still holds the octree).

use std::fmt;

/// Result type for Galaxy3D operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error reported by the graphics device
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (geometry, material, pass, drawable key, ...)
    InvalidResource(String),

    /// Operation not allowed in the current state
    InvalidOperation(String),

    /// Initialization failed (work queue, shadow maps, device setup)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR message and build an `Error::BackendError` from it
///
/// # Example
///
/// ```no_run
/// # use galaxy_3d_visibility::engine_err;
/// let err = engine_err!("galaxy3d::Scene", "Drawable {} not found", 42);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::galaxy3d::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return early with an `Error::BackendError`
///
/// # Example
///
/// ```no_run
/// # use galaxy_3d_visibility::engine_bail;
/// fn check(size: u32) -> galaxy_3d_visibility::galaxy3d::Result<()> {
///     if size == 0 {
///         engine_bail!("galaxy3d::Renderer", "Shadow map size must be non-zero");
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
