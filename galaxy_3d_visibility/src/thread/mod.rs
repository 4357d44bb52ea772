//! Worker threads for the per-frame task graph.

mod work_queue;

pub use work_queue::{Task, WorkQueue, MAX_THREADS};
pub(crate) use work_queue::lock;
