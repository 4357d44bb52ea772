/// Leased 16-bit sort id, returned to its pool on drop.

use std::sync::{Arc, Mutex};
use crate::utils::SlotAllocator;

pub(crate) type SortIdPool = Arc<Mutex<SlotAllocator>>;

#[derive(Debug)]
pub(crate) struct SortId {
    id: u16,
    pool: SortIdPool,
}

impl SortId {
    /// Take the next free id, or `None` when all 65536 ids are live.
    pub(crate) fn lease(pool: &SortIdPool) -> Option<SortId> {
        let id = pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).alloc()?;
        Some(SortId { id, pool: Arc::clone(pool) })
    }

    pub(crate) fn get(&self) -> u16 {
        self.id
    }
}

impl Drop for SortId {
    fn drop(&mut self) {
        self.pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).free(self.id);
    }
}
