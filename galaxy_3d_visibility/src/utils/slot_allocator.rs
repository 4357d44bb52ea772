/// Allocates and recycles 16-bit sort ids.
///
/// Geometries, materials and shader passes each get a small id that is
/// packed into batch sort keys. Ids are dense and recycled so that the
/// 16 bits of key space last for the lifetime of the registry.
///
/// # Example
///
/// ```ignore
/// let mut alloc = SlotAllocator::new();
/// let a = alloc.alloc();  // Some(0)
/// let b = alloc.alloc();  // Some(1)
/// alloc.free(0);          // 0 is now available
/// let c = alloc.alloc();  // Some(0) (recycled)
/// ```
#[derive(Debug)]
pub struct SlotAllocator {
    free_list: Vec<u16>,
    /// Next fresh id; u16::MAX + 1 once the id space is used up
    next_id: u32,
    len: u32,
}

impl SlotAllocator {
    /// Create a new empty allocator
    pub fn new() -> Self {
        Self {
            free_list: Vec::new(),
            next_id: 0,
            len: 0,
        }
    }

    /// Allocate the next available id, `None` when all 65536 are live
    pub fn alloc(&mut self) -> Option<u16> {
        let id = match self.free_list.pop() {
            Some(id) => id,
            None => {
                let id = u16::try_from(self.next_id).ok()?;
                self.next_id += 1;
                id
            }
        };
        self.len += 1;
        Some(id)
    }

    /// Return an id to the pool for reuse
    pub fn free(&mut self, id: u16) {
        debug_assert!((id as u32) < self.next_id, "freeing an unallocated id: {}", id);
        self.len -= 1;
        self.free_list.push(id);
    }

    /// Highest id ever allocated + 1
    pub fn high_water_mark(&self) -> u32 {
        self.next_id
    }

    /// Number of live ids
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no ids are live
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
