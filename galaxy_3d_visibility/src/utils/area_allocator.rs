/// Rectangle allocator for shadow map atlases.
///
/// Keeps a list of disjoint free rectangles. `allocate` picks the smallest
/// free rectangle that fits (best fit) and splits the remainder guillotine
/// style; `allocate_specific` carves out an exact rectangle so a light can
/// keep last frame's atlas region. The allocator never grows.

use glam::IVec2;
use crate::math::IntRect;

#[derive(Debug, Clone)]
pub struct AreaAllocator {
    size: IVec2,
    free_areas: Vec<IntRect>,
}

impl AreaAllocator {
    pub fn new(width: i32, height: i32) -> Self {
        let mut allocator = Self { size: IVec2::ZERO, free_areas: Vec::new() };
        allocator.reset(width, height);
        allocator
    }

    /// Drop every allocation and start over with a `width` x `height` area.
    pub fn reset(&mut self, width: i32, height: i32) {
        self.size = IVec2::new(width.max(0), height.max(0));
        self.free_areas.clear();
        if self.size.x > 0 && self.size.y > 0 {
            self.free_areas.push(IntRect::new(0, 0, self.size.x, self.size.y));
        }
    }

    pub fn size(&self) -> IVec2 {
        self.size
    }

    pub fn free_areas(&self) -> &[IntRect] {
        &self.free_areas
    }

    /// Reserve a `width` x `height` rectangle. Returns its top-left corner.
    pub fn allocate(&mut self, width: i32, height: i32) -> Option<IVec2> {
        let width = width.max(0);
        let height = height.max(0);

        let mut best: Option<(usize, i64)> = None;
        for (i, area) in self.free_areas.iter().enumerate() {
            if area.width() >= width && area.height() >= height {
                let free_area = area.width() as i64 * area.height() as i64;
                if best.map_or(true, |(_, best_area)| free_area < best_area) {
                    best = Some((i, free_area));
                }
            }
        }

        let (index, _) = best?;
        let area = self.free_areas[index];
        let reserved = IntRect::new(area.left, area.top, area.left + width, area.top + height);

        // Remainder to the right keeps the full height unless the area is
        // much taller than the request, in which case the bottom is split off
        let mut right = IntRect::new(reserved.right, area.top, area.right, area.bottom);
        let mut replacements = Vec::with_capacity(2);
        if area.height() > 2 * height {
            right.bottom = reserved.bottom;
            replacements.push(IntRect::new(area.left, reserved.bottom, area.right, area.bottom));
        } else if area.height() > height {
            replacements.push(IntRect::new(area.left, reserved.bottom, reserved.right, area.bottom));
        }
        replacements.push(right);

        self.free_areas.swap_remove(index);
        self.free_areas.extend(replacements.into_iter().filter(|r| !r.is_empty()));
        Some(IVec2::new(reserved.left, reserved.top))
    }

    /// Reserve exactly `rect`. Fails if any part of it is already taken.
    pub fn allocate_specific(&mut self, rect: IntRect) -> bool {
        if rect.is_empty() {
            return false;
        }
        let Some(index) = self.free_areas.iter().position(|area| area.contains(&rect)) else {
            return false;
        };

        let area = self.free_areas.swap_remove(index);
        let pieces = [
            IntRect::new(area.left, area.top, rect.left, area.bottom),
            IntRect::new(rect.right, area.top, area.right, area.bottom),
            IntRect::new(rect.left, area.top, rect.right, rect.top),
            IntRect::new(rect.left, rect.bottom, rect.right, area.bottom),
        ];
        self.free_areas.extend(pieces.into_iter().filter(|r| !r.is_empty()));
        true
    }
}

#[cfg(test)]
#[path = "area_allocator_tests.rs"]
mod tests;
