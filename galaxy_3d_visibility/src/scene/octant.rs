/// Octant - one node of the loose octree.
///
/// The octant covers a world box; its *fitting* box is the world box grown
/// by half its size on every axis. Drawables are accepted while their
/// world box stays inside the fitting box, so small moves near a boundary
/// do not reinsert them. The culling box tested by queries equals the
/// fitting box, except at the root where it also grows to cover drawables
/// that do not fit the root at all.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use glam::Vec3;
use slotmap::new_key_type;
use crate::math::BoundingBox;
use super::drawable::DrawableKey;

new_key_type! {
    /// Stable key for an octant; stale keys of freed octants never resolve
    pub struct OctantKey;
}

pub const NUM_OCTANTS: usize = 8;

/// Occlusion state of an octant, ordered from hidden to visible.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OctantVisibility {
    OutsideFrustum = 0,
    Occluded = 1,
    /// Was occluded; a parent became visible so it is tested again
    OccludedUnknown = 2,
    VisibleUnknown = 3,
    Visible = 4,
}

impl OctantVisibility {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => OctantVisibility::OutsideFrustum,
            1 => OctantVisibility::Occluded,
            2 => OctantVisibility::OccludedUnknown,
            4 => OctantVisibility::Visible,
            _ => OctantVisibility::VisibleUnknown,
        }
    }
}

#[derive(Debug)]
pub struct Octant {
    world_bounding_box: BoundingBox,
    fitting_box: BoundingBox,
    culling_box: BoundingBox,
    center: Vec3,
    half_size: Vec3,
    /// Remaining subdivision levels; 1 = cannot split further
    level: u32,
    parent: Option<OctantKey>,
    child_index: u8,
    pub(crate) children: [Option<OctantKey>; NUM_OCTANTS],
    pub(crate) num_children: u8,
    pub(crate) drawables: Vec<DrawableKey>,
    pub(crate) sort_dirty: bool,
    visibility: AtomicU8,
    query_pending: AtomicBool,
    /// Time since the last query of a visible octant, in query intervals (f32 bits)
    query_timer: AtomicU32,
}

impl Octant {
    pub(crate) fn new(parent: Option<OctantKey>, world_bounding_box: BoundingBox, level: u32, child_index: u8) -> Self {
        let center = world_bounding_box.center();
        let half_size = world_bounding_box.half_size();
        let fitting_box = BoundingBox::new(world_bounding_box.min - half_size, world_bounding_box.max + half_size);
        Self {
            world_bounding_box,
            fitting_box,
            culling_box: fitting_box,
            center,
            half_size,
            level,
            parent,
            child_index,
            children: [None; NUM_OCTANTS],
            num_children: 0,
            drawables: Vec::new(),
            sort_dirty: false,
            visibility: AtomicU8::new(OctantVisibility::VisibleUnknown as u8),
            query_pending: AtomicBool::new(false),
            // Random phase spreads re-queries of visible octants over frames
            query_timer: AtomicU32::new(rand::random::<f32>().to_bits()),
        }
    }

    /// Child slot for a position: bit 0 = +x, bit 1 = +y, bit 2 = +z half.
    pub fn child_index_for(&self, position: Vec3) -> usize {
        let mut index = 0;
        if position.x >= self.center.x {
            index |= 1;
        }
        if position.y >= self.center.y {
            index |= 2;
        }
        if position.z >= self.center.z {
            index |= 4;
        }
        index
    }

    /// World box of child slot `index`.
    pub fn child_world_box(&self, index: usize) -> BoundingBox {
        let mut min = self.world_bounding_box.min;
        let mut max = self.world_bounding_box.max;
        for axis in 0..3 {
            if index & (1 << axis) != 0 {
                min[axis] = self.center[axis];
            } else {
                max[axis] = self.center[axis];
            }
        }
        BoundingBox::new(min, max)
    }

    /// Whether a box should stay at this level instead of moving to a child.
    ///
    /// Accepts when no further split is possible, when the box is not
    /// smaller than this octant's half size on some axis, or when it does
    /// not fit the loose box of the child its center selects.
    pub fn fit_bounding_box(&self, bbox: &BoundingBox, box_size: Vec3) -> bool {
        if self.level <= 1 {
            return true;
        }
        if box_size.cmpge(self.half_size).any() {
            return true;
        }

        let child = self.child_world_box(self.child_index_for(bbox.center()));
        let child_half = child.half_size();
        let child_loose = BoundingBox::new(child.min - child_half, child.max + child_half);
        !child_loose.contains(bbox)
    }

    pub(crate) fn expand_culling_box(&mut self, bbox: &BoundingBox) {
        if bbox.is_defined() {
            self.culling_box.merge(bbox);
        }
    }

    pub(crate) fn reset_culling_box(&mut self, culling_box: BoundingBox) {
        self.culling_box = culling_box;
    }

    // ===== ACCESSORS =====

    pub fn world_bounding_box(&self) -> BoundingBox {
        self.world_bounding_box
    }

    /// Loose box used for the reinsertion fast path
    pub fn fitting_box(&self) -> BoundingBox {
        self.fitting_box
    }

    /// Box tested by queries; contains every drawable held here or below
    pub fn culling_box(&self) -> BoundingBox {
        self.culling_box
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn half_size(&self) -> Vec3 {
        self.half_size
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn parent(&self) -> Option<OctantKey> {
        self.parent
    }

    /// Slot index inside the parent
    pub fn child_index(&self) -> usize {
        self.child_index as usize
    }

    pub fn child(&self, index: usize) -> Option<OctantKey> {
        self.children.get(index).copied().flatten()
    }

    pub fn children(&self) -> impl Iterator<Item = OctantKey> + '_ {
        self.children.iter().flatten().copied()
    }

    pub fn num_children(&self) -> usize {
        self.num_children as usize
    }

    pub fn has_children(&self) -> bool {
        self.num_children > 0
    }

    /// Drawables held directly, lights first
    pub fn drawables(&self) -> &[DrawableKey] {
        &self.drawables
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty() && self.num_children == 0
    }

    // ===== OCCLUSION STATE =====

    pub fn visibility(&self) -> OctantVisibility {
        OctantVisibility::from_u8(self.visibility.load(Ordering::Relaxed))
    }

    pub fn set_visibility(&self, visibility: OctantVisibility) {
        self.visibility.store(visibility as u8, Ordering::Relaxed);
    }

    /// Whether a GPU occlusion query for this octant is in flight
    pub fn is_query_pending(&self) -> bool {
        self.query_pending.load(Ordering::Relaxed)
    }

    pub fn set_query_pending(&self, pending: bool) {
        self.query_pending.store(pending, Ordering::Relaxed);
    }

    /// Whether a new query should be issued this frame.
    ///
    /// Octants that are not visible are queried whenever no query is in
    /// flight. Visible octants advance their timer by `frame_time` and are
    /// queried again once `interval` seconds have accumulated.
    pub fn check_new_query(&self, frame_time: f32, interval: f32) -> bool {
        if self.visibility() != OctantVisibility::Visible || interval <= 0.0 {
            return !self.is_query_pending();
        }

        let mut timer = f32::from_bits(self.query_timer.load(Ordering::Relaxed)) + frame_time.max(0.0) / interval;
        let due = !self.is_query_pending() && timer >= 1.0;
        if due {
            timer = timer.fract();
        }
        self.query_timer.store(timer.to_bits(), Ordering::Relaxed);
        due
    }

    /// Elapsed fraction of the query interval
    pub fn query_timer(&self) -> f32 {
        f32::from_bits(self.query_timer.load(Ordering::Relaxed))
    }
}
