/// Integer rectangle, used for shadow atlas regions and viewports.
///
/// `right` and `bottom` are exclusive.

use glam::IVec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl IntRect {
    pub const ZERO: IntRect = IntRect { left: 0, top: 0, right: 0, bottom: 0 };

    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn from_pos_size(pos: IVec2, size: IVec2) -> Self {
        Self::new(pos.x, pos.y, pos.x + size.x, pos.y + size.y)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width(), self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Whether `other` lies entirely within this rectangle.
    pub fn contains(&self, other: &IntRect) -> bool {
        other.left >= self.left && other.top >= self.top
            && other.right <= self.right && other.bottom <= self.bottom
    }

    /// Whether the rectangles share any area.
    pub fn intersects(&self, other: &IntRect) -> bool {
        other.left < self.right && other.right > self.left
            && other.top < self.bottom && other.bottom > self.top
    }
}
