use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle described by its top-left corner and size.
///
/// Negative sizes are representable but are treated as empty by every
/// operation in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin with the given size.
    pub const fn with_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        !self.is_empty() && x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Returns true when `other` lies entirely within `self`.
    pub fn contains_rect(&self, other: &Rectangle) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }

        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        !self.clip(other).is_empty()
    }

    /// Intersection of `self` with `bounds`. The result may be empty.
    pub fn clip(&self, bounds: &Rectangle) -> Rectangle {
        let x = self.x.max(bounds.x);
        let y = self.y.max(bounds.y);
        let right = self.right().min(bounds.right());
        let bottom = self.bottom().min(bounds.bottom());

        Rectangle::new(
            x,
            y,
            right.saturating_sub(x).max(0),
            bottom.saturating_sub(y).max(0),
        )
    }

    /// Same size, positioned at the origin.
    pub fn normalise(&self) -> Rectangle {
        Rectangle::with_size(self.width, self.height)
    }

    /// Moves the origin, saturating at the `i32` range.
    pub fn translate(&self, dx: i32, dy: i32) -> Rectangle {
        Rectangle::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.width,
            self.height,
        )
    }

    /// Places `self` relative to the origin of `within`.
    pub fn position_within(&self, within: &Rectangle) -> Rectangle {
        self.translate(within.x, within.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clips_against_bounds() {
        let bounds = Rectangle::with_size(10, 10);
        let clipped = Rectangle::new(-2, 5, 6, 10).clip(&bounds);
        assert_eq!(clipped, Rectangle::new(0, 5, 4, 5));

        let outside = Rectangle::new(20, 20, 4, 4).clip(&bounds);
        assert!(outside.is_empty());
        assert!(!bounds.intersects(&Rectangle::new(10, 0, 3, 3)));
    }

    #[test]
    fn extreme_coordinates_saturate() {
        let bounds = Rectangle::with_size(10, 10);
        let far = Rectangle::new(i32::MAX - 1, i32::MIN, 8, 8);

        assert!(far.clip(&bounds).is_empty());
        assert!(Rectangle::new(5, 5, i32::MIN, 4)
            .clip(&Rectangle::new(20, 0, 4, 4))
            .is_empty());
        assert_eq!(
            far.translate(10, -10),
            Rectangle::new(i32::MAX, i32::MIN, 8, 8)
        );
    }

    #[test]
    fn containment_requires_full_overlap() {
        let outer = Rectangle::with_size(8, 8);
        assert!(outer.contains_rect(&Rectangle::new(2, 2, 6, 6)));
        assert!(!outer.contains_rect(&Rectangle::new(2, 2, 7, 6)));
        assert!(!outer.contains_rect(&Rectangle::new(0, 0, 0, 4)));
        assert!(outer.contains_point(7, 7));
        assert!(!outer.contains_point(8, 0));
    }
}
