//! Screen-coordinate value types.
//!
//! Win32 describes rectangles by their edges (`left`, `top`, `right`,
//! `bottom`, right/bottom exclusive). [`Rect`] keeps that representation so
//! conversions to and from `RECT` are exact.

/// A point in screen or client coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// Creates a new point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Size {
    /// Creates a new size.
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// An edge-based rectangle, identical in meaning to Win32 `RECT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge (inclusive).
    pub left: i32,
    /// Top edge (inclusive).
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl Rect {
    /// Creates a rectangle from its edges.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Creates a rectangle from an origin and a size.
    pub const fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(
            origin.x,
            origin.y,
            origin.x + size.width,
            origin.y + size.height,
        )
    }

    /// Width of the rectangle. Negative for inverted rectangles.
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Height of the rectangle. Negative for inverted rectangles.
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// The top-left corner.
    pub const fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// The width and height.
    pub const fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// True when the rectangle has no area.
    pub const fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// True when `point` lies inside; right and bottom edges are exclusive.
    pub const fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }

    /// The overlapping region, or `None` if the rectangles do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!r.is_empty()).then_some(r)
    }

    /// Moves the rectangle by `dx`, `dy`.
    pub const fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }
}

#[cfg(windows)]
mod win {
    use super::{Point, Rect};
    use windows::Win32::Foundation::{POINT, RECT};

    impl From<RECT> for Rect {
        fn from(r: RECT) -> Self {
            Rect::new(r.left, r.top, r.right, r.bottom)
        }
    }

    impl From<Rect> for RECT {
        fn from(r: Rect) -> Self {
            RECT {
                left: r.left,
                top: r.top,
                right: r.right,
                bottom: r.bottom,
            }
        }
    }

    impl From<POINT> for Point {
        fn from(p: POINT) -> Self {
            Point::new(p.x, p.y)
        }
    }

    impl From<Point> for POINT {
        fn from(p: Point) -> Self {
            POINT { x: p.x, y: p.y }
        }
    }
}
