/// Axis-aligned rectangle in map pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub const fn right(&self) -> i32 {
        self.left + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.top + self.height
    }

    /// Returns a copy displaced by the given amounts.
    pub const fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            width: self.width,
            height: self.height,
        }
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.left += dx;
        self.top += dy;
    }

    pub fn set_top_left(&mut self, left: i32, top: i32) {
        self.left = left;
        self.top = top;
    }

    /// True when `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// True when the rectangles overlap by at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }
}

/// A cardinal direction, used both for actor facing and for map boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translated_preserves_size() {
        let rect = Rect::new(10, 20, 28, 18);
        let moved = rect.translated(-4, 6);
        assert_eq!(moved, Rect::new(6, 26, 28, 18));
        assert_eq!(moved.right(), 34);
        assert_eq!(moved.bottom(), 44);
    }

    #[test]
    fn contains_rejects_partial_overlap() {
        let outer = Rect::new(0, 0, 100, 100);
        assert!(outer.contains(&Rect::new(0, 0, 100, 100)));
        assert!(outer.contains(&Rect::new(10, 10, 20, 20)));
        assert!(!outer.contains(&Rect::new(90, 10, 20, 20)));
    }

    #[test]
    fn intersects_is_exclusive_of_touching_edges() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.intersects(&Rect::new(9, 9, 10, 10)));
        assert!(!a.intersects(&Rect::new(10, 0, 10, 10)));
    }
}
