use cgmath::Point2;

/// A rectangle, with top-left corner at `min`, and bottom-right corner at `max`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Rect {
    pub min: Point2<i32>,
    pub max: Point2<i32>,
}

impl Rect {
    #[inline]
    pub fn new(min: Point2<i32>, max: Point2<i32>) -> Self {
        Rect { min, max }
    }

    /// Creates a rectangle from its origin and size.
    #[inline]
    pub fn from_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect {
            min: Point2::new(x, y),
            max: Point2::new(x + width, y + height),
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn size(&self) -> i32 {
        self.width() * self.height()
    }

    #[inline]
    pub fn overlap(&self, rhs: Self) -> Self {
        use std::cmp;
        Rect {
            min: Point2::new(cmp::max(self.min.x, rhs.min.x), cmp::max(self.min.y, rhs.min.y)),
            max: Point2::new(cmp::min(self.max.x, rhs.max.x), cmp::min(self.max.y, rhs.max.y)),
        }
    }

    #[inline]
    pub fn contains<P>(&self, p: P) -> bool
    where
        P: Into<Point2<i32>>,
    {
        let p = p.into();
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basic() {
        let rect = Rect::from_size(2, 4, 8, 16);
        assert_eq!(rect.width(), 8);
        assert_eq!(rect.height(), 16);
        assert!(rect.contains(Point2::new(2, 4)));
        assert!(!rect.contains(Point2::new(10, 4)));

        let o = rect.overlap(Rect::from_size(0, 0, 4, 8));
        assert_eq!(o, Rect::new(Point2::new(2, 4), Point2::new(4, 8)));
    }
}
