//! Axis-aligned bounding boxes over 2D integer, 2D float, and 3D float points.

use super::{Point2f, Point2i, Point3f};
use crate::pbrt::{max, min, Axis, Int};

/// An axis-aligned box over [`Point2i`] pixel coordinates, `p_max` exclusive.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Bounds2i {
    pub p_min: Point2i,
    pub p_max: Point2i,
}

impl Bounds2i {
    pub fn new(p_min: Point2i, p_max: Point2i) -> Self {
        Self { p_min, p_max }
    }

    pub fn diagonal(&self) -> super::Vector2i {
        self.p_max - self.p_min
    }

    pub fn area(&self) -> i64 {
        let d = self.diagonal();
        (d.x as i64) * (d.y as i64)
    }

    /// Whether `p` lies in `[p_min, p_max)`.
    pub fn contains_exclusive(&self, p: &Point2i) -> bool {
        p.x >= self.p_min.x && p.x < self.p_max.x && p.y >= self.p_min.y && p.y < self.p_max.y
    }

    /// Iterates every pixel in `[p_min, p_max)`, row-major.
    pub fn iter_pixels(&self) -> Bounds2iIter {
        Bounds2iIter {
            bounds: *self,
            current: self.p_min,
        }
    }
}

impl IntoIterator for Bounds2i {
    type Item = Point2i;
    type IntoIter = Bounds2iIter;
    fn into_iter(self) -> Bounds2iIter {
        self.iter_pixels()
    }
}

pub struct Bounds2iIter {
    bounds: Bounds2i,
    current: Point2i,
}

impl Iterator for Bounds2iIter {
    type Item = Point2i;
    fn next(&mut self) -> Option<Point2i> {
        if self.bounds.p_min.x >= self.bounds.p_max.x || self.current.y >= self.bounds.p_max.y {
            return None;
        }
        let p = self.current;
        self.current.x += 1;
        if self.current.x >= self.bounds.p_max.x {
            self.current.x = self.bounds.p_min.x;
            self.current.y += 1;
        }
        Some(p)
    }
}

/// An axis-aligned box over [`Point2f`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Bounds2f {
    pub p_min: Point2f,
    pub p_max: Point2f,
}

impl Bounds2f {
    pub fn new(p_min: Point2f, p_max: Point2f) -> Self {
        Self { p_min, p_max }
    }
}

/// An axis-aligned box over [`Point3f`], used for BVH/kd-tree build bounds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds3f {
    pub p_min: Point3f,
    pub p_max: Point3f,
}

impl Default for Bounds3f {
    fn default() -> Self {
        Self {
            p_min: Point3f::new(crate::pbrt::INFINITY, crate::pbrt::INFINITY, crate::pbrt::INFINITY),
            p_max: Point3f::new(-crate::pbrt::INFINITY, -crate::pbrt::INFINITY, -crate::pbrt::INFINITY),
        }
    }
}

impl Bounds3f {
    pub fn new(p_min: Point3f, p_max: Point3f) -> Self {
        Self { p_min, p_max }
    }

    pub fn union(&self, o: &Self) -> Self {
        Self::new(
            Point3f::new(min(self.p_min.x, o.p_min.x), min(self.p_min.y, o.p_min.y), min(self.p_min.z, o.p_min.z)),
            Point3f::new(max(self.p_max.x, o.p_max.x), max(self.p_max.y, o.p_max.y), max(self.p_max.z, o.p_max.z)),
        )
    }

    pub fn union_point(&self, p: &Point3f) -> Self {
        Self::new(
            Point3f::new(min(self.p_min.x, p.x), min(self.p_min.y, p.y), min(self.p_min.z, p.z)),
            Point3f::new(max(self.p_max.x, p.x), max(self.p_max.y, p.y), max(self.p_max.z, p.z)),
        )
    }

    pub fn diagonal(&self) -> super::Vector3f {
        self.p_max - self.p_min
    }

    /// The axis along which this box is longest.
    pub fn maximum_extent(&self) -> Axis {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            Axis::X
        } else if d.y > d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    pub fn centroid(&self) -> Point3f {
        self.p_min + (self.p_max - self.p_min) * 0.5
    }
}

/// Number of tiles needed to cover `extent` with tiles of `tile_size`.
pub fn num_tiles(extent: Int, tile_size: Int) -> Int {
    (extent + tile_size - 1) / tile_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds2i_iterates_every_pixel_once() {
        let b = Bounds2i::new(Point2i::new(0, 0), Point2i::new(3, 2));
        let pixels: Vec<_> = b.iter_pixels().collect();
        assert_eq!(pixels.len(), 6);
        assert_eq!(b.area(), 6);
    }

    #[test]
    fn maximum_extent_picks_longest_axis() {
        let b = Bounds3f::new(Point3f::new(0.0, 0.0, 0.0), Point3f::new(1.0, 5.0, 2.0));
        assert_eq!(b.maximum_extent(), Axis::Y);
    }
}
