//! Points: positions distinct from [`super::Vector3f`] directions.

use super::Vector3f;
use crate::pbrt::{Float, Int};
use std::ops::{Add, Index, Mul, Sub};

/// A 3D point in world or object space.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Point3f {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, o: &Self) -> Float {
        (*self - *o).length()
    }

    pub fn distance_squared(&self, o: &Self) -> Float {
        (*self - *o).length_squared()
    }
}

impl Index<usize> for Point3f {
    type Output = Float;
    fn index(&self, i: usize) -> &Float {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Point3f index out of range: {}", i),
        }
    }
}

impl Add<Vector3f> for Point3f {
    type Output = Self;
    fn add(self, v: Vector3f) -> Self {
        Self::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }
}
impl Sub for Point3f {
    type Output = Vector3f;
    fn sub(self, o: Self) -> Vector3f {
        Vector3f::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}
impl Sub<Vector3f> for Point3f {
    type Output = Self;
    fn sub(self, v: Vector3f) -> Self {
        Self::new(self.x - v.x, self.y - v.y, self.z - v.z)
    }
}
impl Mul<Float> for Point3f {
    type Output = Self;
    fn mul(self, s: Float) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}
impl Add for Point3f {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

/// A 2D point with `Float` coordinates, used for film/lens samples.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point2f {
    pub x: Float,
    pub y: Float,
}

impl Point2f {
    pub fn new(x: Float, y: Float) -> Self {
        Self { x, y }
    }
}

/// A 2D point with integer coordinates, used for pixel indices.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point2i {
    pub x: Int,
    pub y: Int,
}

impl Point2i {
    pub fn new(x: Int, y: Int) -> Self {
        Self { x, y }
    }
}

impl Sub for Point2i {
    type Output = Vector2i;
    fn sub(self, o: Self) -> Vector2i {
        Vector2i::new(self.x - o.x, self.y - o.y)
    }
}

/// A 2D vector with integer coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vector2i {
    pub x: Int,
    pub y: Int,
}

impl Vector2i {
    pub fn new(x: Int, y: Int) -> Self {
        Self { x, y }
    }
}
