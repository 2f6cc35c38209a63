//! 2D/3D vectors.

use crate::pbrt::Float;
use std::ops::{Add, AddAssign, Div, DivAssign, Index, Mul, MulAssign, Neg, Sub, SubAssign};

/// A 3D vector (direction, not a point).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vector3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Vector3f {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }

    pub fn dot(&self, o: &Self) -> Float {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    pub fn abs_dot(&self, o: &Self) -> Float {
        self.dot(o).abs()
    }

    pub fn cross(&self, o: &Self) -> Self {
        Self::new(
            self.y * o.z - self.z * o.y,
            self.z * o.x - self.x * o.z,
            self.x * o.y - self.y * o.x,
        )
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len == 0.0 {
            *self
        } else {
            *self / len
        }
    }

    /// Constructs an orthonormal basis `(v2, v3)` given `v1` (Duff et al.).
    pub fn coordinate_system(&self) -> (Self, Self) {
        let sign = if self.z >= 0.0 { 1.0 } else { -1.0 };
        let a = -1.0 / (sign + self.z);
        let b = self.x * self.y * a;
        let v2 = Self::new(1.0 + sign * self.x * self.x * a, sign * b, -sign * self.x);
        let v3 = Self::new(b, sign + self.y * self.y * a, -self.y);
        (v2, v3)
    }
}

impl From<(Float, Float, Float)> for Vector3f {
    fn from(t: (Float, Float, Float)) -> Self {
        Self::new(t.0, t.1, t.2)
    }
}

impl Add for Vector3f {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}
impl AddAssign for Vector3f {
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}
impl Sub for Vector3f {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}
impl SubAssign for Vector3f {
    fn sub_assign(&mut self, o: Self) {
        *self = *self - o;
    }
}
impl Neg for Vector3f {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}
impl Mul<Float> for Vector3f {
    type Output = Self;
    fn mul(self, s: Float) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}
impl Mul<Vector3f> for Float {
    type Output = Vector3f;
    fn mul(self, v: Vector3f) -> Vector3f {
        v * self
    }
}
impl MulAssign<Float> for Vector3f {
    fn mul_assign(&mut self, s: Float) {
        *self = *self * s;
    }
}
impl Div<Float> for Vector3f {
    type Output = Self;
    fn div(self, s: Float) -> Self {
        let inv = 1.0 / s;
        self * inv
    }
}
impl DivAssign<Float> for Vector3f {
    fn div_assign(&mut self, s: Float) {
        *self = *self / s;
    }
}
impl Index<usize> for Vector3f {
    type Output = Float;
    fn index(&self, i: usize) -> &Float {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vector3f index out of range: {}", i),
        }
    }
}

/// A 2D vector.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vector2f {
    pub x: Float,
    pub y: Float,
}

impl Vector2f {
    pub fn new(x: Float, y: Float) -> Self {
        Self { x, y }
    }
}

impl Sub for Vector2f {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::new(self.x - o.x, self.y - o.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normalize_unit_length() {
        let v = Vector3f::new(3.0, 4.0, 0.0).normalize();
        assert_relative_eq!(v.length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn cross_is_perpendicular_to_both() {
        let a = Vector3f::new(1.0, 0.0, 0.0);
        let b = Vector3f::new(0.0, 1.0, 0.0);
        let c = a.cross(&b);
        assert_relative_eq!(c.dot(&a), 0.0, epsilon = 1e-6);
        assert_relative_eq!(c.dot(&b), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn coordinate_system_is_orthonormal() {
        let v1 = Vector3f::new(0.2, 0.6, -0.77).normalize();
        let (v2, v3) = v1.coordinate_system();
        assert_relative_eq!(v2.length(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(v3.length(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(v1.dot(&v2), 0.0, epsilon = 1e-4);
        assert_relative_eq!(v1.dot(&v3), 0.0, epsilon = 1e-4);
    }
}
