//! Linear RGB colour triples.

use crate::pbrt::{clamp, max, Float};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RGBColor {
    pub r: Float,
    pub g: Float,
    pub b: Float,
}

impl RGBColor {
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0 };

    pub fn new(r: Float, g: Float, b: Float) -> Self {
        Self { r, g, b }
    }

    pub fn splat(v: Float) -> Self {
        Self::new(v, v, v)
    }

    pub fn is_black(&self) -> bool {
        self.r == 0.0 && self.g == 0.0 && self.b == 0.0
    }

    pub fn max_component(&self) -> Float {
        max(self.r, max(self.g, self.b))
    }

    /// CIE luminance of a linear-sRGB triple (Rec.709 weights). Used by the
    /// tile convergence test (§4.H) to turn a pixel's even/all radiance
    /// difference into a perceptually weighted scalar error.
    pub fn y(&self) -> Float {
        0.212671 * self.r + 0.715160 * self.g + 0.072169 * self.b
    }

    pub fn clamp(&self, low: Float, high: Float) -> Self {
        Self::new(clamp(self.r, low, high), clamp(self.g, low, high), clamp(self.b, low, high))
    }
}

impl Add for RGBColor {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(self.r + o.r, self.g + o.g, self.b + o.b)
    }
}
impl AddAssign for RGBColor {
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}
impl Sub for RGBColor {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::new(self.r - o.r, self.g - o.g, self.b - o.b)
    }
}
impl Mul for RGBColor {
    type Output = Self;
    fn mul(self, o: Self) -> Self {
        Self::new(self.r * o.r, self.g * o.g, self.b * o.b)
    }
}
impl Mul<Float> for RGBColor {
    type Output = Self;
    fn mul(self, s: Float) -> Self {
        Self::new(self.r * s, self.g * s, self.b * s)
    }
}
impl MulAssign<Float> for RGBColor {
    fn mul_assign(&mut self, s: Float) {
        *self = *self * s;
    }
}
impl Div<Float> for RGBColor {
    type Output = Self;
    fn div(self, s: Float) -> Self {
        self * (1.0 / s)
    }
}
