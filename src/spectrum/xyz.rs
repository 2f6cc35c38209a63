//! CIE XYZ tristimulus values and the analytic colour-matching-function fit
//! used to convolve arbitrary SPDs without a tabulated curve.

use super::RGBColor;
use crate::pbrt::Float;

/// A CIE XYZ tristimulus triple.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct XYZColor {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl XYZColor {
    pub const BLACK: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Self { x, y, z }
    }

    pub fn luminance(&self) -> Float {
        self.y
    }

    pub fn is_black(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// CIE `xy` chromaticity of this tristimulus value.
    pub fn chromaticity(&self) -> (Float, Float) {
        let sum = self.x + self.y + self.z;
        if sum == 0.0 {
            (0.0, 0.0)
        } else {
            (self.x / sum, self.y / sum)
        }
    }
}

/// Wyman et al.'s multi-lobe Gaussian fit to the CIE 1931 2-degree colour
/// matching functions, evaluated at a single wavelength in nm. Used to
/// convolve an `SPD` into XYZ without carrying a tabulated curve.
pub fn cie_xyz_bar(lambda: Float) -> (Float, Float, Float) {
    fn gauss(x: Float, alpha: Float, mu: Float, sigma1: Float, sigma2: Float) -> Float {
        let sigma = if x < mu { sigma1 } else { sigma2 };
        let t = (x - mu) / sigma;
        alpha * (-0.5 * t * t).exp()
    }

    let x = gauss(lambda, 1.056, 599.8, 37.9, 31.0)
        + gauss(lambda, 0.362, 442.0, 16.0, 26.7)
        + gauss(lambda, -0.065, 501.1, 20.4, 26.2);
    let y = gauss(lambda, 0.821, 568.8, 46.9, 40.5) + gauss(lambda, 0.286, 530.9, 16.3, 31.1);
    let z = gauss(lambda, 1.217, 437.0, 11.8, 36.0) + gauss(lambda, 0.681, 459.0, 26.0, 13.8);
    (x, y, z)
}

/// HDTV (Rec. 709) XYZ -> linear RGB, matching the teacher's coefficients.
pub fn xyz_to_rgb(xyz: &XYZColor) -> RGBColor {
    RGBColor::new(
        3.240479 * xyz.x - 1.537150 * xyz.y - 0.498535 * xyz.z,
        -0.969256 * xyz.x + 1.875991 * xyz.y + 0.041556 * xyz.z,
        0.055648 * xyz.x - 0.204043 * xyz.y + 1.057311 * xyz.z,
    )
}

/// HDTV (Rec. 709) linear RGB -> XYZ.
pub fn rgb_to_xyz(rgb: &RGBColor) -> XYZColor {
    XYZColor::new(
        0.412453 * rgb.r + 0.357580 * rgb.g + 0.180423 * rgb.b,
        0.212671 * rgb.r + 0.715160 * rgb.g + 0.072169 * rgb.b,
        0.019334 * rgb.r + 0.119193 * rgb.g + 0.950227 * rgb.b,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rgb_xyz_round_trip() {
        let rgb = RGBColor::new(0.3, 0.6, 0.1);
        let back = xyz_to_rgb(&rgb_to_xyz(&rgb));
        assert_relative_eq!(back.r, rgb.r, epsilon = 1e-4);
        assert_relative_eq!(back.g, rgb.g, epsilon = 1e-4);
        assert_relative_eq!(back.b, rgb.b, epsilon = 1e-4);
    }

    #[test]
    fn y_bar_peaks_near_555nm() {
        let (_, y_555, _) = cie_xyz_bar(555.0);
        let (_, y_450, _) = cie_xyz_bar(450.0);
        assert!(y_555 > y_450);
    }
}
