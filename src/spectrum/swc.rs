//! SWC spectrum: the stratified-wavelengths-coherent working spectrum used
//! throughout the path tracer.

use super::wavelengths::SpectrumWavelengths;
use super::xyz::cie_xyz_bar;
use super::{RGBColor, SpectrumType, XYZColor};
use crate::pbrt::{Float, WAVELENGTH_SAMPLES};
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, MulAssign, Sub, SubAssign};

/// A fixed-length vector of per-wavelength-sample values. Component count
/// always equals the active wavelength count (§3 invariant).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SWCSpectrum {
    c: [Float; WAVELENGTH_SAMPLES],
}

impl SWCSpectrum {
    pub const BLACK: Self = Self { c: [0.0; WAVELENGTH_SAMPLES] };

    pub fn splat(v: Float) -> Self {
        Self { c: [v; WAVELENGTH_SAMPLES] }
    }

    pub fn from_array(c: [Float; WAVELENGTH_SAMPLES]) -> Self {
        Self { c }
    }

    /// Reconstructs a spectrum from an RGB colour via the Smits
    /// min/med/max decomposition over the seven basis SPDs, resampled to
    /// this path's sampled wavelengths.
    pub fn from_rgb(rgb: &RGBColor, sw: &SpectrumWavelengths, kind: SpectrumType) -> Self {
        let mut c = [0.0; WAVELENGTH_SAMPLES];
        for (i, slot) in c.iter_mut().enumerate() {
            *slot = smits_reconstruct(rgb, sw.w[i], kind);
        }
        Self { c }
    }

    /// Resamples an arbitrary SPD (regular, irregular or blackbody, as a
    /// `(lambda, value)` evaluator) at this path's sampled wavelengths.
    pub fn from_spd(eval: impl Fn(Float) -> Float, sw: &SpectrumWavelengths) -> Self {
        let mut c = [0.0; WAVELENGTH_SAMPLES];
        for (i, slot) in c.iter_mut().enumerate() {
            *slot = eval(sw.w[i]);
        }
        Self { c }
    }

    pub fn is_black(&self) -> bool {
        self.c.iter().all(|v| *v == 0.0)
    }

    pub fn has_nans(&self) -> bool {
        self.c.iter().any(|v| v.is_nan())
    }

    pub fn has_infs(&self) -> bool {
        self.c.iter().any(|v| v.is_infinite())
    }

    pub fn is_finite(&self) -> bool {
        !self.has_nans() && !self.has_infs()
    }

    /// Single-sample-aware mean: the average over active wavelength
    /// samples, used by the Schlick phase function and similar places that
    /// need a single scalar filter value from the spectrum.
    pub fn filter(&self) -> Float {
        self.c.iter().sum::<Float>() / WAVELENGTH_SAMPLES as Float
    }

    /// The largest per-wavelength component, used by Russian-roulette
    /// continuation probability (§4.F step g).
    pub fn max_component(&self) -> Float {
        self.c.iter().cloned().fold(0.0, Float::max)
    }

    pub fn clamp(&self, low: Float, high: Float) -> Self {
        let mut c = self.c;
        for v in c.iter_mut() {
            *v = v.clamp(low, high);
        }
        Self { c }
    }

    pub fn sqrt(&self) -> Self {
        let mut c = self.c;
        for v in c.iter_mut() {
            *v = v.max(0.0).sqrt();
        }
        Self { c }
    }

    pub fn exp(&self) -> Self {
        let mut c = self.c;
        for v in c.iter_mut() {
            *v = v.exp();
        }
        Self { c }
    }

    /// Luminance via CIE-Y convolution at the path's sampled wavelengths;
    /// feeds variance clamping and the tile convergence test.
    pub fn y(&self, sw: &SpectrumWavelengths) -> Float {
        let mut sum = 0.0;
        let mut y_bar_sum = 0.0;
        for i in 0..WAVELENGTH_SAMPLES {
            let (_, y_bar, _) = cie_xyz_bar(sw.w[i]);
            sum += self.c[i] * y_bar;
            y_bar_sum += y_bar;
        }
        if y_bar_sum == 0.0 {
            0.0
        } else {
            sum / y_bar_sum
        }
    }

    /// Converts to XYZ by convolving against the analytic colour-matching
    /// functions at the path's sampled wavelengths.
    pub fn to_xyz(&self, sw: &SpectrumWavelengths) -> XYZColor {
        let mut x = 0.0;
        let mut y = 0.0;
        let mut z = 0.0;
        let mut norm = 0.0;
        for i in 0..WAVELENGTH_SAMPLES {
            let (xb, yb, zb) = cie_xyz_bar(sw.w[i]);
            x += self.c[i] * xb;
            y += self.c[i] * yb;
            z += self.c[i] * zb;
            norm += yb;
        }
        if norm == 0.0 {
            XYZColor::BLACK
        } else {
            XYZColor::new(x / norm, y / norm, z / norm)
        }
    }
}

/// Smits (1999) RGB -> reflectance-SPD reconstruction via a min/med/max
/// decomposition over seven fixed basis curves, tabulated every 10 samples
/// across `[380,720]` nm and linearly interpolated.
fn smits_reconstruct(rgb: &RGBColor, lambda: Float, _kind: SpectrumType) -> Float {
    let white = basis_value(BASIS_WHITE, lambda);
    let cyan = basis_value(BASIS_CYAN, lambda);
    let magenta = basis_value(BASIS_MAGENTA, lambda);
    let yellow = basis_value(BASIS_YELLOW, lambda);
    let red = basis_value(BASIS_RED, lambda);
    let green = basis_value(BASIS_GREEN, lambda);
    let blue = basis_value(BASIS_BLUE, lambda);

    let r = rgb.r;
    let g = rgb.g;
    let b = rgb.b;
    let mut v = 0.0;

    if r <= g && r <= b {
        v += r * white;
        if g <= b {
            v += (g - r) * cyan;
            v += (b - g) * blue;
        } else {
            v += (b - r) * cyan;
            v += (g - b) * green;
        }
    } else if g <= r && g <= b {
        v += g * white;
        if r <= b {
            v += (r - g) * magenta;
            v += (b - r) * blue;
        } else {
            v += (b - g) * magenta;
            v += (r - b) * red;
        }
    } else {
        v += b * white;
        if r <= g {
            v += (r - b) * yellow;
            v += (g - r) * green;
        } else {
            v += (g - b) * yellow;
            v += (r - g) * red;
        }
    }
    v.max(0.0)
}

fn basis_value(table: &[(Float, Float)], lambda: Float) -> Float {
    SpectrumWavelengths::interp_bracket(table, lambda)
}

#[rustfmt::skip]
const BASIS_WHITE: &[(Float, Float)] = &[
    (380.0, 1.0000), (417.0, 1.0000), (455.0, 0.9999), (493.0, 0.9993),
    (532.0, 0.9992), (570.0, 0.9998), (608.0, 1.0000), (647.0, 1.0000),
    (685.0, 1.0000), (720.0, 1.0000),
];
#[rustfmt::skip]
const BASIS_CYAN: &[(Float, Float)] = &[
    (380.0, 0.9710), (417.0, 0.9426), (455.0, 1.0007), (493.0, 1.0007),
    (532.0, 1.0007), (570.0, 1.0007), (608.0, 0.1564), (647.0, 0.0000),
    (685.0, 0.0000), (720.0, 0.0000),
];
#[rustfmt::skip]
const BASIS_MAGENTA: &[(Float, Float)] = &[
    (380.0, 1.0000), (417.0, 1.0000), (455.0, 0.9685), (493.0, 0.2229),
    (532.0, 0.0000), (570.0, 0.0458), (608.0, 0.8369), (647.0, 1.0000),
    (685.0, 1.0000), (720.0, 0.9959),
];
#[rustfmt::skip]
const BASIS_YELLOW: &[(Float, Float)] = &[
    (380.0, 0.0001), (417.0, 0.0000), (455.0, 0.1088), (493.0, 0.6651),
    (532.0, 1.0000), (570.0, 1.0000), (608.0, 0.9996), (647.0, 0.9586),
    (685.0, 0.9685), (720.0, 0.9840),
];
#[rustfmt::skip]
const BASIS_RED: &[(Float, Float)] = &[
    (380.0, 0.1012), (417.0, 0.0515), (455.0, 0.0000), (493.0, 0.0000),
    (532.0, 0.0000), (570.0, 0.0000), (608.0, 0.8325), (647.0, 1.0149),
    (685.0, 1.0149), (720.0, 1.0149),
];
#[rustfmt::skip]
const BASIS_GREEN: &[(Float, Float)] = &[
    (380.0, 0.0000), (417.0, 0.0000), (455.0, 0.0273), (493.0, 0.7937),
    (532.0, 1.0000), (570.0, 0.9418), (608.0, 0.1719), (647.0, 0.0000),
    (685.0, 0.0025), (720.0, 0.0011),
];
#[rustfmt::skip]
const BASIS_BLUE: &[(Float, Float)] = &[
    (380.0, 1.0000), (417.0, 1.0000), (455.0, 0.8916), (493.0, 0.3323),
    (532.0, 0.0000), (570.0, 0.0000), (608.0, 0.0003), (647.0, 0.0369),
    (685.0, 0.0483), (720.0, 0.0496),
];

impl Index<usize> for SWCSpectrum {
    type Output = Float;
    fn index(&self, i: usize) -> &Float {
        &self.c[i]
    }
}
impl IndexMut<usize> for SWCSpectrum {
    fn index_mut(&mut self, i: usize) -> &mut Float {
        &mut self.c[i]
    }
}
impl Add for SWCSpectrum {
    type Output = Self;
    fn add(mut self, o: Self) -> Self {
        for i in 0..WAVELENGTH_SAMPLES {
            self.c[i] += o.c[i];
        }
        self
    }
}
impl AddAssign for SWCSpectrum {
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}
impl Sub for SWCSpectrum {
    type Output = Self;
    fn sub(mut self, o: Self) -> Self {
        for i in 0..WAVELENGTH_SAMPLES {
            self.c[i] -= o.c[i];
        }
        self
    }
}
impl SubAssign for SWCSpectrum {
    fn sub_assign(&mut self, o: Self) {
        *self = *self - o;
    }
}
impl Mul for SWCSpectrum {
    type Output = Self;
    fn mul(mut self, o: Self) -> Self {
        for i in 0..WAVELENGTH_SAMPLES {
            self.c[i] *= o.c[i];
        }
        self
    }
}
impl Mul<Float> for SWCSpectrum {
    type Output = Self;
    fn mul(mut self, s: Float) -> Self {
        for v in self.c.iter_mut() {
            *v *= s;
        }
        self
    }
}
impl MulAssign<Float> for SWCSpectrum {
    fn mul_assign(&mut self, s: Float) {
        *self = *self * s;
    }
}
impl MulAssign for SWCSpectrum {
    fn mul_assign(&mut self, o: Self) {
        *self = *self * o;
    }
}
impl Div<Float> for SWCSpectrum {
    type Output = Self;
    fn div(mut self, s: Float) -> Self {
        let inv = 1.0 / s;
        for v in self.c.iter_mut() {
            *v *= inv;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_is_black() {
        assert!(SWCSpectrum::BLACK.is_black());
        assert_eq!(SWCSpectrum::BLACK.filter(), 0.0);
    }

    #[test]
    fn component_count_matches_wavelength_samples() {
        let s = SWCSpectrum::splat(1.0);
        for i in 0..WAVELENGTH_SAMPLES {
            assert_eq!(s[i], 1.0);
        }
    }

    #[test]
    fn subtraction_is_true_subtraction_not_division() {
        // Design note: `SpectrumGroup::operator-=(float)` in the source divides
        // instead of subtracting; specified here as true per-channel subtraction.
        let a = SWCSpectrum::splat(3.0);
        let b = SWCSpectrum::splat(1.0);
        assert_eq!((a - b).filter(), 2.0);
    }
}
