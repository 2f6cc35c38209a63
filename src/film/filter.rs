//! Pixel reconstruction filters and their precomputed splat LUTs (§4.B).
//!
//! The filter is sampled through a 2D lookup table indexed by sub-pixel
//! offset rather than re-evaluated at every splat — required by GPU
//! back-ends (out of scope here) but worth keeping on CPU too, since it
//! turns a transcendental evaluation into a table lookup.

use crate::pbrt::Float;
use std::f32::consts::PI;

/// Sub-pixel quantization of the LUT along each axis (≥ 4x4 per §4.B).
const LUT_SUBDIV: usize = 8;

pub trait Filter: Send + Sync {
    fn radius(&self) -> (Float, Float);
    fn evaluate(&self, x: Float, y: Float) -> Float;
}

pub struct BoxFilter {
    pub x_width: Float,
    pub y_width: Float,
}
impl Filter for BoxFilter {
    fn radius(&self) -> (Float, Float) {
        (self.x_width, self.y_width)
    }
    fn evaluate(&self, _x: Float, _y: Float) -> Float {
        1.0
    }
}

pub struct GaussianFilter {
    pub x_width: Float,
    pub y_width: Float,
    pub alpha: Float,
    exp_x: Float,
    exp_y: Float,
}
impl GaussianFilter {
    pub fn new(x_width: Float, y_width: Float, alpha: Float) -> Self {
        Self {
            x_width,
            y_width,
            alpha,
            exp_x: (-alpha * x_width * x_width).exp(),
            exp_y: (-alpha * y_width * y_width).exp(),
        }
    }
    fn gaussian(&self, d: Float, expv: Float) -> Float {
        ((-self.alpha * d * d).exp() - expv).max(0.0)
    }
}
impl Filter for GaussianFilter {
    fn radius(&self) -> (Float, Float) {
        (self.x_width, self.y_width)
    }
    fn evaluate(&self, x: Float, y: Float) -> Float {
        self.gaussian(x, self.exp_x) * self.gaussian(y, self.exp_y)
    }
}

pub struct MitchellFilter {
    pub x_width: Float,
    pub y_width: Float,
    pub b: Float,
    pub c: Float,
}
impl MitchellFilter {
    fn mitchell_1d(&self, x: Float) -> Float {
        let x = (2.0 * x).abs();
        let (b, c) = (self.b, self.c);
        if x > 1.0 {
            ((-b - 6.0 * c) * x * x * x + (6.0 * b + 30.0 * c) * x * x + (-12.0 * b - 48.0 * c) * x + (8.0 * b + 24.0 * c)) * (1.0 / 6.0)
        } else {
            ((12.0 - 9.0 * b - 6.0 * c) * x * x * x + (-18.0 + 12.0 * b + 6.0 * c) * x * x + (6.0 - 2.0 * b)) * (1.0 / 6.0)
        }
    }
}
impl Filter for MitchellFilter {
    fn radius(&self) -> (Float, Float) {
        (self.x_width, self.y_width)
    }
    fn evaluate(&self, x: Float, y: Float) -> Float {
        self.mitchell_1d(x / self.x_width) * self.mitchell_1d(y / self.y_width)
    }
}

/// Supersampled variant used by the tile-path sampler's AA grid; shares the
/// same reconstruction kernel as `Mitchell` but with a fixed B=C=1/3 often
/// preferred for AA supersampling.
pub struct MitchellFilterSS {
    inner: MitchellFilter,
}
impl MitchellFilterSS {
    pub fn new(x_width: Float, y_width: Float) -> Self {
        Self {
            inner: MitchellFilter {
                x_width,
                y_width,
                b: 1.0 / 3.0,
                c: 1.0 / 3.0,
            },
        }
    }
}
impl Filter for MitchellFilterSS {
    fn radius(&self) -> (Float, Float) {
        self.inner.radius()
    }
    fn evaluate(&self, x: Float, y: Float) -> Float {
        self.inner.evaluate(x, y)
    }
}

pub struct BlackmanHarrisFilter {
    pub x_width: Float,
    pub y_width: Float,
}
impl BlackmanHarrisFilter {
    fn window_1d(x: Float, width: Float) -> Float {
        if x.abs() > width {
            return 0.0;
        }
        let t = (x + width) / (2.0 * width);
        const A0: Float = 0.35875;
        const A1: Float = 0.48829;
        const A2: Float = 0.14128;
        const A3: Float = 0.01168;
        A0 - A1 * (2.0 * PI * t).cos() + A2 * (4.0 * PI * t).cos() - A3 * (6.0 * PI * t).cos()
    }
}
impl Filter for BlackmanHarrisFilter {
    fn radius(&self) -> (Float, Float) {
        (self.x_width, self.y_width)
    }
    fn evaluate(&self, x: Float, y: Float) -> Float {
        Self::window_1d(x, self.x_width) * Self::window_1d(y, self.y_width)
    }
}

/// A precomputed 2D table of filter weights indexed by quantized sub-pixel
/// offset, `(dx - floor(x), dy - floor(y))`, covering `[-radius, radius]`
/// at `LUT_SUBDIV` samples per pixel.
#[derive(Clone)]
pub struct FilterLUT {
    table: Vec<Float>,
    width: usize,
    height: usize,
    pub x_radius: Float,
    pub y_radius: Float,
}

impl FilterLUT {
    pub fn build(filter: &dyn Filter) -> Self {
        let (x_radius, y_radius) = filter.radius();
        let width = ((2.0 * x_radius).ceil() as usize * LUT_SUBDIV).max(LUT_SUBDIV);
        let height = ((2.0 * y_radius).ceil() as usize * LUT_SUBDIV).max(LUT_SUBDIV);

        let mut table = vec![0.0; width * height];
        for iy in 0..height {
            let fy = (iy as Float + 0.5) / height as Float * 2.0 * y_radius - y_radius;
            for ix in 0..width {
                let fx = (ix as Float + 0.5) / width as Float * 2.0 * x_radius - x_radius;
                table[iy * width + ix] = filter.evaluate(fx, fy);
            }
        }

        Self {
            table,
            width,
            height,
            x_radius,
            y_radius,
        }
    }

    /// LUT width in pixels, `ceil(filterWidth*2 + 1)`-ish footprint.
    pub fn pixel_width(&self) -> usize {
        self.width / LUT_SUBDIV + 1
    }
    pub fn pixel_height(&self) -> usize {
        self.height / LUT_SUBDIV + 1
    }

    /// Looks up the weight for a fractional offset `(dx, dy)` from the
    /// splat point, already known to lie within the filter's radius.
    pub fn weight(&self, dx: Float, dy: Float) -> Float {
        let ix = (((dx + self.x_radius) / (2.0 * self.x_radius)) * self.width as Float).clamp(0.0, self.width as Float - 1.0) as usize;
        let iy = (((dy + self.y_radius) / (2.0 * self.y_radius)) * self.height as Float).clamp(0.0, self.height as Float - 1.0) as usize;
        self.table[iy * self.width + ix]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_filter_is_constant_within_radius() {
        let f = BoxFilter { x_width: 0.5, y_width: 0.5 };
        assert_eq!(f.evaluate(0.1, 0.1), 1.0);
    }

    #[test]
    fn lut_weight_matches_direct_evaluation_at_center() {
        let f = GaussianFilter::new(2.0, 2.0, 2.0);
        let lut = FilterLUT::build(&f);
        let direct = f.evaluate(0.0, 0.0);
        let looked_up = lut.weight(0.0, 0.0);
        assert!((direct - looked_up).abs() < 0.05);
    }
}
