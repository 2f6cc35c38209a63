//! Scalar type aliases and small numeric helpers.

/// Floating point type used throughout the renderer.
pub type Float = f32;

/// Integer type used for counts that mirror the original `u_int`.
pub type Int = i32;

/// Positive infinity for [`Float`].
pub const INFINITY: Float = Float::INFINITY;

/// Machine epsilon for [`Float`].
pub const MACHINE_EPSILON: Float = Float::EPSILON * 0.5;

/// Epsilon used to offset shadow ray origins/`maxt` to avoid self-intersection.
pub const SHADOW_EPSILON: Float = 1e-4;

/// Number of stratified wavelength samples drawn per path (§3 "Wavelength sample set").
pub const WAVELENGTH_SAMPLES: usize = 4;

/// Start of the visible spectrum sampled, in nm.
pub const WAVELENGTH_START: Float = 380.0;

/// End of the visible spectrum sampled, in nm.
pub const WAVELENGTH_END: Float = 720.0;

/// Linearly interpolates between `a` and `b` by `t`.
pub fn lerp(t: Float, a: Float, b: Float) -> Float {
    (1.0 - t) * a + t * b
}

/// Returns `x` clamped to `[low, high]`.
pub fn clamp(x: Float, low: Float, high: Float) -> Float {
    if x < low {
        low
    } else if x > high {
        high
    } else {
        x
    }
}

/// Returns the smaller of `a` and `b`, treating NaN as not smaller.
pub fn min(a: Float, b: Float) -> Float {
    if a < b {
        a
    } else {
        b
    }
}

/// Returns the larger of `a` and `b`, treating NaN as not larger.
pub fn max(a: Float, b: Float) -> Float {
    if a > b {
        a
    } else {
        b
    }
}

/// Solves `a*t^2 + b*t + c = 0`, returning the two roots in ascending order.
pub fn quadratic(a: Float, b: Float, c: Float) -> Option<(Float, Float)> {
    let discrim = (b as f64) * (b as f64) - 4.0 * (a as f64) * (c as f64);
    if discrim < 0.0 {
        return None;
    }
    let root_discrim = discrim.sqrt();
    let q = if b < 0.0 {
        -0.5 * (b as f64 - root_discrim)
    } else {
        -0.5 * (b as f64 + root_discrim)
    };
    let mut t0 = (q / a as f64) as Float;
    let mut t1 = (c as f64 / q) as Float;
    if t0 > t1 {
        std::mem::swap(&mut t0, &mut t1);
    }
    Some((t0, t1))
}

/// Power heuristic for multiple importance sampling with `beta = 2`.
///
/// * `nf` - Number of samples taken with pdf `f_pdf`.
/// * `f_pdf` - Pdf of the strategy being weighted.
/// * `ng` - Number of samples taken with pdf `g_pdf`.
/// * `g_pdf` - Pdf of the other strategy.
pub fn power_heuristic(nf: u32, f_pdf: Float, ng: u32, g_pdf: Float) -> Float {
    let f = nf as Float * f_pdf;
    let g = ng as Float * g_pdf;
    if !(f * f + g * g > 0.0) {
        return 0.0;
    }
    (f * f) / (f * f + g * g)
}

/// Converts a solid-angle pdf to an area pdf.
///
/// * `pdf_w` - Pdf with respect to solid angle.
/// * `d` - Distance between the two points.
/// * `cos_theta` - Cosine of the angle at the receiving point.
pub fn pdf_w_to_a(pdf_w: Float, d: Float, cos_theta: Float) -> Float {
    if d <= 0.0 {
        return 0.0;
    }
    pdf_w * cos_theta.abs() / (d * d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_roots_ascending() {
        let (t0, t1) = quadratic(1.0, -3.0, 2.0).unwrap();
        assert!(t0 <= t1);
        assert!((t0 - 1.0).abs() < 1e-5 || (t0 - 2.0).abs() < 1e-5);
    }

    #[test]
    fn power_heuristic_matches_single_strategy() {
        let w = power_heuristic(1, 1.0, 0, 0.0);
        assert!((w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn pdf_w_to_a_zero_distance_is_zero() {
        assert_eq!(pdf_w_to_a(1.0, 0.0, 1.0), 0.0);
    }
}
