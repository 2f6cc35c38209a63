//! Schlick's approximation to the Fresnel reflectance, used by
//! `GlossyCoating`'s top lobe.

use crate::pbrt::Float;
use crate::spectrum::SWCSpectrum;

/// `S = Ks + (1-Ks)(1-cosθ)^5`, clamped to `[0,1]` per channel.
pub fn schlick_fresnel(ks: SWCSpectrum, cos_theta: Float) -> SWCSpectrum {
    let one_minus_cos = (1.0 - cos_theta.abs()).clamp(0.0, 1.0);
    let weight = one_minus_cos.powi(5);
    (ks + (SWCSpectrum::splat(1.0) - ks) * weight).clamp(0.0, 1.0)
}

/// Scalar Fresnel weight at normal-incidence reflectance `ks` — used when
/// the coating-vs-base selection probability only needs a filter value
/// rather than a full spectrum.
pub fn schlick_weight(ks_filter: Float, cos_theta: Float) -> Float {
    let one_minus_cos = (1.0 - cos_theta.abs()).clamp(0.0, 1.0);
    (ks_filter + (1.0 - ks_filter) * one_minus_cos.powi(5)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grazing_angle_approaches_full_reflectance() {
        let w = schlick_weight(0.04, 0.02);
        assert!(w > 0.5);
    }

    #[test]
    fn normal_incidence_returns_base_reflectance() {
        let w = schlick_weight(0.04, 1.0);
        assert!((w - 0.04).abs() < 1e-6);
    }
}
