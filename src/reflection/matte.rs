//! Perfect Lambertian reflectance — the BSDF used by the end-to-end test
//! scenarios in §8 (a ground plane with uniform white reflectance).

use super::{abs_cos_theta, same_hemisphere, BSDFSample, BSDF};
use crate::event::BSDFEvent;
use crate::geometry::Vector3f;
use crate::pbrt::Float;
use crate::spectrum::SWCSpectrum;
use std::f32::consts::PI;

pub struct Matte {
    reflectance: SWCSpectrum,
}

impl Matte {
    pub fn new(reflectance: SWCSpectrum) -> Self {
        Self { reflectance }
    }

    fn cosine_sample_hemisphere(u0: Float, u1: Float) -> (Float, Float, Float) {
        let r = u0.sqrt();
        let theta = 2.0 * PI * u1;
        let x = r * theta.cos();
        let y = r * theta.sin();
        let z = (1.0 - u0).max(0.0).sqrt();
        (x, y, z)
    }
}

impl BSDF for Matte {
    fn evaluate(&self, wi_local: &Vector3f, wo_local: &Vector3f) -> (SWCSpectrum, Float, Float, BSDFEvent) {
        if !same_hemisphere(wi_local, wo_local) {
            return (SWCSpectrum::BLACK, 0.0, 0.0, BSDFEvent::empty());
        }
        let f = self.reflectance * (1.0 / PI);
        let pdf = abs_cos_theta(wi_local) / PI;
        (f, pdf, pdf, BSDFEvent::DIFFUSE | BSDFEvent::REFLECT)
    }

    fn sample(&self, wo_local: &Vector3f, u0: Float, u1: Float, _u_pt: Float) -> Option<BSDFSample> {
        let (x, y, mut z) = Self::cosine_sample_hemisphere(u0, u1);
        if wo_local.z < 0.0 {
            z = -z;
        }
        let wi_local = Vector3f::new(x, y, z);
        let pdf = abs_cos_theta(&wi_local) / PI;
        if pdf <= 0.0 {
            return None;
        }
        Some(BSDFSample {
            f: self.reflectance * (1.0 / PI),
            wi_local,
            pdf_w: pdf,
            event: BSDFEvent::DIFFUSE | BSDFEvent::REFLECT,
        })
    }

    fn pdf(&self, wi_local: &Vector3f, wo_local: &Vector3f) -> (Float, Float) {
        if !same_hemisphere(wi_local, wo_local) {
            return (0.0, 0.0);
        }
        let pdf = abs_cos_theta(wi_local) / PI;
        (pdf, pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lambertian_reflectance_matches_one_over_pi_for_white() {
        let m = Matte::new(SWCSpectrum::splat(1.0));
        let wi = Vector3f::new(0.0, 0.0, 1.0);
        let wo = Vector3f::new(0.0, 0.0, 1.0);
        let (f, pdf, _, event) = m.evaluate(&wi, &wo);
        assert!((f.filter() - 1.0 / PI).abs() < 1e-6);
        assert!(pdf > 0.0);
        assert!(event.contains(BSDFEvent::DIFFUSE));
    }

    #[test]
    fn opposite_hemisphere_is_black() {
        let m = Matte::new(SWCSpectrum::splat(1.0));
        let wi = Vector3f::new(0.0, 0.0, 1.0);
        let wo = Vector3f::new(0.0, 0.0, -1.0);
        let (f, pdf, _, _) = m.evaluate(&wi, &wo);
        assert!(f.is_black());
        assert_eq!(pdf, 0.0);
    }
}
