//! Absorption-only (Beer-Lambert) volume: no scattering lobe.

use super::{ArcTexture, Volume};
use crate::event::BSDFEvent;
use crate::geometry::{Ray, Vector3f};
use crate::pbrt::Float;
use crate::spectrum::SWCSpectrum;

pub struct ClearVolume {
    priority: i32,
    sigma_a: ArcTexture,
    emission: Option<ArcTexture>,
}

impl ClearVolume {
    pub fn new(priority: i32, sigma_a: ArcTexture, emission: Option<ArcTexture>) -> Self {
        Self { priority, sigma_a, emission }
    }
}

impl Volume for ClearVolume {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn sigma_a(&self) -> SWCSpectrum {
        self.sigma_a.eval().clamp(0.0, Float::INFINITY)
    }

    fn sigma_s(&self) -> SWCSpectrum {
        SWCSpectrum::BLACK
    }

    fn emission(&self) -> Option<SWCSpectrum> {
        self.emission.as_ref().map(|t| t.eval())
    }

    fn scatter(
        &self,
        ray: &Ray,
        _u: Float,
        _scattered_start: bool,
        throughput: &mut SWCSpectrum,
        connection_emission: &mut SWCSpectrum,
    ) -> Float {
        let distance = ray.maxt - ray.mint;
        let sigma = self.sigma_t();
        if !sigma.is_black() {
            let tau = (sigma * distance).clamp(0.0, Float::INFINITY);
            *throughput *= tau.exp_neg();
        }
        if let Some(e) = self.emission() {
            *connection_emission += *throughput * e * distance;
        }
        -1.0
    }

    fn phase_evaluate(&self, _local_light_dir: &Vector3f, _local_eye_dir: &Vector3f) -> Option<(SWCSpectrum, Float, Float)> {
        None
    }

    fn phase_sample(&self, _local_fixed_dir: &Vector3f, _u0: Float, _u1: Float) -> Option<(SWCSpectrum, Vector3f, Float, Float, BSDFEvent)> {
        None
    }
}

trait ExpNeg {
    fn exp_neg(self) -> Self;
}
impl ExpNeg for SWCSpectrum {
    fn exp_neg(self) -> Self {
        (self * -1.0).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point3f, Vector3f as V3};
    use crate::volume::constant;

    #[test]
    fn sigma_s_zero_means_no_scatter_and_beer_lambert_absorption() {
        let vol = ClearVolume::new(0, constant(SWCSpectrum::splat(0.5)), None);
        let ray = Ray::new(Point3f::ZERO, V3::new(0.0, 0.0, 1.0), 2.0, 0.0, None);
        let mut throughput = SWCSpectrum::splat(1.0);
        let mut emission = SWCSpectrum::BLACK;
        let d = vol.scatter(&ray, 0.5, false, &mut throughput, &mut emission);
        assert_eq!(d, -1.0);
        assert!((throughput.filter() - (-1.0f32).exp()).abs() < 1e-5);
    }
}
