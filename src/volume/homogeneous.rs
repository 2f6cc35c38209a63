//! Constant absorption/scattering/asymmetry volume.

use super::{schlick_scatter, ArcTexture, Volume};
use crate::event::BSDFEvent;
use crate::geometry::{Ray, Vector3f};
use crate::pbrt::Float;
use crate::spectrum::SWCSpectrum;

pub struct HomogeneousVolume {
    priority: i32,
    sigma_a: ArcTexture,
    sigma_s: ArcTexture,
    g: ArcTexture,
    emission: Option<ArcTexture>,
    /// Whether a medium vertex may itself re-scatter (`scatteredStart`
    /// guard in §4.E).
    multi_scattering: bool,
}

impl HomogeneousVolume {
    pub fn new(priority: i32, sigma_a: ArcTexture, sigma_s: ArcTexture, g: ArcTexture, emission: Option<ArcTexture>, multi_scattering: bool) -> Self {
        Self {
            priority,
            sigma_a,
            sigma_s,
            g,
            emission,
            multi_scattering,
        }
    }
}

impl Volume for HomogeneousVolume {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn sigma_a(&self) -> SWCSpectrum {
        self.sigma_a.eval().clamp(0.0, Float::INFINITY)
    }

    fn sigma_s(&self) -> SWCSpectrum {
        self.sigma_s.eval().clamp(0.0, Float::INFINITY)
    }

    fn emission(&self) -> Option<SWCSpectrum> {
        self.emission.as_ref().map(|t| t.eval())
    }

    fn scatter(
        &self,
        ray: &Ray,
        u: Float,
        scattered_start: bool,
        throughput: &mut SWCSpectrum,
        connection_emission: &mut SWCSpectrum,
    ) -> Float {
        let max_distance = ray.maxt - ray.mint;
        let scatter_allowed = !scattered_start || self.multi_scattering;

        let k = self.sigma_s().filter();
        let mut scatter = false;
        let mut distance = max_distance;

        if scatter_allowed && k > 0.0 {
            let scatter_distance = -(1.0 - u).ln() / k;
            scatter = scatter_distance < max_distance;
            distance = if scatter { scatter_distance } else { max_distance };

            let pdf = (-distance * k).exp() * if scatter { k } else { 1.0 };
            *throughput *= 1.0 / pdf;
        }

        let sigma_t = self.sigma_t();
        if !sigma_t.is_black() {
            let tau = (sigma_t * distance).clamp(0.0, Float::INFINITY);
            let transmittance = (tau * -1.0).exp();
            *throughput *= transmittance * if scatter { sigma_t } else { SWCSpectrum::splat(1.0) };
        }

        if let Some(e) = self.emission() {
            *connection_emission += *throughput * e * distance;
        }

        if scatter {
            ray.mint + distance
        } else {
            -1.0
        }
    }

    fn phase_evaluate(&self, local_light_dir: &Vector3f, local_eye_dir: &Vector3f) -> Option<(SWCSpectrum, Float, Float)> {
        Some(schlick_scatter::evaluate(self.g.eval().filter(), self.sigma_s(), self.sigma_a(), local_light_dir, local_eye_dir))
    }

    fn phase_sample(&self, local_fixed_dir: &Vector3f, u0: Float, u1: Float) -> Option<(SWCSpectrum, Vector3f, Float, Float, BSDFEvent)> {
        schlick_scatter::sample(self.g.eval().filter(), self.sigma_s(), self.sigma_a(), local_fixed_dir, u0, u1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3f;
    use crate::volume::constant;

    #[test]
    fn pure_absorption_gives_beer_lambert_transmittance() {
        // sigma_a=0.5, sigma_s=0, d=2 => transmittance exp(-1) per §8 scenario 4.
        let vol = HomogeneousVolume::new(0, constant(SWCSpectrum::splat(0.5)), constant(SWCSpectrum::BLACK), constant(SWCSpectrum::BLACK), None, false);
        let ray = Ray::new(Point3f::ZERO, Vector3f::new(0.0, 0.0, 1.0), 2.0, 0.0, None);
        let mut throughput = SWCSpectrum::splat(1.0);
        let mut emission = SWCSpectrum::BLACK;
        let d = vol.scatter(&ray, 0.9, false, &mut throughput, &mut emission);
        assert_eq!(d, -1.0);
        assert!((throughput.filter() - (-1.0f32).exp()).abs() < 1e-4);
    }

    #[test]
    fn zero_scattering_never_scatters() {
        let vol = HomogeneousVolume::new(0, constant(SWCSpectrum::splat(0.1)), constant(SWCSpectrum::BLACK), constant(SWCSpectrum::BLACK), None, false);
        let ray = Ray::new(Point3f::ZERO, Vector3f::new(0.0, 0.0, 1.0), 5.0, 0.0, None);
        let mut throughput = SWCSpectrum::splat(1.0);
        let mut emission = SWCSpectrum::BLACK;
        let d = vol.scatter(&ray, 0.01, false, &mut throughput, &mut emission);
        assert_eq!(d, -1.0);
    }
}
