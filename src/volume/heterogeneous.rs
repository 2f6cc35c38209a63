//! Heterogeneous volume: same parameters as [`super::HomogeneousVolume`] but
//! ray-marched in steps, with trapezoidal-rule accumulation of optical
//! depth and emission (§4.E). Spatial variation of the underlying
//! absorption/scattering textures is out of scope for the core engine (see
//! [`super::VolumeTexture`]); the step loop itself still follows the
//! original stepping/scatter-search algorithm so a spatially varying
//! texture can be dropped in without touching `Scatter`.

use super::{schlick_scatter, ArcTexture, Volume};
use crate::event::BSDFEvent;
use crate::geometry::{Ray, Vector3f};
use crate::pbrt::Float;
use crate::spectrum::SWCSpectrum;

pub struct HeterogeneousVolume {
    priority: i32,
    sigma_a: ArcTexture,
    sigma_s: ArcTexture,
    g: ArcTexture,
    emission: Option<ArcTexture>,
    step_size: Float,
    max_steps_count: u32,
    multi_scattering: bool,
}

impl HeterogeneousVolume {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        priority: i32,
        sigma_a: ArcTexture,
        sigma_s: ArcTexture,
        g: ArcTexture,
        emission: Option<ArcTexture>,
        step_size: Float,
        max_steps_count: u32,
        multi_scattering: bool,
    ) -> Self {
        Self {
            priority,
            sigma_a,
            sigma_s,
            g,
            emission,
            step_size,
            max_steps_count,
            multi_scattering,
        }
    }
}

impl Volume for HeterogeneousVolume {
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
        initial_u: Float,
        scattered_start: bool,
        throughput: &mut SWCSpectrum,
        connection_emission: &mut SWCSpectrum,
    ) -> Float {
        let ray_len = ray.maxt - ray.mint;

        let (steps, ss) = if ray_len.is_infinite() {
            (self.max_steps_count, self.step_size)
        } else {
            let fsteps = ray_len / self.step_size.max(1e-7);
            let steps = if fsteps >= self.max_steps_count as Float {
                self.max_steps_count
            } else {
                fsteps.ceil() as u32
            };
            (steps.max(1), ray_len / steps.max(1) as Float)
        };
        let total_distance = ss * steps as Float;

        let scatter_allowed = !scattered_start || self.multi_scattering;

        let sigma_s_value = self.sigma_s().filter();
        let mut old_sigma_s = sigma_s_value;
        let mut u = initial_u;
        let mut scatter_distance = total_distance;
        let mut t = -1.0;
        let mut pdf = 1.0;

        if scatter_allowed {
            for s in 1..=steps {
                let new_sigma_s = sigma_s_value;
                let half_way_sigma_s = (old_sigma_s + new_sigma_s) * 0.5;
                old_sigma_s = new_sigma_s;

                if half_way_sigma_s <= 0.0 {
                    continue;
                }

                let d = (1.0 - u).ln() / half_way_sigma_s;
                let scatter = d > (s as Float - 1.0) * ss - total_distance;
                if !scatter {
                    pdf *= (-ss * half_way_sigma_s).exp();
                    u -= (1.0 - u) * ((old_sigma_s * ss).exp() - 1.0);
                    continue;
                }

                scatter_distance = (s as Float - 1.0) * ss - d;
                t = ray.mint + scatter_distance;
                pdf *= (d * half_way_sigma_s).exp() * old_sigma_s;
                break;
            }
        }

        let sigma_t = self.sigma_t();
        let integ_steps = (scatter_distance / self.step_size.max(1e-7)).ceil().max(1.0) as u32;
        let integ_ss = scatter_distance / integ_steps as Float;

        let mut tau = SWCSpectrum::BLACK;
        let mut emission_accum = SWCSpectrum::BLACK;
        let mut old_sigma_t = sigma_t;
        for _ in 1..=integ_steps {
            let new_sigma_t = sigma_t;
            let half_way_sigma_t = (old_sigma_t + new_sigma_t) * 0.5;
            tau += (half_way_sigma_t * integ_ss).clamp(0.0, Float::INFINITY);
            old_sigma_t = new_sigma_t;

            if let Some(e) = self.emission() {
                emission_accum += (tau * -1.0).exp() * (e * integ_ss);
            }
        }

        let transmittance = (tau * -1.0).exp();
        *throughput *= transmittance * (1.0 / pdf);
        *connection_emission += *throughput * emission_accum;

        t
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
    fn zero_scattering_reduces_to_absorption_only() {
        let vol = HeterogeneousVolume::new(
            0,
            constant(SWCSpectrum::splat(0.5)),
            constant(SWCSpectrum::BLACK),
            constant(SWCSpectrum::BLACK),
            None,
            0.25,
            64,
            false,
        );
        let ray = Ray::new(Point3f::ZERO, Vector3f::new(0.0, 0.0, 1.0), 2.0, 0.0, None);
        let mut throughput = SWCSpectrum::splat(1.0);
        let mut emission = SWCSpectrum::BLACK;
        let d = vol.scatter(&ray, 0.9, false, &mut throughput, &mut emission);
        assert_eq!(d, -1.0);
        assert!((throughput.filter() - (-1.0f32).exp()).abs() < 1e-3);
    }
}
