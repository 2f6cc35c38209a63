//! The unidirectional path tracer (§4.F): eye-path construction with
//! MIS-weighted direct lighting, Russian roulette and variance clamping.
//! Holds no mutable state outside its argument stack, its `Sampler` and
//! its `PathVolumeInfo` (§5 concurrency model) — `render_sample` is safe
//! to call concurrently from many worker threads against the same
//! `Scene`, `Film` and `PathTracer`.

use super::{PathDepthCaps, PathDepthInfo, SampleResult};
use crate::camera::Camera;
use crate::event::BSDFEvent;
use crate::film::Film;
use crate::geometry::Frame;
use crate::pbrt::{power_heuristic, Float};
use crate::reflection::abs_cos_theta;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::{ColorSystem, SWCSpectrum, SpectrumWavelengths};
use crate::volume::PathVolumeInfo;

#[derive(Copy, Clone, Debug)]
pub struct PathTracerConfig {
    pub max_depth: PathDepthCaps,
    pub rr_depth: u32,
    pub rr_importance_cap: Float,
    /// `path.clamping.variance.maxvalue`; `0` disables clamping (§6).
    pub sqrt_variance_clamp_max_value: Float,
    pub force_black_background: bool,
}

impl Default for PathTracerConfig {
    fn default() -> Self {
        Self {
            max_depth: PathDepthCaps::default(),
            rr_depth: 3,
            rr_importance_cap: 1.0,
            sqrt_variance_clamp_max_value: 0.0,
            force_black_background: false,
        }
    }
}

pub struct PathTracer {
    pub config: PathTracerConfig,
}

impl PathTracer {
    pub fn new(config: PathTracerConfig) -> Self {
        Self { config }
    }

    /// Renders one sample for the pixel at `(px, py)`, fractionally
    /// jittered by `(jitter_x, jitter_y)` within the pixel. `film` is
    /// consulted read-only for the current per-pixel estimate used by
    /// variance clamping (§4.F step 3); the caller performs the actual
    /// splat under whatever locking discipline the engine has chosen
    /// (§5 "Shared resources").
    #[allow(clippy::too_many_arguments)]
    pub fn render_sample(
        &self,
        px: u32,
        py: u32,
        jitter_x: Float,
        jitter_y: Float,
        sampler: &mut dyn Sampler,
        scene: &dyn Scene,
        camera: &dyn Camera,
        film: &Film,
        cs: &ColorSystem,
        num_groups: usize,
    ) -> SampleResult {
        let film_x = px as Float + jitter_x;
        let film_y = py as Float + jitter_y;

        let sw = SpectrumWavelengths::sample(sampler.get_sample(0));
        let u_lens_x = sampler.get_sample(1);
        let u_lens_y = sampler.get_sample(2);
        let u_time = sampler.get_sample(3);

        let mut vol_info = PathVolumeInfo::new();
        let mut ray = camera.generate_ray(film_x, film_y, &vol_info, u_lens_x, u_lens_y, u_time);

        let mut result = SampleResult::new(film_x, film_y, num_groups);
        let mut throughput = SWCSpectrum::splat(1.0);
        let mut depth_info = PathDepthInfo::new();
        let mut last_bsdf_event = BSDFEvent::SPECULAR;
        let mut last_pdf_w: Float = 1.0;
        let mut dim = 4;

        loop {
            let u_passthrough = sampler.get_sample(dim);
            dim += 1;

            let mut connection_throughput = SWCSpectrum::splat(1.0);
            let hit = scene.intersect(
                &mut ray,
                false,
                false,
                u_passthrough,
                &mut vol_info,
                &throughput,
                &mut connection_throughput,
                Some(&mut result),
                &sw,
            );
            throughput *= connection_throughput;

            let Some(scene_hit) = hit else {
                if !self.config.force_black_background {
                    for light in scene.infinite_lights() {
                        if let Some((le, direct_pdf_w, _emission_pdf_w)) = light.get_radiance(&ray.d, None) {
                            let weight = if last_bsdf_event.is_specular() {
                                1.0
                            } else {
                                let pick_pdf = scene.light_strategy().sample_light_pdf(light);
                                power_heuristic(1, last_pdf_w, 1, direct_pdf_w * pick_pdf)
                            };
                            let radiance = throughput * le * weight;
                            add_spectrum(&mut result, 0, &radiance, &sw, cs);
                        }
                    }
                }
                if result.first_path_vertex {
                    result.alpha = Some(0.0);
                }
                break;
            };

            result.first_path_vertex = false;
            let bsdf = scene_hit.bsdf;
            let hit_point = &scene_hit.interaction.hit;
            let frame = Frame::from_normal(&hit_point.n);
            let wo_local = frame.to_local(&hit_point.wo).normalize();

            if bsdf.is_light_source() {
                if let Some(emitted) = bsdf.get_emitted_radiance() {
                    let weight = match (&scene_hit.light, last_bsdf_event.is_specular()) {
                        (_, true) => 1.0,
                        (Some(light), false) => {
                            let pick_pdf = scene.light_strategy().sample_light_pdf(light);
                            let direct_pdf_w = light.get_radiance(&ray.d, Some(&hit_point.p)).map(|(_, d, _)| d).unwrap_or(0.0);
                            power_heuristic(1, last_pdf_w, 1, direct_pdf_w * pick_pdf)
                        }
                        (None, false) => 1.0,
                    };
                    let radiance = throughput * emitted * weight;
                    add_spectrum(&mut result, 0, &radiance, &sw, cs);
                }
                break;
            }

            if !bsdf.is_delta() {
                if let Some((light, pick_pdf)) = scene.light_strategy().sample_lights(sampler.get_sample(dim)) {
                    dim += 1;
                    let u0 = sampler.get_sample(dim);
                    let u1 = sampler.get_sample(dim + 1);
                    let u2 = sampler.get_sample(dim + 2);
                    dim += 3;
                    if let Some(illum) = light.illuminate(&hit_point.p, u0, u1, u2) {
                        let wi_local = frame.to_local(&illum.dir).normalize();
                        let (f, bsdf_pdf_w, _rev_pdf_w, _event) = bsdf.evaluate(&wi_local, &wo_local);
                        if !f.is_black() && bsdf_pdf_w > 0.0 {
                            let to_point = hit_point.p + illum.dir * illum.distance;
                            if let Some(transmittance) = scene.visibility(hit_point, to_point, &vol_info, &sw) {
                                let weight = power_heuristic(1, pick_pdf * illum.direct_pdf_w, 1, bsdf_pdf_w);
                                let cos = abs_cos_theta(&wi_local);
                                let contribution =
                                    throughput * f * transmittance * illum.le * (weight * cos / (pick_pdf * illum.direct_pdf_w));
                                add_spectrum(&mut result, 0, &contribution, &sw, cs);
                            }
                        }
                    }
                }
            }

            let u0 = sampler.get_sample(dim);
            let u1 = sampler.get_sample(dim + 1);
            let u_pt = sampler.get_sample(dim + 2);
            dim += 3;
            let Some(sample) = bsdf.sample(&wo_local, u0, u1, u_pt) else {
                break;
            };
            if sample.pdf_w <= 0.0 || sample.f.is_black() {
                break;
            }

            let cos = abs_cos_theta(&sample.wi_local);
            throughput *= sample.f * (cos / sample.pdf_w);
            last_pdf_w = sample.pdf_w;
            last_bsdf_event = sample.event;

            if depth_info.total >= self.config.rr_depth {
                let prob = self.config.rr_importance_cap.min(throughput.max_component());
                let u_rr = sampler.get_sample(dim);
                dim += 1;
                if u_rr >= prob || prob <= 0.0 {
                    break;
                }
                throughput *= 1.0 / prob;
            }

            depth_info.increment(sample.event);
            if depth_info.exceeds(&self.config.max_depth) {
                break;
            }

            let wi_world = frame.to_world(&sample.wi_local).normalize();
            let into_object = wi_world.dot(&crate::geometry::Vector3f::from(hit_point.n)) < 0.0;
            vol_info.update(sample.event, false, into_object, bsdf.interior_volume());
            ray = hit_point.spawn_ray(&wi_world);
        }

        if self.config.sqrt_variance_clamp_max_value > 0.0 {
            let cap = self.config.sqrt_variance_clamp_max_value;
            let mean = film.get_output_pixel(px as usize, py as usize, 0);
            for c in result.radiance_per_group.iter_mut() {
                c.r = super::clamp_variance(c.r, mean.r, cap);
                c.g = super::clamp_variance(c.g, mean.g, cap);
                c.b = super::clamp_variance(c.b, mean.b, cap);
            }
        }

        if !result.is_finite() {
            // Math-singularity class (§7): drop the contribution entirely
            // rather than splat a NaN/Inf radiance.
            log::error!("non-finite radiance at ({px}, {py}); dropping sample contribution");
            for c in result.radiance_per_group.iter_mut() {
                *c = crate::spectrum::RGBColor::BLACK;
            }
        }

        result.last_path_vertex = true;
        result
    }
}

fn add_spectrum(result: &mut SampleResult, group: usize, s: &SWCSpectrum, sw: &SpectrumWavelengths, cs: &ColorSystem) {
    let rgb = cs.to_rgb(&s.to_xyz(sw));
    result.add_radiance(group, rgb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_have_sane_rr_cap() {
        let cfg = PathTracerConfig::default();
        assert!(cfg.rr_importance_cap > 0.0 && cfg.rr_importance_cap <= 1.0);
    }
}
