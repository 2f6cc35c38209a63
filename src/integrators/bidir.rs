//! The bidirectional path tracer (§4.G): a light subpath connected to the
//! eye at every non-specular vertex, an eye subpath built as in §4.F but
//! tracking the `d0`/`d1vc` area-pdf quantities needed for full
//! balance-heuristic MIS between every light-vertex/eye-vertex pair.

use super::{PathDepthCaps, PathDepthInfo, SampleResult};
use crate::camera::Camera;
use crate::event::BSDFEvent;
use crate::geometry::{Frame, Hit, Vector3f};
use crate::pbrt::{pdf_w_to_a, Float};
use crate::reflection::{abs_cos_theta, ArcBSDF};
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::{ColorSystem, RGBColor, SWCSpectrum, SpectrumWavelengths};
use crate::volume::PathVolumeInfo;

#[derive(Copy, Clone, Debug)]
pub struct BidirConfig {
    pub max_eye_path_depth: PathDepthCaps,
    pub max_light_path_depth: PathDepthCaps,
    pub rr_depth: u32,
    pub rr_importance_cap: Float,
}

impl Default for BidirConfig {
    fn default() -> Self {
        Self {
            max_eye_path_depth: PathDepthCaps::default(),
            max_light_path_depth: PathDepthCaps::default(),
            rr_depth: 3,
            rr_importance_cap: 1.0,
        }
    }
}

/// A stored subpath vertex, in area-pdf form (§4.G). `d0` corresponds to
/// the source's `dVCM`, `d1vc` to `dVC`; both are carried forward as the
/// subpath is extended so a connection to any other subpath's vertex can
/// compute the full balance-heuristic weight without re-walking the path.
struct Vertex {
    hit: Hit,
    frame: Frame,
    bsdf: ArcBSDF,
    /// Fixed (incoming, i.e. toward the predecessor) direction in world
    /// space at this vertex.
    wo_world: Vector3f,
    throughput: SWCSpectrum,
    d0: Float,
    d1vc: Float,
    is_delta: bool,
}

/// A light-subpath-to-eye (or vertex-to-vertex) connection that lands
/// away from the eye path's own pixel; splatted into the film's
/// `RADIANCE_PER_SCREEN_NORMALIZED` bucket rather than the per-pixel one.
pub struct AdditionalSplat {
    pub film_x: Float,
    pub film_y: Float,
    pub radiance: RGBColor,
}

pub struct BidirPathTracer {
    pub config: BidirConfig,
}

impl BidirPathTracer {
    pub fn new(config: BidirConfig) -> Self {
        Self { config }
    }

    /// Renders one sample: builds a light subpath and an eye subpath,
    /// connecting the eye path's own vertices to every stored light
    /// vertex (§4.G `ConnectVertices`) and connecting every light vertex
    /// directly to the eye/lens (§4.G "connection-to-eye"). Returns the
    /// eye path's own per-pixel `SampleResult` plus any additional
    /// screen-normalized splats produced by light-subpath-to-eye
    /// connections.
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
        cs: &ColorSystem,
        pixel_count: usize,
        num_groups: usize,
    ) -> (SampleResult, Vec<AdditionalSplat>) {
        let sw = SpectrumWavelengths::sample(sampler.get_sample(0));
        let mut dim = 1;
        let mut additional = Vec::new();

        let light_path = self.build_light_path(sampler, scene, camera, cs, pixel_count, &sw, &mut dim, &mut additional);

        let film_x = px as Float + jitter_x;
        let film_y = py as Float + jitter_y;
        let result = self.build_eye_path(film_x, film_y, sampler, scene, camera, cs, num_groups, &sw, &mut dim, &light_path);

        (result, additional)
    }

    /// Samples emission from a light, walks `<= max_light_path_depth`
    /// vertices, and at every non-specular vertex attempts a connection
    /// back to the lens (§4.G "Light subpath"). Returns the stored
    /// vertices for later connection from the eye subpath.
    #[allow(clippy::too_many_arguments)]
    fn build_light_path(
        &self,
        sampler: &mut dyn Sampler,
        scene: &dyn Scene,
        camera: &dyn Camera,
        cs: &ColorSystem,
        pixel_count: usize,
        sw: &SpectrumWavelengths,
        dim: &mut usize,
        additional: &mut Vec<AdditionalSplat>,
    ) -> Vec<Vertex> {
        let mut vertices = Vec::new();

        let Some((light, pick_pdf)) = scene.light_strategy().sample_lights(next(sampler, dim)) else {
            return vertices;
        };
        let Some(emit) = light.emit(next(sampler, dim), next(sampler, dim), next(sampler, dim), next(sampler, dim), next(sampler, dim)) else {
            return vertices;
        };
        if emit.emit_pdf_w <= 0.0 || emit.le.is_black() {
            return vertices;
        }

        let mut ray = emit.ray;
        let mut throughput = emit.le * (emit.cos_at_light / (pick_pdf * emit.emit_pdf_w));
        // d0: dVCM, the MIS bookkeeping term relating this vertex's pdf
        // back to the light-selection pdf; d1vc: dVC, relating it to the
        // area-measure emission pdf.
        let mut d0 = emit.direct_pdf_w / emit.emit_pdf_w;
        let mut d1vc = emit.cos_at_light / emit.emit_pdf_w;
        let mut vol_info = PathVolumeInfo::new();
        let mut depth_info = PathDepthInfo::new();

        loop {
            let u_passthrough = next(sampler, dim);
            let mut connection_throughput = SWCSpectrum::splat(1.0);
            let mut dummy_result: Option<SampleResult> = None;
            let hit = scene.intersect(
                &mut ray,
                true,
                false,
                u_passthrough,
                &mut vol_info,
                &throughput,
                &mut connection_throughput,
                dummy_result.as_mut(),
                sw,
            );
            throughput *= connection_throughput;

            let Some(scene_hit) = hit else { break };
            if scene_hit.bsdf.is_light_source() {
                break;
            }

            let hit_point = &scene_hit.interaction.hit;
            let frame = Frame::from_normal(&hit_point.n);
            let is_delta = scene_hit.bsdf.is_delta();

            vertices.push(Vertex {
                hit: hit_point.clone(),
                frame,
                bsdf: scene_hit.bsdf.clone(),
                wo_world: hit_point.wo,
                throughput,
                d0,
                d1vc,
                is_delta,
            });

            if !is_delta {
                self.connect_to_eye(vertices.last().unwrap(), scene, camera, cs, pixel_count, sw, additional);
            }

            if vertices.len() as u32 >= self.config.max_light_path_depth.total {
                break;
            }

            let wo_local = frame.to_local(&hit_point.wo).normalize();
            let Some(sample) = scene_hit.bsdf.sample(&wo_local, next(sampler, dim), next(sampler, dim), next(sampler, dim)) else {
                break;
            };
            if sample.pdf_w <= 0.0 || sample.f.is_black() {
                break;
            }

            let (_f_rev, _pdf_rev_w, rev_pdf_w, _event_rev) = scene_hit.bsdf.evaluate(&wo_local, &sample.wi_local);
            let cos = abs_cos_theta(&sample.wi_local);
            let prev_d0 = d0;
            let prev_d1vc = d1vc;
            d0 = 1.0 / sample.pdf_w;
            d1vc = (cos / sample.pdf_w) * (prev_d1vc * rev_pdf_w + prev_d0);

            throughput *= sample.f * (cos / sample.pdf_w);

            if depth_info.total >= self.config.rr_depth {
                let prob = self.config.rr_importance_cap.min(throughput.max_component());
                if next(sampler, dim) >= prob || prob <= 0.0 {
                    break;
                }
                throughput *= 1.0 / prob;
            }
            depth_info.increment(sample.event);
            if depth_info.exceeds(&self.config.max_light_path_depth) {
                break;
            }

            let wi_world = frame.to_world(&sample.wi_local).normalize();
            let into_object = wi_world.dot(&Vector3f::from(hit_point.n)) < 0.0;
            vol_info.update(sample.event, false, into_object, scene_hit.bsdf.interior_volume());
            ray = hit_point.spawn_ray(&wi_world);
        }

        vertices
    }

    /// Casts a shadow ray from a light-subpath vertex toward a sampled
    /// lens point and, if unoccluded and the projection lands on the
    /// film, splats a screen-normalized sample with MIS weight
    /// `1 / (cameraPdfA/pixelCount . (d0 + d1vc . bsdfRevPdfW) + 1)`.
    fn connect_to_eye(
        &self,
        vertex: &Vertex,
        scene: &dyn Scene,
        camera: &dyn Camera,
        cs: &ColorSystem,
        pixel_count: usize,
        sw: &SpectrumWavelengths,
        additional: &mut Vec<AdditionalSplat>,
    ) {
        // A single lens sample suffices to locate the connection point;
        // the dimension is not drawn from the sampler since this routine
        // runs once per light vertex rather than once per path.
        let (lens_point, lens_pdf) = camera.sample_lens(0.5, 0.5);
        if lens_pdf <= 0.0 {
            return;
        }
        let to_lens = lens_point - vertex.hit.p;
        let dist2 = to_lens.length_squared();
        if dist2 <= 0.0 {
            return;
        }
        let dist = dist2.sqrt();
        let dir = to_lens * (1.0 / dist);

        let Some((film_x, film_y)) = camera.get_sample_position(&lens_point, &dir, dist) else {
            return;
        };

        let wi_local = vertex.frame.to_local(&dir).normalize();
        let wo_local = vertex.frame.to_local(&vertex.wo_world).normalize();
        let (f, _pdf_w, rev_pdf_w, event) = vertex.bsdf.evaluate(&wi_local, &wo_local);
        if f.is_black() || event.is_specular() {
            return;
        }

        let Some(transmittance) = scene.visibility(&vertex.hit, lens_point, &PathVolumeInfo::new(), sw) else {
            return;
        };

        let cos_at_vertex = abs_cos_theta(&wi_local);
        let cos_at_camera = dir.dot(&camera.get_dir()).abs().max(1e-6);
        // Pinhole-style solid-angle -> area pdf conversion at the lens
        // (the exact sensor response is an external collaborator's
        // concern, per §1/§6 "Camera"; this generic conversion is the
        // same utility used for every other pdf measure change here).
        let camera_pdf_w = lens_pdf / cos_at_camera;
        let camera_pdf_a = pdf_w_to_a(camera_pdf_w, dist, cos_at_vertex);

        let weight = 1.0 / ((camera_pdf_a / pixel_count.max(1) as Float) * (vertex.d0 + vertex.d1vc * rev_pdf_w) + 1.0);

        let g = cos_at_vertex * cos_at_camera / dist2;
        let radiance = vertex.throughput * f * (g * weight);
        if radiance.is_black() || !radiance.is_finite() {
            return;
        }
        let radiance = radiance * transmittance;
        let rgb = cs.to_rgb(&radiance.to_xyz(sw));
        additional.push(AdditionalSplat { film_x, film_y, radiance: rgb });
    }

    /// Builds the eye subpath exactly as the unidirectional tracer does
    /// (camera ray, NEE, BSDF sampling, RR), but additionally connects
    /// every non-specular eye vertex to every stored light vertex via
    /// `connect_vertices`.
    #[allow(clippy::too_many_arguments)]
    fn build_eye_path(
        &self,
        film_x: Float,
        film_y: Float,
        sampler: &mut dyn Sampler,
        scene: &dyn Scene,
        camera: &dyn Camera,
        cs: &ColorSystem,
        num_groups: usize,
        sw: &SpectrumWavelengths,
        dim: &mut usize,
        light_path: &[Vertex],
    ) -> SampleResult {
        let mut vol_info = PathVolumeInfo::new();
        let mut ray = camera.generate_ray(film_x, film_y, &vol_info, next(sampler, dim), next(sampler, dim), next(sampler, dim));

        let mut result = SampleResult::new(film_x, film_y, num_groups);
        let mut throughput = SWCSpectrum::splat(1.0);
        let mut depth_info = PathDepthInfo::new();
        let mut last_bsdf_event = BSDFEvent::SPECULAR;
        let mut last_pdf_w: Float = 1.0;
        let mut d0: Float = 0.0;
        let mut d1vc: Float = 0.0;

        loop {
            let u_passthrough = next(sampler, dim);
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
                sw,
            );
            throughput *= connection_throughput;

            let Some(scene_hit) = hit else {
                for light in scene.infinite_lights() {
                    if let Some((le, direct_pdf_w, _emission_pdf_w)) = light.get_radiance(&ray.d, None) {
                        let weight = if last_bsdf_event.is_specular() {
                            1.0
                        } else {
                            let pick_pdf = scene.light_strategy().sample_light_pdf(light);
                            crate::pbrt::power_heuristic(1, last_pdf_w, 1, direct_pdf_w * pick_pdf)
                        };
                        let radiance = throughput * le * weight;
                        let rgb = cs.to_rgb(&radiance.to_xyz(sw));
                        result.add_radiance(0, rgb);
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
                            crate::pbrt::power_heuristic(1, last_pdf_w, 1, direct_pdf_w * pick_pdf)
                        }
                        (None, false) => 1.0,
                    };
                    let radiance = throughput * emitted * weight;
                    let rgb = cs.to_rgb(&radiance.to_xyz(sw));
                    result.add_radiance(0, rgb);
                }
                break;
            }

            if !bsdf.is_delta() {
                if let Some((light, pick_pdf)) = scene.light_strategy().sample_lights(next(sampler, dim)) {
                    if let Some(illum) = light.illuminate(&hit_point.p, next(sampler, dim), next(sampler, dim), next(sampler, dim)) {
                        let wi_local = frame.to_local(&illum.dir).normalize();
                        let (f, bsdf_pdf_w, _rev_pdf_w, _event) = bsdf.evaluate(&wi_local, &wo_local);
                        if !f.is_black() && bsdf_pdf_w > 0.0 {
                            let to_point = hit_point.p + illum.dir * illum.distance;
                            if let Some(transmittance) = scene.visibility(hit_point, to_point, &vol_info, sw) {
                                let weight = crate::pbrt::power_heuristic(1, pick_pdf * illum.direct_pdf_w, 1, bsdf_pdf_w);
                                let cos = abs_cos_theta(&wi_local);
                                let contribution = throughput * f * transmittance * illum.le * (weight * cos / (pick_pdf * illum.direct_pdf_w));
                                let rgb = cs.to_rgb(&contribution.to_xyz(sw));
                                result.add_radiance(0, rgb);
                            }
                        }
                    }
                }

                let eye_vertex = Vertex {
                    hit: hit_point.clone(),
                    frame,
                    bsdf: bsdf.clone(),
                    wo_world: hit_point.wo,
                    throughput,
                    d0,
                    d1vc,
                    is_delta: false,
                };
                for light_vertex in light_path {
                    if light_vertex.is_delta {
                        continue;
                    }
                    if let Some(contribution) = connect_vertices(scene, &eye_vertex, light_vertex, sw) {
                        let rgb = cs.to_rgb(&contribution.to_xyz(sw));
                        result.add_radiance(0, rgb);
                    }
                }
            }

            let u0 = next(sampler, dim);
            let u1 = next(sampler, dim);
            let u_pt = next(sampler, dim);
            let Some(sample) = bsdf.sample(&wo_local, u0, u1, u_pt) else { break };
            if sample.pdf_w <= 0.0 || sample.f.is_black() {
                break;
            }

            let (_f_rev, _pdf_rev_w, rev_pdf_w, _event_rev) = bsdf.evaluate(&wo_local, &sample.wi_local);
            let cos = abs_cos_theta(&sample.wi_local);
            let prev_d0 = d0;
            let prev_d1vc = d1vc;
            d0 = 1.0 / sample.pdf_w;
            d1vc = (cos / sample.pdf_w) * (prev_d1vc * rev_pdf_w + prev_d0);

            throughput *= sample.f * (cos / sample.pdf_w);
            last_pdf_w = sample.pdf_w;
            last_bsdf_event = sample.event;

            if depth_info.total >= self.config.rr_depth {
                let prob = self.config.rr_importance_cap.min(throughput.max_component());
                if next(sampler, dim) >= prob || prob <= 0.0 {
                    break;
                }
                throughput *= 1.0 / prob;
            }
            depth_info.increment(sample.event);
            if depth_info.exceeds(&self.config.max_eye_path_depth) {
                break;
            }

            let wi_world = frame.to_world(&sample.wi_local).normalize();
            let into_object = wi_world.dot(&Vector3f::from(hit_point.n)) < 0.0;
            vol_info.update(sample.event, false, into_object, bsdf.interior_volume());
            ray = hit_point.spawn_ray(&wi_world);
        }

        if !result.is_finite() {
            log::error!("non-finite radiance at ({film_x}, {film_y}) in bidirectional path tracer; dropping sample contribution");
            for c in result.radiance_per_group.iter_mut() {
                *c = RGBColor::BLACK;
            }
        }
        result.last_path_vertex = true;
        result
    }
}

/// Connects an eye vertex and a light vertex with a shadow ray, weighting
/// the unbiased contribution by the full balance-heuristic MIS weight
/// (§4.G `ConnectVertices`). Returns `None` if occluded, degenerate, or
/// the contribution is black.
fn connect_vertices(scene: &dyn Scene, eye: &Vertex, light: &Vertex, sw: &SpectrumWavelengths) -> Option<SWCSpectrum> {
    let d = light.hit.p - eye.hit.p;
    let dist2 = d.length_squared();
    if dist2 <= 0.0 {
        return None;
    }
    let dist = dist2.sqrt();
    let dir = d * (1.0 / dist);

    let eye_wi_local = eye.frame.to_local(&dir).normalize();
    let eye_wo_local = eye.frame.to_local(&eye.wo_world).normalize();
    let (f_eye, pdf_eye_w, rev_pdf_eye_w, event_eye) = eye.bsdf.evaluate(&eye_wi_local, &eye_wo_local);
    if f_eye.is_black() || event_eye.is_specular() {
        return None;
    }

    let light_wi_local = light.frame.to_local(&(-dir)).normalize();
    let light_wo_local = light.frame.to_local(&light.wo_world).normalize();
    let (f_light, pdf_light_w, rev_pdf_light_w, event_light) = light.bsdf.evaluate(&light_wi_local, &light_wo_local);
    if f_light.is_black() || event_light.is_specular() {
        return None;
    }

    let Some(transmittance) = scene.visibility(&eye.hit, light.hit.p, &PathVolumeInfo::new(), sw) else {
        return None;
    };

    let cos_at_eye = abs_cos_theta(&eye_wi_local);
    let cos_at_light = abs_cos_theta(&light_wi_local);

    let eye_bsdf_pdf_a = pdf_w_to_a(pdf_eye_w, dist, cos_at_light);
    let light_bsdf_pdf_a = pdf_w_to_a(pdf_light_w, dist, cos_at_eye);

    let denom = eye_bsdf_pdf_a * (light.d0 + light.d1vc * rev_pdf_light_w) + 1.0 + light_bsdf_pdf_a * (eye.d0 + eye.d1vc * rev_pdf_eye_w);
    if !(denom > 0.0) {
        return None;
    }
    let weight = 1.0 / denom;

    let g = cos_at_eye * cos_at_light / dist2;
    let contribution = eye.throughput * f_eye * light.throughput * f_light * transmittance * (g * weight);
    if contribution.is_black() || !contribution.is_finite() {
        return None;
    }
    Some(contribution)
}

fn next(sampler: &mut dyn Sampler, dim: &mut usize) -> Float {
    let u = sampler.get_sample(*dim);
    *dim += 1;
    u
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_carry_sane_caps() {
        let cfg = BidirConfig::default();
        assert!(cfg.max_eye_path_depth.total > 0);
        assert!(cfg.max_light_path_depth.total > 0);
    }
}
