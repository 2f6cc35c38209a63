//! The Schlick phase function shared by homogeneous and heterogeneous
//! volumes (§4.E).

use crate::event::BSDFEvent;
use crate::geometry::Vector3f;
use crate::pbrt::Float;
use crate::spectrum::SWCSpectrum;
use std::f32::consts::PI;

/// Evaluates Schlick's phase function `p(cosθ) = (1-k²)/(4π(1+k·cosθ)²)`
/// with `k = g·(1.55 - 0.55·g²)`. `local_eye_dir` is the direction back
/// toward the previous vertex, so the sign convention uses `1 + k·cosθ`
/// rather than the textbook `1 - k·cosθ`.
pub fn evaluate(g: Float, sigma_s: SWCSpectrum, sigma_a: SWCSpectrum, local_light_dir: &Vector3f, local_eye_dir: &Vector3f) -> (SWCSpectrum, Float, Float) {
    let r = albedo(sigma_s, sigma_a);
    let k = g.clamp(-1.0, 1.0) * (1.55 - 0.55 * g * g);

    let dot_eye_light = local_eye_dir.dot(local_light_dir);
    let compcost = 1.0 + k * dot_eye_light;
    let pdf = (1.0 - k * k) / (compcost * compcost * (4.0 * PI));

    let value = r * (1.0 - k * k) / (compcost * compcost * (4.0 * PI));
    (value, pdf, pdf)
}

pub fn sample(
    g: Float,
    sigma_s: SWCSpectrum,
    sigma_a: SWCSpectrum,
    local_fixed_dir: &Vector3f,
    u0: Float,
    u1: Float,
) -> Option<(SWCSpectrum, Vector3f, Float, Float, BSDFEvent)> {
    let k = g.clamp(-1.0, 1.0) * (1.55 - 0.55 * g * g);

    // The sign convention is flipped because `local_fixed_dir` points back
    // toward the previous vertex rather than along the standard phase
    // function's incoming direction.
    let cost = -(2.0 * u0 + k - 1.0) / (2.0 * k * u0 - k + 1.0);
    let (x, y) = local_fixed_dir.coordinate_system();
    let sint = (1.0 - cost * cost).max(0.0).sqrt();
    let phi = 2.0 * PI * u1;
    let local_sampled_dir = x * (sint * phi.cos()) + y * (sint * phi.sin()) + *local_fixed_dir * cost;

    let compcost = 1.0 + k * cost;
    let pdf = (1.0 - k * k) / (compcost * compcost * (4.0 * PI));
    if pdf <= 0.0 {
        return None;
    }

    let r = albedo(sigma_s, sigma_a);
    Some((r, local_sampled_dir, pdf, local_sampled_dir.z.abs(), BSDFEvent::DIFFUSE | BSDFEvent::REFLECT))
}

fn albedo(sigma_s: SWCSpectrum, sigma_a: SWCSpectrum) -> SWCSpectrum {
    let mut r = sigma_s;
    for i in 0..4 {
        r[i] = if r[i] > 0.0 { r[i] / (r[i] + sigma_a[i]) } else { 1.0 };
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isotropic_phase_integrates_near_inv_4pi() {
        let s = SWCSpectrum::splat(1.0);
        let a = SWCSpectrum::splat(0.0);
        let (_, pdf, _) = evaluate(0.0, s, a, &Vector3f::new(0.0, 0.0, 1.0), &Vector3f::new(0.0, 0.0, 1.0));
        assert!((pdf - 1.0 / (4.0 * PI)).abs() < 1e-5);
    }
}
