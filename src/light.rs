//! Light and light-selection-strategy contracts (§6 "Light strategy",
//! "Light"). Concrete light implementations (area, infinite/environment,
//! point, etc.) are scene-authoring collaborators out of scope for this
//! core; the path/bidirectional integrators are written entirely against
//! these trait contracts.

use crate::geometry::{Point3f, Ray, Vector3f};
use crate::pbrt::Float;
use crate::spectrum::SWCSpectrum;
use std::sync::Arc;

/// The result of `Light::emit`: an emission ray plus the pdfs needed to
/// seed a light subpath (§4.G).
pub struct EmitSample {
    pub ray: Ray,
    pub le: SWCSpectrum,
    pub emit_pdf_w: Float,
    pub direct_pdf_w: Float,
    pub cos_at_light: Float,
}

/// The result of `Light::illuminate`: a sampled direction toward the
/// light used for next-event estimation (§4.F step e).
pub struct IlluminateSample {
    pub le: SWCSpectrum,
    pub dir: Vector3f,
    pub distance: Float,
    pub direct_pdf_w: Float,
    pub emission_pdf_w: Float,
    pub cos_at_light: Float,
}

/// A single light source (§6 "Light").
pub trait Light: Send + Sync {
    /// Samples an emission ray leaving the light, for bidirectional light
    /// subpath construction.
    fn emit(&self, u0: Float, u1: Float, u2: Float, u3: Float, u4: Float) -> Option<EmitSample>;

    /// Samples a direction from `point` toward the light, for next-event
    /// estimation.
    fn illuminate(&self, point: &Point3f, u0: Float, u1: Float, u2: Float) -> Option<IlluminateSample>;

    /// Radiance emitted toward `-dir` (i.e. as seen by a ray traveling
    /// along `dir`), along with the area and solid-angle emission pdfs a
    /// BSDF-sampled ray that happens to hit this light would need for MIS.
    /// `hit_point` disambiguates area lights with multiple emitting
    /// surfaces; `None` for purely directional/environment lights.
    fn get_radiance(&self, dir: &Vector3f, hit_point: Option<&Point3f>) -> Option<(SWCSpectrum, Float, Float)>;

    /// Environment ("infinite") lights are reachable from any escaping ray
    /// and use solid-angle rather than area pdf at the light vertex (§4.G).
    fn is_environmental(&self) -> bool {
        false
    }

    fn id(&self) -> u32;
}

pub type ArcLight = Arc<dyn Light>;

/// Light-selection strategy (§6 "Light strategy").
pub trait LightStrategy: Send + Sync {
    /// Picks a light for next-event estimation, with its selection pdf.
    fn sample_lights(&self, u: Float) -> Option<(ArcLight, Float)>;

    /// The selection pdf `sample_lights` would have assigned to `light`,
    /// needed to compute the MIS weight when a BSDF-sampled ray happens to
    /// hit a light directly.
    fn sample_light_pdf(&self, light: &ArcLight) -> Float;

    fn lights(&self) -> &[ArcLight];
}

/// Uniform light-selection strategy: every light is equally likely. The
/// simplest strategy satisfying the contract; scenes needing
/// power-weighted or spatial selection supply their own.
pub struct UniformLightStrategy {
    lights: Vec<ArcLight>,
}

impl UniformLightStrategy {
    pub fn new(lights: Vec<ArcLight>) -> Self {
        Self { lights }
    }
}

impl LightStrategy for UniformLightStrategy {
    fn sample_lights(&self, u: Float) -> Option<(ArcLight, Float)> {
        if self.lights.is_empty() {
            return None;
        }
        let n = self.lights.len();
        let idx = ((u * n as Float) as usize).min(n - 1);
        Some((self.lights[idx].clone(), 1.0 / n as Float))
    }

    fn sample_light_pdf(&self, _light: &ArcLight) -> Float {
        if self.lights.is_empty() {
            0.0
        } else {
            1.0 / self.lights.len() as Float
        }
    }

    fn lights(&self) -> &[ArcLight] {
        &self.lights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubLight(u32);
    impl Light for StubLight {
        fn emit(&self, _u0: Float, _u1: Float, _u2: Float, _u3: Float, _u4: Float) -> Option<EmitSample> {
            None
        }
        fn illuminate(&self, _point: &Point3f, _u0: Float, _u1: Float, _u2: Float) -> Option<IlluminateSample> {
            None
        }
        fn get_radiance(&self, _dir: &Vector3f, _hit_point: Option<&Point3f>) -> Option<(SWCSpectrum, Float, Float)> {
            None
        }
        fn id(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn uniform_strategy_pdf_matches_reciprocal_count() {
        let strategy = UniformLightStrategy::new(vec![Arc::new(StubLight(0)), Arc::new(StubLight(1)), Arc::new(StubLight(2))]);
        let (light, pdf) = strategy.sample_lights(0.5).unwrap();
        assert!((pdf - 1.0 / 3.0).abs() < 1e-6);
        assert!((strategy.sample_light_pdf(&light) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn empty_strategy_samples_nothing() {
        let strategy = UniformLightStrategy::new(vec![]);
        assert!(strategy.sample_lights(0.3).is_none());
    }
}
