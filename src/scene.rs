//! The scene contract (§6 "Scene collaborator"). Geometry storage,
//! acceleration-structure traversal and scene-file parsing are out of
//! scope for this core (§1); the path and bidirectional integrators are
//! written entirely against this trait, which captures exactly the
//! behavior `Intersect` is responsible for: finding the closest surface,
//! applying volume `Scatter` along the segment, advancing through
//! pass-through surfaces, and accumulating emission into the sample
//! result.

use crate::geometry::{Hit, Point3f, Ray, SurfaceInteraction};
use crate::integrators::SampleResult;
use crate::light::{ArcLight, LightStrategy};
use crate::pbrt::Float;
use crate::reflection::ArcBSDF;
use crate::spectrum::{SWCSpectrum, SpectrumWavelengths};
use crate::volume::{ArcVolume, PathVolumeInfo};

/// A surface the ray came to rest on: its differential geometry and the
/// BSDF to shade it with. `light` is populated when the surface belongs to
/// an area light, so a BSDF-sampled ray that lands on it can be MIS-weighted
/// against the light strategy's own selection pdf (§4.F step d).
pub struct SceneHit {
    pub interaction: SurfaceInteraction,
    pub bsdf: ArcBSDF,
    pub light: Option<ArcLight>,
}

pub trait Scene: Send + Sync {
    /// Advances `ray` to the next surface, integrating volume scattering
    /// and pass-through surfaces along the way (§6). `vol_info` is
    /// mutated to reflect every volume entered/exited en route.
    /// `connection_throughput` accumulates transmittance/pass-through
    /// attenuation picked up along the segment; any emission encountered
    /// (volume or otherwise) is added directly to `sample_result` when
    /// supplied. Returns `None` only when the ray escapes to infinity.
    #[allow(clippy::too_many_arguments)]
    fn intersect(
        &self,
        ray: &mut Ray,
        from_light: bool,
        through_shadow_transparency: bool,
        u_passthrough: Float,
        vol_info: &mut PathVolumeInfo,
        path_throughput: &SWCSpectrum,
        connection_throughput: &mut SWCSpectrum,
        sample_result: Option<&mut SampleResult>,
        sw: &SpectrumWavelengths,
    ) -> Option<SceneHit>;

    /// Casts a shadow ray from `from` toward `to`. Returns the
    /// transmittance/pass-through attenuation accumulated along the way
    /// when the ray reaches `to` unoccluded by an opaque surface, or
    /// `None` when blocked (§4.F step e).
    fn visibility(&self, from: &Hit, to: Point3f, vol_info: &PathVolumeInfo, sw: &SpectrumWavelengths) -> Option<SWCSpectrum>;

    fn light_strategy(&self) -> &dyn LightStrategy;

    /// Environment lights reachable from any escaping ray (§4.F step c).
    fn infinite_lights(&self) -> &[crate::light::ArcLight] {
        &[]
    }

    fn default_world_volume(&self) -> Option<ArcVolume> {
        None
    }
}
