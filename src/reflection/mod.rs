//! The BSDF/material contract (§4.D) and one representative implementation,
//! `GlossyCoating`, illustrating it.

mod fresnel;
mod glossy_coating;
mod matte;

pub use fresnel::schlick_fresnel;
pub use glossy_coating::GlossyCoating;
pub use matte::Matte;

use crate::event::BSDFEvent;
use crate::geometry::{Normal3f, Vector3f};
use crate::pbrt::Float;
use crate::spectrum::SWCSpectrum;
use crate::volume::ArcVolume;
use std::sync::Arc;

/// Local-frame BSDF sample data: the outcome of `Sample`.
pub struct BSDFSample {
    pub f: SWCSpectrum,
    pub wi_local: Vector3f,
    pub pdf_w: Float,
    pub event: BSDFEvent,
}

/// The contract every material/BSDF implements (§3 "Material/BSDF
/// contract"). All directions are given in the surface's local shading
/// frame (z = shading normal) so implementations never need the frame
/// itself; callers transform to/from world space.
pub trait BSDF: Send + Sync {
    /// `f, pdfW, revPdfW, event` for the given local directions.
    /// Invariant: `pdfW > 0` whenever `f != 0`, unless `event` contains
    /// `SPECULAR`.
    fn evaluate(&self, wi_local: &Vector3f, wo_local: &Vector3f) -> (SWCSpectrum, Float, Float, BSDFEvent);

    /// Samples a new direction given the fixed (outgoing) direction `wo`.
    /// `u_pt` is reserved for pass-through stochastic selection in
    /// composite BSDFs (used by `GlossyCoating`).
    fn sample(&self, wo_local: &Vector3f, u0: Float, u1: Float, u_pt: Float) -> Option<BSDFSample>;

    /// `pdfW, revPdfW` without evaluating `f`.
    fn pdf(&self, wi_local: &Vector3f, wo_local: &Vector3f) -> (Float, Float);

    fn is_delta(&self) -> bool {
        false
    }

    /// A pass-through surface: the BSDF is effectively identity for this
    /// wavelength/random draw (material alpha cutout), independent of the
    /// volume-priority pass-through handled by `PathVolumeInfo`.
    fn is_pass_through(&self) -> bool {
        false
    }

    fn get_pass_through_transparency(&self, _u: Float) -> Option<SWCSpectrum> {
        None
    }

    fn is_light_source(&self) -> bool {
        false
    }

    fn get_emitted_radiance(&self) -> Option<SWCSpectrum> {
        None
    }

    fn interior_volume(&self) -> Option<ArcVolume> {
        None
    }

    fn exterior_volume(&self) -> Option<ArcVolume> {
        None
    }
}

pub type ArcBSDF = Arc<dyn BSDF>;

/// Whether `wi`/`wo` are on the same side of the geometric normal (i.e. a
/// reflection rather than a transmission event).
pub fn same_hemisphere(wi_local: &Vector3f, wo_local: &Vector3f) -> bool {
    wi_local.z * wo_local.z > 0.0
}

pub fn cos_theta(w: &Vector3f) -> Float {
    w.z
}

pub fn abs_cos_theta(w: &Vector3f) -> Float {
    w.z.abs()
}

/// Flips `n` into the hemisphere of `v` — used before bumping a hitpoint
/// for the coating lobe in `GlossyCoating::evaluate`.
pub fn face_forward_normal(n: &Normal3f, v: &Vector3f) -> Normal3f {
    n.face_forward(v)
}
