//! The error taxonomy (§7 "Error handling design"). Configuration and
//! scene-consistency errors are fatal and propagate out of `Start()`; math
//! singularities and interruption never do — see the call sites in
//! `film`, `integrators` and `engine` for where each is handled locally.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// Unknown engine/sampler/filter name, out-of-range parameter, or an
    /// incompatible sampler for the chosen engine (e.g. a non-tile sampler
    /// with a tile engine). Surfaced synchronously during start; no state
    /// is mutated before it is raised.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Too many image-map pages, or an IO failure delegated from a
    /// collaborator (full image-map management is out of scope here).
    #[error("resource error: {0}")]
    Resource(String),

    /// A cycle in material references, or an unresolved texture name.
    /// Fatal at start, like `Configuration`.
    #[error("scene consistency error: {0}")]
    SceneConsistency(String),
}

/// A math singularity encountered mid-path (NaN/Inf radiance, a
/// negative-weight splat, a zero-pdf sample taken on a non-specular
/// branch). Never propagated as a `RenderError`: the caller drops the
/// contribution (treats it as zero) and still counts the sample toward
/// the splat. Exists as a named type so call sites can `log::warn!` with
/// a structured reason rather than a bare string.
#[derive(Debug, Error)]
pub enum MathSingularity {
    #[error("non-finite radiance")]
    NonFiniteRadiance,
    #[error("negative splat weight")]
    NegativeWeight,
    #[error("zero pdf on a non-specular sample")]
    ZeroPdf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_formats_its_message() {
        let e = RenderError::Configuration("unknown sampler type FOO".into());
        assert_eq!(e.to_string(), "configuration error: unknown sampler type FOO");
    }
}
