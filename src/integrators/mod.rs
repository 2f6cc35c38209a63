//! The path-tracing state machines (§4.F unidirectional, §4.G
//! bidirectional) built against the `Scene`/`Camera`/`Light` external
//! interfaces (§6).

mod bidir;
mod path;
mod path_depth_info;
mod sample_result;

pub use bidir::{AdditionalSplat, BidirConfig, BidirPathTracer};
pub use path::{PathTracerConfig, PathTracer};
pub use path_depth_info::{PathDepthCaps, PathDepthInfo};
pub use sample_result::SampleResult;

use crate::pbrt::Float;

/// Clamps each of a sample result's radiance channels against the film's
/// current per-pixel mean, bounding contribution to `mean +/- cap`.
/// Applied uniformly before splat regardless of engine, resolving the
/// source's inconsistency between engines noted in §9.
pub fn clamp_variance(radiance: Float, mean: Float, cap: Float) -> Float {
    if cap <= 0.0 {
        return radiance;
    }
    let delta = (radiance - mean).abs();
    radiance * (1.0_f32).min(cap / cap.max(delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_cap_disables_clamping() {
        assert_eq!(clamp_variance(100.0, 0.0, 0.0), 100.0);
    }

    #[test]
    fn large_outlier_is_pulled_toward_mean() {
        let clamped = clamp_variance(100.0, 1.0, 2.0);
        assert!(clamped < 100.0);
    }
}
