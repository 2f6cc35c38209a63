//! The film accumulator (§4.B): per-pixel radiance buckets, filtered
//! splatting, per-channel scaling and convergence reporting.
//!
//! Buckets store `RGBColor`, not `SWCSpectrum`: every path sample carries
//! its own independently stratified wavelength set (§4.A), so summing raw
//! spectral samples across samples would mix incompatible bases. The
//! integrator converts a sample's `SWCSpectrum` to RGB via
//! `SWCSpectrum::to_xyz` + `ColorSystem::to_rgb` once, at the point where
//! it hands the contribution to the film.

pub mod filter;

use crate::pbrt::Float;
use crate::spectrum::spd::{BlackbodySPD, SPD};
use crate::spectrum::{cie_xyz_bar, ColorSystem, RGBColor, XYZColor};
use filter::FilterLUT;

/// A single `RADIANCE_PER_PIXEL_NORMALIZED` accumulator: weighted sum plus
/// the weight itself, so multiple concurrent splats merge by addition
/// regardless of order (§8 property 7).
#[derive(Clone, Copy, Default)]
pub struct PixelBucket {
    pub radiance: RGBColor,
    pub weight: Float,
}

impl PixelBucket {
    fn add(&mut self, radiance: RGBColor, weight: Float) {
        self.radiance += radiance * weight;
        self.weight += weight;
    }

    fn resolve(&self) -> RGBColor {
        if self.weight > 0.0 {
            self.radiance * (1.0 / self.weight)
        } else {
            RGBColor::BLACK
        }
    }
}

/// Per-channel post-processing scale (§3 "RadianceChannelScale"). The
/// effective scale is cached in `cached_scale` rather than recomputed on
/// every read, to keep the per-pixel tone-map path allocation-free;
/// `recompute()` re-derives it and must be called whenever any of
/// `global_scale`/`rgb_scale`/`temperature*` changes.
#[derive(Clone, Copy)]
pub struct RadianceChannelScale {
    pub global_scale: Float,
    pub rgb_scale: RGBColor,
    pub temperature: Option<Float>,
    pub temperature_normalize: bool,
    pub temperature_reverse: bool,
    cached_scale: RGBColor,
}

impl Default for RadianceChannelScale {
    fn default() -> Self {
        Self {
            global_scale: 1.0,
            rgb_scale: RGBColor::splat(1.0),
            temperature: None,
            temperature_normalize: true,
            temperature_reverse: false,
            cached_scale: RGBColor::splat(1.0),
        }
    }
}

impl RadianceChannelScale {
    /// Re-derives `cached_scale = clamp(bb(T) * rgbScale * globalScale, 0)`.
    /// Must be called after constructing or mutating this scale's fields
    /// before `effective_scale()` reflects the change.
    pub fn recompute(&mut self, cs: &ColorSystem) {
        let bb = match self.temperature {
            None => RGBColor::splat(1.0),
            Some(t) => {
                let spd = if self.temperature_normalize {
                    BlackbodySPD::normalized(t)
                } else {
                    BlackbodySPD::new(t)
                };
                let (x, y, z) = (380..=720).step_by(5).fold((0.0, 0.0, 0.0), |(ax, ay, az), lambda| {
                    let v = spd.eval(lambda as Float);
                    let (xb, yb, zb) = cie_xyz_bar(lambda as Float);
                    (ax + v * xb, ay + v * yb, az + v * zb)
                });
                let xyz = XYZColor::new(x, y, z);
                let rgb = cs.to_rgb(&xyz);
                if self.temperature_reverse {
                    RGBColor::splat(1.0) - rgb.clamp(0.0, 1.0)
                } else {
                    rgb
                }
            }
        };
        self.cached_scale = (bb * self.rgb_scale * self.global_scale).clamp(0.0, Float::INFINITY);
    }

    /// The cached effective scale from the last `recompute()`.
    pub fn effective_scale(&self) -> RGBColor {
        self.cached_scale
    }
}

/// Rectangular pixel grid with per-light-group radiance buckets plus the
/// ALPHA/DEPTH/SAMPLECOUNT AOV channels (§6 "Film (exposed to embedder)").
#[derive(Clone)]
pub struct Film {
    pub width: usize,
    pub height: usize,
    num_groups: usize,

    per_pixel_normalized: Vec<Vec<PixelBucket>>,
    per_screen_normalized: Vec<Vec<RGBColor>>,
    per_screen_enabled: Vec<bool>,

    alpha: Vec<Float>,
    depth: Vec<Float>,
    depth_enabled: bool,
    sample_count: Vec<u64>,
    total_sample_count: u64,

    channel_scales: Vec<RadianceChannelScale>,
    filter_lut: FilterLUT,
    convergence: Float,
}

impl Film {
    pub fn new(width: usize, height: usize, num_groups: usize, filter: &dyn filter::Filter) -> Self {
        let npixels = width * height;
        Self {
            width,
            height,
            num_groups,
            per_pixel_normalized: vec![vec![PixelBucket::default(); npixels]; num_groups],
            per_screen_normalized: vec![vec![RGBColor::BLACK; npixels]; num_groups],
            per_screen_enabled: vec![false; num_groups],
            alpha: vec![0.0; npixels],
            depth: vec![0.0; npixels],
            depth_enabled: false,
            sample_count: vec![0; npixels],
            total_sample_count: 0,
            channel_scales: vec![RadianceChannelScale::default(); num_groups],
            filter_lut: FilterLUT::build(filter),
            convergence: 1.0,
        }
    }

    pub fn enable_per_screen_normalized(&mut self, group: usize) {
        self.per_screen_enabled[group] = true;
    }

    pub fn enable_depth_channel(&mut self) {
        self.depth_enabled = true;
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// `AddSample(x, y, perGroupRadiance, weight)`.
    pub fn add_sample(&mut self, x: usize, y: usize, group: usize, radiance: RGBColor, weight: Float) {
        if x >= self.width || y >= self.height {
            return;
        }
        if !is_finite_rgb(&radiance) || weight < 0.0 {
            // Math-singularity class (§7): drop the contribution, count
            // the sample as having landed.
            return;
        }
        let idx = self.index(x, y);
        self.per_pixel_normalized[group][idx].add(radiance, weight);
    }

    /// `SplatFiltered(x, y, fractionalCoords, radiance, alpha, weight)`.
    /// `fx, fy` are film-space fractional coordinates; the filter LUT's
    /// footprint around them is splatted into the per-screen-normalized
    /// bucket, clipped to film bounds.
    pub fn splat_filtered(&mut self, fx: Float, fy: Float, group: usize, radiance: RGBColor, alpha: Option<Float>, weight: Float) {
        if !is_finite_rgb(&radiance) || weight < 0.0 {
            return;
        }
        let x_radius = self.filter_lut.x_radius;
        let y_radius = self.filter_lut.y_radius;

        let x0 = ((fx - x_radius).ceil() as i64).max(0);
        let x1 = (((fx + x_radius).ceil() as i64) + 1).min(self.width as i64);
        let y0 = ((fy - y_radius).ceil() as i64).max(0);
        let y1 = (((fy + y_radius).ceil() as i64) + 1).min(self.height as i64);

        for py in y0..y1 {
            for px in x0..x1 {
                let dx = (px as Float + 0.5) - fx;
                let dy = (py as Float + 0.5) - fy;
                if dx.abs() > x_radius || dy.abs() > y_radius {
                    continue;
                }
                let w = self.filter_lut.weight(dx, dy) * weight;
                if w <= 0.0 {
                    continue;
                }
                let idx = self.index(px as usize, py as usize);
                self.per_screen_normalized[group][idx] += radiance * w;
                if let Some(a) = alpha {
                    self.alpha[idx] += a * w;
                }
            }
        }
    }

    /// `AddSampleCount(groupId, count, elapsedMs)`. `elapsedMs` only feeds
    /// throughput statistics, which the core engine does not track.
    pub fn add_sample_count(&mut self, _group: usize, count: u64, _elapsed_ms: Float) {
        self.total_sample_count += count;
    }

    pub fn set_pixel_sample_count(&mut self, x: usize, y: usize, count: u64) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.index(x, y);
        self.sample_count[idx] += count;
    }

    pub fn set_depth(&mut self, x: usize, y: usize, depth: Float) {
        if x >= self.width || y >= self.height || !self.depth_enabled {
            return;
        }
        let idx = self.index(x, y);
        self.depth[idx] = depth;
    }

    /// `GetConvergence()`.
    pub fn get_convergence(&self) -> Float {
        self.convergence
    }

    /// Records the outcome of the last convergence test (owned by the
    /// tile repository, not the film itself).
    pub fn set_convergence(&mut self, value: Float) {
        self.convergence = value.clamp(0.0, 1.0);
    }

    /// `ChannelScale(groupId)`.
    pub fn channel_scale(&self, group: usize) -> RadianceChannelScale {
        self.channel_scales[group]
    }

    /// Installs a new per-channel scale, recomputing its cached effective
    /// scale immediately so the hot tone-map path never pays for it.
    pub fn set_channel_scale(&mut self, group: usize, mut scale: RadianceChannelScale, cs: &ColorSystem) {
        scale.recompute(cs);
        self.channel_scales[group] = scale;
    }

    /// The tone-mapped output pixel: merges `RADIANCE_PER_PIXEL_NORMALIZED`
    /// and (if enabled and the film has seen at least one sample)
    /// `RADIANCE_PER_SCREEN_NORMALIZED`, each scaled by its channel's
    /// effective scale.
    pub fn get_output_pixel(&self, x: usize, y: usize, group: usize) -> RGBColor {
        if x >= self.width || y >= self.height {
            return RGBColor::BLACK;
        }
        let idx = self.index(x, y);
        let scale = self.channel_scales[group].effective_scale();
        let mut out = self.per_pixel_normalized[group][idx].resolve() * scale;
        if self.per_screen_enabled[group] && self.total_sample_count >= 1 {
            let pixel_count = (self.width * self.height) as Float;
            out += self.per_screen_normalized[group][idx] * (pixel_count / self.total_sample_count as Float) * scale;
        }
        out
    }

    pub fn total_sample_count(&self) -> u64 {
        self.total_sample_count
    }

    /// Unscaled `RADIANCE_PER_PIXEL_NORMALIZED` resolve, ignoring channel
    /// scale and the per-screen-normalized bucket. Used by the tile
    /// convergence test (§4.H), which compares two films of the same scene
    /// and so has no need of the embedder-facing tone-mapped value.
    pub fn pixel_radiance_raw(&self, x: usize, y: usize, group: usize) -> RGBColor {
        let idx = self.index(x, y);
        self.per_pixel_normalized[group][idx].resolve()
    }

    pub fn sample_count_at(&self, x: usize, y: usize) -> u64 {
        self.sample_count[self.index(x, y)]
    }

    /// Resets every per-pixel bucket to empty without reallocating. Used by
    /// `enableFirstPassClear` (§4.H) so a new multipass cycle replaces
    /// rather than blends the previous cycle's samples.
    pub fn clear_per_pixel(&mut self) {
        for g in 0..self.num_groups {
            for b in self.per_pixel_normalized[g].iter_mut() {
                *b = PixelBucket::default();
            }
            for c in self.per_screen_normalized[g].iter_mut() {
                *c = RGBColor::BLACK;
            }
        }
        for a in self.alpha.iter_mut() {
            *a = 0.0;
        }
        for s in self.sample_count.iter_mut() {
            *s = 0;
        }
        self.total_sample_count = 0;
    }

    /// Merges another film's buckets into this one (tile-to-main merge
    /// under the repository's mutex, §5 concurrency model). Associative
    /// and commutative by construction, since every bucket is a sum.
    pub fn merge(&mut self, other: &Film) {
        debug_assert_eq!(self.width, other.width);
        debug_assert_eq!(self.height, other.height);
        for g in 0..self.num_groups {
            for i in 0..self.per_pixel_normalized[g].len() {
                let b = other.per_pixel_normalized[g][i];
                self.per_pixel_normalized[g][i].radiance += b.radiance;
                self.per_pixel_normalized[g][i].weight += b.weight;
                self.per_screen_normalized[g][i] += other.per_screen_normalized[g][i];
            }
        }
        for i in 0..self.alpha.len() {
            self.alpha[i] += other.alpha[i];
            self.sample_count[i] += other.sample_count[i];
        }
        self.total_sample_count += other.total_sample_count;
    }
}

fn is_finite_rgb(c: &RGBColor) -> bool {
    c.r.is_finite() && c.g.is_finite() && c.b.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use filter::BoxFilter;

    fn test_film() -> Film {
        let f = BoxFilter { x_width: 0.5, y_width: 0.5 };
        Film::new(4, 4, 1, &f)
    }

    #[test]
    fn add_sample_with_zero_weight_is_a_noop_on_output() {
        let mut film = test_film();
        film.add_sample(1, 0, 0, RGBColor::splat(5.0), 0.0);
        let out = film.get_output_pixel(1, 0, 0);
        assert!(out.is_black());
    }

    #[test]
    fn add_sample_is_commutative_across_order() {
        let mut forward = test_film();
        let mut backward = test_film();
        let samples = [
            (RGBColor::splat(1.0), 1.0),
            (RGBColor::splat(2.0), 0.5),
            (RGBColor::splat(0.3), 2.0),
        ];
        for (r, w) in samples.iter() {
            forward.add_sample(2, 2, 0, *r, *w);
        }
        for (r, w) in samples.iter().rev() {
            backward.add_sample(2, 2, 0, *r, *w);
        }
        let a = forward.get_output_pixel(2, 2, 0);
        let b = backward.get_output_pixel(2, 2, 0);
        assert!((a.r - b.r).abs() < 1e-5);
    }

    #[test]
    fn merge_accumulates_both_films_contributions() {
        let mut a = test_film();
        let mut b = test_film();
        a.add_sample(0, 0, 0, RGBColor::splat(1.0), 1.0);
        b.add_sample(0, 0, 0, RGBColor::splat(1.0), 1.0);
        a.merge(&b);
        let out = a.get_output_pixel(0, 0, 0);
        assert!((out.r - 1.0).abs() < 1e-5);
    }

    #[test]
    fn set_channel_scale_recomputes_cached_effective_scale() {
        let cs = ColorSystem::srgb();
        let mut film = test_film();
        let mut scale = RadianceChannelScale::default();
        scale.global_scale = 2.0;
        film.set_channel_scale(0, scale, &cs);
        assert!((film.channel_scale(0).effective_scale().r - 2.0).abs() < 1e-5);
    }
}
