//! Per-splat record produced by a path (§3 "SampleResult").

use crate::spectrum::RGBColor;

/// A single sample's contribution, ready to hand to `Film`. Radiance is
/// tracked per light group so multi-light-group scenes can be recomposed
/// in post; the core engine itself only ever uses group 0 but the slot is
/// part of the film's external contract (§6).
#[derive(Clone, Debug)]
pub struct SampleResult {
    pub film_x: f32,
    pub film_y: f32,
    pub radiance_per_group: Vec<RGBColor>,
    pub alpha: Option<f32>,
    pub depth: f32,
    pub first_path_vertex: bool,
    pub last_path_vertex: bool,
}

impl SampleResult {
    pub fn new(film_x: f32, film_y: f32, num_groups: usize) -> Self {
        Self {
            film_x,
            film_y,
            radiance_per_group: vec![RGBColor::BLACK; num_groups],
            alpha: None,
            depth: 0.0,
            first_path_vertex: true,
            last_path_vertex: false,
        }
    }

    pub fn add_radiance(&mut self, group: usize, r: RGBColor) {
        if let Some(slot) = self.radiance_per_group.get_mut(group) {
            *slot += r;
        }
    }

    /// The sum of every light group's radiance — what the film's single
    /// `RADIANCE_PER_PIXEL_NORMALIZED` splat needs when the embedder has
    /// not split output into distinct AOV channels per group.
    pub fn total_radiance(&self) -> RGBColor {
        self.radiance_per_group.iter().fold(RGBColor::BLACK, |a, b| a + *b)
    }

    pub fn is_finite(&self) -> bool {
        self.radiance_per_group.iter().all(|c| c.r.is_finite() && c.g.is_finite() && c.b.is_finite())
    }
}
