//! Stratified-pixel random sampler: every pixel index is handed to
//! exactly one worker at a time via a shared atomic bucket, cycling once
//! all pixels have been visited (§4.C "Random").

use super::Sampler;
use crate::pbrt::rng::Rng;
use crate::pbrt::Float;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared across every `RandomSampler` on the same film so pixel
/// assignment rotates without two workers landing on the same pixel in
/// the same pass.
pub struct SharedPixelBucket {
    next: AtomicUsize,
    pixel_count: usize,
}

impl SharedPixelBucket {
    pub fn new(pixel_count: usize) -> Arc<Self> {
        Arc::new(Self {
            next: AtomicUsize::new(0),
            pixel_count,
        })
    }

    fn take(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % self.pixel_count.max(1)
    }
}

pub struct RandomSampler {
    bucket: Arc<SharedPixelBucket>,
    rng: Rng,
    film_width: u32,
    pixel_index: usize,
}

impl RandomSampler {
    pub fn new(bucket: Arc<SharedPixelBucket>, film_width: u32, seed: u64) -> Self {
        let pixel_index = bucket.take();
        Self {
            bucket,
            rng: Rng::new(seed),
            film_width,
            pixel_index,
        }
    }
}

impl Sampler for RandomSampler {
    fn get_sample(&mut self, _dim: usize) -> Float {
        self.rng.uniform_float()
    }

    fn next_sample(&mut self, _luminance: Float) {
        self.pixel_index = self.bucket.take();
    }

    fn current_pixel(&self) -> Option<(u32, u32)> {
        if self.film_width == 0 {
            return None;
        }
        let x = (self.pixel_index as u32) % self.film_width;
        let y = (self.pixel_index as u32) / self.film_width;
        Some((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_cycles_through_every_pixel_before_repeating() {
        let bucket = SharedPixelBucket::new(4);
        let seen: Vec<usize> = (0..4).map(|_| bucket.take()).collect();
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(bucket.take(), 0);
    }

    #[test]
    fn current_pixel_matches_bucket_assignment() {
        let bucket = SharedPixelBucket::new(6);
        let sampler = RandomSampler::new(bucket, 3, 1);
        let (x, y) = sampler.current_pixel().unwrap();
        assert_eq!(x + y * 3, sampler.pixel_index as u32);
    }
}
