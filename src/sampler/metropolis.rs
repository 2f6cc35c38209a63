//! Metropolis sampler: mutates the full sample vector and runs an
//! acceptance chain over path contributions (§4.C "Metropolis").

use super::Sampler;
use crate::pbrt::rng::Rng;
use crate::pbrt::Float;

const NUM_DIMENSIONS: usize = 2 + 4 + 10 * 4;

pub struct MetropolisSampler {
    rng: Rng,
    large_step_rate: Float,
    image_mutation_range: Float,
    max_consecutive_reject: u32,

    current: [Float; NUM_DIMENSIONS],
    proposed: [Float; NUM_DIMENSIONS],
    current_luminance: Float,
    is_large_step: bool,
    consecutive_rejects: u32,
}

impl MetropolisSampler {
    pub fn new(seed: u64, large_step_rate: Float, image_mutation_range: Float, max_consecutive_reject: u32) -> Self {
        let mut rng = Rng::new(seed);
        let mut current = [0.0; NUM_DIMENSIONS];
        for v in current.iter_mut() {
            *v = rng.uniform_float();
        }
        Self {
            rng,
            large_step_rate,
            image_mutation_range,
            max_consecutive_reject,
            current,
            proposed: current,
            current_luminance: 0.0,
            is_large_step: true,
            consecutive_rejects: 0,
        }
    }

    fn mutate_component(&mut self, v: Float, range: Float) -> Float {
        let u = self.rng.uniform_float();
        let delta = range * (2.0 * u - 1.0);
        let mut r = v + delta;
        if r < 0.0 {
            r += 1.0;
        } else if r >= 1.0 {
            r -= 1.0;
        }
        r
    }

    /// Proposes the next sample vector, either a fresh large step or a
    /// small perturbation of `current`.
    fn propose(&mut self) {
        self.is_large_step = self.rng.uniform_float() < self.large_step_rate;
        if self.is_large_step {
            for v in self.proposed.iter_mut() {
                *v = self.rng.uniform_float();
            }
        } else {
            for i in 0..NUM_DIMENSIONS {
                let range = if i < 2 { self.image_mutation_range } else { 0.1 };
                self.proposed[i] = self.mutate_component(self.current[i], range);
            }
        }
    }
}

impl Sampler for MetropolisSampler {
    fn get_sample(&mut self, dim: usize) -> Float {
        if dim == 0 {
            self.propose();
        }
        self.proposed[dim % NUM_DIMENSIONS]
    }

    /// Accepts or rejects `self.proposed` against `self.current` using the
    /// standard Metropolis acceptance ratio `min(1, L'/L)`. Forces
    /// acceptance after `max_consecutive_reject` rejections so the chain
    /// never stalls indefinitely in a low-contribution region.
    fn next_sample(&mut self, luminance: Float) {
        let accept = if self.current_luminance <= 0.0 {
            true
        } else {
            let ratio = (luminance / self.current_luminance).min(1.0);
            self.rng.uniform_float() < ratio || self.consecutive_rejects >= self.max_consecutive_reject
        };

        if accept {
            self.current = self.proposed;
            self.current_luminance = luminance;
            self.consecutive_rejects = 0;
        } else {
            self.consecutive_rejects += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_in_unit_range_across_mutations() {
        let mut s = MetropolisSampler::new(3, 0.3, 0.05, 32);
        for _ in 0..200 {
            for dim in 0..4 {
                let v = s.get_sample(dim);
                assert!((0.0..1.0).contains(&v));
            }
            s.next_sample(1.0);
        }
    }

    #[test]
    fn zero_contribution_proposal_is_always_rejected_unless_forced() {
        let mut s = MetropolisSampler::new(3, 0.0, 0.02, 1000);
        s.get_sample(0);
        s.next_sample(1.0);
        let before = s.current;
        s.get_sample(0);
        s.next_sample(0.0);
        assert_eq!(s.current, before);
    }
}
