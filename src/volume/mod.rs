//! Participating media: the priority-ordered volume stack (§3
//! "PathVolumeInfo") and the three volume variants that supply free-flight
//! scattering, transmittance and emission along a ray segment (§4.E).

mod clear;
mod heterogeneous;
mod homogeneous;
mod schlick_scatter;

pub use clear::ClearVolume;
pub use heterogeneous::HeterogeneousVolume;
pub use homogeneous::HomogeneousVolume;

use crate::event::BSDFEvent;
use crate::geometry::{Ray, Vector3f};
use crate::pbrt::Float;
use crate::spectrum::SWCSpectrum;
use std::sync::Arc;

/// A constant-valued texture stand-in. Full image/procedural texture
/// evaluation is out of scope for the core engine; volumes parameterized
/// by anything richer plug in through the same trait.
pub trait VolumeTexture: Send + Sync {
    fn eval(&self) -> SWCSpectrum;
}

pub struct ConstantTexture(pub SWCSpectrum);

impl VolumeTexture for ConstantTexture {
    fn eval(&self) -> SWCSpectrum {
        self.0
    }
}

pub type ArcTexture = Arc<dyn VolumeTexture>;

pub fn constant(v: SWCSpectrum) -> ArcTexture {
    Arc::new(ConstantTexture(v))
}

/// The contract every participating-medium variant implements.
pub trait Volume: Send + Sync {
    fn priority(&self) -> i32;

    fn sigma_a(&self) -> SWCSpectrum;
    fn sigma_s(&self) -> SWCSpectrum;

    fn sigma_t(&self) -> SWCSpectrum {
        self.sigma_a() + self.sigma_s()
    }

    fn emission(&self) -> Option<SWCSpectrum>;

    /// Picks a free-flight scatter distance along `ray`'s parametric
    /// interval when possible, multiplies `throughput` by transmittance
    /// (and, on scatter, by `sigma_t`), and accumulates emission traversed
    /// along the segment into `connection_emission`. Returns the scatter
    /// distance along the ray, or `-1` if the ray reached `ray.maxt`
    /// without scattering.
    fn scatter(
        &self,
        ray: &Ray,
        u: Float,
        scattered_start: bool,
        throughput: &mut SWCSpectrum,
        connection_emission: &mut SWCSpectrum,
    ) -> Float;

    /// Schlick phase function evaluation, `None` for volumes with no
    /// scattering lobe (e.g. `ClearVolume`).
    fn phase_evaluate(&self, local_light_dir: &Vector3f, local_eye_dir: &Vector3f) -> Option<(SWCSpectrum, Float, Float)>;

    fn phase_sample(&self, local_fixed_dir: &Vector3f, u0: Float, u1: Float) -> Option<(SWCSpectrum, Vector3f, Float, Float, BSDFEvent)>;
}

pub type ArcVolume = Arc<dyn Volume>;

/// Fixed-capacity ordered stack of volumes currently entered along a path
/// (§3 "PathVolumeInfo"). `PATHVOLUMEINFO_SIZE` matches the invariant that
/// at most this many volumes can be simultaneously nested; the
/// implementation asserts on overflow rather than silently growing, since
/// growth here would mask a scene-authoring error.
pub const PATHVOLUMEINFO_SIZE: usize = 8;

#[derive(Clone, Default)]
pub struct PathVolumeInfo {
    volumes: Vec<ArcVolume>,
    current: Option<ArcVolume>,
    /// True immediately after a medium-scattering vertex; cleared at the
    /// next non-volume BSDF event. Mirrors `scatteredStart` from §4.E.
    pub scattered_start: bool,
}

fn priority_wins(a: &ArcVolume, b: &Option<ArcVolume>) -> bool {
    match b {
        None => true,
        Some(cur) => a.priority() >= cur.priority(),
    }
}

/// Volume-identity comparison: `a` wins over `b` iff they're the same
/// volume or `a` has strictly higher priority.
fn compare_priorities(a: &Option<ArcVolume>, b: &Option<ArcVolume>) -> bool {
    match (a, b) {
        (Some(va), Some(vb)) => Arc::ptr_eq(va, vb) || va.priority() > vb.priority(),
        _ => false,
    }
}

impl PathVolumeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `vol` to the stack, ignoring `None` or an already-full stack.
    pub fn add(&mut self, vol: Option<ArcVolume>) {
        let Some(vol) = vol else { return };
        assert!(
            self.volumes.len() < PATHVOLUMEINFO_SIZE,
            "PathVolumeInfo overflow: more than {PATHVOLUMEINFO_SIZE} nested volumes"
        );
        if priority_wins(&vol, &self.current) {
            self.current = Some(vol.clone());
        }
        self.volumes.push(vol);
    }

    /// Removes the first occurrence of `vol` and recomputes `current` from
    /// the remaining stack (last-highest-priority wins).
    pub fn remove(&mut self, vol: Option<ArcVolume>) {
        let Some(vol) = vol else { return };
        let Some(pos) = self.volumes.iter().position(|v| Arc::ptr_eq(v, &vol)) else {
            return;
        };
        self.volumes.remove(pos);
        self.current = None;
        for v in &self.volumes {
            if priority_wins(v, &self.current) {
                self.current = Some(v.clone());
            }
        }
    }

    /// What `current` would become after adding `vol`, without mutating.
    pub fn simulate_add(&self, vol: Option<ArcVolume>) -> Option<ArcVolume> {
        match (&self.current, &vol) {
            (Some(cur), Some(v)) => {
                if cur.priority() > v.priority() {
                    Some(cur.clone())
                } else {
                    Some(v.clone())
                }
            }
            (Some(cur), None) => Some(cur.clone()),
            (None, v) => v.clone(),
        }
    }

    /// What `current` would become after removing `vol`, without mutating.
    pub fn simulate_remove(&self, vol: Option<ArcVolume>) -> Option<ArcVolume> {
        let Some(vol) = vol else { return self.current.clone() };
        let mut found = false;
        let mut new_current: Option<ArcVolume> = None;
        for v in &self.volumes {
            if !found && Arc::ptr_eq(v, &vol) {
                found = true;
                continue;
            }
            if priority_wins(v, &new_current) {
                new_current = Some(v.clone());
            }
        }
        new_current
    }

    pub fn current_volume(&self) -> Option<ArcVolume> {
        self.current.clone()
    }

    /// Updates the stack after a surface or medium event. Volume-scattering
    /// vertices set `scattered_start` and leave the stack untouched;
    /// transmissive surface events enter/exit the interior volume
    /// according to the `into_object` direction.
    pub fn update(&mut self, event: BSDFEvent, is_volume_event: bool, into_object: bool, material_interior: Option<ArcVolume>) {
        if is_volume_event {
            self.scattered_start = true;
            return;
        }
        self.scattered_start = false;
        if event.contains(BSDFEvent::TRANSMIT) {
            if into_object {
                self.add(material_interior);
            } else {
                self.remove(material_interior);
            }
        }
    }

    /// Implements the priority rule from §3: a transmissive surface is a
    /// pass-through ("continue to trace") when either (1) we're entering
    /// an object whose interior volume does not outrank the current one,
    /// or (2) we're exiting and the removal would not change `current`.
    pub fn continue_to_trace(&self, event: BSDFEvent, into_object: bool, material_interior: Option<ArcVolume>) -> bool {
        if !event.contains(BSDFEvent::TRANSMIT) {
            return false;
        }
        if into_object {
            return compare_priorities(&self.current, &material_interior);
        }
        if self.current.is_some() && volume_opt_eq(&self.simulate_remove(material_interior), &self.current) {
            return true;
        }
        false
    }

    /// Populates a hitpoint's interior/exterior volumes for the BSDF,
    /// falling back to `default_world_volume` when neither the material
    /// nor the stack supplies one.
    pub fn set_hit_point_volumes(
        &self,
        into_object: bool,
        material_interior: Option<ArcVolume>,
        material_exterior: Option<ArcVolume>,
        default_world_volume: Option<ArcVolume>,
    ) -> (Option<ArcVolume>, Option<ArcVolume>) {
        if into_object {
            let interior = self.simulate_add(material_interior);
            let exterior = self.current.clone().or(material_exterior).or_else(|| default_world_volume.clone());
            (interior, exterior)
        } else {
            let interior = self.current.clone().or(material_interior).or_else(|| default_world_volume.clone());
            let exterior = self.simulate_remove(material_interior);
            (interior, exterior)
        }
    }
}

/// Identity comparison for two optional volumes (`Arc::ptr_eq`, lifted
/// through `Option`).
fn volume_opt_eq(a: &Option<ArcVolume>, b: &Option<ArcVolume>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::clear::ClearVolume;

    fn vol(priority: i32) -> ArcVolume {
        Arc::new(ClearVolume::new(priority, constant(SWCSpectrum::splat(0.1)), None))
    }

    #[test]
    fn higher_priority_wins_on_add() {
        let mut info = PathVolumeInfo::new();
        let low = vol(0);
        let high = vol(5);
        info.add(Some(low.clone()));
        info.add(Some(high.clone()));
        assert!(Arc::ptr_eq(&info.current_volume().unwrap(), &high));
    }

    #[test]
    fn simulate_add_remove_round_trips_when_not_overridden() {
        let mut info = PathVolumeInfo::new();
        let a = vol(1);
        info.add(Some(a.clone()));
        let unchanged = info.simulate_add(info.simulate_remove(Some(a.clone())));
        assert!(unchanged.is_some());
        assert!(Arc::ptr_eq(&unchanged.unwrap(), &info.current_volume().unwrap()));
    }

    #[test]
    fn remove_restores_previous_current() {
        let mut info = PathVolumeInfo::new();
        let a = vol(1);
        let b = vol(2);
        info.add(Some(a.clone()));
        info.add(Some(b.clone()));
        info.remove(Some(b));
        assert!(Arc::ptr_eq(&info.current_volume().unwrap(), &a));
    }
}
