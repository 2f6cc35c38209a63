//! Interaction records: the common point-of-scattering data shared by
//! surface hits and medium scattering events.

use super::{Normal3f, Point3f, Vector3f};
use crate::pbrt::{Float, SHADOW_EPSILON};
use crate::volume::ArcVolume;
use std::sync::Arc;

/// The medium on either side of a surface. `inside`/`outside` are both
/// `None` for vacuum, and equal to each other for a pass-through surface
/// that does not separate two different media.
#[derive(Clone, Default)]
pub struct MediumInterface {
    pub inside: Option<ArcVolume>,
    pub outside: Option<ArcVolume>,
}

impl MediumInterface {
    pub fn new(inside: Option<ArcVolume>, outside: Option<ArcVolume>) -> Self {
        Self { inside, outside }
    }

    pub fn homogeneous(medium: Option<ArcVolume>) -> Self {
        Self {
            inside: medium.clone(),
            outside: medium,
        }
    }

    /// Whether this interface separates two distinct media (as opposed to
    /// a purely geometric, pass-through surface).
    pub fn is_medium_transition(&self) -> bool {
        match (&self.inside, &self.outside) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        }
    }
}

/// Common fields shared by surface and medium interactions (§3 "Hit").
#[derive(Clone)]
pub struct Hit {
    pub p: Point3f,
    pub time: Float,
    pub p_error: Vector3f,
    pub wo: Vector3f,
    pub n: Normal3f,
    pub medium_interface: Option<MediumInterface>,
}

impl Hit {
    pub fn new(
        p: Point3f,
        time: Float,
        p_error: Vector3f,
        wo: Vector3f,
        n: Normal3f,
        medium_interface: Option<MediumInterface>,
    ) -> Self {
        Self {
            p,
            time,
            p_error,
            wo,
            n,
            medium_interface,
        }
    }

    pub fn is_surface_interaction(&self) -> bool {
        self.n != Normal3f::zero()
    }

    pub fn is_medium_interaction(&self) -> bool {
        !self.is_surface_interaction()
    }

    /// Spawns a ray leaving this point in direction `d`.
    pub fn spawn_ray(&self, d: &Vector3f) -> super::Ray {
        let o = super::offset_ray_origin(&self.p, &self.p_error, &self.n, d);
        super::Ray::new(o, *d, crate::pbrt::INFINITY, self.time, self.get_medium_in_direction(d))
    }

    /// Spawns a shadow ray towards another point, with `maxt` pulled in by
    /// `SHADOW_EPSILON` so the target point itself is not re-hit.
    pub fn spawn_ray_to(&self, p: &Point3f) -> super::Ray {
        let dir = *p - self.p;
        let o = super::offset_ray_origin(&self.p, &self.p_error, &self.n, &dir);
        let d = *p - o;
        super::Ray::new(o, d, 1.0 - SHADOW_EPSILON, self.time, self.get_medium_in_direction(&d))
    }

    /// The medium lying on the `w` side of this interaction's surface.
    pub fn get_medium_in_direction(&self, w: &Vector3f) -> Option<ArcVolume> {
        let mi = self.medium_interface.clone()?;
        if w.dot(&self.n) > 0.0 {
            mi.outside
        } else {
            mi.inside
        }
    }

    /// The medium at this point, when the interface does not separate two
    /// distinct media (used when spawning camera/light rays from a surface
    /// that is purely a volume boundary marker).
    pub fn get_medium(&self) -> Option<ArcVolume> {
        let mi = self.medium_interface.clone()?;
        if mi.is_medium_transition() {
            None
        } else {
            mi.inside
        }
    }
}

/// A ray/surface intersection: the point, local differential geometry,
/// and a back-pointer to the surface and material that was hit.
#[derive(Clone)]
pub struct SurfaceInteraction {
    pub hit: Hit,
    pub uv: super::Point2f,
    pub dpdu: Vector3f,
    pub dpdv: Vector3f,
    pub surface_id: u32,
}

impl SurfaceInteraction {
    pub fn new(hit: Hit, uv: super::Point2f, dpdu: Vector3f, dpdv: Vector3f, surface_id: u32) -> Self {
        Self {
            hit,
            uv,
            dpdu,
            dpdv,
            surface_id,
        }
    }
}

/// A scattering event inside a participating medium, away from any surface.
#[derive(Clone)]
pub struct MediumInteraction {
    pub hit: Hit,
    pub volume: ArcVolume,
}

impl MediumInteraction {
    pub fn new(hit: Hit, volume: ArcVolume) -> Self {
        Self { hit, volume }
    }
}

/// Either a surface or a medium interaction, as returned by path extension.
pub enum Interaction {
    Surface(SurfaceInteraction),
    Medium(MediumInteraction),
}

impl Interaction {
    pub fn hit(&self) -> &Hit {
        match self {
            Self::Surface(si) => &si.hit,
            Self::Medium(mi) => &mi.hit,
        }
    }
}
