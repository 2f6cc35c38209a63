//! Rays and their hit records (§3 "Ray & RayHit").

use super::{Normal3f, Point3f, Vector3f};
use crate::pbrt::{Float, INFINITY};
use crate::volume::ArcVolume;

/// A ray with a parametric interval `[mint, maxt]` and a time sample,
/// optionally carrying the medium it currently travels through.
#[derive(Clone)]
pub struct Ray {
    pub o: Point3f,
    pub d: Vector3f,
    pub mint: Float,
    pub maxt: Float,
    pub time: Float,
    pub medium: Option<ArcVolume>,
}

impl Ray {
    pub fn new(o: Point3f, d: Vector3f, maxt: Float, time: Float, medium: Option<ArcVolume>) -> Self {
        Self {
            o,
            d,
            mint: 0.0,
            maxt,
            time,
            medium,
        }
    }

    /// Evaluates the ray's position at parameter `t`.
    pub fn at(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }

    /// The length of the parametric interval currently covered by this ray.
    pub fn length(&self) -> Float {
        if self.maxt.is_infinite() {
            INFINITY
        } else {
            self.maxt - self.mint
        }
    }
}

/// The result of intersecting a [`Ray`] with scene geometry.
///
/// A miss is any `t >= maxt` (§3 invariant).
#[derive(Copy, Clone, Debug, Default)]
pub struct RayHit {
    pub t: Float,
    pub surface_id: u32,
    pub b1: Float,
    pub b2: Float,
}

impl RayHit {
    pub fn is_hit(&self, maxt: Float) -> bool {
        self.t < maxt
    }
}

/// Offsets a ray origin away from a surface to avoid self-intersection,
/// biasing along the geometric normal in the direction of `d`.
pub fn offset_ray_origin(p: &Point3f, p_error: &Vector3f, n: &Normal3f, d: &Vector3f) -> Point3f {
    let offset_mag = p_error.x.abs() + p_error.y.abs() + p_error.z.abs();
    let n_v: Vector3f = (*n).into();
    let offset = if n_v.dot(d) < 0.0 {
        n_v * -offset_mag.max(1e-6)
    } else {
        n_v * offset_mag.max(1e-6)
    };
    *p + offset
}
