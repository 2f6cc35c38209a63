//! Orthonormal shading frame built from a surface normal. The BSDF
//! contract (§4.D) operates entirely in this local frame (z = shading
//! normal); callers transform to/from world space at the frame boundary.

use super::{Normal3f, Vector3f};

#[derive(Copy, Clone, Debug)]
pub struct Frame {
    x: Vector3f,
    y: Vector3f,
    z: Vector3f,
}

impl Frame {
    /// Builds an orthonormal basis around `n` via `Vector3f::coordinate_system`.
    pub fn from_normal(n: &Normal3f) -> Self {
        let z: Vector3f = (*n).into();
        let (x, y) = z.coordinate_system();
        Self { x, y, z }
    }

    pub fn to_local(&self, v: &Vector3f) -> Vector3f {
        Vector3f::new(v.dot(&self.x), v.dot(&self.y), v.dot(&self.z))
    }

    pub fn to_world(&self, v: &Vector3f) -> Vector3f {
        self.x * v.x + self.y * v.y + self.z * v.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round_trips_through_local_and_world() {
        let n = Normal3f::new(0.0, 0.0, 1.0);
        let frame = Frame::from_normal(&n);
        let v = Vector3f::new(0.3, -0.6, 0.2).normalize();
        let local = frame.to_local(&v);
        let world = frame.to_world(&local);
        assert_relative_eq!(world.x, v.x, epsilon = 1e-5);
        assert_relative_eq!(world.y, v.y, epsilon = 1e-5);
        assert_relative_eq!(world.z, v.z, epsilon = 1e-5);
    }

    #[test]
    fn normal_maps_to_local_z() {
        let n = Normal3f::new(0.0, 1.0, 0.0);
        let frame = Frame::from_normal(&n);
        let local = frame.to_local(&Vector3f::new(0.0, 1.0, 0.0));
        assert_relative_eq!(local.z, 1.0, epsilon = 1e-5);
        assert_relative_eq!(local.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(local.y, 0.0, epsilon = 1e-5);
    }
}
