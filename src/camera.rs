//! The camera contract (§6 "Camera"). Lens/projection models are
//! scene-authoring collaborators out of scope for this core; the path and
//! bidirectional integrators are written entirely against this trait.

use crate::geometry::{Point2f, Point3f, Vector3f};
use crate::pbrt::Float;
use crate::volume::PathVolumeInfo;

pub trait Camera: Send + Sync {
    /// Generates a ray leaving the camera through film position
    /// `(film_x, film_y)`. `vol_info` supplies the medium the ray starts
    /// in (a camera may sit inside a participating medium).
    fn generate_ray(&self, film_x: Float, film_y: Float, vol_info: &PathVolumeInfo, u_dof_x: Float, u_dof_y: Float, u_time: Float) -> crate::geometry::Ray;

    /// Samples a point on the lens, for bidirectional camera connections.
    fn sample_lens(&self, u0: Float, u1: Float) -> (Point3f, Float);

    /// Projects a world-space point back to film coordinates, as seen from
    /// a sampled lens point, for a light-subpath-to-eye connection.
    /// `None` if the point falls outside the visible film area or behind
    /// the camera.
    fn get_sample_position(&self, lens_point: &Point3f, dir: &Vector3f, distance: Float) -> Option<Point2f>;

    fn get_dir(&self) -> Vector3f;

    fn get_pixel_area(&self) -> Float;
}
