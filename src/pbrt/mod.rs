//! PBRT-style common primitives shared across the renderer.

mod axis;
mod clamp;
mod common;
mod log2;
pub mod rng;

// Re-export
pub use axis::*;
pub use clamp::*;
pub use common::*;
pub use log2::*;
