//! Spectral colour core: stratified wavelength sampling, the SWC working
//! spectrum, RGB/XYZ conversion and SPD resampling (regular, irregular,
//! blackbody).

mod color_system;
mod rgb;
pub mod spd;
mod swc;
mod wavelengths;
mod xyz;

pub use color_system::{ColorSystem, GamutLimitMethod};
pub use rgb::RGBColor;
pub use swc::SWCSpectrum;
pub use wavelengths::SpectrumWavelengths;
pub use xyz::{cie_xyz_bar, XYZColor};

/// Identifies whether an RGB/XYZ triple is a surface reflectance or an
/// illuminant SPD — the Smits basis differs for the two.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpectrumType {
    Reflectance,
    Illuminant,
}
