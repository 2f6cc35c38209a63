//! Surface/volume event flags, shared by the BSDF contract (§4.D) and the
//! phase-function contract used by participating media (§4.E).

use bitflags::bitflags;

bitflags! {
    /// A tagged interaction: a lobe class crossed with a direction class.
    /// `SPECULAR` means a delta distribution with no MIS partner.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct BSDFEvent: u32 {
        const DIFFUSE  = 1 << 0;
        const GLOSSY   = 1 << 1;
        const SPECULAR = 1 << 2;
        const REFLECT  = 1 << 3;
        const TRANSMIT = 1 << 4;

        const ALL_LOBES     = Self::DIFFUSE.bits() | Self::GLOSSY.bits() | Self::SPECULAR.bits();
        const ALL_DIRECTIONS = Self::REFLECT.bits() | Self::TRANSMIT.bits();
        const ALL            = Self::ALL_LOBES.bits() | Self::ALL_DIRECTIONS.bits();
    }
}

impl BSDFEvent {
    pub fn is_specular(&self) -> bool {
        self.contains(Self::SPECULAR)
    }

    pub fn is_diffuse(&self) -> bool {
        self.contains(Self::DIFFUSE)
    }
}
