//! Render-state persistence boundary (§6 "Render state"). The core does
//! not mandate a specific encoding for resuming a render (that is an
//! embedder/serialization concern, per spec §1's scope cut); this module
//! only carries the few fields the core itself needs to validate and
//! reseed a resumed engine: the engine-type tag (so resuming with a
//! mismatched `renderengine.type` is a `RenderError::Configuration`,
//! §6/§7), the boot seed, and — for tile engines — the tile repository's
//! scheduling state.

use crate::engine::config::RenderEngineType;
use crate::engine::tile::TileRepository;
use crate::error::RenderError;

/// Opaque (to the embedder) blob a tile/no-tile engine can resume from.
pub struct RenderState {
    pub engine_type: RenderEngineType,
    pub boot_strap_seed: u64,
    pub tile_repository: Option<TileRepository>,
}

impl RenderState {
    pub fn new(engine_type: RenderEngineType, boot_strap_seed: u64) -> Self {
        Self {
            engine_type,
            boot_strap_seed,
            tile_repository: None,
        }
    }

    /// Rejects resuming with a different engine tag than this state was
    /// saved with (§6, §7 "Render-state mismatch on resume is a
    /// configuration error").
    pub fn check_compatible(&self, requested: RenderEngineType) -> Result<(), RenderError> {
        if self.engine_type != requested {
            return Err(RenderError::Configuration(format!(
                "render state mismatch: saved as {:?}, resuming as {:?}",
                self.engine_type, requested
            )));
        }
        Ok(())
    }

    /// The seed a resumed engine's workers reseed from (§4.J "the engine
    /// seeds its RNG with `prior.bootStrapSeed + 1`").
    pub fn next_boot_seed(&self) -> u64 {
        self.boot_strap_seed.wrapping_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_engine_tag_on_resume_is_a_configuration_error() {
        let state = RenderState::new(RenderEngineType::PathCpu, 42);
        let err = state.check_compatible(RenderEngineType::BidirCpu).unwrap_err();
        assert!(matches!(err, RenderError::Configuration(_)));
    }

    #[test]
    fn next_boot_seed_is_prior_plus_one() {
        let state = RenderState::new(RenderEngineType::TilePathCpu, 7);
        assert_eq!(state.next_boot_seed(), 8);
    }
}
