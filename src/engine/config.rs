//! Typed engine-configuration store (§6 "Engine configuration
//! properties"), generalized from the teacher's
//! `core::paramset::ParamSet` hashmap-of-typed-values idiom: here a
//! single string-keyed map with typed accessors that parse on read,
//! rather than one hashmap per value type, since every recognized key
//! has exactly one expected type.

use crate::error::RenderError;
use std::collections::HashMap;
use std::str::FromStr;

/// `renderengine.type` (§6).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderEngineType {
    PathCpu,
    BidirCpu,
    LightCacheCpu,
    TilePathCpu,
    PathOcl,
    TilePathOcl,
    RtPathOcl,
    FileSaver,
}

impl RenderEngineType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "PATHCPU" => Some(Self::PathCpu),
            "BIDIRCPU" => Some(Self::BidirCpu),
            "LIGHTCACHECPU" => Some(Self::LightCacheCpu),
            "TILEPATHCPU" => Some(Self::TilePathCpu),
            "PATHOCL" => Some(Self::PathOcl),
            "TILEPATHOCL" => Some(Self::TilePathOcl),
            "RTPATHOCL" => Some(Self::RtPathOcl),
            "FILESAVER" => Some(Self::FileSaver),
            _ => None,
        }
    }

    /// Whether this engine renders tile-by-tile through a
    /// `TileRepository` rather than the no-tile per-pixel loop (§4.J).
    pub fn is_tile_engine(&self) -> bool {
        matches!(self, Self::TilePathCpu | Self::TilePathOcl | Self::RtPathOcl)
    }
}

/// A `Properties`-style typed key/value store. Every value is held as its
/// source string and parsed lazily on read, so a caller can `set` keys in
/// any order (including ones this crate doesn't recognize, which are
/// simply never read) without a schema round-trip.
#[derive(Clone, Debug, Default)]
pub struct Properties {
    values: HashMap<String, String>,
}

macro_rules! typed_getter {
    ($name:ident, $t:ty) => {
        pub fn $name(&self, key: &str, default: $t) -> Result<$t, RenderError> {
            self.get_parsed(key, default)
        }
    };
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.values.get(key).cloned().unwrap_or_else(|| default.to_string())
    }

    fn get_parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T, RenderError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|_| RenderError::Configuration(format!("invalid value {raw:?} for {key}"))),
        }
    }

    typed_getter!(get_u32, u32);
    typed_getter!(get_f32, f32);
    typed_getter!(get_bool, bool);
    typed_getter!(get_u64, u64);

    pub fn get_render_engine_type(&self) -> Result<RenderEngineType, RenderError> {
        let raw = self.get_string("renderengine.type", "PATHCPU");
        RenderEngineType::parse(&raw).ok_or_else(|| RenderError::Configuration(format!("unknown renderengine.type {raw:?}")))
    }

    pub fn get_sampler_type(&self) -> Result<crate::sampler::SamplerType, RenderError> {
        let raw = self.get_string("sampler.type", "RANDOM");
        crate::sampler::SamplerType::parse(&raw).ok_or_else(|| RenderError::Configuration(format!("unknown sampler.type {raw:?}")))
    }

    /// `path.maxdepth.{total,diffuse,glossy,specular}`.
    pub fn get_path_depth_caps(&self) -> Result<crate::integrators::PathDepthCaps, RenderError> {
        let defaults = crate::integrators::PathDepthCaps::default();
        Ok(crate::integrators::PathDepthCaps {
            total: self.get_u32("path.maxdepth.total", defaults.total)?,
            diffuse: self.get_u32("path.maxdepth.diffuse", defaults.diffuse)?,
            glossy: self.get_u32("path.maxdepth.glossy", defaults.glossy)?,
            specular: self.get_u32("path.maxdepth.specular", defaults.specular)?,
        })
    }

    /// `path.russianroulette.{depth, cap}`; `cap` must lie in `[0, 1]`.
    pub fn get_russian_roulette(&self) -> Result<(u32, f32), RenderError> {
        let depth = self.get_u32("path.russianroulette.depth", 3)?;
        let cap = self.get_f32("path.russianroulette.cap", 1.0)?;
        if !(0.0..=1.0).contains(&cap) {
            return Err(RenderError::Configuration(format!("path.russianroulette.cap {cap} out of [0,1]")));
        }
        Ok((depth, cap))
    }

    pub fn get_variance_clamp_max(&self) -> Result<f32, RenderError> {
        let v = self.get_f32("path.clamping.variance.maxvalue", 0.0)?;
        if v < 0.0 {
            return Err(RenderError::Configuration(format!("path.clamping.variance.maxvalue {v} is negative")));
        }
        Ok(v)
    }

    /// `tile.size.{x,y}`.
    pub fn get_tile_size(&self) -> Result<(u32, u32), RenderError> {
        let x = self.get_u32("tile.size.x", 64)?;
        let y = self.get_u32("tile.size.y", 64)?;
        if x == 0 || y == 0 {
            return Err(RenderError::Configuration("tile.size.{x,y} must be positive".into()));
        }
        Ok((x, y))
    }

    pub fn get_aa_size(&self) -> Result<u32, RenderError> {
        self.get_u32("tilepath.sampling.aa.size", 3)
    }

    /// `tile.multipass.{enable, convergencetest.threshold,
    /// convergencetest.threshold.reduction, convergencetest.warmup.count}`.
    pub fn get_multipass(&self) -> Result<MultipassConfig, RenderError> {
        Ok(MultipassConfig {
            enable: self.get_bool("tile.multipass.enable", true)?,
            convergence_test_threshold: self.get_f32("tile.multipass.convergencetest.threshold", 6.0 / 256.0)?,
            convergence_test_threshold_reduction: self.get_f32("tile.multipass.convergencetest.threshold.reduction", 0.0)?,
            convergence_test_warmup_count: self.get_u32("tile.multipass.convergencetest.warmup.count", 8)?,
        })
    }

    /// `native.threads.count`; `0` means "use all logical cores".
    pub fn get_thread_count(&self) -> Result<u32, RenderError> {
        self.get_u32("native.threads.count", 0)
    }

    pub fn get_force_black_background(&self) -> Result<bool, RenderError> {
        self.get_bool("path.forceblackbackground.enable", false)
    }

    /// `batch.{halttime, haltspp, haltthreshold, haltdebug}`.
    pub fn get_halt_conditions(&self) -> Result<HaltConditions, RenderError> {
        Ok(HaltConditions {
            halt_time_secs: self.get_u32("batch.halttime", 0)?,
            halt_spp: self.get_u32("batch.haltspp", 0)?,
            halt_threshold: self.get_f32("batch.haltthreshold", -1.0)?,
            halt_debug_samples: self.get_u64("batch.haltdebug", 0)?,
        })
    }
}

#[derive(Copy, Clone, Debug)]
pub struct MultipassConfig {
    pub enable: bool,
    pub convergence_test_threshold: f32,
    pub convergence_test_threshold_reduction: f32,
    pub convergence_test_warmup_count: u32,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct HaltConditions {
    pub halt_time_secs: u32,
    pub halt_spp: u32,
    /// `< 0` disables the convergence-based halt.
    pub halt_threshold: f32,
    /// `0` disables the halt-debug sample cap.
    pub halt_debug_samples: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_engine_type_is_a_configuration_error() {
        let mut p = Properties::new();
        p.set("renderengine.type", "NOTANENGINE");
        assert!(matches!(p.get_render_engine_type(), Err(RenderError::Configuration(_))));
    }

    #[test]
    fn defaults_apply_when_key_is_absent() {
        let p = Properties::new();
        assert_eq!(p.get_render_engine_type().unwrap(), RenderEngineType::PathCpu);
        assert_eq!(p.get_tile_size().unwrap(), (64, 64));
    }

    #[test]
    fn out_of_range_rr_cap_is_rejected() {
        let mut p = Properties::new();
        p.set("path.russianroulette.cap", 1.5);
        assert!(p.get_russian_roulette().is_err());
    }

    #[test]
    fn malformed_numeric_value_is_a_configuration_error_not_a_panic() {
        let mut p = Properties::new();
        p.set("tile.size.x", "banana");
        assert!(p.get_tile_size().is_err());
    }
}
