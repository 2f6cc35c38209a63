//! The CPU render engine (§4.J): a pool of worker threads, one per
//! logical core by default, pulling samples from a `Sampler` and driving
//! them through `PathTracer`/`BidirPathTracer` into a shared `Film`.
//!
//! Grounded on the teacher's own parallel-render loop
//! (`core::integrator::sampler_integrator::SamplerIntegrator::render`,
//! which farms tiles out via `rayon`'s `par_bridge`), generalized to a
//! *persistent* pool that supports the pause/stop/scene-edit lifecycle
//! §5 requires — a `rayon::scope` cannot be paused or joined from
//! another thread mid-flight, so this engine reaches for `std::thread`
//! instead, one OS thread per worker, matching the spec's own wording
//! ("one OS thread per rendering worker").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::camera::Camera;
use crate::engine::config::{HaltConditions, Properties, RenderEngineType};
use crate::engine::tile::{MultipassConfig as TileMultipassConfig, TileRepository, TileWork};
use crate::error::RenderError;
use crate::film::Film;
use crate::integrators::{BidirConfig, BidirPathTracer, PathTracer, PathTracerConfig};
use crate::pbrt::Float;
use crate::sampler::{MetropolisSampler, RandomSampler, Sampler, SamplerType, SharedPixelBucket, SobolSampler, TilePathSampler};
use crate::scene::Scene;
use crate::spectrum::ColorSystem;

/// Sleep granted to a paused worker before it re-checks the pause flag
/// (§5 "sleeping 100 ms in the pause loop").
const PAUSE_POLL: Duration = Duration::from_millis(100);

/// Every `SNAPSHOT_REFRESH_SAMPLES` samples, a no-tile worker refreshes
/// its thread-local read-only copy of the film used for variance
/// clamping (§4.F step 3). Cloning the whole film on every sample would
/// force a lock per path; refreshing periodically keeps the clamp
/// reference reasonably current without serializing the render loop
/// behind a single mutex for the cost of path construction itself.
const SNAPSHOT_REFRESH_SAMPLES: u64 = 64;

/// High sampler dimensions used for the pixel-filter subpixel jitter, far
/// past any structured dimension block a sampler allocates for
/// wavelength/lens/per-depth draws (§4.C), so the jitter draw never
/// aliases a structured one for `Sobol`.
const JITTER_DIM_X: usize = 512;
const JITTER_DIM_Y: usize = 513;

/// Resolved, validated engine configuration (§6 "Engine configuration
/// properties").
#[derive(Clone)]
pub struct CpuEngineConfig {
    pub engine_type: RenderEngineType,
    pub sampler_type: SamplerType,
    pub thread_count: u32,
    pub path: PathTracerConfig,
    pub bidir: BidirConfig,
    pub tile_size: (u32, u32),
    pub aa_size: u32,
    pub tile_multipass: TileMultipassConfig,
    pub halt: HaltConditions,
    pub metropolis: MetropolisConfig,
}

#[derive(Copy, Clone, Debug)]
pub struct MetropolisConfig {
    pub large_step_rate: Float,
    pub image_mutation_range: Float,
    pub max_consecutive_reject: u32,
}

impl Default for MetropolisConfig {
    fn default() -> Self {
        Self {
            large_step_rate: 0.4,
            image_mutation_range: 0.01,
            max_consecutive_reject: 512,
        }
    }
}

impl CpuEngineConfig {
    /// Parses and validates every key in §6's "Engine configuration
    /// properties" list, rejecting an engine/sampler mismatch as a
    /// `Configuration` error (e.g. `TILEPATHSAMPLER` with `PATHCPU`, or a
    /// non-tile sampler with `TILEPATHCPU`) before any state is touched.
    pub fn from_properties(props: &Properties) -> Result<Self, RenderError> {
        let engine_type = props.get_render_engine_type()?;
        let sampler_type = props.get_sampler_type()?;

        let is_tile_sampler = matches!(sampler_type, SamplerType::TilePathSampler);
        if engine_type.is_tile_engine() != is_tile_sampler {
            return Err(RenderError::Configuration(format!(
                "sampler.type {sampler_type:?} is incompatible with renderengine.type {engine_type:?}"
            )));
        }

        let max_depth = props.get_path_depth_caps()?;
        let (rr_depth, rr_cap) = props.get_russian_roulette()?;
        let variance_clamp = props.get_variance_clamp_max()?;
        let force_black_background = props.get_force_black_background()?;

        let path = PathTracerConfig {
            max_depth,
            rr_depth,
            rr_importance_cap: rr_cap,
            sqrt_variance_clamp_max_value: variance_clamp,
            force_black_background,
        };
        let bidir = BidirConfig {
            max_eye_path_depth: max_depth,
            max_light_path_depth: max_depth,
            rr_depth,
            rr_importance_cap: rr_cap,
        };

        let (tile_x, tile_y) = props.get_tile_size()?;
        let aa_size = props.get_aa_size()?;
        let mp = props.get_multipass()?;
        let tile_multipass = TileMultipassConfig {
            enable: mp.enable,
            convergence_test_threshold: mp.convergence_test_threshold,
            convergence_test_threshold_reduction: mp.convergence_test_threshold_reduction,
            convergence_test_warmup_count: mp.convergence_test_warmup_count,
            enable_convergence_test: props.get_bool("film.noiseestimation.enabled", true)?,
            enable_first_pass_clear: props.get_bool("tile.multipass.firstpassclear.enable", mp.enable)?,
        };

        let halt = props.get_halt_conditions()?;
        let thread_count = props.get_thread_count()?;

        let metropolis = MetropolisConfig {
            large_step_rate: props.get_f32("sampler.metropolis.largesteprate", 0.4)?,
            image_mutation_range: props.get_f32("sampler.metropolis.imagemutationrate", 0.01)?,
            max_consecutive_reject: props.get_u32("sampler.metropolis.maxconsecutivereject", 512)?,
        };

        Ok(Self {
            engine_type,
            sampler_type,
            thread_count,
            path,
            bidir,
            tile_size: (tile_x, tile_y),
            aa_size,
            tile_multipass,
            halt,
            metropolis,
        })
    }

    fn resolved_thread_count(&self) -> usize {
        if self.thread_count > 0 {
            self.thread_count as usize
        } else {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        }
    }
}

/// What `EndSceneEdit` should do to the film (§5 "clears the tile
/// repository (but not the film unless edit actions include
/// `FILM_EDIT`)").
#[derive(Copy, Clone, Debug, Default)]
pub struct SceneEditActions {
    pub clear_film: bool,
}

/// A handle to a running engine's workers (§5 "Cancellation"). `Stop`
/// joins every worker; `Pause`/`Resume` toggle the pause flag without
/// joining, matching the spec's distinction between the two.
pub struct EngineHandle {
    interrupted: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    workers: Vec<JoinHandle<u64>>,
}

impl EngineHandle {
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed)
    }

    /// Sets the interruption flag and joins every worker, returning the
    /// total number of samples rendered across all threads. Workers poll
    /// the flag at every loop iteration and between every tile (§5
    /// "interruption must cause the worker to exit cleanly within one
    /// tile's worth of work").
    pub fn stop(self) -> u64 {
        self.interrupted.store(true, Ordering::Relaxed);
        self.workers.into_iter().filter_map(|h| h.join().ok()).sum()
    }
}

/// `CPURenderEngine` (§4.J): owns the resolved configuration and spawns
/// worker threads against a `Scene`/`Camera`/`Film` supplied at `start`.
/// The engine itself holds no per-render mutable state, matching §5's
/// requirement that the render loop be re-entrant.
pub struct CpuRenderEngine {
    pub config: CpuEngineConfig,
    tile_repository: Option<Arc<TileRepository>>,
}

impl CpuRenderEngine {
    pub fn new(config: CpuEngineConfig) -> Self {
        Self { config, tile_repository: None }
    }

    /// Resumes from a prior `RenderState`: rejects an engine-type mismatch
    /// (§6/§7) and returns the boot seed the resumed workers must reseed
    /// from (`prior.bootStrapSeed + 1`, §4.J), for the caller to pass back
    /// into `start`.
    pub fn resume(config: CpuEngineConfig, prior: &crate::engine::render_state::RenderState) -> Result<(Self, u64), RenderError> {
        prior.check_compatible(config.engine_type)?;
        let boot_seed = prior.next_boot_seed();
        Ok((Self::new(config), boot_seed))
    }

    /// Starts rendering. `boot_seed` seeds every worker's RNG
    /// deterministically (§9 "Deterministic replay"); a resumed engine
    /// passes `prior.bootStrapSeed + 1` (§4.J).
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        scene: Arc<dyn Scene>,
        camera: Arc<dyn Camera>,
        film: Arc<Mutex<Film>>,
        filter: Arc<dyn crate::film::filter::Filter>,
        cs: ColorSystem,
        num_groups: usize,
        boot_seed: u64,
    ) -> Result<EngineHandle, RenderError> {
        let (film_width, film_height) = {
            let f = film.lock().unwrap();
            (f.width as u32, f.height as u32)
        };

        let interrupted = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));
        let thread_count = self.config.resolved_thread_count();
        let start_time = Instant::now();

        let mut workers = Vec::with_capacity(thread_count);

        if self.config.engine_type.is_tile_engine() {
            let repo = self.tile_repository.take().unwrap_or_else(|| {
                Arc::new(TileRepository::new(self.config.tile_size.0, self.config.tile_size.1, self.config.tile_multipass, num_groups))
            });
            repo.init_tiles(film_width, film_height, &*filter);
            self.tile_repository = Some(repo.clone());

            for thread_index in 0..thread_count {
                let scene = scene.clone();
                let camera = camera.clone();
                let film = film.clone();
                let filter = filter.clone();
                let repo = repo.clone();
                let interrupted = interrupted.clone();
                let paused = paused.clone();
                let cfg = self.config.clone();
                let cs = cs;
                workers.push(thread::spawn(move || {
                    run_tile_worker(thread_index as u64, boot_seed, cfg, scene, camera, film, filter, repo, cs, num_groups, interrupted, paused)
                }));
            }
        } else {
            let shared_bucket = if self.config.sampler_type == SamplerType::Random {
                Some(SharedPixelBucket::new((film_width as usize) * (film_height as usize)))
            } else {
                None
            };

            for thread_index in 0..thread_count {
                let scene = scene.clone();
                let camera = camera.clone();
                let film = film.clone();
                let interrupted = interrupted.clone();
                let paused = paused.clone();
                let cfg = self.config.clone();
                let bucket = shared_bucket.clone();
                let cs = cs;
                workers.push(thread::spawn(move || {
                    run_no_tile_worker(
                        thread_index as u64,
                        boot_seed,
                        cfg,
                        scene,
                        camera,
                        film,
                        cs,
                        num_groups,
                        film_width,
                        film_height,
                        bucket,
                        interrupted,
                        paused,
                        start_time,
                    )
                }));
            }
        }

        Ok(EngineHandle { interrupted, paused, workers })
    }

    /// `BeginSceneEdit`: stops every worker so the scene can be mutated.
    pub fn begin_scene_edit(handle: EngineHandle) -> u64 {
        handle.stop()
    }

    /// `EndSceneEdit`: clears the tile repository (discarding all
    /// accumulated passes) and, if `actions.clear_film`, also clears the
    /// film's per-pixel buckets; the caller then calls `start` again to
    /// restart workers (§5).
    pub fn end_scene_edit(&mut self, film: &Mutex<Film>, actions: SceneEditActions) {
        self.tile_repository = None;
        if actions.clear_film {
            film.lock().unwrap().clear_per_pixel();
        }
    }
}

fn build_scalar_sampler(sampler_type: SamplerType, boot_seed: u64, thread_index: u64, bucket: Option<Arc<SharedPixelBucket>>, film_width: u32, metro: MetropolisConfig) -> Box<dyn Sampler> {
    match sampler_type {
        SamplerType::Random => Box::new(RandomSampler::new(bucket.expect("random sampler needs a shared bucket"), film_width, boot_seed ^ (thread_index.wrapping_mul(0x9E3779B97F4A7C15) | 1))),
        SamplerType::Sobol => Box::new(SobolSampler::new(boot_seed, thread_index)),
        SamplerType::Metropolis => Box::new(MetropolisSampler::new(boot_seed.wrapping_add(thread_index), metro.large_step_rate, metro.image_mutation_range, metro.max_consecutive_reject)),
        SamplerType::TilePathSampler => unreachable!("tile sampler is only ever used by the tile engine path"),
    }
}

/// A single sample's pixel coordinates and subpixel jitter, resolved
/// according to which sampler owns pixel assignment (§4.C). `Random`
/// assigns its own pixel via the shared bucket (`current_pixel`); `Sobol`
/// and `Metropolis` have no notion of a current pixel of their own
/// (`current_pixel` always returns `None` for both) and instead treat
/// screen position as a continuous quantity drawn from dims 0/1.
fn next_sample_position(sampler_type: SamplerType, sampler: &mut dyn Sampler, film_width: u32, film_height: u32) -> (u32, u32, Float, Float) {
    match sampler_type {
        SamplerType::Sobol | SamplerType::Metropolis => {
            let u0 = (sampler.get_sample(0) * film_width as Float).clamp(0.0, film_width as Float - 1e-4);
            let u1 = (sampler.get_sample(1) * film_height as Float).clamp(0.0, film_height as Float - 1e-4);
            let px = u0.floor() as u32;
            let py = u1.floor() as u32;
            (px, py, u0 - px as Float, u1 - py as Float)
        }
        SamplerType::Random => {
            let (px, py) = sampler.current_pixel().unwrap_or((0, 0));
            let jx = sampler.get_sample(JITTER_DIM_X);
            let jy = sampler.get_sample(JITTER_DIM_Y);
            (px, py, jx, jy)
        }
        SamplerType::TilePathSampler => unreachable!("tile sampler positions are resolved by the tile worker loop directly"),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_no_tile_worker(
    thread_index: u64,
    boot_seed: u64,
    cfg: CpuEngineConfig,
    scene: Arc<dyn Scene>,
    camera: Arc<dyn Camera>,
    film: Arc<Mutex<Film>>,
    cs: ColorSystem,
    num_groups: usize,
    film_width: u32,
    film_height: u32,
    bucket: Option<Arc<SharedPixelBucket>>,
    interrupted: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    start_time: Instant,
) -> u64 {
    let mut sampler = build_scalar_sampler(cfg.sampler_type, boot_seed, thread_index, bucket, film_width, cfg.metropolis);
    let path_tracer = PathTracer::new(cfg.path);
    let bidir_tracer = BidirPathTracer::new(cfg.bidir);
    let pixel_count = film_width as u64 * film_height as u64;

    let mut snapshot = film.lock().unwrap().clone();
    let mut rendered: u64 = 0;

    loop {
        if interrupted.load(Ordering::Relaxed) {
            break;
        }
        if paused.load(Ordering::Relaxed) {
            thread::sleep(PAUSE_POLL);
            continue;
        }
        if cfg.halt.halt_time_secs > 0 && start_time.elapsed().as_secs() as u32 >= cfg.halt.halt_time_secs {
            break;
        }
        if cfg.halt.halt_debug_samples > 0 && rendered >= cfg.halt.halt_debug_samples {
            break;
        }
        if cfg.halt.halt_spp > 0 {
            let total = film.lock().unwrap().total_sample_count();
            if total >= cfg.halt.halt_spp as u64 * pixel_count {
                break;
            }
        }
        // `batch.haltthreshold` is only meaningful once something is
        // tracking per-pixel convergence (the tile engine's
        // `Tile::check_convergence`); the no-tile engines never call
        // `Film::set_convergence`, so the threshold halt is a no-op here.

        if rendered % SNAPSHOT_REFRESH_SAMPLES == 0 {
            snapshot = film.lock().unwrap().clone();
        }

        let (px, py, jx, jy) = next_sample_position(cfg.sampler_type, &mut *sampler, film_width, film_height);

        let luminance;
        if cfg.engine_type == RenderEngineType::BidirCpu {
            let (result, additional) = bidir_tracer.render_sample(px, py, jx, jy, &mut *sampler, &*scene, &*camera, &cs, pixel_count as usize, num_groups);
            luminance = result.total_radiance().y();
            let mut f = film.lock().unwrap();
            f.splat_filtered(result.film_x, result.film_y, 0, result.total_radiance(), result.alpha, 1.0);
            for splat in additional {
                f.splat_filtered(splat.film_x, splat.film_y, 0, splat.radiance, None, 1.0);
            }
            f.add_sample_count(0, 1, 0.0);
        } else {
            let result = path_tracer.render_sample(px, py, jx, jy, &mut *sampler, &*scene, &*camera, &snapshot, &cs, num_groups);
            luminance = result.total_radiance().y();
            let mut f = film.lock().unwrap();
            f.splat_filtered(result.film_x, result.film_y, 0, result.total_radiance(), result.alpha, 1.0);
            f.add_sample_count(0, 1, 0.0);
        }

        sampler.next_sample(luminance);
        rendered += 1;
    }

    rendered
}

#[allow(clippy::too_many_arguments)]
fn run_tile_worker(
    _thread_index: u64,
    _boot_seed: u64,
    cfg: CpuEngineConfig,
    scene: Arc<dyn Scene>,
    camera: Arc<dyn Camera>,
    film: Arc<Mutex<Film>>,
    filter: Arc<dyn crate::film::filter::Filter>,
    repo: Arc<TileRepository>,
    cs: ColorSystem,
    num_groups: usize,
    interrupted: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
) -> u64 {
    let path_tracer = PathTracer::new(cfg.path);
    let mut tile_work = TileWork::default();
    let mut finished: Option<Film> = None;
    let mut rendered: u64 = 0;

    loop {
        if interrupted.load(Ordering::Relaxed) {
            break;
        }
        if paused.load(Ordering::Relaxed) {
            thread::sleep(PAUSE_POLL);
            continue;
        }

        let has_more = {
            let mut main = film.lock().unwrap();
            repo.next_tile(&mut main, &mut tile_work, finished.as_ref())
        };
        finished = None;
        if !has_more {
            break;
        }

        let coord = match repo.assigned_coord(&tile_work) {
            Some(c) => c,
            None => break,
        };

        let mut tile_film = Film::new(coord.width as usize, coord.height as usize, num_groups, &*filter);

        for local_y in 0..coord.height {
            for local_x in 0..coord.width {
                if interrupted.load(Ordering::Relaxed) {
                    return rendered;
                }
                let px = coord.x + local_x;
                let py = coord.y + local_y;
                let mut pixel_sampler = TilePathSampler::new(px, py, tile_work.pass_to_render, tile_work.multipass_index_to_render, cfg.aa_size);
                loop {
                    let (jx, jy) = pixel_sampler.subpixel_jitter();
                    let result = path_tracer.render_sample(local_x, local_y, jx, jy, &mut pixel_sampler, &*scene, &*camera, &tile_film, &cs, num_groups);
                    tile_film.add_sample(local_x as usize, local_y as usize, 0, result.total_radiance(), 1.0);
                    rendered += 1;
                    pixel_sampler.next_sample(result.total_radiance().y());
                    if pixel_sampler.is_tile_done() {
                        break;
                    }
                }
                tile_film.set_pixel_sample_count(local_x as usize, local_y as usize, (cfg.aa_size * cfg.aa_size) as u64);
            }
        }
        tile_film.add_sample_count(0, (coord.width * coord.height * cfg.aa_size * cfg.aa_size) as u64, 0.0);

        finished = Some(tile_film);
    }

    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_rejects_tile_sampler_on_non_tile_engine() {
        let mut p = Properties::new();
        p.set("renderengine.type", "PATHCPU");
        p.set("sampler.type", "TILEPATHSAMPLER");
        assert!(CpuEngineConfig::from_properties(&p).is_err());
    }

    #[test]
    fn config_rejects_non_tile_sampler_on_tile_engine() {
        let mut p = Properties::new();
        p.set("renderengine.type", "TILEPATHCPU");
        p.set("sampler.type", "RANDOM");
        assert!(CpuEngineConfig::from_properties(&p).is_err());
    }

    #[test]
    fn config_accepts_matching_engine_and_sampler() {
        let mut p = Properties::new();
        p.set("renderengine.type", "TILEPATHCPU");
        p.set("sampler.type", "TILEPATHSAMPLER");
        assert!(CpuEngineConfig::from_properties(&p).is_ok());

        let mut p2 = Properties::new();
        p2.set("renderengine.type", "PATHCPU");
        p2.set("sampler.type", "RANDOM");
        assert!(CpuEngineConfig::from_properties(&p2).is_ok());
    }
}
