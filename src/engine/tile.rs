//! The tile scheduler (§4.H "Tile repository"), grounded on
//! `slg::TileRepository`/`slg::Tile` (`examples/original_source/include/
//! slg/engines/tilerepository.h`). Partitions a film's sub-region into
//! fixed-size tiles, orders them along a Hilbert curve, and hands each
//! worker thread the least-rendered tile under a mutex — merging that
//! worker's previous tile-local film into the main film first.
//!
//! The serialization half of the teacher's header (`BOOST_CLASS_EXPORT`,
//! `save`/`load`) is a persistence concern the core does not mandate a
//! specific encoding for (§6 "Render state") and is left to the embedder.

use crate::film::filter::Filter;
use crate::film::Film;
use crate::pbrt::Float;
use std::collections::BinaryHeap;
use std::sync::Mutex;

/// A tile's position within the film, in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Per-tile convergence-test and pass-accounting state (`slg::Tile`).
pub struct Tile {
    pub coord: TileCoord,
    pub pass: u32,
    pub pending_passes: u32,
    pub error: Float,
    pub done: bool,

    all_pass_film: Film,
    even_pass_film: Option<Film>,
    all_pass_film_total_y: Float,
    has_enough_warmup_samples: bool,
}

impl Tile {
    fn new(coord: TileCoord, num_groups: usize, filter: &dyn Filter, enable_convergence_test: bool) -> Self {
        let even_pass_film = if enable_convergence_test {
            Some(Film::new(coord.width as usize, coord.height as usize, num_groups, filter))
        } else {
            None
        };
        Self {
            coord,
            pass: 0,
            pending_passes: 0,
            error: Float::INFINITY,
            done: false,
            all_pass_film: Film::new(coord.width as usize, coord.height as usize, num_groups, filter),
            even_pass_film,
            all_pass_film_total_y: 0.0,
            has_enough_warmup_samples: false,
        }
    }

    fn restart(&mut self, pass: u32) {
        self.pass = pass;
        self.pending_passes = 0;
        self.error = Float::INFINITY;
        self.done = false;
        self.has_enough_warmup_samples = false;
        self.all_pass_film.clear_per_pixel();
        if let Some(even) = self.even_pass_film.as_mut() {
            even.clear_per_pixel();
        }
    }

    /// Mutable access to this tile's own private film, for a worker to
    /// render a pass into before handing it back through `NextTile`.
    pub fn film_mut(&mut self) -> &mut Film {
        &mut self.all_pass_film
    }

    pub fn film(&self) -> &Film {
        &self.all_pass_film
    }

    /// Sum of per-pixel luminance over the tile, as of the last
    /// convergence test (`allPassFilmTotalYValue`); exposed for the
    /// repository's aggregate progress statistics.
    pub fn total_y(&self) -> Float {
        self.all_pass_film_total_y
    }

    /// Folds a just-rendered pass into the tile's bookkeeping
    /// (`Tile::AddPass`): every second pass also accumulates into the
    /// even-pass film used by the convergence test.
    fn add_pass(&mut self, rendered_pass_film: &Film) {
        self.all_pass_film.merge(rendered_pass_film);
        if self.pass % 2 == 0 {
            if let Some(even) = self.even_pass_film.as_mut() {
                even.merge(rendered_pass_film);
            }
        }
        self.pass += 1;
        if self.pending_passes > 0 {
            self.pending_passes -= 1;
        }
    }

    /// `CheckConvergence`: per-pixel luminance error between the all-pass
    /// and even-pass films, weighted by each pixel's luminance, reduced
    /// by the max over pixels (§4.H).
    fn check_convergence(&mut self, threshold: Float, warmup_samples: u32) {
        let Some(even) = self.even_pass_film.as_ref() else {
            self.done = false;
            return;
        };
        if !self.has_enough_warmup_samples {
            if self.pass < warmup_samples {
                return;
            }
            self.has_enough_warmup_samples = true;
        }

        let (w, h) = (self.coord.width as usize, self.coord.height as usize);
        let num_groups = 1;
        let mut max_error: Float = 0.0;
        let mut total_y: Float = 0.0;
        for y in 0..h {
            for x in 0..w {
                let all = self.all_pass_film.pixel_radiance_raw(x, y, 0);
                let ev = even.pixel_radiance_raw(x, y, 0);
                let y_all = all.y();
                total_y += y_all;
                let diff = (y_all - ev.y() * 2.0).abs();
                let weight = y_all.max(1e-6);
                let error = diff / weight;
                if error > max_error {
                    max_error = error;
                }
            }
        }
        let _ = num_groups;
        self.all_pass_film_total_y = total_y;
        self.error = max_error;
        self.done = max_error <= threshold;
    }
}

/// A tile handed to a worker thread, plus which pass/multipass cycle it
/// should render (`slg::TileWork`).
pub struct TileWork {
    tile_index: Option<usize>,
    pub pass_to_render: u32,
    pub multipass_index_to_render: u32,
}

impl Default for TileWork {
    fn default() -> Self {
        Self {
            tile_index: None,
            pass_to_render: 0,
            multipass_index_to_render: 0,
        }
    }
}

impl TileWork {
    pub fn has_work(&self) -> bool {
        self.tile_index.is_some()
    }

    pub fn reset(&mut self) {
        self.tile_index = None;
    }
}

/// Priority-queue ordering key: fewest-passes-first, stable by insertion
/// order (`slg::TileRepository::CompareTilesPtr` + `boost::heap::stable`).
#[derive(Copy, Clone, Eq, PartialEq)]
struct QueueKey {
    pass: u32,
    seq: u64,
    tile_index: usize,
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap; we want fewest passes first, and for
        // equal pass counts, earliest insertion first (stability).
        other.pass.cmp(&self.pass).then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Copy, Clone, Debug)]
pub struct MultipassConfig {
    pub enable: bool,
    pub convergence_test_threshold: Float,
    pub convergence_test_threshold_reduction: Float,
    pub convergence_test_warmup_count: u32,
    /// When set, the convergence test is active (an `evenPassFilm` is
    /// tracked per tile).
    pub enable_convergence_test: bool,
    /// `enableFirstPassClear` (§4.H): clears the main film's per-pixel
    /// buckets at the start of each multipass cycle.
    pub enable_first_pass_clear: bool,
}

struct Inner {
    tiles: Vec<Tile>,
    todo: BinaryHeap<QueueKey>,
    pending_count: usize,
    converged: Vec<usize>,
    next_seq: u64,
    multipass_index: u32,
    convergence_threshold: Float,
    done: bool,
}

/// `slg::TileRepository`. Owns every tile plus the scheduling state;
/// every public method that touches `Inner` takes the mutex internally,
/// matching §5's "every call is guarded by its internal mutex."
pub struct TileRepository {
    pub tile_width: u32,
    pub tile_height: u32,
    pub multipass: MultipassConfig,
    num_groups: usize,
    inner: Mutex<Inner>,
}

impl TileRepository {
    pub fn new(tile_width: u32, tile_height: u32, multipass: MultipassConfig, num_groups: usize) -> Self {
        Self {
            tile_width,
            tile_height,
            multipass,
            num_groups,
            inner: Mutex::new(Inner {
                tiles: Vec::new(),
                todo: BinaryHeap::new(),
                pending_count: 0,
                converged: Vec::new(),
                next_seq: 0,
                multipass_index: 0,
                convergence_threshold: multipass.convergence_test_threshold,
                done: false,
            }),
        }
    }

    /// `InitTiles`: partitions `film`'s `width x height` region into
    /// `ceil(width/tileWidth) x ceil(height/tileHeight)` tiles, in
    /// Hilbert-curve order, and pushes them all onto the todo queue.
    pub fn init_tiles(&self, film_width: u32, film_height: u32, filter: &dyn Filter) {
        let n_cols = film_width.div_ceil(self.tile_width);
        let n_rows = film_height.div_ceil(self.tile_height);
        let coords = hilbert_tile_order(n_cols, n_rows, self.tile_width, self.tile_height, film_width, film_height);

        let mut inner = self.inner.lock().unwrap();
        inner.tiles.clear();
        inner.todo.clear();
        inner.pending_count = 0;
        inner.converged.clear();
        inner.multipass_index = 0;
        inner.convergence_threshold = self.multipass.convergence_test_threshold;
        inner.done = false;

        for coord in coords {
            let idx = inner.tiles.len();
            inner.tiles.push(Tile::new(coord, self.num_groups, filter, self.multipass.enable_convergence_test));
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.todo.push(QueueKey { pass: 0, seq, tile_index: idx });
        }
    }

    pub fn is_done(&self) -> bool {
        self.inner.lock().unwrap().done
    }

    pub fn tile_count(&self) -> usize {
        self.inner.lock().unwrap().tiles.len()
    }

    /// Coordinates of every tile, in scheduling order at init time. Used
    /// by tests to verify full film coverage (§8 property 8).
    pub fn all_coords(&self) -> Vec<TileCoord> {
        self.inner.lock().unwrap().tiles.iter().map(|t| t.coord).collect()
    }

    pub fn min_pass(&self) -> u32 {
        self.inner.lock().unwrap().tiles.iter().map(|t| t.pass).min().unwrap_or(0)
    }

    /// `NextTile`: merges the caller's just-finished tile film into the
    /// main film (if any), runs the convergence test, then assigns the
    /// next tile. Returns `false` once every tile is converged/done and
    /// multipass rendering (if enabled) has also run to completion.
    pub fn next_tile(&self, main_film: &mut Film, tile_work: &mut TileWork, finished_tile_film: Option<&Film>) -> bool {
        let mut inner = self.inner.lock().unwrap();

        if let (Some(idx), Some(finished)) = (tile_work.tile_index, finished_tile_film) {
            main_film.merge(finished);
            inner.pending_count = inner.pending_count.saturating_sub(1);
            let tile = &mut inner.tiles[idx];
            tile.add_pass(finished);
            let threshold = inner.convergence_threshold;
            let warmup = self.multipass.convergence_test_warmup_count;
            tile.check_convergence(threshold, warmup);
            if tile.done {
                inner.converged.push(idx);
            } else {
                let pass = tile.pass;
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.todo.push(QueueKey { pass, seq, tile_index: idx });
            }
        }
        tile_work.reset();

        loop {
            // Prefer a tile with no pass already in flight; only hand out
            // a second concurrent pass on the same tile (oversubscription)
            // once every other todo tile already has one pending.
            let mut deferred = Vec::new();
            let mut picked = None;
            while let Some(key) = inner.todo.pop() {
                if inner.tiles[key.tile_index].pending_passes == 0 {
                    picked = Some(key);
                    break;
                }
                deferred.push(key);
            }
            if picked.is_none() {
                picked = deferred.pop();
            }
            for key in deferred {
                inner.todo.push(key);
            }

            if let Some(key) = picked {
                inner.pending_count += 1;
                let tile = &mut inner.tiles[key.tile_index];
                tile.pending_passes += 1;
                tile_work.tile_index = Some(key.tile_index);
                tile_work.pass_to_render = tile.pass;
                tile_work.multipass_index_to_render = inner.multipass_index;
                return true;
            }

            if inner.pending_count > 0 {
                return false;
            }

            if self.multipass.enable {
                let reduction = self.multipass.convergence_test_threshold_reduction;
                if reduction > 0.0 {
                    inner.convergence_threshold *= reduction;
                }
                inner.multipass_index += 1;
                let pass = inner.multipass_index;
                let first_clear = self.multipass.enable_first_pass_clear;
                let converged_restart: Vec<usize> = inner.converged.drain(..).collect();
                for idx in converged_restart {
                    inner.tiles[idx].restart(0);
                }
                for (i, tile) in inner.tiles.iter_mut().enumerate() {
                    if first_clear {
                        tile.restart(0);
                    }
                    let seq = inner.next_seq;
                    inner.next_seq += 1;
                    inner.todo.push(QueueKey { pass: tile.pass, seq, tile_index: i });
                }
                let _ = pass;
                if first_clear {
                    main_film.clear_per_pixel();
                }
                continue;
            }

            inner.done = true;
            return false;
        }
    }

    /// Coordinates of the tile currently assigned to `tile_work`, so a
    /// worker can size (or resize) its private per-pass film before
    /// rendering into it (§4.J "each thread owns a private tile-sized
    /// film").
    pub fn assigned_coord(&self, tile_work: &TileWork) -> Option<TileCoord> {
        let idx = tile_work.tile_index?;
        Some(self.inner.lock().unwrap().tiles[idx].coord)
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }
}

/// Generates tile coordinates for an `n_cols x n_rows` grid, ordered
/// along a Hilbert space-filling curve so spatially adjacent tiles are
/// also adjacent in schedule order (`HilberCurveTiles`, spelling kept
/// faithful to neither teacher nor original — named for what it does).
/// The curve is built over the smallest power-of-two grid containing
/// both dimensions; cells outside the actual grid are skipped.
fn hilbert_tile_order(n_cols: u32, n_rows: u32, tile_w: u32, tile_h: u32, film_w: u32, film_h: u32) -> Vec<TileCoord> {
    let side = n_cols.max(n_rows).max(1).next_power_of_two();
    let mut order = Vec::with_capacity((n_cols * n_rows) as usize);
    for d in 0..(side as u64 * side as u64) {
        let (x, y) = hilbert_d2xy(side, d);
        if x < n_cols && y < n_rows {
            order.push((x, y));
        }
    }

    order
        .into_iter()
        .map(|(cx, cy)| {
            let x = cx * tile_w;
            let y = cy * tile_h;
            TileCoord {
                x,
                y,
                width: tile_w.min(film_w.saturating_sub(x)),
                height: tile_h.min(film_h.saturating_sub(y)),
            }
        })
        .collect()
}

/// Converts a Hilbert-curve distance to `(x, y)` on a `side x side` grid
/// (`side` a power of two), the standard rotate-and-reflect construction.
fn hilbert_d2xy(side: u32, d: u64) -> (u32, u32) {
    let mut rx;
    let mut ry;
    let mut t = d;
    let (mut x, mut y) = (0u64, 0u64);
    let mut s = 1u64;
    while s < side as u64 {
        rx = 1 & (t / 2);
        ry = 1 & (t ^ rx);
        if ry == 0 {
            if rx == 1 {
                x = s - 1 - x;
                y = s - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        x += s * rx;
        y += s * ry;
        t /= 4;
        s *= 2;
    }
    (x as u32, y as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film::filter::BoxFilter;

    fn filter() -> BoxFilter {
        BoxFilter { x_width: 0.5, y_width: 0.5 }
    }
    fn default_multipass() -> MultipassConfig {
        MultipassConfig {
            enable: false,
            convergence_test_threshold: 0.05,
            convergence_test_threshold_reduction: 0.0,
            convergence_test_warmup_count: 1,
            enable_convergence_test: true,
            enable_first_pass_clear: false,
        }
    }

    #[test]
    fn init_tiles_covers_film_region_exactly_once() {
        let repo = TileRepository::new(32, 32, default_multipass(), 1);
        let f = filter();
        repo.init_tiles(128, 128, &f);
        let coords = repo.all_coords();
        assert_eq!(coords.len(), 16);

        let mut covered = vec![false; 128 * 128];
        for c in coords {
            for y in c.y..(c.y + c.height) {
                for x in c.x..(c.x + c.width) {
                    let idx = (y * 128 + x) as usize;
                    assert!(!covered[idx], "pixel ({x},{y}) covered twice");
                    covered[idx] = true;
                }
            }
        }
        assert!(covered.iter().all(|&c| c));
    }

    #[test]
    fn non_multiple_of_tile_size_still_covers_exactly() {
        let repo = TileRepository::new(32, 32, default_multipass(), 1);
        let f = filter();
        repo.init_tiles(100, 70, &f);
        let coords = repo.all_coords();
        let mut covered = vec![false; 100 * 70];
        for c in coords {
            assert!(c.x + c.width <= 100 && c.y + c.height <= 70);
            for y in c.y..(c.y + c.height) {
                for x in c.x..(c.x + c.width) {
                    let idx = (y * 100 + x) as usize;
                    assert!(!covered[idx]);
                    covered[idx] = true;
                }
            }
        }
        assert!(covered.iter().all(|&c| c));
    }

    #[test]
    fn next_tile_assigns_fewest_passes_first() {
        let repo = TileRepository::new(64, 64, default_multipass(), 1);
        let f = filter();
        repo.init_tiles(128, 64, &f);
        let mut film = Film::new(128, 64, 1, &f);

        let mut w1 = TileWork::default();
        assert!(repo.next_tile(&mut film, &mut w1, None));
        let first_idx = w1.tile_index.unwrap();

        // Finish the first tile's pass (bumping it to pass 1) before
        // asking for the next one.
        let scratch = Film::new(64, 64, 1, &f);
        let mut w1b = TileWork { tile_index: Some(first_idx), pass_to_render: 0, multipass_index_to_render: 0 };
        assert!(repo.next_tile(&mut film, &mut w1b, Some(&scratch)));
        // Every other tile is still at pass 0, so the freshly-bumped
        // tile (now pass 1) must not be reassigned before them.
        assert_ne!(w1b.tile_index, Some(first_idx));
    }

    #[test]
    fn done_once_every_tile_converges_without_multipass() {
        let cfg = MultipassConfig {
            enable: false,
            convergence_test_threshold: 1.0,
            convergence_test_threshold_reduction: 0.0,
            convergence_test_warmup_count: 0,
            enable_convergence_test: true,
            enable_first_pass_clear: false,
        };
        let repo = TileRepository::new(64, 64, cfg, 1);
        let f = filter();
        repo.init_tiles(64, 64, &f);
        let mut film = Film::new(64, 64, 1, &f);

        let mut work = TileWork::default();
        assert!(repo.next_tile(&mut film, &mut work, None));
        let scratch = Film::new(64, 64, 1, &f);
        // threshold 1.0 with warmup 0 converges immediately (error <= 1.0
        // trivially once `has_enough_warmup_samples` flips).
        assert!(!repo.next_tile(&mut film, &mut work, Some(&scratch)) || repo.is_done());
    }
}
