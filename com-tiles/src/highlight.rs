//! Thread-safe set of highlighted render tiles
//!
//! Render workers highlight a tile when they start on it and unhighlight it
//! when done; the progress overlay reads the current set on every redraw. The
//! overlay reads far more often than tiles change, so the rect list it reads
//! is cached and only rebuilt after a change.

use crate::types::{Rect, RenderResult, Tile};
use log::trace;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct HighlightState {
    tiles: HashSet<Tile>,
    cached_rects: Vec<Rect>,
    did_tiles_change: bool,
}

impl HighlightState {
    fn rects(&mut self, rebuild_count: &AtomicU64) -> &[Rect] {
        if self.did_tiles_change {
            self.cached_rects.clear();
            self.cached_rects.extend(self.tiles.iter().map(Tile::rect));
            self.did_tiles_change = false;
            rebuild_count.fetch_add(1, Ordering::Relaxed);
        }
        &self.cached_rects
    }
}

/// Tiles currently being rendered
///
/// All operations take one lock, so the tracker can be shared between render
/// threads and the UI through an `Arc`.
#[derive(Default)]
pub struct TilesHighlight {
    state: Mutex<HighlightState>,
    rebuild_count: AtomicU64,
}

impl TilesHighlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highlight(&self, tile: Tile) {
        let mut state = self.state.lock();
        state.tiles.insert(tile);
        state.did_tiles_change = true;
        trace!("highlight tile {:?}", tile.rect());
    }

    pub fn unhighlight(&self, tile: Tile) {
        let mut state = self.state.lock();
        state.tiles.remove(&tile);
        state.did_tiles_change = true;
        trace!("unhighlight tile {:?}", tile.rect());
    }

    pub fn highlight_tile(&self, x: i32, y: i32, width: i32, height: i32) {
        self.highlight(Tile::new(x, y, width, height));
    }

    pub fn unhighlight_tile(&self, x: i32, y: i32, width: i32, height: i32) {
        self.unhighlight(Tile::new(x, y, width, height));
    }

    pub fn highlight_tile_for_result(&self, result: &RenderResult) {
        self.highlight(Tile::from_render_result(result));
    }

    pub fn unhighlight_tile_for_result(&self, result: &RenderResult) {
        self.unhighlight(Tile::from_render_result(result));
    }

    /// Highlight or unhighlight a tile, as reported by render engines
    pub fn set_tile_highlight(&self, x: i32, y: i32, width: i32, height: i32, highlight: bool) {
        if highlight {
            self.highlight_tile(x, y, width, height);
        } else {
            self.unhighlight_tile(x, y, width, height);
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.tiles.clear();
        state.cached_rects.clear();
        state.did_tiles_change = false;
    }

    /// Bounds of every highlighted tile, in no particular order
    pub fn get_all_highlighted_tiles(&self) -> Vec<Rect> {
        self.with_highlighted_tiles(<[Rect]>::to_vec)
    }

    /// Run `f` on the highlighted tile bounds without copying them
    ///
    /// The tracker stays locked while `f` runs; `f` must not call back into it.
    pub fn with_highlighted_tiles<R>(&self, f: impl FnOnce(&[Rect]) -> R) -> R {
        let mut state = self.state.lock();
        f(state.rects(&self.rebuild_count))
    }

    pub fn len(&self) -> usize {
        self.state.lock().tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().tiles.is_empty()
    }

    pub fn contains(&self, tile: Tile) -> bool {
        self.state.lock().tiles.contains(&tile)
    }

    /// Number of times the cached rect list was rebuilt
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count.load(Ordering::Relaxed)
    }
}
