//! Tile highlight FFI bindings
//!
//! C-compatible API over `TilesHighlight` for render engines reporting tiles
//! and the UI drawing them.

use com_tiles::{Rect, TilesHighlight};
use libc::{c_int, size_t};
use std::ptr;

/// Opaque handle to TilesHighlight (C-compatible)
pub struct COMTilesHighlight {
    _private: [u8; 0],
}

// ============================================================================
// TILE HIGHLIGHT API
// ============================================================================

/// Create an empty tile tracker
///
/// # Safety
/// Safe to call. The handle must be released with `com_tiles_highlight_destroy`.
#[no_mangle]
pub unsafe extern "C" fn com_tiles_highlight_create() -> *mut COMTilesHighlight {
    let tracker = Box::new(TilesHighlight::new());
    Box::into_raw(tracker) as *mut COMTilesHighlight
}

/// Destroy a tile tracker
///
/// # Safety
/// Caller must ensure ptr is valid and not already freed.
#[no_mangle]
pub unsafe extern "C" fn com_tiles_highlight_destroy(ptr: *mut COMTilesHighlight) {
    if !ptr.is_null() {
        let _ = Box::from_raw(ptr as *mut TilesHighlight);
    }
}

unsafe fn tracker<'a>(ptr: *const COMTilesHighlight) -> Option<&'a TilesHighlight> {
    (ptr as *const TilesHighlight).as_ref()
}

/// Highlight the tile at `(x, y)` of the given size
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn com_tiles_highlight_highlight_tile(
    ptr: *const COMTilesHighlight,
    x: c_int,
    y: c_int,
    width: c_int,
    height: c_int,
) {
    if let Some(tracker) = tracker(ptr) {
        tracker.highlight_tile(x, y, width, height);
    }
}

/// Unhighlight the tile at `(x, y)` of the given size
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn com_tiles_highlight_unhighlight_tile(
    ptr: *const COMTilesHighlight,
    x: c_int,
    y: c_int,
    width: c_int,
    height: c_int,
) {
    if let Some(tracker) = tracker(ptr) {
        tracker.unhighlight_tile(x, y, width, height);
    }
}

/// Highlight (non-zero `highlight`) or unhighlight a tile
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn com_tiles_highlight_set_tile_highlight(
    ptr: *const COMTilesHighlight,
    x: c_int,
    y: c_int,
    width: c_int,
    height: c_int,
    highlight: c_int,
) {
    if let Some(tracker) = tracker(ptr) {
        tracker.set_tile_highlight(x, y, width, height, highlight != 0);
    }
}

/// Remove every highlighted tile
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn com_tiles_highlight_clear(ptr: *const COMTilesHighlight) {
    if let Some(tracker) = tracker(ptr) {
        tracker.clear();
    }
}

/// Number of highlighted tiles
///
/// # Safety
/// Caller must ensure ptr is valid.
#[no_mangle]
pub unsafe extern "C" fn com_tiles_highlight_count(ptr: *const COMTilesHighlight) -> size_t {
    tracker(ptr).map_or(0, TilesHighlight::len)
}

/// Copy up to `capacity` highlighted tile rects into `out`
///
/// Returns the total number of highlighted tiles, which may exceed
/// `capacity`. Passing a null `out` only queries the count.
///
/// # Safety
/// Caller must ensure ptr is valid and `out` points to `capacity` writable rects.
#[no_mangle]
pub unsafe extern "C" fn com_tiles_highlight_copy_tiles(
    ptr: *const COMTilesHighlight,
    out: *mut Rect,
    capacity: size_t,
) -> size_t {
    let Some(tracker) = tracker(ptr) else {
        return 0;
    };

    tracker.with_highlighted_tiles(|rects| {
        if !out.is_null() {
            let count = rects.len().min(capacity);
            ptr::copy_nonoverlapping(rects.as_ptr(), out, count);
        }
        rects.len()
    })
}
