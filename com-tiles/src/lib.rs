//! Render Tile Highlighting
//!
//! Tracks which render tiles are in flight so the progress overlay can draw
//! their bounds.
//!
//! Key properties:
//! - Set semantics, highlighting a tile twice keeps one entry
//! - Cached rect list, rebuilt only after a change
//! - One parking_lot mutex, safe to share between render threads and the UI

pub mod highlight;
pub mod types;

pub use highlight::*;
pub use types::*;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_reports_result_tiles() {
        let tracker = TilesHighlight::new();
        let result = RenderResult {
            tilerect: Rect::from_xywh(128, 64, 64, 64),
        };

        tracker.highlight_tile_for_result(&result);

        assert_eq!(tracker.get_all_highlighted_tiles(), vec![result.tilerect]);
    }
}
