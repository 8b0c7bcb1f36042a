//! Tile bounds reported by render workers

/// Integer pixel rectangle, max bounds exclusive
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub xmin: i32,
    pub xmax: i32,
    pub ymin: i32,
    pub ymax: i32,
}

impl Rect {
    pub fn new(xmin: i32, xmax: i32, ymin: i32, ymax: i32) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    /// Rectangle at `(x, y)` of the given size
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, x + width, y, y + height)
    }

    pub fn width(&self) -> i32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> i32 {
        self.ymax - self.ymin
    }
}

/// A render tile, identified by its bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    rect: Rect,
}

impl Tile {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            rect: Rect::from_xywh(x, y, width, height),
        }
    }

    pub fn from_render_result(result: &RenderResult) -> Self {
        Self {
            rect: result.tilerect,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }
}

impl From<Rect> for Tile {
    fn from(rect: Rect) -> Self {
        Self { rect }
    }
}

/// The part of a render result the tracker reads
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderResult {
    pub tilerect: Rect,
}
