//! Texture pool recycling result storage between operations
//!
//! Multi-pass algorithms (jump flooding in particular) need intermediate
//! buffers of the same size on every invocation. The pool keeps released
//! storage keyed by format and size so the next request skips the allocation.

use crate::types::{Domain, PixelData, PixelFormat, ResultType};
use glam::IVec2;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PoolKey {
    format: PixelFormat,
    size: IVec2,
}

/// Pool of released pixel buffers
#[derive(Default)]
pub struct TexturePool {
    textures: Mutex<HashMap<PoolKey, Vec<PixelData>>>,
    allocated: AtomicU64,
    reused: AtomicU64,
}

impl TexturePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire storage for a `size` texture of type `ty`
    ///
    /// Reused storage keeps its previous contents.
    pub fn acquire(&self, ty: ResultType, size: IVec2) -> PixelData {
        let key = PoolKey {
            format: ty.format(),
            size,
        };

        if let Some(data) = self.textures.lock().get_mut(&key).and_then(Vec::pop) {
            self.reused.fetch_add(1, Ordering::Relaxed);
            return data;
        }

        self.allocated.fetch_add(1, Ordering::Relaxed);
        PixelData::zeroed(key.format, Domain::new(size).pixel_count())
    }

    /// Return storage covering `domain` to the pool
    pub fn release(&self, domain: Domain, data: PixelData) {
        debug_assert_eq!(data.len(), domain.pixel_count());
        let key = PoolKey {
            format: data.format(),
            size: domain.size,
        };
        self.textures.lock().entry(key).or_default().push(data);
    }

    /// Drop every pooled buffer
    pub fn clear(&self) {
        self.textures.lock().clear();
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        let available = self.textures.lock().values().map(Vec::len).sum();

        PoolStats {
            allocated: self.allocated.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            available,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers created because nothing matching was pooled
    pub allocated: u64,
    /// Requests served from the pool
    pub reused: u64,
    /// Buffers currently waiting in the pool
    pub available: usize,
}
