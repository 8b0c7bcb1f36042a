//! Typed 2D result buffers
//!
//! A `ResultBuffer` is what compositor operations read from and write to. It is
//! either a full texture covering its domain or a single value standing in
//! for a constant image. Storage is reference counted so results can share
//! data cheaply; writes to shared storage copy it first.

use crate::error::{ComError, Result};
use crate::texture_pool::TexturePool;
use crate::types::{Domain, Pixel, PixelData, ResultType};
use glam::IVec2;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

pub struct ResultBuffer {
    ty: ResultType,
    domain: Domain,
    data: Option<Arc<PixelData>>,
    is_single_value: bool,
}

impl ResultBuffer {
    /// Create an unallocated result of the given type
    pub fn new(ty: ResultType) -> Self {
        Self {
            ty,
            domain: Domain::identity(),
            data: None,
            is_single_value: false,
        }
    }

    /// Create an allocated texture from row-major pixels
    pub fn from_pixels<T: Pixel>(ty: ResultType, size: IVec2, pixels: Vec<T>) -> Result<Self> {
        assert_eq!(T::FORMAT, ty.format(), "pixel type does not match {ty:?}");
        let domain = Domain::new(size);
        if pixels.len() != domain.pixel_count() {
            return Err(ComError::DataSizeMismatch {
                expected: domain.pixel_count(),
                actual: pixels.len(),
            });
        }

        Ok(Self {
            ty,
            domain,
            data: Some(Arc::new(T::into_storage(pixels))),
            is_single_value: false,
        })
    }

    /// Create a single value result holding `value`
    pub fn from_single_value<T: Pixel>(ty: ResultType, value: T) -> Self {
        let mut result = Self::new(ty);
        result.allocate_single_value();
        result.set_single_value(value);
        result
    }

    pub fn ty(&self) -> ResultType {
        self.ty
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn is_single_value(&self) -> bool {
        self.is_single_value
    }

    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// Allocate zeroed storage covering `domain`
    pub fn allocate_texture(&mut self, domain: Domain) {
        let data = PixelData::zeroed(self.ty.format(), domain.pixel_count());
        self.set_texture(domain, data);
    }

    /// Allocate storage covering `domain` from a texture pool
    ///
    /// Reused storage is not cleared; callers must write every pixel.
    pub fn allocate_texture_from(&mut self, pool: &TexturePool, domain: Domain) {
        let data = pool.acquire(self.ty, domain.size);
        self.set_texture(domain, data);
    }

    fn set_texture(&mut self, domain: Domain, data: PixelData) {
        debug_assert_eq!(data.len(), domain.pixel_count());
        self.domain = domain;
        self.data = Some(Arc::new(data));
        self.is_single_value = false;
    }

    /// Allocate storage for a single value, initialized to zero
    pub fn allocate_single_value(&mut self) {
        self.domain = Domain::identity();
        self.data = Some(Arc::new(PixelData::zeroed(self.ty.format(), 1)));
        self.is_single_value = true;
    }

    pub fn set_single_value<T: Pixel>(&mut self, value: T) {
        assert!(self.is_single_value, "result is not a single value");
        self.pixels_mut::<T>()[0] = value;
    }

    pub fn get_single_value<T: Pixel>(&self) -> T {
        assert!(self.is_single_value, "result is not a single value");
        self.pixels::<T>()[0]
    }

    /// Make this result reference the storage of `source`
    pub fn share_data(&mut self, source: &ResultBuffer) {
        debug_assert_eq!(self.ty.format(), source.ty.format());
        self.domain = source.domain;
        self.data = source.data.clone();
        self.is_single_value = source.is_single_value;
    }

    /// Move the storage of `source` into this result, leaving `source` unallocated
    pub fn steal_data(&mut self, source: &mut ResultBuffer) {
        debug_assert_eq!(self.ty.format(), source.ty.format());
        self.domain = source.domain;
        self.data = source.data.take();
        self.is_single_value = source.is_single_value;
        source.is_single_value = false;
    }

    /// Drop this result's storage
    ///
    /// Returns the storage if no other result shares it, so it can be
    /// recycled.
    pub fn release(&mut self) -> Option<(Domain, PixelData)> {
        let data = self.data.take()?;
        self.is_single_value = false;
        Arc::try_unwrap(data).ok().map(|data| (self.domain, data))
    }

    /// All pixels in row-major order
    pub fn pixels<T: Pixel>(&self) -> &[T] {
        let data = self
            .data
            .as_deref()
            .unwrap_or_else(|| panic!("{:?} result is not allocated", self.ty));
        T::storage(data)
            .unwrap_or_else(|| panic!("{:?} result read as {:?}", self.ty, T::FORMAT))
    }

    /// Mutable pixels; copies the storage first if it is shared
    pub fn pixels_mut<T: Pixel>(&mut self) -> &mut [T] {
        let ty = self.ty;
        let data = self
            .data
            .as_mut()
            .unwrap_or_else(|| panic!("{ty:?} result is not allocated"));
        T::storage_mut(Arc::make_mut(data))
            .unwrap_or_else(|| panic!("{ty:?} result written as {:?}", T::FORMAT))
    }

    /// Raw bytes of the storage
    pub fn bytes(&self) -> &[u8] {
        match self.data.as_deref() {
            Some(data) => data.as_bytes(),
            None => panic!("{:?} result is not allocated", self.ty),
        }
    }

    /// Mutable raw bytes; copies the storage first if it is shared
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        match self.data.as_mut() {
            Some(data) => Arc::make_mut(data).as_bytes_mut(),
            None => panic!("{:?} result is not allocated", self.ty),
        }
    }

    #[inline]
    pub fn load_pixel<T: Pixel>(&self, texel: IVec2) -> T {
        if self.is_single_value {
            return self.pixels::<T>()[0];
        }
        self.pixels::<T>()[self.domain.index(texel)]
    }

    /// Load a pixel, returning zero outside the domain
    #[inline]
    pub fn load_pixel_zero<T: Pixel>(&self, texel: IVec2) -> T {
        self.load_pixel_fallback(texel, T::ZERO)
    }

    /// Load a pixel, clamping the texel to the domain edges
    #[inline]
    pub fn load_pixel_extended<T: Pixel>(&self, texel: IVec2) -> T {
        if self.is_single_value {
            return self.pixels::<T>()[0];
        }
        self.pixels::<T>()[self.domain.index(self.domain.clamp(texel))]
    }

    /// Load a pixel, returning `fallback` outside the domain
    #[inline]
    pub fn load_pixel_fallback<T: Pixel>(&self, texel: IVec2, fallback: T) -> T {
        if self.is_single_value {
            return self.pixels::<T>()[0];
        }
        if !self.domain.contains(texel) {
            return fallback;
        }
        self.pixels::<T>()[self.domain.index(texel)]
    }

    #[inline]
    pub fn store_pixel<T: Pixel>(&mut self, texel: IVec2, value: T) {
        let index = self.domain.index(texel);
        self.pixels_mut::<T>()[index] = value;
    }

    /// Compute every pixel of the domain in parallel, one row per task
    ///
    /// Runs on the current rayon pool; wrap in `ThreadPool::install` to pick
    /// another one.
    pub fn par_fill<T, F>(&mut self, kernel: F)
    where
        T: Pixel,
        F: Fn(IVec2) -> T + Sync + Send,
    {
        let width = self.domain.size.x.max(1) as usize;
        let pixels = self.pixels_mut::<T>();
        if pixels.is_empty() {
            return;
        }

        pixels
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, pixel) in row.iter_mut().enumerate() {
                    *pixel = kernel(IVec2::new(x as i32, y as i32));
                }
            });
    }
}

impl fmt::Debug for ResultBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultBuffer")
            .field("ty", &self.ty)
            .field("size", &self.domain.size)
            .field("allocated", &self.is_allocated())
            .field("single_value", &self.is_single_value)
            .finish()
    }
}
