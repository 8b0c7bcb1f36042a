//! Core type definitions for compositor results
//!
//! Pixel storage is typed per result kind so kernels work on plain slices
//! (`&[Vec4]`, `&[IVec2]`, ...) and can be uploaded to the GPU as-is.

use bytemuck::Pod;
use glam::{IVec2, Vec2, Vec4};
use std::fmt::Debug;

/// The kind of values a result holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
    Float,
    Float2,
    Vector,
    Color,
    Int2,
}

impl ResultType {
    /// Storage layout used for this type
    pub fn format(self) -> PixelFormat {
        match self {
            ResultType::Float => PixelFormat::Float,
            ResultType::Float2 => PixelFormat::Float2,
            ResultType::Vector | ResultType::Color => PixelFormat::Float4,
            ResultType::Int2 => PixelFormat::Int2,
        }
    }

    pub fn channel_count(self) -> usize {
        match self.format() {
            PixelFormat::Float => 1,
            PixelFormat::Float2 | PixelFormat::Int2 => 2,
            PixelFormat::Float4 => 4,
        }
    }

    pub fn is_float4(self) -> bool {
        self.format() == PixelFormat::Float4
    }
}

/// In-memory layout of a pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Float,
    Float2,
    Float4,
    Int2,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Float => 4,
            PixelFormat::Float2 | PixelFormat::Int2 => 8,
            PixelFormat::Float4 => 16,
        }
    }
}

/// Integer extent of a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Domain {
    pub size: IVec2,
}

impl Domain {
    pub fn new(size: IVec2) -> Self {
        debug_assert!(size.x >= 0 && size.y >= 0, "negative domain size {size}");
        Self { size }
    }

    /// The 1x1 domain of single value results
    pub fn identity() -> Self {
        Self { size: IVec2::ONE }
    }

    pub fn pixel_count(&self) -> usize {
        self.size.x.max(0) as usize * self.size.y.max(0) as usize
    }

    pub fn contains(&self, texel: IVec2) -> bool {
        texel.x >= 0 && texel.y >= 0 && texel.x < self.size.x && texel.y < self.size.y
    }

    /// Row-major buffer index of an in-bounds texel
    #[inline]
    pub fn index(&self, texel: IVec2) -> usize {
        debug_assert!(self.contains(texel), "texel {texel} outside {}", self.size);
        texel.y as usize * self.size.x as usize + texel.x as usize
    }

    /// Clamp a texel to the nearest edge texel
    #[inline]
    pub fn clamp(&self, texel: IVec2) -> IVec2 {
        texel.clamp(IVec2::ZERO, (self.size - IVec2::ONE).max(IVec2::ZERO))
    }
}

/// Typed pixel storage
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    Float(Vec<f32>),
    Float2(Vec<Vec2>),
    Float4(Vec<Vec4>),
    Int2(Vec<IVec2>),
}

impl PixelData {
    /// Allocate `len` zeroed pixels for the given format
    pub fn zeroed(format: PixelFormat, len: usize) -> Self {
        match format {
            PixelFormat::Float => PixelData::Float(vec![0.0; len]),
            PixelFormat::Float2 => PixelData::Float2(vec![Vec2::ZERO; len]),
            PixelFormat::Float4 => PixelData::Float4(vec![Vec4::ZERO; len]),
            PixelFormat::Int2 => PixelData::Int2(vec![IVec2::ZERO; len]),
        }
    }

    pub fn format(&self) -> PixelFormat {
        match self {
            PixelData::Float(_) => PixelFormat::Float,
            PixelData::Float2(_) => PixelFormat::Float2,
            PixelData::Float4(_) => PixelFormat::Float4,
            PixelData::Int2(_) => PixelFormat::Int2,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelData::Float(values) => values.len(),
            PixelData::Float2(values) => values.len(),
            PixelData::Float4(values) => values.len(),
            PixelData::Int2(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes, tightly packed, as uploaded to device buffers
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PixelData::Float(values) => bytemuck::cast_slice(values),
            PixelData::Float2(values) => bytemuck::cast_slice(values),
            PixelData::Float4(values) => bytemuck::cast_slice(values),
            PixelData::Int2(values) => bytemuck::cast_slice(values),
        }
    }

    /// Mutable raw bytes, written by device readbacks
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            PixelData::Float(values) => bytemuck::cast_slice_mut(values),
            PixelData::Float2(values) => bytemuck::cast_slice_mut(values),
            PixelData::Float4(values) => bytemuck::cast_slice_mut(values),
            PixelData::Int2(values) => bytemuck::cast_slice_mut(values),
        }
    }
}

/// A value that can be stored in a result
pub trait Pixel: Pod + PartialEq + Debug + Send + Sync + 'static {
    const FORMAT: PixelFormat;
    const ZERO: Self;

    fn storage(data: &PixelData) -> Option<&[Self]>;
    fn storage_mut(data: &mut PixelData) -> Option<&mut [Self]>;
    fn into_storage(values: Vec<Self>) -> PixelData;
}

macro_rules! impl_pixel {
    ($ty:ty, $variant:ident, $zero:expr) => {
        impl Pixel for $ty {
            const FORMAT: PixelFormat = PixelFormat::$variant;
            const ZERO: Self = $zero;

            fn storage(data: &PixelData) -> Option<&[Self]> {
                match data {
                    PixelData::$variant(values) => Some(values.as_slice()),
                    _ => None,
                }
            }

            fn storage_mut(data: &mut PixelData) -> Option<&mut [Self]> {
                match data {
                    PixelData::$variant(values) => Some(values.as_mut_slice()),
                    _ => None,
                }
            }

            fn into_storage(values: Vec<Self>) -> PixelData {
                PixelData::$variant(values)
            }
        }
    };
}

impl_pixel!(f32, Float, 0.0);
impl_pixel!(Vec2, Float2, Vec2::ZERO);
impl_pixel!(Vec4, Float4, Vec4::ZERO);
impl_pixel!(IVec2, Int2, IVec2::ZERO);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_type_formats() {
        assert_eq!(ResultType::Color.format(), PixelFormat::Float4);
        assert_eq!(ResultType::Vector.format(), PixelFormat::Float4);
        assert_eq!(ResultType::Int2.channel_count(), 2);
        assert_eq!(ResultType::Float.channel_count(), 1);
        assert!(ResultType::Color.is_float4());
        assert!(!ResultType::Float2.is_float4());
    }

    #[test]
    fn test_domain_indexing() {
        let domain = Domain::new(IVec2::new(4, 3));
        assert_eq!(domain.pixel_count(), 12);
        assert_eq!(domain.index(IVec2::new(0, 0)), 0);
        assert_eq!(domain.index(IVec2::new(3, 2)), 11);
        assert!(domain.contains(IVec2::new(3, 2)));
        assert!(!domain.contains(IVec2::new(4, 0)));
        assert!(!domain.contains(IVec2::new(0, -1)));
    }

    #[test]
    fn test_domain_clamp() {
        let domain = Domain::new(IVec2::new(4, 3));
        assert_eq!(domain.clamp(IVec2::new(-5, 10)), IVec2::new(0, 2));
        assert_eq!(domain.clamp(IVec2::new(2, 1)), IVec2::new(2, 1));
    }

    #[test]
    fn test_pixel_data_bytes() {
        let data = PixelData::Int2(vec![IVec2::new(1, -1), IVec2::new(2, 3)]);
        assert_eq!(data.format(), PixelFormat::Int2);
        assert_eq!(data.as_bytes().len(), 2 * PixelFormat::Int2.bytes_per_pixel());

        let mut copy = PixelData::zeroed(PixelFormat::Int2, 2);
        copy.as_bytes_mut().copy_from_slice(data.as_bytes());
        assert_eq!(copy, data);
    }

    #[test]
    fn test_pixel_storage_type_check() {
        let mut data = PixelData::zeroed(PixelFormat::Float4, 2);
        assert!(<Vec4 as Pixel>::storage(&data).is_some());
        assert!(<f32 as Pixel>::storage(&data).is_none());
        assert!(<IVec2 as Pixel>::storage_mut(&mut data).is_none());
    }
}
