//! Execution backends for compositor algorithms
//!
//! Every algorithm has one CPU implementation (rayon over rows) and one GPU
//! implementation (a wgpu compute shader per kernel). The context owns one
//! backend and algorithms dispatch through it, so the same test suite can be
//! run against either.

use crate::context::Device;
use crate::error::Result;
use crate::pad::PaddingMethod;
use crate::result::ResultBuffer;
use crate::texture_pool::TexturePool;
use glam::{IVec2, Vec3, Vec4};

pub mod cpu;
#[cfg(feature = "gpu")]
pub mod gpu;
#[cfg(feature = "gpu")]
pub mod shaders;

pub use cpu::CpuBackend;
#[cfg(feature = "gpu")]
pub use gpu::GpuBackend;

/// Direction of the gamma 2 approximation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GammaMode {
    Correct,
    Uncorrect,
}

impl GammaMode {
    /// Apply gamma to a premultiplied color, keeping alpha
    ///
    /// Color is unpremultiplied first; zero or negative alpha is treated as 1.
    #[inline]
    pub fn apply(self, color: Vec4) -> Vec4 {
        let alpha = if color.w > 0.0 { color.w } else { 1.0 };
        let straight = (color.truncate() / alpha).max(Vec3::ZERO);
        let adjusted = match self {
            GammaMode::Correct => straight * straight,
            GammaMode::Uncorrect => Vec3::new(straight.x.sqrt(), straight.y.sqrt(), straight.z.sqrt()),
        };
        (adjusted * alpha).extend(color.w)
    }
}

/// A strategy executing algorithm kernels on some device
///
/// Outputs passed to backends are already allocated by the algorithm entry
/// points; backends only fill pixels.
pub trait Backend: Send + Sync {
    fn device(&self) -> Device;

    fn name(&self) -> &str;

    /// Gamma correct or uncorrect every pixel of a float4 texture
    fn gamma(&self, input: &ResultBuffer, output: &mut ResultBuffer, mode: GammaMode) -> Result<()>;

    /// Write `input` into `output` offset by `size`, filling the border by `method`
    fn pad(
        &self,
        input: &ResultBuffer,
        output: &mut ResultBuffer,
        size: IVec2,
        method: PaddingMethod,
    ) -> Result<()>;

    /// Run one jump flooding pass per step size, leaving the last pass in `output`
    ///
    /// Passes never overlap: every pixel of one pass is written before the
    /// next pass reads.
    fn jump_flooding(
        &self,
        pool: &TexturePool,
        input: &ResultBuffer,
        output: &mut ResultBuffer,
        step_sizes: &[i32],
    ) -> Result<()>;
}
