//! Padding results with a border on every side

use crate::context::Context;
use crate::error::Result;
use crate::result::ResultBuffer;
use crate::types::{Domain, PixelFormat};
use glam::IVec2;
use log::debug;

/// How border pixels are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingMethod {
    /// Border is transparent zero; used for colors
    Zero,
    /// Border repeats the nearest edge pixel; used for float and float2
    Extend,
}

impl PaddingMethod {
    /// Whether callers are allowed to pad results of `format` with this method
    pub fn supports(self, format: PixelFormat) -> bool {
        match self {
            PaddingMethod::Zero => format == PixelFormat::Float4,
            PaddingMethod::Extend => matches!(format, PixelFormat::Float | PixelFormat::Float2),
        }
    }
}

/// Pad `input` by `size` pixels on every side into `output`
///
/// Single value inputs are shared as-is since padding a constant changes
/// nothing.
pub fn pad(
    context: &Context,
    input: &ResultBuffer,
    output: &mut ResultBuffer,
    size: IVec2,
    padding_method: PaddingMethod,
) -> Result<()> {
    debug_assert!(size.x >= 0 && size.y >= 0, "negative padding {size}");
    debug_assert!(
        padding_method.supports(input.ty().format()),
        "{padding_method:?} padding is not defined for {:?}",
        input.ty()
    );
    debug_assert_eq!(input.ty().format(), output.ty().format());

    if input.is_single_value() {
        output.share_data(input);
        return Ok(());
    }

    let extended_size = input.domain().size + size * 2;
    debug!(
        "{padding_method:?} padding {} to {extended_size} on {}",
        input.domain().size,
        context.backend().name()
    );
    output.allocate_texture(Domain::new(extended_size));
    if input.domain().pixel_count() == 0 {
        // Nothing to extend from, the border stays zero
        return Ok(());
    }
    context.backend().pad(input, output, size, padding_method)
}
