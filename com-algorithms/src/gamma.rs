//! Gamma correction of premultiplied colors
//!
//! Uses a fixed gamma of 2, so correcting is a square and uncorrecting a
//! square root of the unpremultiplied color. The two are inverses for
//! non-negative colors with positive alpha.

use crate::backend::GammaMode;
use crate::context::Context;
use crate::error::Result;
use crate::result::ResultBuffer;
use glam::Vec4;
use log::debug;

/// Square the unpremultiplied color of every pixel of `input` into `output`
pub fn gamma_correct(context: &Context, input: &ResultBuffer, output: &mut ResultBuffer) -> Result<()> {
    apply_gamma(context, input, output, GammaMode::Correct)
}

/// Square root the unpremultiplied color of every pixel of `input` into `output`
pub fn gamma_uncorrect(
    context: &Context,
    input: &ResultBuffer,
    output: &mut ResultBuffer,
) -> Result<()> {
    apply_gamma(context, input, output, GammaMode::Uncorrect)
}

fn apply_gamma(
    context: &Context,
    input: &ResultBuffer,
    output: &mut ResultBuffer,
    mode: GammaMode,
) -> Result<()> {
    debug_assert!(input.ty().is_float4(), "gamma expects a color, got {:?}", input.ty());
    debug_assert_eq!(input.ty().format(), output.ty().format());

    if input.is_single_value() {
        output.allocate_single_value();
        output.set_single_value(mode.apply(input.get_single_value::<Vec4>()));
        return Ok(());
    }

    debug!("{mode:?} gamma over {} on {}", input.domain().size, context.backend().name());
    output.allocate_texture(input.domain());
    context.backend().gamma(input, output, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResultType;
    use glam::IVec2;

    fn color_result(size: IVec2) -> ResultBuffer {
        let pixels = (0..size.x * size.y)
            .map(|i| {
                let t = i as f32 / (size.x * size.y) as f32;
                let alpha = 0.25 + 0.75 * t;
                Vec4::new(t * alpha, (1.0 - t) * alpha, 0.5 * alpha, alpha)
            })
            .collect();
        ResultBuffer::from_pixels(ResultType::Color, size, pixels).unwrap()
    }

    #[test]
    fn test_gamma_correct_allocates_output() {
        let context = Context::cpu();
        let input = color_result(IVec2::new(6, 4));
        let mut output = context.create_result(ResultType::Color);

        gamma_correct(&context, &input, &mut output).unwrap();

        assert!(output.is_allocated());
        assert_eq!(output.domain(), input.domain());
        for (original, corrected) in input.pixels::<Vec4>().iter().zip(output.pixels::<Vec4>()) {
            assert_eq!(*corrected, GammaMode::Correct.apply(*original));
        }
    }

    #[test]
    fn test_gamma_round_trip() {
        let context = Context::cpu();
        let input = color_result(IVec2::new(9, 7));
        let mut corrected = context.create_result(ResultType::Color);
        let mut restored = context.create_result(ResultType::Color);

        gamma_correct(&context, &input, &mut corrected).unwrap();
        gamma_uncorrect(&context, &corrected, &mut restored).unwrap();

        for (original, round_trip) in input.pixels::<Vec4>().iter().zip(restored.pixels::<Vec4>()) {
            assert!((*original - *round_trip).abs().max_element() < 1e-5);
        }
    }

    #[test]
    fn test_gamma_single_value() {
        let context = Context::cpu();
        let input = ResultBuffer::from_single_value(ResultType::Color, Vec4::new(0.5, 0.5, 0.5, 1.0));
        let mut output = context.create_result(ResultType::Color);

        gamma_uncorrect(&context, &input, &mut output).unwrap();

        assert!(output.is_single_value());
        let value = output.get_single_value::<Vec4>();
        assert!((value.x - 0.5f32.sqrt()).abs() < 1e-6);
        assert_eq!(value.w, 1.0);
    }
}
