//! Jump flooding: nearest seed propagation in a logarithmic number of passes
//!
//! Implements the 1+JFA variant of "Variants of Jump Flooding Algorithm for
//! Computing Discrete Voronoi Diagrams" (Rong & Tan, ISVD 2007). The input is
//! an `Int2` result where seed pixels hold their own texel and every other
//! pixel holds `JUMP_FLOODING_NON_FLOODED_VALUE`, see
//! `initialize_jump_flooding_value`. The output holds, for every pixel, the
//! texel of its (approximately) closest seed.
//!
//! The algorithm first runs a pass with a step size of 1, then passes with
//! step sizes of half the power of two enclosing the image, halving down to
//! 1. That is `ceil(log2(n)) + 1` passes for an `n` pixel wide image, each
//! pass linear in the pixel count regardless of how many seeds exist.
//!
//! In a pass, every pixel looks at the 3x3 grid of pixels spaced `step size`
//! apart around it, itself included, and keeps the closest seed any of them
//! knows about. Passes are double buffered.

use crate::context::Context;
use crate::error::Result;
use crate::result::ResultBuffer;
use crate::types::ResultType;
use glam::IVec2;
use log::debug;
use rayon::prelude::*;

/// Marks pixels no seed has reached yet
pub const JUMP_FLOODING_NON_FLOODED_VALUE: IVec2 = IVec2::splat(-1);

/// Largest image side for which squared distances fit in `i32`
pub const MAX_JUMP_FLOODING_SIZE: i32 = 32768;

/// Masks with values above this are seeds in `seeds_from_mask`
pub const SEED_MASK_THRESHOLD: f32 = 0.5;

/// Initial value of a pixel in a jump flooding input
#[inline]
pub fn initialize_jump_flooding_value(texel: IVec2, is_seed: bool) -> IVec2 {
    if is_seed {
        texel
    } else {
        JUMP_FLOODING_NON_FLOODED_VALUE
    }
}

/// Value written by a pass for a pixel whose closest seed is `closest_seed_texel`
#[inline]
pub fn encode_jump_flooding_value(closest_seed_texel: IVec2, is_flooded: bool) -> IVec2 {
    if is_flooded {
        closest_seed_texel
    } else {
        JUMP_FLOODING_NON_FLOODED_VALUE
    }
}

/// Step sizes of every pass for an image of the given size
pub fn jump_flooding_step_sizes(size: IVec2) -> Vec<i32> {
    let max_size = size.x.max(size.y).max(1) as u32;

    let mut step_sizes = vec![1];
    let mut step_size = max_size.next_power_of_two() / 2;
    while step_size != 0 {
        step_sizes.push(step_size as i32);
        step_size /= 2;
    }
    step_sizes
}

/// Compute one pixel of a jump flooding pass
///
/// Neighbors are visited row by row from the top left, and on equal
/// distances the first visited seed wins. Reads outside the image count as
/// not flooded.
#[inline]
pub fn jump_flooding_pass_pixel(input: &ResultBuffer, texel: IVec2, step_size: i32) -> IVec2 {
    let mut closest: Option<(IVec2, i32)> = None;

    for j in -1..=1 {
        for i in -1..=1 {
            let offset = IVec2::new(i, j) * step_size;
            let value = input.load_pixel_fallback(texel + offset, JUMP_FLOODING_NON_FLOODED_VALUE);
            if value == JUMP_FLOODING_NON_FLOODED_VALUE {
                continue;
            }

            let difference = texel - value;
            let squared_distance = difference.dot(difference);
            if closest.map_or(true, |(_, minimum)| squared_distance < minimum) {
                closest = Some((value, squared_distance));
            }
        }
    }

    match closest {
        Some((seed, _)) => encode_jump_flooding_value(seed, true),
        None => encode_jump_flooding_value(IVec2::ZERO, false),
    }
}

/// Flood `input` into `output` with the 1+JFA schedule
pub fn jump_flooding(context: &Context, input: &ResultBuffer, output: &mut ResultBuffer) -> Result<()> {
    debug_assert_eq!(input.ty(), ResultType::Int2);
    debug_assert_eq!(output.ty(), ResultType::Int2);

    if input.is_single_value() {
        output.share_data(input);
        return Ok(());
    }

    let size = input.domain().size;
    debug_assert!(
        size.max_element() <= MAX_JUMP_FLOODING_SIZE,
        "jump flooding domain {size} too large"
    );

    let step_sizes = jump_flooding_step_sizes(size);
    debug!(
        "jump flooding {size} in {} passes on {}",
        step_sizes.len(),
        context.backend().name()
    );
    context
        .backend()
        .jump_flooding(context.texture_pool(), input, output, &step_sizes)
}

/// Build a jump flooding input from a float mask
///
/// Pixels with a mask value above `SEED_MASK_THRESHOLD` become seeds.
pub fn seeds_from_mask(mask: &ResultBuffer, output: &mut ResultBuffer) {
    debug_assert_eq!(mask.ty(), ResultType::Float);
    output.allocate_texture(mask.domain());
    output.par_fill(|texel| {
        initialize_jump_flooding_value(texel, mask.load_pixel::<f32>(texel) > SEED_MASK_THRESHOLD)
    });
}

/// Euclidean distance from every pixel to its closest seed
///
/// Pixels that were never flooded get `f32::INFINITY`.
pub fn distance_to_closest_seed(flooded: &ResultBuffer, output: &mut ResultBuffer) {
    debug_assert_eq!(flooded.ty(), ResultType::Int2);
    debug_assert_eq!(output.ty(), ResultType::Float);
    output.allocate_texture(flooded.domain());
    output.par_fill(|texel| {
        let seed = flooded.load_pixel::<IVec2>(texel);
        if seed == JUMP_FLOODING_NON_FLOODED_VALUE {
            f32::INFINITY
        } else {
            (texel - seed).as_vec2().length()
        }
    });
}

/// Number of pixels no seed reached
pub fn count_non_flooded(flooded: &ResultBuffer) -> usize {
    flooded
        .pixels::<IVec2>()
        .par_iter()
        .filter(|value| **value == JUMP_FLOODING_NON_FLOODED_VALUE)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Domain;

    fn seeded_input(size: IVec2, seeds: &[IVec2]) -> ResultBuffer {
        let mut input = ResultBuffer::new(ResultType::Int2);
        input.allocate_texture(Domain::new(size));
        input.par_fill(|texel| initialize_jump_flooding_value(texel, seeds.contains(&texel)));
        input
    }

    fn brute_force_distance(texel: IVec2, seeds: &[IVec2]) -> i32 {
        seeds
            .iter()
            .map(|seed| (texel - *seed).dot(texel - *seed))
            .min()
            .unwrap()
    }

    #[test]
    fn test_initialize_and_encode() {
        let texel = IVec2::new(5, 9);
        assert_eq!(initialize_jump_flooding_value(texel, true), texel);
        assert_eq!(
            initialize_jump_flooding_value(texel, false),
            JUMP_FLOODING_NON_FLOODED_VALUE
        );
        assert_eq!(encode_jump_flooding_value(texel, true), texel);
        assert_eq!(encode_jump_flooding_value(texel, false), JUMP_FLOODING_NON_FLOODED_VALUE);
    }

    #[test]
    fn test_step_sizes() {
        assert_eq!(jump_flooding_step_sizes(IVec2::new(1, 1)), vec![1]);
        assert_eq!(jump_flooding_step_sizes(IVec2::new(8, 8)), vec![1, 4, 2, 1]);
        assert_eq!(jump_flooding_step_sizes(IVec2::new(5, 3)), vec![1, 4, 2, 1]);
        assert_eq!(jump_flooding_step_sizes(IVec2::new(100, 600)), vec![1, 512, 256, 128, 64, 32, 16, 8, 4, 2, 1]);
    }

    #[test]
    fn test_pass_count_is_log2_plus_one() {
        for n in [2, 3, 16, 17, 1000] {
            let expected = (n as f64).log2().ceil() as usize + 1;
            assert_eq!(jump_flooding_step_sizes(IVec2::new(n, 1)).len(), expected, "n = {n}");
        }
    }

    #[test]
    fn test_pass_pixel_ignores_out_of_bounds() {
        let input = seeded_input(IVec2::new(4, 4), &[IVec2::new(0, 0)]);
        assert_eq!(
            jump_flooding_pass_pixel(&input, IVec2::new(1, 1), 1),
            IVec2::new(0, 0)
        );
        assert_eq!(
            jump_flooding_pass_pixel(&input, IVec2::new(3, 3), 1),
            JUMP_FLOODING_NON_FLOODED_VALUE
        );
    }

    #[test]
    fn test_pass_pixel_tie_keeps_first_visited() {
        // Both seeds are at distance 1 from (1, 1); (1, 0) is visited first
        let input = seeded_input(IVec2::new(3, 3), &[IVec2::new(1, 0), IVec2::new(1, 2)]);
        assert_eq!(jump_flooding_pass_pixel(&input, IVec2::new(1, 1), 1), IVec2::new(1, 0));
    }

    #[test]
    fn test_single_seed_floods_everything() {
        let context = Context::cpu();
        let seed = IVec2::new(3, 3);
        let input = seeded_input(IVec2::new(8, 8), &[seed]);
        let mut output = context.create_result(ResultType::Int2);

        jump_flooding(&context, &input, &mut output).unwrap();

        assert_eq!(output.pixels::<IVec2>().len(), 64);
        assert!(output.pixels::<IVec2>().iter().all(|value| *value == seed));
    }

    #[test]
    fn test_seeds_keep_their_own_texel() {
        let context = Context::cpu();
        let seeds = [
            IVec2::new(2, 2),
            IVec2::new(30, 5),
            IVec2::new(17, 28),
            IVec2::new(3, 31),
        ];
        let input = seeded_input(IVec2::new(33, 33), &seeds);
        let mut output = context.create_result(ResultType::Int2);

        jump_flooding(&context, &input, &mut output).unwrap();

        for seed in seeds {
            assert_eq!(output.load_pixel::<IVec2>(seed), seed);
        }
        assert_eq!(count_non_flooded(&output), 0);
    }

    #[test]
    fn test_flooding_finds_closest_seed_for_sparse_seeds() {
        let context = Context::cpu();
        let size = IVec2::new(40, 24);
        let seeds = [IVec2::new(4, 4), IVec2::new(35, 20), IVec2::new(20, 12)];
        let input = seeded_input(size, &seeds);
        let mut output = context.create_result(ResultType::Int2);

        jump_flooding(&context, &input, &mut output).unwrap();

        for y in 0..size.y {
            for x in 0..size.x {
                let texel = IVec2::new(x, y);
                let found = output.load_pixel::<IVec2>(texel);
                assert!(seeds.contains(&found));
                assert_eq!(
                    (texel - found).dot(texel - found),
                    brute_force_distance(texel, &seeds),
                    "texel {texel}"
                );
            }
        }
    }

    #[test]
    fn test_no_seeds_stays_non_flooded() {
        let context = Context::cpu();
        let input = seeded_input(IVec2::new(5, 5), &[]);
        let mut output = context.create_result(ResultType::Int2);

        jump_flooding(&context, &input, &mut output).unwrap();

        assert_eq!(count_non_flooded(&output), 25);
    }

    #[test]
    fn test_seeds_from_mask_and_distance() {
        let context = Context::cpu();
        let mut mask_pixels = vec![0.0f32; 5 * 3];
        mask_pixels[0] = 1.0;
        mask_pixels[2] = 0.5; // Not above the threshold
        let mask = ResultBuffer::from_pixels(ResultType::Float, IVec2::new(5, 3), mask_pixels).unwrap();

        let mut seeds = context.create_result(ResultType::Int2);
        seeds_from_mask(&mask, &mut seeds);
        assert_eq!(seeds.load_pixel::<IVec2>(IVec2::ZERO), IVec2::ZERO);
        assert_eq!(
            seeds.load_pixel::<IVec2>(IVec2::new(2, 0)),
            JUMP_FLOODING_NON_FLOODED_VALUE
        );

        let mut flooded = context.create_result(ResultType::Int2);
        jump_flooding(&context, &seeds, &mut flooded).unwrap();

        let mut distance = context.create_result(ResultType::Float);
        distance_to_closest_seed(&flooded, &mut distance);
        assert_eq!(distance.load_pixel::<f32>(IVec2::ZERO), 0.0);
        assert_eq!(distance.load_pixel::<f32>(IVec2::new(4, 0)), 4.0);
        assert!((distance.load_pixel::<f32>(IVec2::new(3, 2)) - 13.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_distance_of_non_flooded_is_infinite() {
        let mut flooded = ResultBuffer::new(ResultType::Int2);
        flooded.allocate_texture(Domain::new(IVec2::new(2, 1)));
        flooded.store_pixel(IVec2::new(0, 0), JUMP_FLOODING_NON_FLOODED_VALUE);
        flooded.store_pixel(IVec2::new(1, 0), IVec2::new(1, 0));

        let mut distance = ResultBuffer::new(ResultType::Float);
        distance_to_closest_seed(&flooded, &mut distance);

        assert_eq!(distance.load_pixel::<f32>(IVec2::new(0, 0)), f32::INFINITY);
        assert_eq!(distance.load_pixel::<f32>(IVec2::new(1, 0)), 0.0);
    }
}
