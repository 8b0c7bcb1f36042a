//! Compositor FFI - C Foreign Function Interface
//!
//! Provides a C-compatible API for the render UI and the C/C++ compositor:
//! the tile highlight tracker and the host buffer kernels.

use com_algorithms::{
    gamma_correct, gamma_uncorrect, jump_flooding, Context, ResultBuffer, ResultType,
};
use glam::{IVec2, Vec4};
use libc::{c_char, c_int};

mod tiles_ffi;
pub use tiles_ffi::*;

/// Number of 32-bit values in a `width x height` buffer of `channels` values per pixel
///
/// `None` for negative sizes and for buffers no slice can span.
fn value_count(width: c_int, height: c_int, channels: usize) -> Option<usize> {
    if width < 0 || height < 0 {
        return None;
    }
    let count = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(channels)?;
    let bytes = count.checked_mul(std::mem::size_of::<f32>())?;
    (bytes <= isize::MAX as usize).then_some(count)
}

// ============================================================================
// KERNEL API
// ============================================================================

type GammaFn = fn(&Context, &ResultBuffer, &mut ResultBuffer) -> com_algorithms::Result<()>;

unsafe fn gamma_rgba(pixels: *mut f32, width: c_int, height: c_int, gamma: GammaFn) -> c_int {
    let Some(count) = value_count(width, height, 4) else {
        return 0;
    };
    if pixels.is_null() {
        return 0;
    }

    let values = std::slice::from_raw_parts_mut(pixels, count);
    let colors = values.chunks_exact(4).map(Vec4::from_slice).collect();
    let size = IVec2::new(width, height);

    let context = Context::cpu();
    let result = ResultBuffer::from_pixels(ResultType::Color, size, colors).and_then(|input| {
        let mut output = context.create_result(ResultType::Color);
        gamma(&context, &input, &mut output)?;
        Ok(output)
    });

    match result {
        Ok(output) => {
            for (chunk, color) in values.chunks_exact_mut(4).zip(output.pixels::<Vec4>()) {
                color.write_to_slice(chunk);
            }
            1
        }
        Err(err) => {
            log::error!("gamma over {width}x{height} RGBA pixels failed: {err}");
            0
        }
    }
}

/// Gamma correct premultiplied RGBA float pixels in place
///
/// Returns 1 on success, 0 on invalid arguments or failure.
///
/// # Safety
/// Caller must ensure `pixels` points to `width * height * 4` floats.
#[no_mangle]
pub unsafe extern "C" fn com_gamma_correct_rgba(pixels: *mut f32, width: c_int, height: c_int) -> c_int {
    gamma_rgba(pixels, width, height, gamma_correct)
}

/// Gamma uncorrect premultiplied RGBA float pixels in place
///
/// Returns 1 on success, 0 on invalid arguments or failure.
///
/// # Safety
/// Caller must ensure `pixels` points to `width * height * 4` floats.
#[no_mangle]
pub unsafe extern "C" fn com_gamma_uncorrect_rgba(
    pixels: *mut f32,
    width: c_int,
    height: c_int,
) -> c_int {
    gamma_rgba(pixels, width, height, gamma_uncorrect)
}

/// Jump flood interleaved `(x, y)` int32 pairs in place
///
/// Seeds hold their own texel, every other pixel `(-1, -1)`. On return every
/// pixel holds the texel of its closest seed, or `(-1, -1)` if there are no
/// seeds. Returns 1 on success, 0 on invalid arguments or failure.
///
/// # Safety
/// Caller must ensure `values` points to `width * height * 2` int32s.
#[no_mangle]
pub unsafe extern "C" fn com_jump_flooding(values: *mut i32, width: c_int, height: c_int) -> c_int {
    let Some(count) = value_count(width, height, 2) else {
        return 0;
    };
    if values.is_null() {
        return 0;
    }

    let values = std::slice::from_raw_parts_mut(values, count);
    let seeds = values.chunks_exact(2).map(IVec2::from_slice).collect();
    let size = IVec2::new(width, height);

    let context = Context::cpu();
    let result = ResultBuffer::from_pixels(ResultType::Int2, size, seeds).and_then(|input| {
        let mut output = context.create_result(ResultType::Int2);
        jump_flooding(&context, &input, &mut output)?;
        Ok(output)
    });

    match result {
        Ok(output) => {
            for (chunk, seed) in values.chunks_exact_mut(2).zip(output.pixels::<IVec2>()) {
                seed.write_to_slice(chunk);
            }
            1
        }
        Err(err) => {
            log::error!("jump flooding over {width}x{height} pixels failed: {err}");
            0
        }
    }
}

// ============================================================================
// UTILITY FUNCTIONS
// ============================================================================

/// Get library version string
///
/// # Safety
/// Returns a static string, safe to call.
#[no_mangle]
pub extern "C" fn com_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_gamma_ffi_in_place() {
        let mut pixels = [0.5f32, 0.25, 0.0, 1.0, 0.2, 0.2, 0.2, 0.5];

        let status = unsafe { com_gamma_correct_rgba(pixels.as_mut_ptr(), 2, 1) };
        assert_eq!(status, 1);
        assert_eq!(&pixels[..4], &[0.25, 0.0625, 0.0, 1.0]);
        // straight 0.4, squared 0.16, premultiplied by 0.5
        assert!((pixels[4] - 0.08).abs() < 1e-6);
        assert_eq!(pixels[7], 0.5);

        let status = unsafe { com_gamma_uncorrect_rgba(pixels.as_mut_ptr(), 2, 1) };
        assert_eq!(status, 1);
        assert!((pixels[0] - 0.5).abs() < 1e-6);
        assert!((pixels[4] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_jump_flooding_ffi() {
        let (width, height) = (8, 8);
        let mut values = vec![-1i32; width * height * 2];
        // Seed at (3, 3)
        let seed = (3 * width + 3) * 2;
        values[seed] = 3;
        values[seed + 1] = 3;

        let status = unsafe { com_jump_flooding(values.as_mut_ptr(), width as c_int, height as c_int) };

        assert_eq!(status, 1);
        assert!(values.iter().all(|value| *value == 3));
    }

    #[test]
    fn test_invalid_arguments() {
        let mut pixels = [0.0f32; 4];
        unsafe {
            assert_eq!(com_gamma_correct_rgba(std::ptr::null_mut(), 1, 1), 0);
            assert_eq!(com_gamma_correct_rgba(pixels.as_mut_ptr(), -1, 1), 0);
            assert_eq!(com_jump_flooding(std::ptr::null_mut(), 4, 4), 0);
        }
    }

    #[test]
    fn test_value_count_overflow() {
        assert_eq!(value_count(4, 3, 4), Some(48));
        assert_eq!(value_count(0, 7, 2), Some(0));
        assert_eq!(value_count(-1, 7, 2), None);
        assert_eq!(value_count(c_int::MAX, c_int::MAX, 4), None);
        assert_eq!(value_count(c_int::MAX, c_int::MAX, 2), None);
    }

    #[test]
    fn test_oversized_buffers_are_rejected() {
        // Never dereferenced, the size check fails first
        let mut pixel = [0.0f32; 4];
        let mut seed = [0i32; 2];
        unsafe {
            assert_eq!(com_gamma_correct_rgba(pixel.as_mut_ptr(), c_int::MAX, c_int::MAX), 0);
            assert_eq!(com_jump_flooding(seed.as_mut_ptr(), c_int::MAX, c_int::MAX), 0);
        }
        assert_eq!(pixel, [0.0; 4]);
    }

    #[test]
    fn test_version() {
        let version = com_version();
        assert!(!version.is_null());

        let version_str = unsafe { CStr::from_ptr(version) }.to_str().unwrap();
        assert_eq!(version_str, env!("CARGO_PKG_VERSION"));
    }
}
