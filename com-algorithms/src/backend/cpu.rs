//! CPU backend: rayon parallel loops over result rows

use super::{Backend, GammaMode};
use crate::context::Device;
use crate::error::{ComError, Result};
use crate::jump_flooding::jump_flooding_pass_pixel;
use crate::pad::PaddingMethod;
use crate::result::ResultBuffer;
use crate::texture_pool::TexturePool;
use crate::types::{Pixel, PixelFormat, ResultType};
use glam::{IVec2, Vec2, Vec4};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Runs kernels on the global rayon pool or on a dedicated one
#[derive(Default)]
pub struct CpuBackend {
    thread_pool: Option<ThreadPool>,
}

impl CpuBackend {
    /// Backend using the global rayon pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend owning a pool of `num_threads` workers
    pub fn with_threads(num_threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("com-cpu-{index}"))
            .build()
            .map_err(|err| ComError::ThreadPool(err.to_string()))?;

        Ok(Self {
            thread_pool: Some(pool),
        })
    }

    pub fn num_threads(&self) -> usize {
        match &self.thread_pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.thread_pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

fn pad_pixels<T: Pixel>(
    input: &ResultBuffer,
    output: &mut ResultBuffer,
    size: IVec2,
    method: PaddingMethod,
) {
    match method {
        PaddingMethod::Zero => output.par_fill(|texel| input.load_pixel_zero::<T>(texel - size)),
        PaddingMethod::Extend => {
            output.par_fill(|texel| input.load_pixel_extended::<T>(texel - size))
        }
    }
}

impl Backend for CpuBackend {
    fn device(&self) -> Device {
        Device::Cpu
    }

    fn name(&self) -> &str {
        "cpu"
    }

    fn gamma(&self, input: &ResultBuffer, output: &mut ResultBuffer, mode: GammaMode) -> Result<()> {
        self.install(|| output.par_fill(|texel| mode.apply(input.load_pixel::<Vec4>(texel))));
        Ok(())
    }

    fn pad(
        &self,
        input: &ResultBuffer,
        output: &mut ResultBuffer,
        size: IVec2,
        method: PaddingMethod,
    ) -> Result<()> {
        self.install(|| match input.ty().format() {
            PixelFormat::Float => pad_pixels::<f32>(input, output, size, method),
            PixelFormat::Float2 => pad_pixels::<Vec2>(input, output, size, method),
            PixelFormat::Float4 => pad_pixels::<Vec4>(input, output, size, method),
            PixelFormat::Int2 => pad_pixels::<IVec2>(input, output, size, method),
        });
        Ok(())
    }

    fn jump_flooding(
        &self,
        pool: &TexturePool,
        input: &ResultBuffer,
        output: &mut ResultBuffer,
        step_sizes: &[i32],
    ) -> Result<()> {
        let Some((&first_step, remaining_steps)) = step_sizes.split_first() else {
            output.share_data(input);
            return Ok(());
        };

        let domain = input.domain();
        let mut flooded = ResultBuffer::new(ResultType::Int2);
        flooded.allocate_texture_from(pool, domain);
        let mut scratch = ResultBuffer::new(ResultType::Int2);
        scratch.allocate_texture_from(pool, domain);

        self.install(|| {
            flooded.par_fill(|texel| jump_flooding_pass_pixel(input, texel, first_step));

            for &step_size in remaining_steps {
                log::trace!("jump flooding pass, step size {step_size}");
                scratch.par_fill(|texel| jump_flooding_pass_pixel(&flooded, texel, step_size));
                std::mem::swap(&mut flooded, &mut scratch);
            }
        });

        output.steal_data(&mut flooded);
        if let Some((domain, data)) = scratch.release() {
            pool.release(domain, data);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Domain;

    #[test]
    fn test_dedicated_thread_pool() {
        let backend = CpuBackend::with_threads(2).unwrap();
        assert_eq!(backend.num_threads(), 2);
        assert_eq!(backend.device(), Device::Cpu);
        assert_eq!(backend.name(), "cpu");
    }

    #[test]
    fn test_gamma_on_dedicated_pool() {
        let backend = CpuBackend::with_threads(3).unwrap();
        let size = IVec2::new(7, 5);
        let pixels = vec![Vec4::new(0.5, 0.5, 0.5, 1.0); 35];
        let input = ResultBuffer::from_pixels(ResultType::Color, size, pixels).unwrap();
        let mut output = ResultBuffer::new(ResultType::Color);
        output.allocate_texture(Domain::new(size));

        backend.gamma(&input, &mut output, GammaMode::Correct).unwrap();

        for pixel in output.pixels::<Vec4>() {
            assert_eq!(*pixel, Vec4::new(0.25, 0.25, 0.25, 1.0));
        }
    }

    #[test]
    fn test_jump_flooding_returns_scratch_to_pool() {
        let backend = CpuBackend::new();
        let pool = TexturePool::new();
        let size = IVec2::new(4, 4);
        let mut input = ResultBuffer::new(ResultType::Int2);
        input.allocate_texture(Domain::new(size));
        input.par_fill(|texel| {
            crate::jump_flooding::initialize_jump_flooding_value(texel, texel == IVec2::ZERO)
        });
        let mut output = ResultBuffer::new(ResultType::Int2);

        backend.jump_flooding(&pool, &input, &mut output, &[1, 2, 1]).unwrap();

        assert_eq!(pool.stats().allocated, 2);
        assert_eq!(pool.stats().available, 1);
        assert!(output.pixels::<IVec2>().iter().all(|seed| *seed == IVec2::ZERO));
    }
}
