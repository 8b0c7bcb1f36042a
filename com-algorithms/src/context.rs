//! Execution context shared by compositor algorithms
//!
//! The context selects the backend every algorithm dispatches to and owns
//! the texture pool intermediate results are drawn from.

use crate::backend::{Backend, CpuBackend};
use crate::error::Result;
use crate::result::ResultBuffer;
use crate::texture_pool::TexturePool;
use crate::types::ResultType;
use log::{info, warn};

/// Device the algorithms execute on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Gpu,
}

/// Adapter preference when creating a GPU context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerPreference {
    LowPower,
    #[default]
    HighPerformance,
}

/// Context configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextConfig {
    pub device: Device,
    /// Dedicated CPU worker count; `None` uses the global rayon pool
    pub num_threads: Option<usize>,
    pub power_preference: PowerPreference,
}

impl ContextConfig {
    pub fn cpu() -> Self {
        Self::default()
    }

    pub fn gpu() -> Self {
        Self {
            device: Device::Gpu,
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }
}

pub struct Context {
    backend: Box<dyn Backend>,
    texture_pool: TexturePool,
}

impl Context {
    /// Create a context for `config`
    ///
    /// A GPU request falls back to the CPU backend when no device can be
    /// created or the crate was built without the `gpu` feature.
    pub fn new(config: ContextConfig) -> Result<Self> {
        let backend = match config.device {
            Device::Gpu => match gpu_backend(&config) {
                Some(backend) => backend,
                None => cpu_backend(&config)?,
            },
            Device::Cpu => cpu_backend(&config)?,
        };

        info!("compositor context using {} backend", backend.name());
        Ok(Self::with_backend(backend))
    }

    /// CPU context on the global rayon pool
    pub fn cpu() -> Self {
        Self::with_backend(Box::new(CpuBackend::new()))
    }

    /// Context dispatching to an injected backend
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            texture_pool: TexturePool::new(),
        }
    }

    pub fn use_gpu(&self) -> bool {
        self.backend.device() == Device::Gpu
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn texture_pool(&self) -> &TexturePool {
        &self.texture_pool
    }

    pub fn create_result(&self, ty: ResultType) -> ResultBuffer {
        ResultBuffer::new(ty)
    }

    /// Release a result, recycling its storage if nothing else shares it
    pub fn release_result(&self, result: &mut ResultBuffer) {
        if let Some((domain, data)) = result.release() {
            self.texture_pool.release(domain, data);
        }
    }
}

fn cpu_backend(config: &ContextConfig) -> Result<Box<dyn Backend>> {
    Ok(match config.num_threads {
        Some(num_threads) => Box::new(CpuBackend::with_threads(num_threads)?),
        None => Box::new(CpuBackend::new()),
    })
}

#[cfg(feature = "gpu")]
fn gpu_backend(config: &ContextConfig) -> Option<Box<dyn Backend>> {
    match crate::backend::GpuBackend::new(config.power_preference) {
        Ok(backend) => Some(Box::new(backend)),
        Err(err) => {
            warn!("GPU compositing unavailable ({err}), falling back to CPU");
            None
        }
    }
}

#[cfg(not(feature = "gpu"))]
fn gpu_backend(_config: &ContextConfig) -> Option<Box<dyn Backend>> {
    warn!("GPU compositing requested but built without the `gpu` feature, falling back to CPU");
    None
}
