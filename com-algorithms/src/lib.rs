//! Compositor Algorithms
//!
//! Image operations shared by compositor nodes, each with a CPU and a GPU
//! implementation behind one entry point.
//!
//! Operations:
//! - Gamma correction and uncorrection of premultiplied colors
//! - Zero and extend padding
//! - Jump flooding (1+JFA) for nearest seed maps
//!
//! The GPU backend is compiled with the `gpu` feature and selected through
//! `ContextConfig`.

pub mod backend;
pub mod context;
pub mod error;
pub mod gamma;
pub mod jump_flooding;
pub mod pad;
pub mod result;
pub mod texture_pool;
pub mod types;

pub use backend::{Backend, CpuBackend, GammaMode};
#[cfg(feature = "gpu")]
pub use backend::GpuBackend;
pub use context::*;
pub use error::*;
pub use gamma::*;
pub use jump_flooding::*;
pub use pad::*;
pub use result::*;
pub use texture_pool::*;
pub use types::*;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
