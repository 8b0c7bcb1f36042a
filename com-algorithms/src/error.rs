//! Error type for compositor algorithms
//!
//! Contract violations (mismatched domains, wrong pixel types, invalid
//! padding pairings) are assertions, not errors. Only the edges that talk to
//! a device or build a thread pool can fail at runtime.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComError {
    #[error("no compatible GPU adapter is available")]
    GpuUnavailable,

    #[error("failed to create GPU device: {0}")]
    DeviceRequest(String),

    #[error("failed to map GPU buffer for readback: {0}")]
    BufferMap(String),

    #[error("GPU buffer of {size} bytes exceeds the device binding limit of {limit} bytes")]
    BufferTooLarge { size: u64, limit: u64 },

    #[error("unknown compute shader `{0}`")]
    ShaderNotFound(String),

    #[error("pixel data holds {actual} values, domain needs {expected}")]
    DataSizeMismatch { expected: usize, actual: usize },

    #[error("failed to build CPU thread pool: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, ComError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ComError::DataSizeMismatch {
            expected: 64,
            actual: 63,
        };
        assert_eq!(err.to_string(), "pixel data holds 63 values, domain needs 64");

        let err = ComError::ShaderNotFound("compositor_missing".into());
        assert_eq!(err.to_string(), "unknown compute shader `compositor_missing`");

        let err = ComError::BufferTooLarge {
            size: 576_000_000,
            limit: 134_217_728,
        };
        assert_eq!(
            err.to_string(),
            "GPU buffer of 576000000 bytes exceeds the device binding limit of 134217728 bytes"
        );
    }
}
