//! Multi-backend image decode dispatch for prepline pipelines
//!
//! Given a batch of encoded samples, the dispatcher classifies each one
//! against an ordered chain of decode backends — a dedicated hardware
//! engine, a split host/accelerator path, and pure host software — under
//! capacity and format constraints, with preallocated accelerator memory
//! and per-sample fallback. The [`op::ImageDecodeOperator`] exposes the
//! engine as a pipeline operator whose crop parameters resolve through
//! the argument system, including per-sample tensor-arguments.

#![warn(missing_docs)]

pub mod backend;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod op;
pub mod pool;
pub mod probe;
pub mod source;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types for convenience
pub use backend::{CropRegion, DecodeBackend, PixelBuffer, PixelDecoder, PixelFormat};
pub use dispatch::{
    BatchDecodeResult, DecodeDispatcher, DispatchConfig, EncodedSample, SampleFailure,
};
pub use error::{Error, Result};
pub use format::{peek_dimensions, ImageDims, ImageFormat};
pub use op::{register_schemas, ImageDecodeOperator, IMAGE_DECODE_SCHEMA};
pub use pool::{AcceleratorPool, PoolStats, Reservation};
pub use probe::{CapabilityProbe, HardwareCapability, NullProbe};
pub use source::{ByteSource, FileByteSource, MemoryByteSource, MmapByteSource};
pub use stream::AcceleratorStream;
