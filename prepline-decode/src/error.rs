//! Error types for the decode dispatch engine

use std::path::PathBuf;

use thiserror::Error;

/// Result type for the decode dispatch engine
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the decode dispatch engine
///
/// Backend-unavailability errors ([`Error::CapacityExhausted`]) trigger
/// tier fallback inside the dispatcher and are only surfaced when no
/// tier remains; everything else propagates.
#[derive(Error, Debug)]
pub enum Error {
    /// Core pipeline error
    #[error("Core error: {0}")]
    Core(#[from] prepline_core::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A byte source could not be opened
    #[error("Could not open file {}: {}", .path.display(), .source)]
    Open {
        /// Path that failed to open
        path: PathBuf,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// No decode backend can handle the format
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The accelerator memory pool cannot grow far enough
    #[error(
        "Accelerator pool exhausted: requested {requested} bytes, \
         capacity {capacity} bytes"
    )]
    CapacityExhausted {
        /// Bytes the reservation asked for
        requested: usize,
        /// Pool capacity at the time of the failure
        capacity: usize,
    },

    /// An image header could not be parsed
    #[error("Invalid image header: {0}")]
    InvalidHeader(String),

    /// Decoding one sample failed at the final tier
    #[error("Decode failed for sample {sample}: {reason}")]
    SampleDecode {
        /// Batch index of the failed sample
        sample: usize,
        /// Failure description
        reason: String,
    },

    /// A crop rectangle does not fit inside the decoded image
    #[error(
        "Crop region {x},{y} {width}x{height} exceeds image bounds {image_width}x{image_height}"
    )]
    CropOutOfBounds {
        /// Crop x offset
        x: u32,
        /// Crop y offset
        y: u32,
        /// Crop width
        width: u32,
        /// Crop height
        height: u32,
        /// Decoded image width
        image_width: u32,
        /// Decoded image height
        image_height: u32,
    },

    /// The accelerator stream worker is gone
    #[error("Accelerator stream error: {0}")]
    Stream(String),

    /// The host worker pool could not be constructed
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}
