//! Decode backend tiers and the opaque decode primitive
//!
//! Turning encoded bytes into pixels happens through one of three
//! mutually exclusive strategies. The format-specific decoding itself
//! is an external collaborator behind the [`PixelDecoder`] trait; this
//! module defines the tiers, the pixel buffer they produce, and crop
//! extraction.

use std::fmt;

use crate::error::{Error, Result};
use crate::format::ImageFormat;

/// One of the mutually exclusive decode strategies, ordered from most
/// to least specialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeBackend {
    /// Dedicated hardware decode engine on the accelerator
    Hardware,

    /// Split decode: entropy stage on the host, pixel stage on the
    /// accelerator
    Hybrid,

    /// Pure software decode on the host
    Host,
}

impl DecodeBackend {
    /// The next tier down the fallback chain
    pub fn fallback(self) -> Option<DecodeBackend> {
        match self {
            DecodeBackend::Hardware => Some(DecodeBackend::Hybrid),
            DecodeBackend::Hybrid => Some(DecodeBackend::Host),
            DecodeBackend::Host => None,
        }
    }

    /// Whether this tier can handle the given container format
    ///
    /// The hardware engine and the split decode path handle JPEG only;
    /// the host tier is the universal fallback.
    pub fn supports(self, format: ImageFormat) -> bool {
        match self {
            DecodeBackend::Hardware | DecodeBackend::Hybrid => format == ImageFormat::Jpeg,
            DecodeBackend::Host => format != ImageFormat::Unknown,
        }
    }

    /// Whether this tier runs any work on the accelerator
    pub fn uses_accelerator(self) -> bool {
        !matches!(self, DecodeBackend::Host)
    }
}

impl fmt::Display for DecodeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeBackend::Hardware => write!(f, "hardware"),
            DecodeBackend::Hybrid => write!(f, "hybrid"),
            DecodeBackend::Host => write!(f, "host"),
        }
    }
}

/// Requested output pixel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Interleaved red, green, blue
    Rgb,

    /// Interleaved blue, green, red
    Bgr,

    /// Single-channel grayscale
    Gray,
}

impl PixelFormat {
    /// Number of interleaved channels
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => 3,
            PixelFormat::Gray => 1,
        }
    }

    /// Parse the format names accepted by decode operators
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "rgb" => Ok(PixelFormat::Rgb),
            "bgr" => Ok(PixelFormat::Bgr),
            "gray" | "grayscale" => Ok(PixelFormat::Gray),
            other => Err(Error::Core(prepline_core::Error::InvalidArgument(format!(
                "Unknown output pixel format: {}",
                other
            )))),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Rgb => write!(f, "rgb"),
            PixelFormat::Bgr => write!(f, "bgr"),
            PixelFormat::Gray => write!(f, "gray"),
        }
    }
}

/// A crop window in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    /// Left edge
    pub x: u32,

    /// Top edge
    pub y: u32,

    /// Window width
    pub width: u32,

    /// Window height
    pub height: u32,
}

/// A decoded image: interleaved 8-bit pixels in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Channel layout of `data`
    pub format: PixelFormat,

    /// Interleaved pixel bytes, `height * width * channels` long
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer, validating the storage length
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(Error::Core(prepline_core::Error::InvalidArgument(format!(
                "Pixel buffer holds {} bytes, {}x{} {} requires {}",
                data.len(),
                width,
                height,
                format,
                expected
            ))));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Total byte size of the buffer
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Extract a crop window
    pub fn crop(&self, region: CropRegion) -> Result<PixelBuffer> {
        let x_end = region.x.checked_add(region.width);
        let y_end = region.y.checked_add(region.height);
        let in_bounds = matches!((x_end, y_end), (Some(xe), Some(ye))
            if xe <= self.width && ye <= self.height && region.width > 0 && region.height > 0);
        if !in_bounds {
            return Err(Error::CropOutOfBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                image_width: self.width,
                image_height: self.height,
            });
        }

        let channels = self.format.channels();
        let src_stride = self.width as usize * channels;
        let dst_stride = region.width as usize * channels;
        let mut data = Vec::with_capacity(region.height as usize * dst_stride);
        for row in region.y..region.y + region.height {
            let start = row as usize * src_stride + region.x as usize * channels;
            data.extend_from_slice(&self.data[start..start + dst_stride]);
        }
        PixelBuffer::new(region.width, region.height, self.format, data)
    }
}

/// The opaque format-specific decode primitive
///
/// Implementations decode one sample's bytes into the requested output
/// layout. The engine treats the primitive as a black box per tier and
/// never inspects its internals.
pub trait PixelDecoder: Send + Sync {
    /// Whether this primitive can decode the given container format
    fn supports(&self, format: ImageFormat) -> bool;

    /// Decode bytes into a pixel buffer of the requested layout
    fn decode(&self, bytes: &[u8], format: ImageFormat, output: PixelFormat)
        -> Result<PixelBuffer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_chain() {
        assert_eq!(DecodeBackend::Hardware.fallback(), Some(DecodeBackend::Hybrid));
        assert_eq!(DecodeBackend::Hybrid.fallback(), Some(DecodeBackend::Host));
        assert_eq!(DecodeBackend::Host.fallback(), None);
    }

    #[test]
    fn test_tier_format_support() {
        assert!(DecodeBackend::Hardware.supports(ImageFormat::Jpeg));
        assert!(!DecodeBackend::Hardware.supports(ImageFormat::Png));
        assert!(!DecodeBackend::Hybrid.supports(ImageFormat::Png));
        assert!(DecodeBackend::Host.supports(ImageFormat::Png));
        assert!(!DecodeBackend::Host.supports(ImageFormat::Unknown));
    }

    #[test]
    fn test_pixel_format_parse() {
        assert_eq!(PixelFormat::parse("rgb").unwrap(), PixelFormat::Rgb);
        assert_eq!(PixelFormat::parse("grayscale").unwrap(), PixelFormat::Gray);
        assert!(PixelFormat::parse("cmyk").is_err());
    }

    #[test]
    fn test_buffer_length_validation() {
        assert!(PixelBuffer::new(2, 2, PixelFormat::Rgb, vec![0; 12]).is_ok());
        assert!(PixelBuffer::new(2, 2, PixelFormat::Rgb, vec![0; 11]).is_err());
        assert!(PixelBuffer::new(2, 2, PixelFormat::Gray, vec![0; 4]).is_ok());
    }

    #[test]
    fn test_crop_extracts_window() {
        // 4x2 grayscale image with row-major values 0..8
        let buffer =
            PixelBuffer::new(4, 2, PixelFormat::Gray, (0..8).collect()).unwrap();
        let cropped = buffer
            .crop(CropRegion {
                x: 1,
                y: 0,
                width: 2,
                height: 2,
            })
            .unwrap();
        assert_eq!(cropped.width, 2);
        assert_eq!(cropped.height, 2);
        assert_eq!(cropped.data, vec![1, 2, 5, 6]);
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let buffer = PixelBuffer::new(4, 4, PixelFormat::Gray, vec![0; 16]).unwrap();
        let err = buffer
            .crop(CropRegion {
                x: 2,
                y: 2,
                width: 4,
                height: 1,
            })
            .unwrap_err();
        assert!(matches!(err, Error::CropOutOfBounds { .. }));
    }
}
