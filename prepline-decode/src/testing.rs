//! Test fixtures: a deterministic decode primitive and synthetic
//! image containers with parseable headers

use crate::backend::{PixelBuffer, PixelDecoder, PixelFormat};
use crate::error::{Error, Result};
use crate::format::{peek_dimensions, ImageFormat};
use crate::probe::{CapabilityProbe, HardwareCapability};

/// Decode primitive producing a deterministic gradient from the input
/// bytes, so identical bytes decode to identical pixels on every tier
pub(crate) struct StubDecoder;

impl PixelDecoder for StubDecoder {
    fn supports(&self, format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Gif
        )
    }

    fn decode(
        &self,
        bytes: &[u8],
        _format: ImageFormat,
        output: PixelFormat,
    ) -> Result<PixelBuffer> {
        let dims = peek_dimensions(bytes)
            .ok_or_else(|| Error::InvalidHeader("no parseable frame header".into()))?;
        let seed = bytes.iter().fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)));
        let mut data =
            Vec::with_capacity(dims.width as usize * dims.height as usize * output.channels());
        for y in 0..dims.height {
            for x in 0..dims.width {
                let r = (x.wrapping_mul(31).wrapping_add(y.wrapping_mul(17)).wrapping_add(seed)
                    & 0xFF) as u8;
                let g = (x.wrapping_mul(13).wrapping_add(y.wrapping_mul(7)).wrapping_add(seed)
                    & 0xFF) as u8;
                let b = (x.wrapping_mul(3).wrapping_add(y.wrapping_mul(29)).wrapping_add(seed)
                    & 0xFF) as u8;
                match output {
                    PixelFormat::Rgb => data.extend([r, g, b]),
                    PixelFormat::Bgr => data.extend([b, g, r]),
                    PixelFormat::Gray => {
                        data.push(((u16::from(r) + u16::from(g) + u16::from(b)) / 3) as u8)
                    }
                }
            }
        }
        PixelBuffer::new(dims.width, dims.height, output, data)
    }
}

/// Probe with a configurable hardware engine
pub(crate) struct StubProbe {
    pub hardware: bool,
}

impl CapabilityProbe for StubProbe {
    fn probe(&self) -> HardwareCapability {
        HardwareCapability {
            hardware_decoder: self.hardware,
            driver_version: (535, 104),
        }
    }
}

/// A minimal JPEG container: SOI, an SOF0 frame header carrying the
/// dimensions, a comment segment varying with `seed`, EOI
pub(crate) fn make_jpeg(width: u16, height: u16, seed: u8) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8];
    // SOF0: length 17, 8-bit precision, three components
    bytes.extend([0xFF, 0xC0, 0x00, 0x11, 0x08]);
    bytes.extend(height.to_be_bytes());
    bytes.extend(width.to_be_bytes());
    bytes.push(3);
    bytes.extend([1, 0x11, 0, 2, 0x11, 0, 3, 0x11, 0]);
    // Comment segment so the payload differs per seed
    bytes.extend([0xFF, 0xFE, 0x00, 0x03, seed]);
    bytes.extend([0xFF, 0xD9]);
    bytes
}

/// A minimal PNG container: signature plus an IHDR chunk for a
/// truecolor image
pub(crate) fn make_png(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend(13u32.to_be_bytes());
    bytes.extend(b"IHDR");
    bytes.extend(width.to_be_bytes());
    bytes.extend(height.to_be_bytes());
    // bit depth 8, truecolor, default compression/filter/interlace
    bytes.extend([8, 2, 0, 0, 0]);
    // placeholder CRC varying with seed
    bytes.extend([seed, 0, 0, 0]);
    bytes
}
