//! Image container formats and cheap header parsing
//!
//! Backend selection needs a pixel count before any full decode runs,
//! so this module sniffs the container format from magic bytes and
//! pulls dimensions out of the header when the format embeds them.

/// Image container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// JPEG format
    Jpeg,
    /// PNG format
    Png,
    /// BMP format
    Bmp,
    /// GIF format
    Gif,
    /// TIFF format
    Tiff,
    /// WebP format
    WebP,
    /// Unknown format
    Unknown,
}

impl ImageFormat {
    /// Detect image format from file extension
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "bmp" => ImageFormat::Bmp,
            "gif" => ImageFormat::Gif,
            "tiff" | "tif" => ImageFormat::Tiff,
            "webp" => ImageFormat::WebP,
            _ => ImageFormat::Unknown,
        }
    }

    /// Detect image format from magic bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.len() < 8 {
            return ImageFormat::Unknown;
        }

        match bytes {
            // JPEG: FF D8 FF
            [0xFF, 0xD8, 0xFF, ..] => ImageFormat::Jpeg,

            // PNG: 89 50 4E 47 0D 0A 1A 0A
            [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, ..] => ImageFormat::Png,

            // BMP: 42 4D
            [0x42, 0x4D, ..] => ImageFormat::Bmp,

            // GIF: 47 49 46 38
            [0x47, 0x49, 0x46, 0x38, ..] => ImageFormat::Gif,

            // TIFF: 49 49 2A 00 or 4D 4D 00 2A
            [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => ImageFormat::Tiff,

            // WebP: 52 49 46 46 ?? ?? ?? ?? 57 45 42 50
            [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => ImageFormat::WebP,

            _ => ImageFormat::Unknown,
        }
    }

    /// Name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Gif => "gif",
            ImageFormat::Tiff => "tiff",
            ImageFormat::WebP => "webp",
            ImageFormat::Unknown => "unknown",
        }
    }
}

/// Dimensions pulled from an image header ahead of full decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDims {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Number of channels encoded in the container
    pub channels: u8,
}

impl ImageDims {
    /// Total pixel count
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Parse image dimensions from header bytes without decoding pixels
///
/// Returns `None` when the format does not embed dimensions in an
/// easily reachable header (TIFF, WebP) or the header is malformed;
/// selection then treats the sample's size as unknown.
pub fn peek_dimensions(bytes: &[u8]) -> Option<ImageDims> {
    match ImageFormat::from_bytes(bytes) {
        ImageFormat::Jpeg => jpeg_dimensions(bytes),
        ImageFormat::Png => png_dimensions(bytes),
        ImageFormat::Bmp => bmp_dimensions(bytes),
        ImageFormat::Gif => gif_dimensions(bytes),
        ImageFormat::Tiff | ImageFormat::WebP | ImageFormat::Unknown => None,
    }
}

/// Walk JPEG marker segments until a start-of-frame carrying the
/// frame dimensions
fn jpeg_dimensions(bytes: &[u8]) -> Option<ImageDims> {
    let mut i = 2;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];
        // Fill bytes before a marker
        if marker == 0xFF {
            i += 1;
            continue;
        }
        // RST0-7, SOI, EOI carry no length field
        if (0xD0..=0xD9).contains(&marker) {
            i += 2;
            continue;
        }
        let len = usize::from(u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]));
        if len < 2 {
            return None;
        }
        // SOF0-15, excluding DHT (C4), JPG (C8) and DAC (CC)
        if (0xC0..=0xCF).contains(&marker) && marker != 0xC4 && marker != 0xC8 && marker != 0xCC {
            if i + 9 >= bytes.len() {
                return None;
            }
            let height = u32::from(u16::from_be_bytes([bytes[i + 5], bytes[i + 6]]));
            let width = u32::from(u16::from_be_bytes([bytes[i + 7], bytes[i + 8]]));
            let channels = bytes[i + 9];
            return Some(ImageDims {
                width,
                height,
                channels,
            });
        }
        i += 2 + len;
    }
    None
}

/// Read width and height from the PNG IHDR chunk
fn png_dimensions(bytes: &[u8]) -> Option<ImageDims> {
    if bytes.len() < 26 || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    let channels = match bytes[25] {
        0 => 1, // grayscale
        2 => 3, // truecolor
        3 => 1, // palette indices
        4 => 2, // grayscale + alpha
        6 => 4, // truecolor + alpha
        _ => return None,
    };
    Some(ImageDims {
        width,
        height,
        channels,
    })
}

/// Read width and height from the BMP info header
fn bmp_dimensions(bytes: &[u8]) -> Option<ImageDims> {
    if bytes.len() < 30 {
        return None;
    }
    let width = i32::from_le_bytes([bytes[18], bytes[19], bytes[20], bytes[21]]);
    // Height may be negative for top-down bitmaps
    let height = i32::from_le_bytes([bytes[22], bytes[23], bytes[24], bytes[25]]);
    let bits = u16::from_le_bytes([bytes[28], bytes[29]]);
    if width <= 0 || height == 0 || bits == 0 {
        return None;
    }
    Some(ImageDims {
        width: width as u32,
        height: height.unsigned_abs(),
        channels: ((bits + 7) / 8).min(4) as u8,
    })
}

/// Read the logical screen size from a GIF header
fn gif_dimensions(bytes: &[u8]) -> Option<ImageDims> {
    if bytes.len() < 10 {
        return None;
    }
    let width = u32::from(u16::from_le_bytes([bytes[6], bytes[7]]));
    let height = u32::from(u16::from_le_bytes([bytes[8], bytes[9]]));
    Some(ImageDims {
        width,
        height,
        channels: 3,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{make_jpeg, make_png};

    #[test]
    fn test_magic_byte_detection() {
        assert_eq!(ImageFormat::from_bytes(&make_jpeg(4, 4, 0)), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_bytes(&make_png(4, 4, 0)), ImageFormat::Png);
        assert_eq!(ImageFormat::from_bytes(b"BMxxxxxxxx"), ImageFormat::Bmp);
        assert_eq!(ImageFormat::from_bytes(b"GIF89a-not-really"), ImageFormat::Gif);
        assert_eq!(ImageFormat::from_bytes(b"plain text"), ImageFormat::Unknown);
        assert_eq!(ImageFormat::from_bytes(&[0xFF]), ImageFormat::Unknown);
    }

    #[test]
    fn test_extension_detection() {
        assert_eq!(ImageFormat::from_extension("JPG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("tif"), ImageFormat::Tiff);
        assert_eq!(ImageFormat::from_extension("dat"), ImageFormat::Unknown);
    }

    #[test]
    fn test_jpeg_header_parse() {
        let bytes = make_jpeg(640, 480, 0);
        let dims = peek_dimensions(&bytes).unwrap();
        assert_eq!(dims.width, 640);
        assert_eq!(dims.height, 480);
        assert_eq!(dims.channels, 3);
        assert_eq!(dims.pixel_count(), 640 * 480);
    }

    #[test]
    fn test_png_header_parse() {
        let bytes = make_png(320, 200, 0);
        let dims = peek_dimensions(&bytes).unwrap();
        assert_eq!(dims.width, 320);
        assert_eq!(dims.height, 200);
        assert_eq!(dims.channels, 3);
    }

    #[test]
    fn test_truncated_header_yields_none() {
        let bytes = make_jpeg(640, 480, 0);
        assert_eq!(peek_dimensions(&bytes[..4]), None);
        assert_eq!(peek_dimensions(&make_png(320, 200, 0)[..10]), None);
    }
}
