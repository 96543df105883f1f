//! PNG/JPEG payload decoding for image placement
//!
//! JPEG data is embedded untouched (DCTDecode); only the frame header is read
//! for the pixel size. PNG data is decoded to 8-bit samples and re-encoded as
//! a FlateDecode stream, with any alpha channel split into a soft mask.

use crate::coords::Size;
use crate::error::AnnotError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }

    /// Detect the format from the file signature.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
}

impl ColorSpace {
    pub(crate) fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::Gray => "DeviceGray",
            ColorSpace::Rgb => "DeviceRGB",
            ColorSpace::Cmyk => "DeviceCMYK",
        }
    }
}

/// An image ready to be embedded as an XObject.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub(crate) color_space: ColorSpace,
    /// Stream payload, already in the encoding named by `format`'s filter
    pub(crate) data: Vec<u8>,
    /// Zlib-compressed 8-bit alpha samples
    pub(crate) alpha: Option<Vec<u8>>,
}

impl DecodedImage {
    /// Decode an uploaded image. `mime` is the browser-reported type, if any.
    pub fn decode(mime: Option<&str>, bytes: &[u8]) -> Result<Self, AnnotError> {
        if let Some(mime) = mime.filter(|m| !m.is_empty()) {
            if ImageFormat::from_mime(mime).is_none() {
                return Err(AnnotError::UnsupportedFile(format!(
                    "{} (please select a PNG or JPEG image)",
                    mime
                )));
            }
        }

        if bytes.is_empty() {
            return Err(AnnotError::InvalidImage("file is empty".to_string()));
        }

        match ImageFormat::sniff(bytes) {
            Some(ImageFormat::Png) => decode_png(bytes),
            Some(ImageFormat::Jpeg) => decode_jpeg(bytes),
            None => Err(AnnotError::InvalidImage(
                "not a PNG or JPEG file".to_string(),
            )),
        }
    }

    /// Display size at `target_width`, keeping the aspect ratio.
    pub fn scaled_to_width(&self, target_width: f64) -> Size {
        let scale = target_width / self.width as f64;
        Size {
            width: target_width,
            height: self.height as f64 * scale,
        }
    }

    pub(crate) fn filter(&self) -> &'static str {
        match self.format {
            ImageFormat::Png => "FlateDecode",
            ImageFormat::Jpeg => "DCTDecode",
        }
    }

    /// CMYK JPEGs are stored Adobe-inverted, so each component is flipped back.
    pub(crate) fn decode_array(&self) -> Option<Vec<f64>> {
        match (self.format, self.color_space) {
            (ImageFormat::Jpeg, ColorSpace::Cmyk) => Some([1.0, 0.0].repeat(4)),
            _ => None,
        }
    }
}

fn decode_png(bytes: &[u8]) -> Result<DecodedImage, AnnotError> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|e| AnnotError::InvalidImage(format!("PNG header: {}", e)))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buf)
        .map_err(|e| AnnotError::InvalidImage(format!("PNG data: {}", e)))?;
    let samples = &buf[..frame.buffer_size()];

    if frame.width == 0 || frame.height == 0 {
        return Err(AnnotError::InvalidImage("PNG has no pixels".to_string()));
    }

    let (color_space, color, alpha) = match frame.color_type {
        png::ColorType::Grayscale => (ColorSpace::Gray, samples.to_vec(), None),
        png::ColorType::Rgb => (ColorSpace::Rgb, samples.to_vec(), None),
        png::ColorType::GrayscaleAlpha => {
            let (color, alpha) = split_alpha(samples, 1);
            (ColorSpace::Gray, color, Some(alpha))
        }
        png::ColorType::Rgba => {
            let (color, alpha) = split_alpha(samples, 3);
            (ColorSpace::Rgb, color, Some(alpha))
        }
        png::ColorType::Indexed => {
            return Err(AnnotError::InvalidImage(
                "indexed PNG was not expanded".to_string(),
            ))
        }
    };

    // Fully opaque masks are dropped
    let alpha = match alpha {
        Some(a) if a.iter().any(|&v| v != 0xFF) => Some(deflate(&a)?),
        _ => None,
    };

    Ok(DecodedImage {
        format: ImageFormat::Png,
        width: frame.width,
        height: frame.height,
        color_space,
        data: deflate(&color)?,
        alpha,
    })
}

fn split_alpha(samples: &[u8], color_channels: usize) -> (Vec<u8>, Vec<u8>) {
    let stride = color_channels + 1;
    let pixels = samples.len() / stride;
    let mut color = Vec::with_capacity(pixels * color_channels);
    let mut alpha = Vec::with_capacity(pixels);
    for px in samples.chunks_exact(stride) {
        color.extend_from_slice(&px[..color_channels]);
        alpha.push(px[color_channels]);
    }
    (color, alpha)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, AnnotError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| AnnotError::InvalidImage(format!("compression failed: {}", e)))
}

fn decode_jpeg(bytes: &[u8]) -> Result<DecodedImage, AnnotError> {
    let (width, height, components) = jpeg_frame_header(bytes)?;

    let color_space = match components {
        1 => ColorSpace::Gray,
        3 => ColorSpace::Rgb,
        4 => ColorSpace::Cmyk,
        n => {
            return Err(AnnotError::InvalidImage(format!(
                "JPEG with {} components is not supported",
                n
            )))
        }
    };

    Ok(DecodedImage {
        format: ImageFormat::Jpeg,
        width,
        height,
        color_space,
        data: bytes.to_vec(),
        alpha: None,
    })
}

/// Read (width, height, components) from the first SOFn segment.
fn jpeg_frame_header(bytes: &[u8]) -> Result<(u32, u32, u8), AnnotError> {
    let truncated = || AnnotError::InvalidImage("JPEG header is truncated".to_string());

    let mut pos = 2; // past SOI
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return Err(AnnotError::InvalidImage(
                "JPEG marker expected".to_string(),
            ));
        }
        let marker = bytes[pos + 1];
        match marker {
            // Fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // Markers without a length field
            0x01 | 0xD0..=0xD8 => {
                pos += 2;
                continue;
            }
            // EOI or start of scan before any frame header
            0xD9 | 0xDA => break,
            _ => {}
        }

        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if len < 2 || pos + 2 + len > bytes.len() {
            return Err(truncated());
        }

        let is_frame_header = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame_header {
            let segment = &bytes[pos + 4..pos + 2 + len];
            if segment.len() < 6 {
                return Err(truncated());
            }
            let height = u16::from_be_bytes([segment[1], segment[2]]) as u32;
            let width = u16::from_be_bytes([segment[3], segment[4]]) as u32;
            let components = segment[5];
            if width == 0 || height == 0 {
                return Err(AnnotError::InvalidImage("JPEG has no pixels".to_string()));
            }
            return Ok((width, height, components));
        }

        pos += 2 + len;
    }

    Err(AnnotError::InvalidImage(
        "JPEG frame header not found".to_string(),
    ))
}
