use crate::blend::Color8;
use crate::reader::AseReader;
use crate::{DecodeError, PixelFormat, Result};
use image::Rgba;
use std::borrow::Cow;

// From the file format description:
// PIXEL: One pixel, depending on the image pixel format:
// Grayscale: BYTE[2], each pixel has 2 bytes in the order Value, Alpha.
// Indexed: BYTE, each pixel uses 1 byte (the index).
// RGBA: BYTE[4], each pixel has 4 bytes in this order Red, Green, Blue, Alpha.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Grayscale {
    value: u8,
    alpha: u8,
}

impl Grayscale {
    fn as_rgba(self) -> Color8 {
        Rgba([self.value, self.value, self.value, self.alpha])
    }
}

/// Pixel payload of a cel, stored in the source file's pixel format.
pub(crate) enum Pixels {
    Rgba(Vec<Color8>),
    Grayscale(Vec<Grayscale>),
    Indexed(Vec<u8>),
}

impl Pixels {
    fn from_bytes(bytes: Vec<u8>, pixel_format: PixelFormat) -> Result<Self> {
        match pixel_format {
            PixelFormat::Indexed => Ok(Self::Indexed(bytes)),
            PixelFormat::Grayscale => {
                if bytes.len() % 2 != 0 {
                    return Err(DecodeError::Format(
                        "Incorrect length of bytes for grayscale image data".to_string(),
                    ));
                }
                let pixels = bytes
                    .chunks_exact(2)
                    .map(|chunk| Grayscale {
                        value: chunk[0],
                        alpha: chunk[1],
                    })
                    .collect();
                Ok(Self::Grayscale(pixels))
            }
            PixelFormat::Rgba => {
                if bytes.len() % 4 != 0 {
                    return Err(DecodeError::Format(
                        "Incorrect length of bytes for RGBA image data".to_string(),
                    ));
                }
                let pixels = bytes
                    .chunks_exact(4)
                    .map(|chunk| Rgba([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect();
                Ok(Self::Rgba(pixels))
            }
        }
    }

    /// Reads an uncompressed pixel payload. The payload must contain exactly
    /// `expected_pixel_count` pixels.
    pub(crate) fn from_raw(
        reader: AseReader,
        pixel_format: PixelFormat,
        expected_pixel_count: usize,
    ) -> Result<Self> {
        let expected_bytes = pixel_format.bytes_per_pixel() * expected_pixel_count;
        reader
            .take_bytes(expected_bytes)
            .and_then(|bytes| Self::from_bytes(bytes, pixel_format))
    }

    /// Inflates and reads a zlib-compressed pixel payload. The decompressed
    /// data must contain exactly `expected_pixel_count` pixels.
    pub(crate) fn from_compressed(
        reader: AseReader,
        pixel_format: PixelFormat,
        expected_pixel_count: usize,
    ) -> Result<Self> {
        let expected_bytes = pixel_format.bytes_per_pixel() * expected_pixel_count;
        let bytes = reader.unzip(expected_bytes)?;
        if bytes.len() != expected_bytes {
            return Err(DecodeError::Format(format!(
                "Incorrect amount of decompressed image data. Expected: {}, Actual: {}",
                expected_bytes,
                bytes.len()
            )));
        }
        Self::from_bytes(bytes, pixel_format)
    }
}

/// Resolves indexed-mode pixel values to concrete colors.
///
/// Palette chunks are not decoded by this library; the colors for an indexed
/// sprite come from the caller through this trait (usually a [`Palette`]
/// built from the asset pipeline that produced the file). Lookups are shared
/// across worker threads when compositing in parallel, hence the `Sync`
/// bound.
pub trait ColorLookup: Sync {
    /// The color stored at `index`.
    fn color(&self, index: u8) -> Rgba<u8>;
}

/// A plain array of colors, addressed by palette index.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    colors: Vec<Rgba<u8>>,
}

impl Palette {
    /// Creates a palette from colors in index order.
    pub fn new(colors: Vec<Rgba<u8>>) -> Palette {
        Palette { colors }
    }

    /// Number of colors in the palette.
    pub fn num_colors(&self) -> u32 {
        self.colors.len() as u32
    }
}

impl ColorLookup for Palette {
    /// Indices past the end of the palette resolve to transparent black.
    fn color(&self, index: u8) -> Rgba<u8> {
        self.colors
            .get(index as usize)
            .copied()
            .unwrap_or(Rgba([0, 0, 0, 0]))
    }
}

/// Converts a cel's pixels to RGBA, in payload order.
///
/// Indexed pixels equal to the transparent color index become fully
/// transparent, except on background layers where the palette color is kept
/// as-is. Returns `None` for indexed pixels without a lookup; the caller
/// turns that into a compose error.
pub(crate) fn resolve_rgba<'a>(
    pixels: &'a Pixels,
    lookup: Option<&dyn ColorLookup>,
    transparent_color_index: u8,
    layer_is_background: bool,
) -> Option<Cow<'a, [Color8]>> {
    match pixels {
        Pixels::Rgba(colors) => Some(Cow::Borrowed(colors.as_slice())),
        Pixels::Grayscale(colors) => Some(Cow::Owned(
            colors.iter().map(|gray| gray.as_rgba()).collect(),
        )),
        Pixels::Indexed(indices) => {
            let lookup = lookup?;
            let colors = indices
                .iter()
                .map(|&index| {
                    let color = lookup.color(index);
                    if index == transparent_color_index && !layer_is_background {
                        Rgba([color[0], color[1], color[2], 0])
                    } else {
                        color
                    }
                })
                .collect();
            Some(Cow::Owned(colors))
        }
    }
}
