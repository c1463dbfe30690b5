use crate::pixel::Pixels;
use crate::reader::AseReader;
use crate::{DecodeError, PixelFormat, Result};
use std::fmt;

/// Width and height of a cel's pixel block.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ImageSize {
    pub(crate) width: u16,
    pub(crate) height: u16,
}

impl ImageSize {
    fn parse(reader: &mut AseReader) -> Result<ImageSize> {
        let width = reader.word()?;
        let height = reader.word()?;
        Ok(ImageSize { width, height })
    }

    pub(crate) fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// One decoded cel chunk: the pixel data of one layer in one frame.
///
/// `x` and `y` may be negative and the pixel block may reach past the
/// canvas; clipping happens at composite time.
#[derive(Debug)]
pub(crate) struct RawCel {
    pub(crate) layer_index: u16,
    pub(crate) x: i16,
    pub(crate) y: i16,
    pub(crate) opacity: u8,
    pub(crate) content: CelContent,
}

#[derive(Debug)]
pub(crate) enum CelContent {
    /// Pixel data stored in this cel.
    Image(ImageContent),
    /// This cel reuses the image of the cel on the same layer in the given
    /// frame.
    Linked(u16),
}

pub(crate) struct ImageContent {
    pub(crate) size: ImageSize,
    pub(crate) pixels: Pixels,
}

impl fmt::Debug for ImageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}x{} cel>", self.size.width, self.size.height)
    }
}

pub(crate) fn parse_cel_chunk(data: &[u8], pixel_format: PixelFormat) -> Result<RawCel> {
    let mut reader = AseReader::new(data);

    let layer_index = reader.word()?;
    let x = reader.short()?;
    let y = reader.short()?;
    let opacity = reader.byte()?;
    let cel_type = reader.word()?;
    reader.skip_reserved(7)?;

    let content = match cel_type {
        0 => parse_raw_cel(reader, pixel_format)?,
        1 => CelContent::Linked(reader.word()?),
        2 => parse_compressed_cel(reader, pixel_format)?,
        _ => {
            return Err(DecodeError::Format(format!(
                "Invalid/unsupported cel type: {}",
                cel_type
            )))
        }
    };

    Ok(RawCel {
        layer_index,
        x,
        y,
        opacity,
        content,
    })
}

fn parse_raw_cel(mut reader: AseReader, pixel_format: PixelFormat) -> Result<CelContent> {
    let size = ImageSize::parse(&mut reader)?;
    Pixels::from_raw(reader, pixel_format, size.pixel_count())
        .map(|pixels| CelContent::Image(ImageContent { size, pixels }))
}

fn parse_compressed_cel(mut reader: AseReader, pixel_format: PixelFormat) -> Result<CelContent> {
    let size = ImageSize::parse(&mut reader)?;
    Pixels::from_compressed(reader, pixel_format, size.pixel_count())
        .map(|pixels| CelContent::Image(ImageContent { size, pixels }))
}
