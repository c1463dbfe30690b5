use crate::reader::AseReader;
use crate::{DecodeError, Result};

pub(crate) const HEADER_MAGIC: u16 = 0xA5E0;

/// The fixed 128 byte header at the start of every Aseprite file.
///
/// All format-defined fields are kept, including ones this library does not
/// otherwise use, so that tooling built on top can inspect them. Reserved
/// trailing bytes must decode, but their content is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Total file size in bytes, as declared by the writer.
    pub file_size: u32,
    /// Number of frames the writer declared. Frames are decoded until the
    /// input ends, so the actual count is [`num_frames`](crate::Sprite::num_frames).
    pub frames: u16,
    /// Canvas width in pixels.
    pub width: u16,
    /// Canvas height in pixels.
    pub height: u16,
    /// Color depth in bits per pixel: 32 is RGBA, 16 grayscale, 8 indexed.
    pub color_depth: u16,
    /// Header flags (bit 1: layer opacity carries a valid value).
    pub flags: u32,
    /// Default frame duration in milliseconds. Deprecated by the format in
    /// favor of per-frame durations.
    pub speed: u16,
    /// Palette index that represents transparency in indexed sprites.
    pub transparent_color_index: u8,
    /// Number of palette colors (0 means 256).
    pub num_colors: u16,
    /// Pixel width. The on-screen pixel ratio is `pixel_width:pixel_height`,
    /// where 0:0 means 1:1. The ratio is display metadata; composited images
    /// always carry one output pixel per stored pixel.
    pub pixel_width: u8,
    /// Pixel height. See [`pixel_width`](Self::pixel_width).
    pub pixel_height: u8,
    /// X position of the grid.
    pub grid_x: i16,
    /// Y position of the grid.
    pub grid_y: i16,
    /// Grid width, zero when there is no grid.
    pub grid_width: u16,
    /// Grid height, zero when there is no grid.
    pub grid_height: u16,
}

pub(crate) fn parse_header(reader: &mut AseReader) -> Result<Header> {
    let file_size = reader.dword()?;
    let magic_number = reader.word()?;
    if magic_number != HEADER_MAGIC {
        return Err(DecodeError::Format(format!(
            "Invalid magic number for header: {:x} != {:x}",
            magic_number, HEADER_MAGIC
        )));
    }
    let frames = reader.word()?;
    let width = reader.word()?;
    let height = reader.word()?;
    let color_depth = reader.word()?;
    let flags = reader.dword()?;
    let speed = reader.word()?;
    let _placeholder1 = reader.dword()?;
    let _placeholder2 = reader.dword()?;
    let transparent_color_index = reader.byte()?;
    reader.skip_reserved(3)?;
    let num_colors = reader.word()?;
    let pixel_width = reader.byte()?;
    let pixel_height = reader.byte()?;
    let grid_x = reader.short()?;
    let grid_y = reader.short()?;
    let grid_width = reader.word()?;
    let grid_height = reader.word()?;
    reader.skip_reserved(84)?;

    Ok(Header {
        file_size,
        frames,
        width,
        height,
        color_depth,
        flags,
        speed,
        transparent_color_index,
        num_colors,
        pixel_width,
        pixel_height,
        grid_x,
        grid_y,
        grid_width,
        grid_height,
    })
}
