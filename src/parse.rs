use crate::cel::{self, RawCel};
use crate::file::{FrameData, PixelFormat, Sprite};
use crate::header;
use crate::layer::{self, LayerChunk, Layers};
use crate::reader::AseReader;
use crate::tags::{self, Tag};
use crate::{DecodeError, Result};
use log::debug;

// Chunk type codes handled by this library. Everything else is skipped.
const CHUNK_LAYER: u16 = 0x2004;
const CHUNK_CEL: u16 = 0x2005;
const CHUNK_TAGS: u16 = 0x2018;

const FRAME_MAGIC: u16 = 0xf1fa;

// The declared chunk size includes this header (dword size + word type).
const CHUNK_HEADER_SIZE: usize = 6;
// Frame header: dword length, word magic, word old chunk count, word
// duration, 2 reserved bytes, dword chunk count.
const FRAME_HEADER_SIZE: usize = 16;

/// Decodes a complete document from a byte buffer.
///
/// The header's declared frame count is ignored: frames are read until the
/// input ends, which also accepts files whose writer miscounted.
pub(crate) fn read_sprite(data: &[u8]) -> Result<Sprite> {
    let mut reader = AseReader::new(data);
    let header = header::parse_header(&mut reader)?;
    let pixel_format = parse_pixel_format(header.color_depth)?;

    let mut frames = Vec::with_capacity(header.frames as usize);
    let mut layers: Vec<LayerChunk> = Vec::new();
    let mut tags: Vec<Tag> = Vec::new();

    while !reader.is_at_end() {
        let raw_frame = parse_frame(&mut reader, pixel_format)?;
        // Layer chunks and tag chunks are document-global; cels belong to
        // the frame they were stored in.
        layers.extend(raw_frame.layers);
        tags.extend(raw_frame.tags);
        frames.push(FrameData {
            duration_ms: raw_frame.duration_ms,
            cels: raw_frame.cels,
        });
    }

    Ok(Sprite {
        header,
        pixel_format,
        frames,
        layers: Layers::new(layers),
        tags,
    })
}

fn parse_pixel_format(color_depth: u16) -> Result<PixelFormat> {
    match color_depth {
        8 => Ok(PixelFormat::Indexed),
        16 => Ok(PixelFormat::Grayscale),
        32 => Ok(PixelFormat::Rgba),
        depth => Err(DecodeError::Format(format!(
            "Unknown pixel format. Color depth: {}",
            depth
        ))),
    }
}

struct RawFrame {
    duration_ms: u16,
    layers: Vec<LayerChunk>,
    cels: Vec<RawCel>,
    tags: Vec<Tag>,
}

fn parse_frame(reader: &mut AseReader, pixel_format: PixelFormat) -> Result<RawFrame> {
    let num_bytes = reader.dword()?;
    let magic_number = reader.word()?;
    if magic_number != FRAME_MAGIC {
        return Err(DecodeError::Format(format!(
            "Invalid magic number for frame: {:x} != {:x}",
            magic_number, FRAME_MAGIC
        )));
    }
    let old_num_chunks = reader.word()?;
    let duration_ms = reader.word()?;
    reader.skip_reserved(2)?;
    let new_num_chunks = reader.dword()?;

    if (num_bytes as usize) < FRAME_HEADER_SIZE {
        return Err(DecodeError::Format(format!(
            "Invalid frame length: {}",
            num_bytes
        )));
    }
    let mut bytes_available = num_bytes as i64 - FRAME_HEADER_SIZE as i64;
    if bytes_available as usize > reader.remaining() {
        return Err(DecodeError::Format(format!(
            "Frame length {} exceeds the {} bytes left in the input",
            num_bytes,
            reader.remaining() + FRAME_HEADER_SIZE
        )));
    }

    let num_chunks = if new_num_chunks == 0 {
        old_num_chunks as u32
    } else {
        new_num_chunks
    };

    let mut frame = RawFrame {
        duration_ms,
        layers: Vec::new(),
        cels: Vec::new(),
        tags: Vec::new(),
    };
    for _ in 0..num_chunks {
        match read_chunk(reader, pixel_format, &mut bytes_available)? {
            Chunk::Layer(chunk) => frame.layers.push(chunk),
            Chunk::Cel(chunk) => frame.cels.push(chunk),
            Chunk::Tags(mut chunk) => frame.tags.append(&mut chunk),
            Chunk::Ignored => {}
        }
    }
    // The declared frame length is authoritative for the stream position.
    // Skip bytes the chunks did not account for so the next frame starts at
    // the right offset.
    if bytes_available > 0 {
        reader.skip_reserved(bytes_available as usize)?;
    }
    Ok(frame)
}

// A decoded chunk. Chunk types outside this library's scope, as well as
// unknown ones, decode to `Ignored`; their declared size still moves the
// cursor so the rest of the frame stays in sync.
enum Chunk {
    Layer(LayerChunk),
    Cel(RawCel),
    Tags(Vec<Tag>),
    Ignored,
}

fn read_chunk(
    reader: &mut AseReader,
    pixel_format: PixelFormat,
    bytes_available: &mut i64,
) -> Result<Chunk> {
    let chunk_size = reader.dword()?;
    let chunk_type = reader.word()?;
    check_chunk_bytes(chunk_size, *bytes_available)?;
    let chunk_data_bytes = chunk_size as usize - CHUNK_HEADER_SIZE;
    let mut data = vec![0_u8; chunk_data_bytes];
    reader.read_exact(&mut data)?;
    *bytes_available -= chunk_size as i64;

    match chunk_type {
        CHUNK_LAYER => layer::parse_layer_chunk(&data).map(Chunk::Layer),
        CHUNK_CEL => cel::parse_cel_chunk(&data, pixel_format).map(Chunk::Cel),
        CHUNK_TAGS => tags::parse_tags_chunk(&data).map(Chunk::Tags),
        _ => {
            debug!(
                "Ignoring chunk of type 0x{:04x} ({} bytes)",
                chunk_type, chunk_data_bytes
            );
            Ok(Chunk::Ignored)
        }
    }
}

fn check_chunk_bytes(chunk_size: u32, bytes_available: i64) -> Result<()> {
    if (chunk_size as usize) < CHUNK_HEADER_SIZE {
        return Err(DecodeError::Format(format!(
            "Chunk size is too small {}, minimum_size: {}",
            chunk_size, CHUNK_HEADER_SIZE
        )));
    }
    if chunk_size as i64 > bytes_available {
        return Err(DecodeError::Format(format!(
            "Trying to read chunk of size {}, but frame has only {} bytes left",
            chunk_size, bytes_available
        )));
    }
    Ok(())
}
