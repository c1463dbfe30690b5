use crate::reader::AseReader;
use crate::{DecodeError, Result};

/// A named animation: an inclusive frame range plus a playback direction.
///
/// Tags may appear anywhere in the file; they are collected in the order
/// their chunks are stored. Nothing stops a file from containing several
/// tags with the same name or overlapping frame ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    from_frame: u16,
    to_frame: u16,
    direction: AnimationDirection,
}

impl Tag {
    /// The tag's name. Not guaranteed to be unique within a file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First frame of the animation.
    pub fn from_frame(&self) -> u32 {
        self.from_frame as u32
    }

    /// Last frame of the animation, inclusive.
    pub fn to_frame(&self) -> u32 {
        self.to_frame as u32
    }

    /// Number of frames the tag spans. A tag stored with its end before
    /// its start spans no frames.
    pub fn num_frames(&self) -> u32 {
        (self.to_frame() + 1).saturating_sub(self.from_frame())
    }

    /// The playback direction.
    pub fn animation_direction(&self) -> AnimationDirection {
        self.direction
    }
}

/// Describes how an animation is meant to be played back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationDirection {
    /// Plays from `from_frame` to `to_frame`.
    Forward,
    /// Plays from `to_frame` back to `from_frame`.
    Reverse,
    /// Alternates between playing forward and reverse.
    PingPong,
}

fn parse_animation_direction(id: u8) -> Result<AnimationDirection> {
    match id {
        0 => Ok(AnimationDirection::Forward),
        1 => Ok(AnimationDirection::Reverse),
        2 => Ok(AnimationDirection::PingPong),
        _ => Err(DecodeError::Format(format!(
            "Invalid animation direction: {}",
            id
        ))),
    }
}

pub(crate) fn parse_tags_chunk(data: &[u8]) -> Result<Vec<Tag>> {
    let mut reader = AseReader::new(data);

    let num_tags = reader.word()?;
    reader.skip_reserved(8)?;

    let mut result = Vec::with_capacity(num_tags as usize);
    for _ in 0..num_tags {
        let from_frame = reader.word()?;
        let to_frame = reader.word()?;
        let direction = parse_animation_direction(reader.byte()?)?;
        reader.skip_reserved(8)?;
        let _color = reader.dword()?;
        let name = reader.string()?;
        result.push(Tag {
            name,
            from_frame,
            to_frame,
            direction,
        });
    }
    Ok(result)
}
