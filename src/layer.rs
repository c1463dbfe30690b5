use crate::file::Sprite;
use crate::reader::AseReader;
use crate::{DecodeError, Result};
use bitflags::bitflags;

/// Types of layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    /// A regular image layer. Its cels carry pixel data.
    Image,
    /// A layer that groups other layers. Has no cels of its own, but its
    /// visibility applies to everything below it in the hierarchy.
    Group,
}

bitflags! {
    /// Attribute flags of a layer, as stored in the layer chunk.
    pub struct LayerFlags: u32 {
        /// Layer is visible (eye icon enabled).
        const VISIBLE = 0x0001;
        /// Layer can be modified (lock icon disabled).
        const EDITABLE = 0x0002;
        /// Layer cannot be moved.
        const MOVEMENT_LOCKED = 0x0004;
        /// Layer is a background layer (stack order cannot be changed).
        const BACKGROUND = 0x0008;
        /// Prefer to link cels when the user copies them.
        const CONTINUOUS = 0x0010;
        /// Prefer to show this group layer collapsed.
        const COLLAPSED = 0x0020;
        /// This is a reference layer.
        const REFERENCE = 0x0040;

        /// The flag combination a background layer carries.
        const BACKGROUND_LAYER = Self::MOVEMENT_LOCKED.bits | Self::BACKGROUND.bits;
    }
}

/// Blend modes, as stored in the layer chunk.
///
/// Describes how a layer's pixels combine with the image composited so far
/// when a frame is flattened. See [`Layer::blend_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Addition,
    Subtract,
    Divide,
    /// A mode code this library does not know. Cels on such a layer leave
    /// the image below unchanged when compositing.
    Unsupported(u16),
}

fn parse_blend_mode(id: u16) -> BlendMode {
    match id {
        0 => BlendMode::Normal,
        1 => BlendMode::Multiply,
        2 => BlendMode::Screen,
        3 => BlendMode::Overlay,
        4 => BlendMode::Darken,
        5 => BlendMode::Lighten,
        6 => BlendMode::ColorDodge,
        7 => BlendMode::ColorBurn,
        8 => BlendMode::HardLight,
        9 => BlendMode::SoftLight,
        10 => BlendMode::Difference,
        11 => BlendMode::Exclusion,
        12 => BlendMode::Hue,
        13 => BlendMode::Saturation,
        14 => BlendMode::Color,
        15 => BlendMode::Luminosity,
        16 => BlendMode::Addition,
        17 => BlendMode::Subtract,
        18 => BlendMode::Divide,
        _ => BlendMode::Unsupported(id),
    }
}

fn parse_layer_type(id: u16) -> Result<LayerType> {
    match id {
        0 => Ok(LayerType::Image),
        1 => Ok(LayerType::Group),
        _ => Err(DecodeError::Format(format!("Invalid layer type: {}", id))),
    }
}

/// One decoded layer chunk.
#[derive(Debug, Clone)]
pub(crate) struct LayerChunk {
    pub(crate) flags: LayerFlags,
    pub(crate) name: String,
    pub(crate) blend_mode: BlendMode,
    pub(crate) opacity: u8,
    pub(crate) layer_type: LayerType,
    pub(crate) child_level: u16,
}

impl LayerChunk {
    pub(crate) fn is_visible(&self) -> bool {
        self.flags.contains(LayerFlags::VISIBLE)
    }

    pub(crate) fn is_background(&self) -> bool {
        self.flags.contains(LayerFlags::BACKGROUND)
    }
}

pub(crate) fn parse_layer_chunk(data: &[u8]) -> Result<LayerChunk> {
    let mut reader = AseReader::new(data);

    let flags = reader.word()?;
    let layer_type = reader.word()?;
    let child_level = reader.word()?;
    let _default_width = reader.word()?;
    let _default_height = reader.word()?;
    let blend_mode = reader.word()?;
    let opacity = reader.byte()?;
    reader.skip_reserved(3)?;
    let name = reader.string()?;

    Ok(LayerChunk {
        flags: LayerFlags::from_bits_truncate(flags as u32),
        name,
        blend_mode: parse_blend_mode(blend_mode),
        opacity,
        layer_type: parse_layer_type(layer_type)?,
        child_level,
    })
}

/// The file's layers in document order, bottom to top.
///
/// Layer chunks appear once per file and form a flattened tree: each chunk
/// carries a child level, and a layer's parent is found by scanning back
/// for the nearest layer one level up.
#[derive(Debug)]
pub(crate) struct Layers {
    layers: Vec<LayerChunk>,
}

impl Layers {
    pub(crate) fn new(layers: Vec<LayerChunk>) -> Layers {
        Layers { layers }
    }

    pub(crate) fn len(&self) -> usize {
        self.layers.len()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&LayerChunk> {
        self.layers.get(index)
    }

    pub(crate) fn chunk(&self, index: usize) -> &LayerChunk {
        &self.layers[index]
    }

    /// Index of the group that contains layer `index`, if any.
    ///
    /// The backward scan stops ahead of index 0, so the bottom-most layer
    /// is never reported as a parent even when its child level matches.
    /// Group layers must not sit at the very bottom of the stack.
    pub(crate) fn parent_index(&self, index: usize) -> Option<usize> {
        let child_level = self.layers.get(index)?.child_level;
        if child_level == 0 {
            return None;
        }
        (1..index)
            .rev()
            .find(|&candidate| self.layers[candidate].child_level == child_level - 1)
    }

    /// Whether layer `index` and all groups above it are visible.
    pub(crate) fn is_visible(&self, index: usize) -> bool {
        if !self.chunk(index).is_visible() {
            return false;
        }
        let mut current = index;
        while let Some(parent) = self.parent_index(current) {
            if !self.chunk(parent).is_visible() {
                return false;
            }
            current = parent;
        }
        true
    }
}

/// A reference to a single layer.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub(crate) file: &'a Sprite,
    pub(crate) layer_id: u32,
}

impl<'a> Layer<'a> {
    fn chunk(&self) -> &LayerChunk {
        self.file.layers.chunk(self.layer_id as usize)
    }

    /// This layer's ID, i.e. its index in the file's layer list. Layer 0 is
    /// the bottom-most layer.
    pub fn id(&self) -> u32 {
        self.layer_id
    }

    /// Name of the layer. Not guaranteed to be unique within a file.
    pub fn name(&self) -> &str {
        &self.chunk().name
    }

    /// The layer's attribute flags.
    pub fn flags(&self) -> LayerFlags {
        self.chunk().flags
    }

    /// Opacity of the layer (`0` transparent, `255` opaque).
    pub fn opacity(&self) -> u8 {
        self.chunk().opacity
    }

    /// How pixels on this layer combine with the layers below.
    pub fn blend_mode(&self) -> BlendMode {
        self.chunk().blend_mode
    }

    /// Whether this is an image layer or a group layer.
    pub fn layer_type(&self) -> LayerType {
        self.chunk().layer_type
    }

    /// The group layer this layer is nested under, if any.
    pub fn parent(&self) -> Option<Layer<'a>> {
        self.file
            .layers
            .parent_index(self.layer_id as usize)
            .map(|index| Layer {
                file: self.file,
                layer_id: index as u32,
            })
    }

    /// Whether this layer is visible, taking the visibility of all groups
    /// above it into account.
    pub fn is_visible(&self) -> bool {
        self.file.layers.is_visible(self.layer_id as usize)
    }
}
