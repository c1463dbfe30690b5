use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::atlas::{self, Atlas};
use crate::cel::RawCel;
use crate::composite;
use crate::header::Header;
use crate::layer::{Layer, Layers};
use crate::parse;
use crate::pixel::ColorLookup;
use crate::tags::Tag;
use crate::{ComposeError, Result};
use image::RgbaImage;

/// Pixel format of the source file.
///
/// The compositing output is always RGBA; this describes how cels store
/// their pixels on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Red, green, blue, and alpha with 8 bits each.
    Rgba,
    /// 8 bit grayscale and 8 bit alpha.
    Grayscale,
    /// 8 bit palette index per pixel. Concrete colors come from a
    /// [`ColorLookup`] supplied at composite time.
    Indexed,
}

impl PixelFormat {
    /// Number of bytes one pixel occupies on disk.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba => 4,
            PixelFormat::Grayscale => 2,
            PixelFormat::Indexed => 1,
        }
    }
}

/// One decoded frame: its duration and its cels in stored order.
#[derive(Debug)]
pub(crate) struct FrameData {
    pub(crate) duration_ms: u16,
    pub(crate) cels: Vec<RawCel>,
}

/// A decoded Aseprite document.
///
/// Constructed via [`Sprite::read`] or [`Sprite::read_file`]. The document
/// is immutable once decoded; compositing methods derive images from it
/// without changing it.
#[derive(Debug)]
pub struct Sprite {
    pub(crate) header: Header,
    pub(crate) pixel_format: PixelFormat,
    pub(crate) frames: Vec<FrameData>,
    pub(crate) layers: Layers,
    pub(crate) tags: Vec<Tag>,
}

impl Sprite {
    /// Loads an Aseprite file from disk.
    pub fn read_file(path: &Path) -> Result<Sprite> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        parse::read_sprite(&data)
    }

    /// Loads an Aseprite file from any input, e.g. one embedded with
    /// `include_bytes!`.
    pub fn read<R: Read>(mut input: R) -> Result<Sprite> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        parse::read_sprite(&data)
    }

    /// The fixed file header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.header.width as usize
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.header.height as usize
    }

    /// Width and height in pixels.
    pub fn size(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// How the file stores its pixels.
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Number of frames that were decoded. Frames are read until the input
    /// ends, so this can differ from the count in [`Sprite::header`].
    pub fn num_frames(&self) -> u32 {
        self.frames.len() as u32
    }

    /// Number of layers.
    pub fn num_layers(&self) -> u32 {
        self.layers.len() as u32
    }

    /// A reference to one frame.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than [`Sprite::num_frames`].
    pub fn frame(&self, index: u32) -> Frame {
        assert!(index < self.num_frames());
        Frame { file: self, index }
    }

    /// A reference to one layer. Layer 0 is the bottom-most layer.
    ///
    /// # Panics
    ///
    /// Panics if `layer_id` is not less than [`Sprite::num_layers`].
    pub fn layer(&self, layer_id: u32) -> Layer {
        assert!(layer_id < self.num_layers());
        Layer {
            file: self,
            layer_id,
        }
    }

    /// The layer with the given name, if any. If the file contains several
    /// layers with that name, the one with the lowest ID wins.
    pub fn layer_by_name(&self, name: &str) -> Option<Layer> {
        self.layers_iter().find(|layer| layer.name() == name)
    }

    /// An iterator over all layers, bottom layer first.
    pub fn layers_iter(&self) -> LayersIter {
        LayersIter {
            file: self,
            next: 0,
        }
    }

    /// All animation tags, in the order their chunks appear in the file.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Total number of animation tags.
    pub fn num_tags(&self) -> u32 {
        self.tags.len() as u32
    }

    /// A reference to one tag.
    ///
    /// # Panics
    ///
    /// Panics if `tag_id` is not less than [`Sprite::num_tags`].
    pub fn tag(&self, tag_id: u32) -> &Tag {
        &self.tags[tag_id as usize]
    }

    /// The tag with the given name, if any. If the file contains several
    /// tags with that name, the one with the lowest ID wins.
    pub fn tag_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name() == name)
    }

    /// Flattens one frame into an RGBA image of canvas size.
    ///
    /// Fails with [`ComposeError::MissingPalette`] for indexed files; use
    /// [`Sprite::frame_image_with`] for those.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is not less than [`Sprite::num_frames`].
    pub fn frame_image(&self, frame: u32) -> Result<RgbaImage, ComposeError> {
        assert!(frame < self.num_frames());
        composite::composite_frame(self, frame, None)
    }

    /// Like [`Sprite::frame_image`], with a color lookup for indexed files.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is not less than [`Sprite::num_frames`].
    pub fn frame_image_with(
        &self,
        frame: u32,
        colors: &dyn ColorLookup,
    ) -> Result<RgbaImage, ComposeError> {
        assert!(frame < self.num_frames());
        composite::composite_frame(self, frame, Some(colors))
    }

    /// Flattens every frame. The result is indexed by frame; a frame that
    /// fails to composite does not stop the others.
    pub fn frame_images(&self) -> Vec<Result<RgbaImage, ComposeError>> {
        composite::composite_all(self, None)
    }

    /// Like [`Sprite::frame_images`], with a color lookup for indexed
    /// files.
    pub fn frame_images_with(
        &self,
        colors: &dyn ColorLookup,
    ) -> Vec<Result<RgbaImage, ComposeError>> {
        composite::composite_all(self, Some(colors))
    }

    /// Flattens every frame and packs the results into a horizontal strip,
    /// frame 0 leftmost. Fails if any frame fails to composite.
    pub fn atlas(&self) -> Result<Atlas, ComposeError> {
        atlas::build_atlas(self, None)
    }

    /// Like [`Sprite::atlas`], with a color lookup for indexed files.
    pub fn atlas_with(&self, colors: &dyn ColorLookup) -> Result<Atlas, ComposeError> {
        atlas::build_atlas(self, Some(colors))
    }
}

/// A reference to a single frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    file: &'a Sprite,
    index: u32,
}

impl<'a> Frame<'a> {
    /// The frame number.
    pub fn id(&self) -> u32 {
        self.index
    }

    /// How long this frame should be displayed, in milliseconds.
    pub fn duration(&self) -> u32 {
        self.file.frames[self.index as usize].duration_ms as u32
    }

    /// Number of cels stored for this frame.
    pub fn num_cels(&self) -> u32 {
        self.file.frames[self.index as usize].cels.len() as u32
    }

    /// Flattens this frame into an image. See [`Sprite::frame_image`].
    pub fn image(&self) -> Result<RgbaImage, ComposeError> {
        self.file.frame_image(self.index)
    }

    /// Like [`Frame::image`], with a color lookup for indexed files.
    pub fn image_with(&self, colors: &dyn ColorLookup) -> Result<RgbaImage, ComposeError> {
        self.file.frame_image_with(self.index, colors)
    }
}

/// An iterator over the layers of a file. See [`Sprite::layers_iter`].
#[derive(Debug)]
pub struct LayersIter<'a> {
    file: &'a Sprite,
    next: u32,
}

impl<'a> Iterator for LayersIter<'a> {
    type Item = Layer<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next < self.file.num_layers() {
            let item = self.file.layer(self.next);
            self.next += 1;
            Some(item)
        } else {
            None
        }
    }
}
