use crate::blend::Color8;
use crate::composite::{self, Canvas};
use crate::file::Sprite;
use crate::pixel::ColorLookup;
use crate::ComposeError;
use image::RgbaImage;

/// All frames of a file laid out side by side in a single image.
///
/// Frames keep their order: frame 0 sits at `x = 0`, frame 1 right next to
/// it, and so on. Every slot is exactly canvas sized, so the atlas is
/// `canvas width * number of frames` wide and one canvas tall.
#[derive(Debug)]
pub struct Atlas {
    image: RgbaImage,
    frames: Vec<AtlasRect>,
}

impl Atlas {
    /// The packed image.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Takes ownership of the packed image.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Placement rectangles of all frames, indexed by frame.
    pub fn frames(&self) -> &[AtlasRect] {
        &self.frames
    }

    /// Placement rectangle of one frame.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is not less than the number of frames.
    pub fn frame_rect(&self, frame: u32) -> AtlasRect {
        self.frames[frame as usize]
    }

    /// Number of frames packed into this atlas.
    pub fn num_frames(&self) -> u32 {
        self.frames.len() as u32
    }
}

/// Placement of one frame inside an [`Atlas`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasRect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels. Always 0; frames are packed in a single row.
    pub y: u32,
    /// Width of the slot (the canvas width).
    pub width: u32,
    /// Height of the slot (the canvas height).
    pub height: u32,
}

pub(crate) fn build_atlas(
    sprite: &Sprite,
    lookup: Option<&dyn ColorLookup>,
) -> Result<Atlas, ComposeError> {
    let width = sprite.width() as u32;
    let height = sprite.height() as u32;
    let frame_images = composite::composite_all(sprite, lookup);

    let mut canvas = Canvas::new(width * frame_images.len() as u32, height);
    let mut frames = Vec::with_capacity(frame_images.len());
    for (column, image) in frame_images.into_iter().enumerate() {
        let image = image?;
        let rect = AtlasRect {
            x: column as u32 * width,
            y: 0,
            width,
            height,
        };
        canvas.set_block(rect.x, 0, width, height, &rows_bottom_up(&image));
        frames.push(rect);
    }

    Ok(Atlas {
        image: canvas.finish(),
        frames,
    })
}

// Canvas blocks take their rows bottom to top.
fn rows_bottom_up(image: &RgbaImage) -> Vec<Color8> {
    let (width, height) = image.dimensions();
    let mut colors = Vec::with_capacity((width * height) as usize);
    for row in (0..height).rev() {
        for col in 0..width {
            colors.push(*image.get_pixel(col, row));
        }
    }
    colors
}
