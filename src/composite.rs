//! Flattens the cels of a frame into a single RGBA image.
//!
//! Cels are placed bottom layer first. Visibility is resolved through the
//! layer hierarchy, the layer's blend mode picks the pixel combinator, and
//! out-of-canvas pixels are clipped before anything touches the canvas.

use crate::blend::{self, BlendFn, Color8};
use crate::cel::{CelContent, ImageContent, RawCel};
use crate::file::Sprite;
use crate::layer::{BlendMode, LayerChunk, LayerType};
use crate::pixel::{self, ColorLookup};
use crate::ComposeError;
use image::{Rgba, RgbaImage};
use log::{debug, warn};

/// Canvas-sized RGBA accumulator for one frame.
///
/// Pixel blocks arrive with bottom-up row order and bottom-origin
/// placement; this type converts them to the top-down layout of
/// [`RgbaImage`] in one place.
pub(crate) struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// A fully transparent canvas.
    pub(crate) fn new(width: u32, height: u32) -> Canvas {
        Canvas {
            image: RgbaImage::new(width, height),
        }
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    /// Overwrites a block of pixels. `x` and `y` locate the block's
    /// bottom-left corner, measured from the canvas's bottom-left; `colors`
    /// holds the rows bottom to top.
    pub(crate) fn set_block(&mut self, x: u32, y: u32, width: u32, height: u32, colors: &[Color8]) {
        for row in 0..height {
            let image_y = self.height() - 1 - (y + row);
            for col in 0..width {
                let color = colors[(row * width + col) as usize];
                self.image.put_pixel(x + col, image_y, color);
            }
        }
    }

    /// Blends a block of pixels onto the canvas with `f` at `opacity`.
    /// Coordinates and row order as in [`Canvas::set_block`].
    pub(crate) fn blend_block(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        colors: &[Color8],
        f: BlendFn,
        opacity: u8,
    ) {
        for row in 0..height {
            let image_y = self.height() - 1 - (y + row);
            for col in 0..width {
                let src = colors[(row * width + col) as usize];
                let image_x = x + col;
                let backdrop = *self.image.get_pixel(image_x, image_y);
                self.image.put_pixel(image_x, image_y, f(backdrop, src, opacity));
            }
        }
    }

    /// The accumulated image.
    pub(crate) fn finish(self) -> RgbaImage {
        self.image
    }
}

// A cel clipped to the canvas, ready for placement.
struct CelBlock {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    colors: Vec<Color8>,
}

/// Clips a cel's pixels against the canvas and builds its placement block.
///
/// The clipped width and height shrink by however far the cel reaches past
/// the right and bottom canvas edges. A cel pushed past the left or top
/// edge keeps its clipped size but skips the off-canvas part of the
/// payload, which leaves transparent filler ahead of the copied pixels.
/// Rows are stored bottom-up and the block is placed from the canvas
/// bottom, matching what [`Canvas`] expects. Returns `None` when no pixel
/// of the cel can land on the canvas.
fn rasterize(
    canvas_width: u32,
    canvas_height: u32,
    cel_x: i32,
    cel_y: i32,
    cel_width: u32,
    cel_height: u32,
    pixels: &[Color8],
) -> Option<CelBlock> {
    let canvas_w = canvas_width as i32;
    let canvas_h = canvas_height as i32;
    let cel_w = cel_width as i32;
    let cel_h = cel_height as i32;

    let mut width = cel_w.min(canvas_w);
    let mut height = cel_h.min(canvas_h);
    if cel_x + cel_w > canvas_w {
        width -= (cel_x + cel_w) - canvas_w;
    }
    if cel_y + cel_h > canvas_h {
        height -= (cel_y + cel_h) - canvas_h;
    }
    let offset_x = if cel_x < 0 { -cel_x } else { 0 };
    let offset_y = if cel_y < 0 { -cel_y } else { 0 };
    if width <= 0 || height <= 0 || offset_x >= width || offset_y >= height {
        return None;
    }

    let mut colors = vec![Rgba([0, 0, 0, 0]); (width * height) as usize];
    for y in offset_y..height {
        for x in offset_x..width {
            let src = (y * cel_w + x) as usize;
            let dst = ((height - (y + 1)) * width + x) as usize;
            colors[dst] = pixels[src];
        }
    }

    Some(CelBlock {
        x: (cel_x + offset_x) as u32,
        y: (canvas_h - (cel_y + offset_y) - height) as u32,
        width: width as u32,
        height: height as u32,
        colors,
    })
}

/// Flattens one frame of `sprite` into an image.
pub(crate) fn composite_frame(
    sprite: &Sprite,
    frame: u32,
    lookup: Option<&dyn ColorLookup>,
) -> Result<RgbaImage, ComposeError> {
    let mut canvas = Canvas::new(sprite.width() as u32, sprite.height() as u32);

    // Cels are stored in chunk order; compositing goes bottom layer first.
    // The sort is stable, so cels sharing a layer keep their stored order.
    let mut cels: Vec<&RawCel> = sprite.frames[frame as usize].cels.iter().collect();
    cels.sort_by_key(|cel| cel.layer_index);

    for cel in cels {
        write_cel(sprite, frame, cel, lookup, &mut canvas)?;
    }
    Ok(canvas.finish())
}

fn write_cel(
    sprite: &Sprite,
    frame: u32,
    cel: &RawCel,
    lookup: Option<&dyn ColorLookup>,
    canvas: &mut Canvas,
) -> Result<(), ComposeError> {
    let layer_index = cel.layer_index as usize;
    let layer = sprite
        .layers
        .get(layer_index)
        .ok_or(ComposeError::LayerIndex {
            frame,
            layer_index: cel.layer_index as u32,
            num_layers: sprite.layers.len() as u32,
        })?;

    if layer.layer_type == LayerType::Group || !sprite.layers.is_visible(layer_index) {
        return Ok(());
    }

    let content = match &cel.content {
        CelContent::Image(content) => content,
        CelContent::Linked(target_frame) => {
            match linked_cel(sprite, *target_frame, cel.layer_index) {
                Some(target) => {
                    // Only one level of linking is followed.
                    if let CelContent::Linked(_) = target.content {
                        debug!(
                            "Ignoring cel in frame {} linked to another linked cel in frame {}",
                            frame, target_frame
                        );
                        return Ok(());
                    }
                    return write_cel(sprite, frame, target, lookup, canvas);
                }
                None => {
                    debug!(
                        "Ignoring cel in frame {} linked to missing cel in frame {}",
                        frame, target_frame
                    );
                    return Ok(());
                }
            }
        }
    };

    write_image_cel(sprite, frame, cel, layer, content, lookup, canvas)
}

fn write_image_cel(
    sprite: &Sprite,
    frame: u32,
    cel: &RawCel,
    layer: &LayerChunk,
    content: &ImageContent,
    lookup: Option<&dyn ColorLookup>,
    canvas: &mut Canvas,
) -> Result<(), ComposeError> {
    let colors = pixel::resolve_rgba(
        &content.pixels,
        lookup,
        sprite.header.transparent_color_index,
        layer.is_background(),
    )
    .ok_or(ComposeError::MissingPalette { frame })?;

    let block = rasterize(
        sprite.width() as u32,
        sprite.height() as u32,
        cel.x as i32,
        cel.y as i32,
        content.size.width as u32,
        content.size.height as u32,
        &colors,
    );
    let block = match block {
        Some(block) => block,
        None => return Ok(()),
    };

    // Normal cels composite at full strength; the layer and cel opacities
    // only apply to the other modes.
    let opacity = match layer.blend_mode {
        BlendMode::Normal => 255,
        _ => layer.opacity.min(cel.opacity),
    };
    if let BlendMode::Unsupported(mode) = layer.blend_mode {
        warn!(
            "Unknown blend mode {} on layer {:?}; leaving the image below unchanged",
            mode, layer.name
        );
    }
    canvas.blend_block(
        block.x,
        block.y,
        block.width,
        block.height,
        &block.colors,
        blend::blend_fn(layer.blend_mode),
        opacity,
    );
    Ok(())
}

fn linked_cel(sprite: &Sprite, frame: u16, layer_index: u16) -> Option<&RawCel> {
    sprite
        .frames
        .get(frame as usize)
        .and_then(|frame| frame.cels.iter().find(|cel| cel.layer_index == layer_index))
}

/// Flattens every frame. The result vector is indexed by frame; a failed
/// frame does not stop the others.
pub(crate) fn composite_all(
    sprite: &Sprite,
    lookup: Option<&dyn ColorLookup>,
) -> Vec<Result<RgbaImage, ComposeError>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        (0..sprite.num_frames())
            .into_par_iter()
            .map(|frame| composite_frame(sprite, frame, lookup))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..sprite.num_frames())
            .map(|frame| composite_frame(sprite, frame, lookup))
            .collect()
    }
}
