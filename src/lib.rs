#![warn(clippy::all)]
#![warn(missing_docs)]
/*!

Utilities for loading [Aseprite](https://www.aseprite.org/) files and
turning them into sprite sheets. This library reads the binary file format
directly, flattens the layers of each animation frame into an
`image::RgbaImage`, and can pack all frames side by side into a single
atlas image. Animation tags are decoded along the way, so a game can slice
the atlas back into named animations.

Note that this library can be rather slow when compiled without
optimizations. We recommend that you override the optimization settings for
this dependency in dev mode by adding the following to your `Cargo.toml`:

```text
[profile.dev.package.aseatlas]
opt-level = 2  # or 3
```

# Basic Usage

```no_run
use aseatlas::Sprite;
use std::path::Path;

let path = Path::new("assets/player.aseprite");
let player = Sprite::read_file(path).expect("failed to load sprite");
println!(
    "size: {}x{}, frames: {}",
    player.width(),
    player.height(),
    player.num_frames(),
);

// Flatten a single frame...
let first_frame = player.frame(0).image().expect("failed to composite");
assert_eq!(first_frame.dimensions(), (player.width() as u32, player.height() as u32));

// ...or pack every frame into one horizontal sprite sheet.
let sheet = player.atlas().expect("failed to build atlas");
assert_eq!(sheet.num_frames(), player.num_frames());
```

# Animation tags

Tags name a range of frames, e.g. a `walk` cycle. Combined with the atlas
they are all a runtime needs to play animations:

```no_run
# use aseatlas::Sprite;
# let player = Sprite::read_file(std::path::Path::new("x.aseprite")).unwrap();
let sheet = player.atlas().expect("failed to build atlas");
if let Some(walk) = player.tag_by_name("walk") {
    for frame in walk.from_frame()..=walk.to_frame() {
        let rect = sheet.frame_rect(frame);
        println!("frame {} at x={} ({}x{})", frame, rect.x, rect.width, rect.height);
    }
}
```

# Indexed sprites

Files that store 8 bit palette indices need a color lookup when
compositing, since this library does not decode palette chunks. Build a
[`Palette`] (or implement [`ColorLookup`] yourself) and use the `_with`
methods:

```no_run
use aseatlas::{Palette, Sprite};
use image::Rgba;

let sprite = Sprite::read_file(std::path::Path::new("dungeon.aseprite")).unwrap();
let palette = Palette::new(vec![
    Rgba([0, 0, 0, 255]),
    Rgba([255, 255, 255, 255]),
    Rgba([255, 0, 0, 255]),
]);
let sheet = sprite.atlas_with(&palette).expect("failed to build atlas");
# let _ = sheet;
```

*/

mod atlas;
mod blend;
mod cel;
mod composite;
mod error;
mod file;
mod header;
mod layer;
mod parse;
mod pixel;
mod reader;
mod tags;

/// A specialized `Result` type for decoding operations.
pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

pub use atlas::{Atlas, AtlasRect};
pub use error::{ComposeError, DecodeError};
pub use file::{Frame, LayersIter, PixelFormat, Sprite};
pub use header::Header;
pub use layer::{BlendMode, Layer, LayerFlags, LayerType};
pub use pixel::{ColorLookup, Palette};
pub use tags::{AnimationDirection, Tag};
