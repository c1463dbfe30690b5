use std::{error::Error, fmt, io, string::FromUtf8Error};

/// An error occured while decoding an Aseprite file.
///
/// Decode errors are fatal: when one occurs, no partial document is
/// returned.
#[derive(Debug)]
pub enum DecodeError {
    /// The input data was malformed. String contains a detailed message.
    Format(String),
    /// An error occured while reading the input. Truncated input that ends
    /// before a declared length also surfaces as this variant.
    Io(io::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Format(msg) => write!(f, "Invalid Aseprite file: {}", msg),
            DecodeError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DecodeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        DecodeError::Io(err)
    }
}

impl From<FromUtf8Error> for DecodeError {
    fn from(err: FromUtf8Error) -> Self {
        DecodeError::Format(format!("Could not decode utf8: {}", err))
    }
}

/// An error occured while compositing a frame.
///
/// Compose errors are scoped to a single frame. When flattening several
/// frames, a failed frame does not prevent the others from compositing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// A cel references a layer index outside the file's layer list.
    LayerIndex {
        /// Frame the offending cel belongs to.
        frame: u32,
        /// The layer index stored in the cel chunk.
        layer_index: u32,
        /// Number of layers in the file.
        num_layers: u32,
    },
    /// An indexed-color frame was composited without a color lookup. Use the
    /// `_with` variant of the compositing method to supply one.
    MissingPalette {
        /// Frame that required the lookup.
        frame: u32,
    },
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeError::LayerIndex {
                frame,
                layer_index,
                num_layers,
            } => write!(
                f,
                "Cel in frame {} references layer {} but the file has {} layers",
                frame, layer_index, num_layers
            ),
            ComposeError::MissingPalette { frame } => write!(
                f,
                "Frame {} contains indexed pixels but no color lookup was given",
                frame
            ),
        }
    }
}

impl Error for ComposeError {}
