//! Decoder for the Mapbox Vector Tile wire format.
//!
//! A tile is a protobuf message of named layers; each layer carries distinct
//! key/value tables, an extent and a list of features referencing those
//! tables by index. Geometry stays in its compact command-stream form on the
//! decoded [`Feature`] and is walked lazily via [`Feature::path_commands`].
//!
//! Decoding is defensive: the input is untrusted. Structural corruption of
//! the tile message itself is a hard [`DecodeError`]; a malformed feature or
//! an unsupported layer version only skips that feature or layer.

mod geometry;
mod reader;
mod tile;

pub use geometry::{zigzag_decode, GeometryError, PathCommand, PathCommands};
pub use reader::DecodeError;
pub use tile::{Feature, GeomType, Layer, TagMap, Tile, Value};
