//! tilebrush renders Mapbox vector tiles into raster draw operations,
//! driven by a GL-style JSON rule set.
//!
//! The pipeline for one tile is strictly in-order and synchronous:
//! decode (`mvt-data`) → filter + zoom matching (`mvt-style`) → property
//! resolution → dispatch to a caller-supplied [`Rasterizer`]. A loaded
//! [`StyleSheet`] is immutable and can be shared across concurrent renders;
//! each render owns its decoded data and its raster target.
//!
//! ```text
//! let style = StyleSheet::from_slice(&std::fs::read("style.json")?)?;
//! let tile = std::fs::read("14-8714-5685.mvt")?;
//! render(&tile, 14.0, &style, 512, &mut canvas)?;
//! ```

pub mod rasterizer;
pub mod render;

pub use rasterizer::{FillStyle, Rasterizer, StrokeStyle, SymbolStyle};
pub use render::{render, RenderError};

pub use mvt_data::{Feature, GeomType, Layer, TagMap, Tile, Value};
pub use mvt_style::{Color, StyleLayer, StyleSheet};
