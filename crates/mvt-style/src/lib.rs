//! A Mapbox-GL-style subset: ordered style layers bound to tile source
//! layers, boolean tag filters, and zoom-interpolated paint/layout
//! properties.
//!
//! The outer JSON parse is the caller's concern; [`StyleSheet::load`] takes
//! an already-parsed `serde_json::Value` tree.

pub mod color;
pub mod filter;
pub mod function;
pub mod style;

pub use color::Color;
pub use filter::Filter;
pub use function::{Function, Interpolate, Template};
pub use style::{
    LayerType, Layout, LineCap, LineJoin, Paint, RotationAlignment, StyleError, StyleLayer,
    StyleSheet, SymbolPlacement, TextAnchor, TextTransform,
};
