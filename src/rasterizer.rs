//! The seam to the actual pixel rasterizer.
//!
//! The engine decodes, matches and resolves; it never touches pixels. A
//! [`Rasterizer`] implementation owns the raster target and receives fully
//! resolved values, so path fill/stroke, anti-aliasing, font shaping and
//! sprite lookup all live on the other side of this trait.

use kurbo::BezPath;
use mvt_style::{Color, LineCap, LineJoin, RotationAlignment, SymbolPlacement, TextAnchor};

/// Resolved fill-layer values for one feature at one zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct FillStyle {
    pub color: Color,
    pub opacity: f64,
    pub outline: Color,
    pub antialias: bool,
    /// Sprite name to tile the fill with, if any.
    pub pattern: Option<String>,
}

/// Resolved line-layer values for one feature at one zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
    pub opacity: f64,
    pub cap: LineCap,
    pub join: LineJoin,
    pub dash: Vec<f64>,
}

/// Resolved symbol-layer values for one feature at one zoom. The text has
/// template substitution and text-transform already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolStyle {
    pub text: String,
    pub icon: Option<String>,
    pub text_size: f64,
    pub text_color: Color,
    pub anchor: TextAnchor,
    pub placement: SymbolPlacement,
    pub rotation_alignment: RotationAlignment,
    pub max_text_width: f64,
    pub max_text_angle: f64,
}

/// Receives resolved draw operations in draw order. Paths are already
/// scaled to the raster's coordinate space.
pub trait Rasterizer {
    fn fill_background(&mut self, color: Color);
    fn fill_path(&mut self, path: &BezPath, style: &FillStyle);
    fn stroke_path(&mut self, path: &BezPath, style: &StrokeStyle);
    fn draw_symbol(&mut self, path: &BezPath, style: &SymbolStyle);
}
