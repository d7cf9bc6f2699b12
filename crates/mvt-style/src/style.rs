//! The loaded style: ordered layers with zoom ranges, filters and typed
//! paint/layout property functions.
//!
//! A `StyleSheet` is immutable once loaded and safe to share across
//! concurrent renders; reloading a style builds a new sheet. Individual
//! malformed layers degrade to safe defaults instead of failing the load —
//! only a document without a layer array is a hard error.

use serde_json::Value as Json;
use thiserror::Error;
use tracing::warn;

use mvt_data::TagMap;

use crate::color::Color;
use crate::filter::Filter;
use crate::function::{Function, Template};

#[derive(Debug, Error)]
pub enum StyleError {
    #[error("style document has no layer array")]
    InvalidDocument,
    #[error("style document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    Fill,
    Line,
    Background,
    Symbol,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Bevel,
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    #[default]
    Center,
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolPlacement {
    #[default]
    Point,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationAlignment {
    #[default]
    Auto,
    Map,
    Viewport,
}

/// The loaded rule set: style layers in declared order.
#[derive(Debug, Clone)]
pub struct StyleSheet {
    layers: Vec<StyleLayer>,
    source_layers: Vec<String>,
}

impl StyleSheet {
    /// Loads a style from a JSON value tree: either the bare layer array or
    /// a document object with a `layers` member.
    pub fn load(doc: &Json) -> Result<StyleSheet, StyleError> {
        let entries = doc
            .as_array()
            .or_else(|| doc.get("layers").and_then(Json::as_array))
            .ok_or(StyleError::InvalidDocument)?;

        let layers: Vec<StyleLayer> = entries.iter().map(StyleLayer::parse).collect();

        // Declared order, deduplicated.
        let mut source_layers: Vec<String> = Vec::new();
        for layer in &layers {
            if !layer.source_layer.is_empty() && !source_layers.contains(&layer.source_layer) {
                source_layers.push(layer.source_layer.clone());
            }
        }

        Ok(StyleSheet {
            layers,
            source_layers,
        })
    }

    pub fn from_slice(data: &[u8]) -> Result<StyleSheet, StyleError> {
        Self::load(&serde_json::from_slice(data)?)
    }

    /// Style layers in declared (draw) order.
    pub fn layers(&self) -> &[StyleLayer] {
        &self.layers
    }

    /// Source-layer names referenced by the style, declared order,
    /// deduplicated.
    pub fn source_layers(&self) -> &[String] {
        &self.source_layers
    }
}

#[derive(Debug, Clone)]
pub struct StyleLayer {
    layer_type: LayerType,
    source_layer: String,
    min_zoom: Option<f64>,
    max_zoom: Option<f64>,
    filter: Filter,
    layout: Layout,
    paint: Paint,
}

impl StyleLayer {
    fn parse(json: &Json) -> StyleLayer {
        if !json.is_object() {
            warn!(layer = %json, "style layer is not an object");
        }

        let layer_type = match json.get("type").and_then(Json::as_str) {
            Some("fill") => LayerType::Fill,
            Some("line") => LayerType::Line,
            Some("background") => LayerType::Background,
            Some("symbol") => LayerType::Symbol,
            _ => LayerType::Unknown,
        };

        StyleLayer {
            layer_type,
            source_layer: json
                .get("source-layer")
                .and_then(Json::as_str)
                .unwrap_or_default()
                .to_owned(),
            min_zoom: json.get("minzoom").and_then(Json::as_f64),
            max_zoom: json.get("maxzoom").and_then(Json::as_f64),
            filter: Filter::parse(json.get("filter")),
            layout: Layout::parse(json.get("layout")),
            paint: Paint::parse(json.get("paint")),
        }
    }

    pub fn layer_type(&self) -> LayerType {
        self.layer_type
    }

    pub fn source_layer(&self) -> &str {
        &self.source_layer
    }

    pub fn is_background(&self) -> bool {
        self.layer_type == LayerType::Background
    }

    pub fn is_path(&self) -> bool {
        matches!(self.layer_type, LayerType::Fill | LayerType::Line)
    }

    pub fn is_symbol(&self) -> bool {
        self.layer_type == LayerType::Symbol
    }

    /// A feature is eligible iff `minzoom <= zoom < maxzoom` (unset bounds
    /// are unbounded) and the filter matches its tags.
    pub fn matches(&self, zoom: f64, tags: &TagMap) -> bool {
        if self.min_zoom.is_some_and(|min| zoom < min) {
            return false;
        }
        if self.max_zoom.is_some_and(|max| zoom >= max) {
            return false;
        }
        self.filter.matches(tags)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn paint(&self) -> &Paint {
        &self.paint
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    line_cap: Function<String>,
    line_join: Function<String>,
    text: Template,
    icon: Template,
    text_size: Function<f64>,
    text_max_width: Function<f64>,
    text_max_angle: Function<f64>,
    text_transform: Function<String>,
    text_anchor: Function<String>,
    symbol_placement: Function<String>,
    text_rotation_alignment: Function<String>,
}

impl Layout {
    fn parse(json: Option<&Json>) -> Layout {
        let get = |key: &str| json.and_then(|j| j.get(key));
        Layout {
            line_cap: string_fn(get("line-cap")),
            line_join: string_fn(get("line-join")),
            text: Template::new(string_fn(get("text-field"))),
            icon: Template::new(string_fn(get("icon-image"))),
            text_size: number_fn(get("text-size"), 16.0),
            text_max_width: number_fn(get("text-max-width"), 10.0),
            text_max_angle: number_fn(get("text-max-angle"), 45.0),
            text_transform: string_fn(get("text-transform")),
            text_anchor: string_fn(get("text-anchor")),
            symbol_placement: string_fn(get("symbol-placement")),
            text_rotation_alignment: string_fn(get("text-rotation-alignment")),
        }
    }

    pub fn line_cap(&self, zoom: f64) -> LineCap {
        match self.line_cap.step(zoom).as_str() {
            "round" => LineCap::Round,
            "square" => LineCap::Square,
            _ => LineCap::Butt,
        }
    }

    pub fn line_join(&self, zoom: f64) -> LineJoin {
        match self.line_join.step(zoom).as_str() {
            "bevel" => LineJoin::Bevel,
            "round" => LineJoin::Round,
            _ => LineJoin::Miter,
        }
    }

    /// The text field resolved against the feature's tags, trimmed.
    pub fn text(&self, zoom: f64, tags: &TagMap) -> String {
        self.text.resolve(zoom, tags).trim().to_owned()
    }

    pub fn icon(&self, zoom: f64, tags: &TagMap) -> String {
        self.icon.resolve(zoom, tags)
    }

    pub fn text_size(&self, zoom: f64) -> f64 {
        self.text_size.resolve(zoom)
    }

    pub fn max_text_width(&self, zoom: f64) -> f64 {
        self.text_max_width.resolve(zoom)
    }

    pub fn max_text_angle(&self, zoom: f64) -> f64 {
        self.text_max_angle.resolve(zoom)
    }

    pub fn text_transform(&self, zoom: f64) -> TextTransform {
        match self.text_transform.step(zoom).as_str() {
            "uppercase" => TextTransform::Uppercase,
            "lowercase" => TextTransform::Lowercase,
            _ => TextTransform::None,
        }
    }

    pub fn text_anchor(&self, zoom: f64) -> TextAnchor {
        match self.text_anchor.step(zoom).as_str() {
            "left" => TextAnchor::Left,
            "right" => TextAnchor::Right,
            "top" => TextAnchor::Top,
            "bottom" => TextAnchor::Bottom,
            _ => TextAnchor::Center,
        }
    }

    pub fn symbol_placement(&self, zoom: f64) -> SymbolPlacement {
        match self.symbol_placement.step(zoom).as_str() {
            "line" => SymbolPlacement::Line,
            _ => SymbolPlacement::Point,
        }
    }

    pub fn text_rotation_alignment(&self, zoom: f64) -> RotationAlignment {
        match self.text_rotation_alignment.step(zoom).as_str() {
            "map" => RotationAlignment::Map,
            "viewport" => RotationAlignment::Viewport,
            _ => RotationAlignment::Auto,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Paint {
    text_color: Function<Color>,
    line_color: Function<Color>,
    fill_color: Function<Color>,
    fill_outline_color: Option<Function<Color>>,
    background_color: Function<Color>,
    fill_opacity: Function<f64>,
    line_opacity: Function<f64>,
    line_width: Function<f64>,
    fill_antialias: Function<bool>,
    line_dasharray: Vec<f64>,
    fill_pattern: Function<String>,
}

impl Paint {
    fn parse(json: Option<&Json>) -> Paint {
        let get = |key: &str| json.and_then(|j| j.get(key));
        Paint {
            text_color: color_fn(get("text-color"), Color::BLACK),
            line_color: color_fn(get("line-color"), Color::BLACK),
            fill_color: color_fn(get("fill-color"), Color::BLACK),
            fill_outline_color: get("fill-outline-color")
                .map(|j| color_fn(Some(j), Color::BLACK)),
            background_color: color_fn(get("background-color"), Color::BLACK),
            fill_opacity: number_fn(get("fill-opacity"), 1.0),
            line_opacity: number_fn(get("line-opacity"), 1.0),
            line_width: number_fn(get("line-width"), 1.0),
            fill_antialias: boolean_fn(get("fill-antialias"), true),
            line_dasharray: dash_array(get("line-dasharray")),
            fill_pattern: string_fn(get("fill-pattern")),
        }
    }

    pub fn text_color(&self, zoom: f64) -> Color {
        self.text_color.resolve(zoom)
    }

    pub fn line_color(&self, zoom: f64) -> Color {
        self.line_color.resolve(zoom)
    }

    pub fn fill_color(&self, zoom: f64) -> Color {
        self.fill_color.resolve(zoom)
    }

    /// Falls back to the fill color when not configured.
    pub fn fill_outline_color(&self, zoom: f64) -> Color {
        match &self.fill_outline_color {
            Some(f) => f.resolve(zoom),
            None => self.fill_color(zoom),
        }
    }

    pub fn background_color(&self, zoom: f64) -> Color {
        self.background_color.resolve(zoom)
    }

    pub fn fill_opacity(&self, zoom: f64) -> f64 {
        self.fill_opacity.resolve(zoom)
    }

    pub fn line_opacity(&self, zoom: f64) -> f64 {
        self.line_opacity.resolve(zoom)
    }

    pub fn line_width(&self, zoom: f64) -> f64 {
        self.line_width.resolve(zoom)
    }

    pub fn fill_antialias(&self, zoom: f64) -> bool {
        self.fill_antialias.step(zoom)
    }

    pub fn line_dasharray(&self) -> &[f64] {
        &self.line_dasharray
    }

    pub fn fill_pattern(&self, zoom: f64) -> Option<String> {
        let pattern = self.fill_pattern.step(zoom);
        (!pattern.is_empty()).then_some(pattern)
    }
}

fn number_fn(json: Option<&Json>, default: f64) -> Function<f64> {
    Function::parse(json, default, Json::as_f64)
}

fn boolean_fn(json: Option<&Json>, default: bool) -> Function<bool> {
    Function::parse(json, default, Json::as_bool)
}

fn string_fn(json: Option<&Json>) -> Function<String> {
    Function::parse(json, String::new(), |j| j.as_str().map(str::to_owned))
}

fn color_fn(json: Option<&Json>, default: Color) -> Function<Color> {
    Function::parse(json, default, |j| j.as_str().and_then(Color::parse))
}

fn dash_array(json: Option<&Json>) -> Vec<f64> {
    let Some(json) = json else {
        return Vec::new();
    };
    let dashes = json
        .as_array()
        .and_then(|arr| arr.iter().map(Json::as_f64).collect::<Option<Vec<_>>>());
    match dashes {
        Some(dashes) => dashes,
        None => {
            warn!(dasharray = %json, "malformed line-dasharray");
            Vec::new()
        }
    }
}
