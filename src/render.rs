//! The render orchestrator: joins decoded tile layers to style layers and
//! drives a [`Rasterizer`].

use std::collections::HashSet;

use kurbo::{BezPath, Point};
use thiserror::Error;
use tracing::{debug, warn};

use mvt_data::{DecodeError, Feature, GeometryError, Layer, PathCommand, TagMap, Tile};
use mvt_style::{LayerType, StyleLayer, StyleSheet, TextTransform};

use crate::rasterizer::{FillStyle, Rasterizer, StrokeStyle, SymbolStyle};

/// A render aborts only when the tile body itself cannot be parsed; the
/// caller keeps a background-only or empty raster in that case.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("tile decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Renders one tile at one zoom onto `canvas`, a square raster of `size`
/// pixels.
///
/// Decodes only the source layers the style references, draws the
/// background pass first, then iterates style layers in declared order —
/// draw order is the style document's, not the tile's. Feature- and
/// layer-scoped problems are skipped; they never abort the render.
pub fn render<R: Rasterizer>(
    data: &[u8],
    zoom: f64,
    style: &StyleSheet,
    size: u32,
    canvas: &mut R,
) -> Result<(), RenderError> {
    let referenced: HashSet<&str> = style.source_layers().iter().map(String::as_str).collect();
    let tile = Tile::decode_if(data, |name| referenced.contains(name))?;
    debug!(layers = tile.layers.len(), zoom, "tile decoded");

    let no_tags = TagMap::new();
    for layer in style.layers() {
        if layer.is_background() && layer.matches(zoom, &no_tags) {
            canvas.fill_background(layer.paint().background_color(zoom));
        }
    }

    for style_layer in style.layers() {
        if style_layer.is_background() {
            continue;
        }
        // A style layer without a counterpart in the tile contributes
        // nothing; that is not an error.
        let Some(layer) = tile.layers.get(style_layer.source_layer()) else {
            continue;
        };
        draw_layer(layer, style_layer, zoom, size, canvas);
    }

    Ok(())
}

fn draw_layer<R: Rasterizer>(
    layer: &Layer,
    style_layer: &StyleLayer,
    zoom: f64,
    size: u32,
    canvas: &mut R,
) {
    let scale = f64::from(size) / f64::from(layer.extent.max(1));

    for feature in &layer.features {
        if !style_layer.matches(zoom, &feature.tags) {
            continue;
        }
        let path = match feature_path(feature, scale) {
            Ok(path) => path,
            Err(err) => {
                warn!(layer = %layer.name, %err, "skipping feature with malformed geometry");
                continue;
            }
        };
        if path.elements().is_empty() {
            continue;
        }

        match style_layer.layer_type() {
            LayerType::Fill => canvas.fill_path(&path, &fill_style(style_layer, zoom)),
            LayerType::Line => canvas.stroke_path(&path, &stroke_style(style_layer, zoom)),
            LayerType::Symbol => {
                let symbol = symbol_style(style_layer, zoom, &feature.tags);
                if symbol.text.is_empty() && symbol.icon.is_none() {
                    continue;
                }
                canvas.draw_symbol(&path, &symbol);
            }
            LayerType::Background | LayerType::Unknown => {}
        }
    }
}

/// Converts a feature's command stream into a path scaled to raster
/// coordinates.
fn feature_path(feature: &Feature, scale: f64) -> Result<BezPath, GeometryError> {
    let mut path = BezPath::new();
    let mut current: Option<Point> = None;
    let mut closed = false;

    for command in feature.path_commands() {
        match command? {
            PathCommand::MoveTo { x, y } => {
                let p = scaled(x, y, scale);
                path.move_to(p);
                current = Some(p);
                closed = false;
            }
            PathCommand::LineTo { x, y } => {
                // A LineTo with no open subpath (start of stream or right
                // after a close) re-opens at the cursor.
                if closed || current.is_none() {
                    if let Some(p) = current {
                        path.move_to(p);
                    }
                    closed = false;
                }
                let p = scaled(x, y, scale);
                if current.is_some() {
                    path.line_to(p);
                } else {
                    path.move_to(p);
                }
                current = Some(p);
            }
            PathCommand::Close => {
                // A Close with no open subpath is ignored; kurbo panics on
                // closing an empty or already-closed path.
                if current.is_some() && !closed {
                    path.close_path();
                    closed = true;
                }
            }
        }
    }

    Ok(path)
}

fn scaled(x: i32, y: i32, scale: f64) -> Point {
    Point::new(f64::from(x) * scale, f64::from(y) * scale)
}

fn fill_style(layer: &StyleLayer, zoom: f64) -> FillStyle {
    let paint = layer.paint();
    FillStyle {
        color: paint.fill_color(zoom),
        opacity: paint.fill_opacity(zoom),
        outline: paint.fill_outline_color(zoom),
        antialias: paint.fill_antialias(zoom),
        pattern: paint.fill_pattern(zoom),
    }
}

fn stroke_style(layer: &StyleLayer, zoom: f64) -> StrokeStyle {
    let paint = layer.paint();
    let layout = layer.layout();
    StrokeStyle {
        color: paint.line_color(zoom),
        width: paint.line_width(zoom),
        opacity: paint.line_opacity(zoom),
        cap: layout.line_cap(zoom),
        join: layout.line_join(zoom),
        dash: paint.line_dasharray().to_vec(),
    }
}

fn symbol_style(layer: &StyleLayer, zoom: f64, tags: &TagMap) -> SymbolStyle {
    let layout = layer.layout();
    let text = layout.text(zoom, tags);
    let text = match layout.text_transform(zoom) {
        TextTransform::Uppercase => text.to_uppercase(),
        TextTransform::Lowercase => text.to_lowercase(),
        TextTransform::None => text,
    };
    let icon = layout.icon(zoom, tags);

    SymbolStyle {
        text,
        icon: (!icon.is_empty()).then_some(icon),
        text_size: layout.text_size(zoom),
        text_color: layer.paint().text_color(zoom),
        anchor: layout.text_anchor(zoom),
        placement: layout.symbol_placement(zoom),
        rotation_alignment: layout.text_rotation_alignment(zoom),
        max_text_width: layout.max_text_width(zoom),
        max_text_angle: layout.max_text_angle(zoom),
    }
}
