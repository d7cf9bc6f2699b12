use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::geometry::PathCommands;
use crate::reader::{zigzag64, DecodeError, Reader, WireType};

/// A tag value: the closed sum of types a tile value entry can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
}

impl Value {
    /// Numeric view used for filter comparisons. Booleans and strings are
    /// not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Uint(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(_) | Value::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
        }
    }
}

/// A feature's resolved tags, keyed by the layer's key table.
pub type TagMap = HashMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeomType {
    Unknown,
    Point,
    LineString,
    Polygon,
}

impl GeomType {
    fn from_u64(value: u64) -> Self {
        match value {
            1 => GeomType::Point,
            2 => GeomType::LineString,
            3 => GeomType::Polygon,
            _ => GeomType::Unknown,
        }
    }

    /// The geometry-class name injected as the synthetic `$type` tag.
    pub fn name(self) -> Option<&'static str> {
        match self {
            GeomType::Point => Some("Point"),
            GeomType::LineString => Some("LineString"),
            GeomType::Polygon => Some("Polygon"),
            GeomType::Unknown => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Feature {
    pub geom_type: GeomType,
    pub tags: TagMap,
    /// Raw geometry command stream, unscaled tile coordinates.
    pub geometry: Vec<u32>,
}

impl Feature {
    pub fn path_commands(&self) -> PathCommands<'_> {
        PathCommands::new(&self.geometry)
    }
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub version: u64,
    /// Size of the coordinate space geometry is expressed in.
    pub extent: u32,
    pub features: Vec<Feature>,
}

/// A decoded tile: source-layer name to decoded layer.
#[derive(Debug, Clone, Default)]
pub struct Tile {
    pub layers: HashMap<String, Layer>,
}

impl Tile {
    /// Decodes every layer in the tile.
    pub fn decode(data: &[u8]) -> Result<Tile, DecodeError> {
        Self::decode_if(data, |_| true)
    }

    /// Decodes only the layers whose name passes `keep`; other layer
    /// messages are skipped without building their features.
    ///
    /// Structural corruption of the tile message is a hard error. Layers
    /// with an unsupported version and features with malformed tags are
    /// skipped individually.
    pub fn decode_if(
        data: &[u8],
        mut keep: impl FnMut(&str) -> bool,
    ) -> Result<Tile, DecodeError> {
        let mut reader = Reader::new(data);
        let mut layers = HashMap::new();

        while !reader.is_empty() {
            let (field, wire) = reader.field()?;
            match (field, wire) {
                (3, WireType::Len) => {
                    let body = reader.bytes()?;
                    let Some(name) = layer_name(body)? else {
                        continue;
                    };
                    if !keep(&name) {
                        continue;
                    }
                    if let Some(layer) = decode_layer(body, name)? {
                        layers.insert(layer.name.clone(), layer);
                    }
                }
                (_, wire) => reader.skip(wire)?,
            }
        }

        Ok(Tile { layers })
    }
}

/// Pre-scan a layer message for its name so unreferenced layers can be
/// skipped without decoding their features.
fn layer_name(data: &[u8]) -> Result<Option<String>, DecodeError> {
    let mut reader = Reader::new(data);
    while !reader.is_empty() {
        let (field, wire) = reader.field()?;
        match (field, wire) {
            (1, WireType::Len) => return Ok(Some(reader.string()?.to_owned())),
            (_, wire) => reader.skip(wire)?,
        }
    }
    Ok(None)
}

fn decode_layer(data: &[u8], name: String) -> Result<Option<Layer>, DecodeError> {
    let mut reader = Reader::new(data);
    let mut version = 1u64;
    let mut extent = 4096u32;
    let mut keys = Vec::new();
    let mut values = Vec::new();
    let mut feature_bodies = Vec::new();

    while !reader.is_empty() {
        let (field, wire) = reader.field()?;
        match (field, wire) {
            (15, WireType::Varint) => version = reader.varint()?,
            (2, WireType::Len) => feature_bodies.push(reader.bytes()?),
            (3, WireType::Len) => keys.push(reader.string()?.to_owned()),
            (4, WireType::Len) => values.push(decode_value(reader.bytes()?)?),
            (5, WireType::Varint) => {
                extent = u32::try_from(reader.varint()?)
                    .map_err(|_| DecodeError::OutOfRange("extent"))?;
            }
            (_, wire) => reader.skip(wire)?,
        }
    }

    // Forward-compatibility policy: newer geometry encodings are skipped
    // wholesale, they are not an error.
    if version > 2 {
        warn!(layer = %name, version, "skipping layer with unsupported version");
        return Ok(None);
    }

    let mut features = Vec::with_capacity(feature_bodies.len());
    for body in feature_bodies {
        match decode_feature(body, &keys, &values) {
            Ok(feature) => features.push(feature),
            Err(err) => warn!(layer = %name, %err, "skipping malformed feature"),
        }
    }

    Ok(Some(Layer {
        name,
        version,
        extent,
        features,
    }))
}

fn decode_feature(
    data: &[u8],
    keys: &[String],
    values: &[Option<Value>],
) -> Result<Feature, DecodeError> {
    let mut reader = Reader::new(data);
    let mut geom_type = GeomType::Unknown;
    let mut tag_indices = Vec::new();
    let mut geometry = Vec::new();

    while !reader.is_empty() {
        let (field, wire) = reader.field()?;
        match (field, wire) {
            (2, WireType::Len) => {
                let mut packed = Reader::new(reader.bytes()?);
                while !packed.is_empty() {
                    tag_indices.push(packed.varint()?);
                }
            }
            (2, WireType::Varint) => tag_indices.push(reader.varint()?),
            (3, WireType::Varint) => geom_type = GeomType::from_u64(reader.varint()?),
            (4, WireType::Len) => {
                let mut packed = Reader::new(reader.bytes()?);
                while !packed.is_empty() {
                    let raw = u32::try_from(packed.varint()?)
                        .map_err(|_| DecodeError::OutOfRange("geometry"))?;
                    geometry.push(raw);
                }
            }
            (4, WireType::Varint) => {
                let raw = u32::try_from(reader.varint()?)
                    .map_err(|_| DecodeError::OutOfRange("geometry"))?;
                geometry.push(raw);
            }
            (_, wire) => reader.skip(wire)?,
        }
    }

    if tag_indices.len() % 2 != 0 {
        return Err(DecodeError::TagIndices);
    }

    let mut tags = TagMap::with_capacity(tag_indices.len() / 2 + 1);
    for pair in tag_indices.chunks_exact(2) {
        let key = usize::try_from(pair[0])
            .ok()
            .and_then(|i| keys.get(i))
            .ok_or(DecodeError::TagIndices)?;
        let value = usize::try_from(pair[1])
            .ok()
            .and_then(|i| values.get(i))
            .ok_or(DecodeError::TagIndices)?;
        // An empty value entry resolves to no tag at all.
        if let Some(value) = value {
            tags.insert(key.clone(), value.clone());
        }
    }

    if let Some(name) = geom_type.name() {
        tags.insert("$type".to_owned(), Value::String(name.to_owned()));
    }

    Ok(Feature {
        geom_type,
        tags,
        geometry,
    })
}

fn decode_value(data: &[u8]) -> Result<Option<Value>, DecodeError> {
    let mut reader = Reader::new(data);
    let mut value = None;

    while !reader.is_empty() {
        let (field, wire) = reader.field()?;
        value = match (field, wire) {
            (1, WireType::Len) => Some(Value::String(reader.string()?.to_owned())),
            (2, WireType::Fixed32) => {
                Some(Value::Float(f64::from(f32::from_bits(reader.fixed32()?))))
            }
            (3, WireType::Fixed64) => Some(Value::Float(f64::from_bits(reader.fixed64()?))),
            (4, WireType::Varint) => Some(Value::Int(reader.varint()? as i64)),
            (5, WireType::Varint) => Some(Value::Uint(reader.varint()?)),
            (6, WireType::Varint) => Some(Value::Int(zigzag64(reader.varint()?))),
            (7, WireType::Varint) => Some(Value::Bool(reader.varint()? != 0)),
            (_, wire) => {
                reader.skip(wire)?;
                value
            }
        };
    }

    Ok(value)
}
