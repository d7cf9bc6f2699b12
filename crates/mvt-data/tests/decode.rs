use mvt_data::{DecodeError, GeomType, Tile, Value};

/// Minimal protobuf wire writer for building tile fixtures.
mod wire {
    pub fn varint(out: &mut Vec<u8>, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                return;
            }
            out.push(byte | 0x80);
        }
    }

    pub fn varint_field(out: &mut Vec<u8>, field: u64, value: u64) {
        varint(out, field << 3);
        varint(out, value);
    }

    pub fn len_field(out: &mut Vec<u8>, field: u64, body: &[u8]) {
        varint(out, (field << 3) | 2);
        varint(out, body.len() as u64);
        out.extend_from_slice(body);
    }

    pub fn double_field(out: &mut Vec<u8>, field: u64, value: f64) {
        varint(out, (field << 3) | 1);
        out.extend_from_slice(&value.to_bits().to_le_bytes());
    }
}

fn string_value(s: &str) -> Vec<u8> {
    let mut out = Vec::new();
    wire::len_field(&mut out, 1, s.as_bytes());
    out
}

fn double_value(v: f64) -> Vec<u8> {
    let mut out = Vec::new();
    wire::double_field(&mut out, 3, v);
    out
}

fn int_value(v: i64) -> Vec<u8> {
    let mut out = Vec::new();
    wire::varint_field(&mut out, 4, v as u64);
    out
}

fn bool_value(v: bool) -> Vec<u8> {
    let mut out = Vec::new();
    wire::varint_field(&mut out, 7, u64::from(v));
    out
}

fn feature(geom_type: u64, tags: &[u64], geometry: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut packed_tags = Vec::new();
    for &t in tags {
        wire::varint(&mut packed_tags, t);
    }
    wire::len_field(&mut out, 2, &packed_tags);
    wire::varint_field(&mut out, 3, geom_type);
    let mut packed_geom = Vec::new();
    for &g in geometry {
        wire::varint(&mut packed_geom, u64::from(g));
    }
    wire::len_field(&mut out, 4, &packed_geom);
    out
}

struct LayerBuilder {
    body: Vec<u8>,
}

impl LayerBuilder {
    fn new(name: &str, version: u64) -> Self {
        let mut body = Vec::new();
        wire::varint_field(&mut body, 15, version);
        wire::len_field(&mut body, 1, name.as_bytes());
        LayerBuilder { body }
    }

    fn key(mut self, key: &str) -> Self {
        wire::len_field(&mut self.body, 3, key.as_bytes());
        self
    }

    fn value(mut self, value: &[u8]) -> Self {
        wire::len_field(&mut self.body, 4, value);
        self
    }

    fn extent(mut self, extent: u64) -> Self {
        wire::varint_field(&mut self.body, 5, extent);
        self
    }

    fn feature(mut self, body: &[u8]) -> Self {
        wire::len_field(&mut self.body, 2, body);
        self
    }

    fn build(self) -> Vec<u8> {
        self.body
    }
}

fn tile(layers: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for layer in layers {
        wire::len_field(&mut out, 3, layer);
    }
    out
}

// MoveTo(+2, +3) as a command stream.
const MOVE_2_3: [u32; 3] = [(1 << 3) | 1, 4, 6];

#[test]
fn decodes_layers_features_and_tags() {
    let layer = LayerBuilder::new("roads", 2)
        .key("class")
        .key("lanes")
        .value(&string_value("primary"))
        .value(&int_value(4))
        .extent(4096)
        .feature(&feature(2, &[0, 0, 1, 1], &MOVE_2_3))
        .build();
    let data = tile(&[layer]);

    let decoded = Tile::decode(&data).unwrap();
    assert_eq!(decoded.layers.len(), 1);

    let roads = &decoded.layers["roads"];
    assert_eq!(roads.extent, 4096);
    assert_eq!(roads.version, 2);
    assert_eq!(roads.features.len(), 1);

    let feature = &roads.features[0];
    assert_eq!(feature.geom_type, GeomType::LineString);
    assert_eq!(
        feature.tags.get("class"),
        Some(&Value::String("primary".into()))
    );
    assert_eq!(feature.tags.get("lanes"), Some(&Value::Int(4)));
    assert_eq!(
        feature.tags.get("$type"),
        Some(&Value::String("LineString".into()))
    );
}

#[test]
fn value_types_decode() {
    let layer = LayerBuilder::new("pois", 1)
        .key("open")
        .key("elevation")
        .value(&bool_value(true))
        .value(&double_value(1234.5))
        .feature(&feature(1, &[0, 0, 1, 1], &MOVE_2_3))
        .build();
    let decoded = Tile::decode(&tile(&[layer])).unwrap();
    let tags = &decoded.layers["pois"].features[0].tags;
    assert_eq!(tags.get("open"), Some(&Value::Bool(true)));
    assert_eq!(tags.get("elevation"), Some(&Value::Float(1234.5)));
    assert_eq!(tags.get("$type"), Some(&Value::String("Point".into())));
}

#[test]
fn unsupported_layer_version_is_skipped() {
    let v3 = LayerBuilder::new("future", 3)
        .feature(&feature(1, &[], &MOVE_2_3))
        .build();
    let v2 = LayerBuilder::new("roads", 2)
        .feature(&feature(2, &[], &MOVE_2_3))
        .build();

    let decoded = Tile::decode(&tile(&[v3, v2])).unwrap();
    assert!(!decoded.layers.contains_key("future"));
    assert_eq!(decoded.layers["roads"].features.len(), 1);
}

#[test]
fn odd_tag_list_skips_only_that_feature() {
    let layer = LayerBuilder::new("roads", 2)
        .key("class")
        .value(&string_value("primary"))
        .feature(&feature(2, &[0], &MOVE_2_3))
        .feature(&feature(2, &[0, 0], &MOVE_2_3))
        .build();
    let decoded = Tile::decode(&tile(&[layer])).unwrap();
    assert_eq!(decoded.layers["roads"].features.len(), 1);
}

#[test]
fn out_of_range_tag_index_skips_only_that_feature() {
    let layer = LayerBuilder::new("roads", 2)
        .key("class")
        .value(&string_value("primary"))
        .feature(&feature(2, &[0, 7], &MOVE_2_3))
        .feature(&feature(2, &[0, 0], &MOVE_2_3))
        .build();
    let decoded = Tile::decode(&tile(&[layer])).unwrap();
    assert_eq!(decoded.layers["roads"].features.len(), 1);
}

#[test]
fn truncated_tile_is_a_hard_error() {
    let layer = LayerBuilder::new("roads", 2).build();
    let mut data = tile(&[layer]);
    data.pop();
    assert!(matches!(
        Tile::decode(&data),
        Err(DecodeError::Truncated)
    ));
}

#[test]
fn empty_tile_decodes_to_zero_layers() {
    // Distinguishable from a decode failure.
    let decoded = Tile::decode(&[]).unwrap();
    assert!(decoded.layers.is_empty());
}

#[test]
fn decode_if_skips_unreferenced_layers() {
    let roads = LayerBuilder::new("roads", 2)
        .feature(&feature(2, &[], &MOVE_2_3))
        .build();
    let water = LayerBuilder::new("water", 2)
        .feature(&feature(3, &[], &MOVE_2_3))
        .build();

    let decoded = Tile::decode_if(&tile(&[roads, water]), |name| name == "roads").unwrap();
    assert!(decoded.layers.contains_key("roads"));
    assert!(!decoded.layers.contains_key("water"));
}

#[test]
fn default_extent_applies() {
    let layer = LayerBuilder::new("roads", 2).build();
    let decoded = Tile::decode(&tile(&[layer])).unwrap();
    assert_eq!(decoded.layers["roads"].extent, 4096);
}
