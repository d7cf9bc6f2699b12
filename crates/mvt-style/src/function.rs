//! Stop-based, zoom-interpolated property functions.

use serde_json::Value as Json;
use tracing::warn;

use mvt_data::TagMap;

use crate::color::Color;

/// Value kinds that blend between stops. Booleans and strings stay step
/// functions and never implement this.
pub trait Interpolate: Clone {
    fn interpolate(&self, other: &Self, ratio: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(&self, other: &Self, ratio: f64) -> Self {
        self * (1.0 - ratio) + other * ratio
    }
}

impl Interpolate for Color {
    fn interpolate(&self, other: &Self, ratio: f64) -> Self {
        self.lerp_hsl(*other, ratio)
    }
}

/// A piecewise property function over ascending-input stops.
///
/// With no stops it answers its default, which is also how literal property
/// values are represented. Between stops the progression is linear or
/// exponential in `base`.
#[derive(Debug, Clone)]
pub struct Function<T> {
    stops: Vec<(f64, T)>,
    base: f64,
    default: T,
}

impl<T: Clone> Function<T> {
    pub fn constant(value: T) -> Self {
        Function {
            stops: Vec::new(),
            base: 1.0,
            default: value,
        }
    }

    /// Builds a function from a property value: a literal becomes a
    /// constant, an object with `stops` (and optional `base`) a piecewise
    /// function. Any malformed stop discards the whole stop list; a
    /// half-parsed list is never used.
    pub fn parse(json: Option<&Json>, default: T, value: impl Fn(&Json) -> Option<T>) -> Self {
        let Some(json) = json else {
            return Self::constant(default);
        };
        if let Some(literal) = value(json) {
            return Self::constant(literal);
        }

        let parsed = json
            .get("stops")
            .and_then(Json::as_array)
            .and_then(|entries| {
                entries
                    .iter()
                    .map(|entry| {
                        let stop = entry.as_array()?;
                        if stop.len() != 2 {
                            return None;
                        }
                        Some((stop[0].as_f64()?, value(&stop[1])?))
                    })
                    .collect::<Option<Vec<_>>>()
            });

        let Some(stops) = parsed else {
            warn!(property = %json, "malformed property function, using default");
            return Self::constant(default);
        };

        Function {
            stops,
            base: json.get("base").and_then(Json::as_f64).unwrap_or(1.0),
            default,
        }
    }

    /// Step resolution: the value of the stop at or before `x`, never
    /// blended. This is the only resolution for booleans and strings.
    pub fn step(&self, x: f64) -> T {
        let Some(first) = self.stops.first() else {
            return self.default.clone();
        };
        let mut current = &first.1;
        for (input, value) in &self.stops {
            if x < *input {
                return current.clone();
            }
            current = value;
        }
        current.clone()
    }
}

impl<T: Interpolate> Function<T> {
    /// Interpolated resolution at `x`. Clamps to the first and last stop
    /// values; never extrapolates.
    pub fn resolve(&self, x: f64) -> T {
        let Some(first) = self.stops.first() else {
            return self.default.clone();
        };
        let mut previous = first;
        for stop in &self.stops {
            if x < stop.0 {
                return interpolate(previous, stop, self.base, x);
            }
            previous = stop;
        }
        previous.1.clone()
    }
}

fn interpolate<T: Interpolate>(p0: &(f64, T), p1: &(f64, T), base: f64, x: f64) -> T {
    let difference = p1.0 - p0.0;
    if difference < 1e-6 {
        return p0.1.clone();
    }

    let progress = x - p0.0;
    let ratio = if base == 1.0 {
        progress / difference
    } else {
        (base.powf(progress) - 1.0) / (base.powf(difference) - 1.0)
    };

    p0.1.interpolate(&p1.1, ratio)
}

/// A string property with `{key}` spans substituted from a feature's tags,
/// used for text and icon fields.
#[derive(Debug, Clone)]
pub struct Template {
    field: Function<String>,
}

impl Template {
    pub fn new(field: Function<String>) -> Self {
        Template { field }
    }

    pub fn resolve(&self, zoom: f64, tags: &TagMap) -> String {
        let pattern = self.field.step(zoom);
        if !pattern.contains('{') {
            return pattern;
        }

        let mut out = String::with_capacity(pattern.len());
        let mut rest = pattern.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let Some(close) = rest[open..].find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            let key = &rest[open + 1..open + close];
            if let Some(value) = tags.get(key) {
                out.push_str(&value.to_string());
            }
            rest = &rest[open + close + 1..];
        }
        out.push_str(rest);
        out
    }
}

impl Default for Template {
    fn default() -> Self {
        Template::new(Function::constant(String::new()))
    }
}
