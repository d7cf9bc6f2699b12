//! RGBA color with HSLA conversion.
//!
//! Style colors interpolate in HSL space with the hue expressed as a
//! fraction of a full turn, so the conversions here are part of the visual
//! contract, not an implementation detail.

/// An RGBA color, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub const fn rgb(r: f64, g: f64, b: f64) -> Color {
        Color { r, g, b, a: 1.0 }
    }

    /// Parses a CSS-style color: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`,
    /// `rgb()`, `rgba()`, `hsl()` or `hsla()`.
    pub fn parse(s: &str) -> Option<Color> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(args) = call_args(&lower, "rgba").or_else(|| call_args(&lower, "rgb")) {
            return parse_rgb(&args);
        }
        if let Some(args) = call_args(&lower, "hsla").or_else(|| call_args(&lower, "hsl")) {
            return parse_hsl(&args);
        }
        None
    }

    /// Hue as a fraction of a full turn, saturation, lightness, alpha.
    pub fn to_hsla(self) -> (f64, f64, f64, f64) {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (max + min) / 2.0;
        let delta = max - min;

        if delta <= f64::EPSILON {
            return (0.0, 0.0, l, self.a);
        }

        let s = if l > 0.5 {
            delta / (2.0 - max - min)
        } else {
            delta / (max + min)
        };
        let h = if max == self.r {
            ((self.g - self.b) / delta).rem_euclid(6.0)
        } else if max == self.g {
            (self.b - self.r) / delta + 2.0
        } else {
            (self.r - self.g) / delta + 4.0
        } / 6.0;

        (h, s, l, self.a)
    }

    pub fn from_hsla(h: f64, s: f64, l: f64, a: f64) -> Color {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);

        if s <= f64::EPSILON {
            return Color { r: l, g: l, b: l, a };
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Color {
            r: hue_component(p, q, h + 1.0 / 3.0),
            g: hue_component(p, q, h),
            b: hue_component(p, q, h - 1.0 / 3.0),
            a,
        }
    }

    /// Blends toward `other` channel-wise in HSLA space.
    pub fn lerp_hsl(self, other: Color, ratio: f64) -> Color {
        let (h0, s0, l0, a0) = self.to_hsla();
        let (h1, s1, l1, a1) = other.to_hsla();
        Color::from_hsla(
            mix(h0, h1, ratio),
            mix(s0, s1, ratio),
            mix(l0, l1, ratio),
            mix(a0, a1, ratio),
        )
    }
}

fn mix(v0: f64, v1: f64, ratio: f64) -> f64 {
    v0 * (1.0 - ratio) + v1 * ratio
}

fn hue_component(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digit = |i: usize| char::to_digit(hex.as_bytes().get(i).copied()? as char, 16);
    let nibble = |i: usize| Some(f64::from(digit(i)?) / 15.0);
    let byte = |i: usize| Some(f64::from(digit(i)? * 16 + digit(i + 1)?) / 255.0);

    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color {
            r: nibble(0)?,
            g: nibble(1)?,
            b: nibble(2)?,
            a: nibble(3)?,
        }),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: byte(6)?,
        }),
        _ => None,
    }
}

/// Extracts the comma-separated arguments of `name(...)`.
fn call_args(s: &str, name: &str) -> Option<Vec<String>> {
    let rest = s.strip_prefix(name)?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.split(',').map(|p| p.trim().to_owned()).collect())
}

fn number(s: &str) -> Option<f64> {
    s.trim_end_matches('%').parse().ok()
}

fn parse_rgb(args: &[String]) -> Option<Color> {
    if args.len() != 3 && args.len() != 4 {
        return None;
    }
    let channel = |s: &str| -> Option<f64> {
        if s.ends_with('%') {
            Some((number(s)? / 100.0).clamp(0.0, 1.0))
        } else {
            Some((number(s)? / 255.0).clamp(0.0, 1.0))
        }
    };
    let a = match args.get(3) {
        Some(arg) => number(arg)?.clamp(0.0, 1.0),
        None => 1.0,
    };
    Some(Color {
        r: channel(&args[0])?,
        g: channel(&args[1])?,
        b: channel(&args[2])?,
        a,
    })
}

fn parse_hsl(args: &[String]) -> Option<Color> {
    if args.len() != 3 && args.len() != 4 {
        return None;
    }
    let h = number(&args[0])? / 360.0;
    let s = (number(&args[1])? / 100.0).clamp(0.0, 1.0);
    let l = (number(&args[2])? / 100.0).clamp(0.0, 1.0);
    let a = match args.get(3) {
        Some(arg) => number(arg)?.clamp(0.0, 1.0),
        None => 1.0,
    };
    Some(Color::from_hsla(h, s, l, a))
}
