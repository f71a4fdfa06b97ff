//! RGB colors, HSL conversion and the diverging color scale.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color: {0:?}")]
pub struct ParseColorError(pub String);

/// An opaque sRGB color. Serializes as a `#rrggbb` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Relative lightness in `0.0..=1.0`.
    pub fn lightness(self) -> f64 {
        self.to_hsl().l
    }

    /// Convert to HSL. Achromatic colors have no hue; black and white also
    /// have no saturation.
    pub fn to_hsl(self) -> Hsl {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;
        let min = r.min(g).min(b);
        let max = r.max(g).max(b);
        let d = max - min;
        let l = (max + min) / 2.0;

        if d == 0.0 {
            let s = (l > 0.0 && l < 1.0).then_some(0.0);
            return Hsl { h: None, s, l };
        }

        let s = if l < 0.5 { d / (max + min) } else { d / (2.0 - max - min) };
        let h = if r == max {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if g == max {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        Hsl {
            h: Some(h * 60.0),
            s: Some(s),
            l,
        }
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name {
            "black" => Self::BLACK,
            "gray" | "grey" => Self::GRAY,
            "white" => Self::WHITE,
            "red" => Self::RED,
            "yellow" => Self::YELLOW,
            "green" => Self::GREEN,
            "blue" => Self::rgb(0, 0, 255),
            "orange" => Self::rgb(255, 165, 0),
            "steelblue" => Self::rgb(70, 130, 180),
            _ => return None,
        };
        Some(color)
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseColorError(s.to_string());

        if let Some(hex) = trimmed.strip_prefix('#') {
            if !hex.is_ascii() {
                return Err(err());
            }
            let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| err());
            return match hex.len() {
                3 => {
                    let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                    Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
                }
                6 => Ok(Self::rgb(
                    channel(&hex[0..2])?,
                    channel(&hex[2..4])?,
                    channel(&hex[4..6])?,
                )),
                _ => Err(err()),
            };
        }

        Self::named(&trimmed.to_ascii_lowercase()).ok_or_else(err)
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Hue in degrees, saturation and lightness in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: Option<f64>,
    pub s: Option<f64>,
    pub l: f64,
}

impl Hsl {
    pub fn to_rgb(self) -> Color {
        let h = self.h.filter(|h| h.is_finite()).map_or(0.0, |h| h.rem_euclid(360.0));
        let s = self.s.filter(|s| !s.is_nan()).map_or(0.0, |s| s.clamp(0.0, 1.0));
        let l = if self.l.is_nan() { 0.0 } else { self.l.clamp(0.0, 1.0) };

        let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let m1 = 2.0 * l - m2;

        let v = |mut h: f64| {
            if h > 360.0 {
                h -= 360.0;
            } else if h < 0.0 {
                h += 360.0;
            }
            if h < 60.0 {
                m1 + (m2 - m1) * h / 60.0
            } else if h < 180.0 {
                m2
            } else if h < 240.0 {
                m1 + (m2 - m1) * (240.0 - h) / 60.0
            } else {
                m1
            }
        };
        let channel = |h: f64| (v(h) * 255.0).round().clamp(0.0, 255.0) as u8;

        Color::rgb(channel(h + 120.0), channel(h), channel(h - 120.0))
    }
}

/// Interpolate between two colors in HSL space.
///
/// Hue travels along the shorter arc. A missing hue or saturation on one
/// side borrows the other side's, so fading to black or white does not
/// swing through unrelated hues.
pub fn interpolate_hsl(a: Color, b: Color, t: f64) -> Color {
    let a = a.to_hsl();
    let b = b.to_hsl();

    let (ah, bh) = match (a.h, b.h) {
        (Some(ah), Some(bh)) => {
            let mut dh = bh - ah;
            if dh > 180.0 {
                dh -= 360.0;
            } else if dh < -180.0 {
                dh += 360.0;
            }
            (Some(ah), dh)
        }
        (Some(ah), None) => (Some(ah), 0.0),
        (None, bh) => (bh, 0.0),
    };
    let (as_, bs) = match (a.s, b.s) {
        (Some(as_), Some(bs)) => (Some(as_), bs - as_),
        (Some(as_), None) => (Some(as_), 0.0),
        (None, bs) => (bs, 0.0),
    };

    Hsl {
        h: ah.map(|h| h + bh * t),
        s: as_.map(|s| s + bs * t),
        l: a.l + (b.l - a.l) * t,
    }
    .to_rgb()
}

/// Piecewise color scale over three domain points.
///
/// Values below the middle point interpolate on the low segment, values
/// above it on the high segment; the middle point itself maps to the
/// middle color. A degenerate segment yields the color halfway along it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    domain: [f64; 3],
    colors: [Color; 3],
}

impl ColorScale {
    pub fn new(domain: [f64; 3], colors: [Color; 3]) -> Self {
        Self { domain, colors }
    }

    /// The usual diverging scale around zero.
    pub fn diverging(min: f64, max: f64, colors: [Color; 3]) -> Self {
        Self::new([min, 0.0, max], colors)
    }

    pub fn map(&self, value: f64) -> Color {
        let [d0, mid, d1] = self.domain;
        let [c0, c1, c2] = self.colors;

        let (lo, hi, from, to) = if value < mid {
            (d0, mid, c0, c1)
        } else if value > mid {
            (mid, d1, c1, c2)
        } else {
            return c1;
        };

        let span = hi - lo;
        let t = if span == 0.0 || !span.is_finite() {
            0.5
        } else {
            (value - lo) / span
        };
        interpolate_hsl(from, to, t)
    }
}
