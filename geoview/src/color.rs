use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// RGBA color with 8 bits per channel.
///
/// Layer styles carry colors as CSS-like strings, see [`Color::parse`]. Serializes to
/// `#RRGGBBAA`; strings that can't be parsed deserialize to [`Color::BLACK`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    /// `#00000000`
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// `#FFFFFF`
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    /// `#000000`
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    /// Fill of point and polygon symbols without a configured color, `#3388FF`.
    pub const DEFAULT_FILL: Color = Color::rgb_hex(0x3388FF);
    /// Outline of symbols without a configured color, `#0066CC`.
    pub const DEFAULT_STROKE: Color = Color::rgb_hex(0x0066CC);
    /// Fill of the highlight overlay, `#FFFF00`.
    pub const HIGHLIGHT: Color = Color::rgb_hex(0xFFFF00);
    /// Measurement lines and polygons, `#0080FF`.
    pub const MEASURE: Color = Color::rgb_hex(0x0080FF);

    /// Color from its channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    const fn rgb_hex(rgb: u32) -> Self {
        let [_, r, g, b] = rgb.to_be_bytes();
        Self::rgba(r, g, b, 255)
    }

    /// Parses one of:
    ///
    /// * `#RRGGBB` or `#RRGGBBAA`, case insensitive;
    /// * `rgb(r, g, b)` with channels in `0..=255`;
    /// * `rgba(r, g, b, a)` with `a` in `[0, 1]`.
    ///
    /// Out of range numbers are clamped.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.strip_prefix('#') {
            Some(hex) => parse_hex(hex),
            None => parse_function(&value.to_ascii_lowercase()),
        }
    }

    /// `#RRGGBBAA` form of the color.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// The color with its alpha scaled by `opacity`. Opacity is clamped to `[0, 1]`; `NaN` is
    /// treated as fully opaque.
    pub fn with_opacity(&self, opacity: f64) -> Self {
        let opacity = if opacity.is_nan() {
            1.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
        Self {
            a: (f64::from(self.a) * opacity).round() as u8,
            ..*self
        }
    }

    /// Red channel.
    pub fn r(&self) -> u8 {
        self.r
    }

    /// Green channel.
    pub fn g(&self) -> u8 {
        self.g
    }

    /// Blue channel.
    pub fn b(&self) -> u8 {
        self.b
    }

    /// Alpha channel, `0` is transparent.
    pub fn a(&self) -> u8 {
        self.a
    }
}

fn parse_hex(digits: &str) -> Option<Color> {
    if !matches!(digits.len(), 6 | 8) || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let value = u32::from_str_radix(digits, 16).ok()?;
    let rgba = if digits.len() == 6 {
        value << 8 | 0xFF
    } else {
        value
    };
    let [r, g, b, a] = rgba.to_be_bytes();
    Some(Color::rgba(r, g, b, a))
}

fn parse_function(value: &str) -> Option<Color> {
    let (name, rest) = value.split_once('(')?;
    let args: Vec<f64> = rest
        .strip_suffix(')')?
        .split(',')
        .map(|arg| arg.trim().parse().ok())
        .collect::<Option<_>>()?;
    let channel = |v: f64| v.clamp(0.0, 255.0).round() as u8;

    match (name.trim(), args.as_slice()) {
        ("rgb", &[r, g, b]) => Some(Color::rgba(channel(r), channel(g), channel(b), 255)),
        ("rgba", &[r, g, b, a]) => Some(Color::rgba(
            channel(r),
            channel(g),
            channel(b),
            channel(a * 255.0),
        )),
        _ => None,
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { r, g, b, a } = self;
        write!(f, "#{r:02X}{g:02X}{b:02X}{a:02X}")
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid color '{s}'"))
    }
}

impl From<String> for Color {
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or(Color::BLACK)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_forms() {
        assert_eq!(Color::parse("#FF1000AA"), Some(Color::rgba(255, 16, 0, 170)));
        assert_eq!(Color::parse("#3388ff"), Some(Color::DEFAULT_FILL));
        assert_eq!(Color::rgba(255, 16, 0, 170).to_hex(), "#FF1000AA");
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("#+12345"), None);
    }

    #[test]
    fn css_functions() {
        assert_eq!(
            Color::parse("rgba(255, 51, 0, 0.5)"),
            Some(Color::rgba(255, 51, 0, 128))
        );
        assert_eq!(Color::parse("RGB(0,102,204)"), Some(Color::DEFAULT_STROKE));
        assert_eq!(Color::parse("rgb(300, -5, 0)"), Some(Color::rgba(255, 0, 0, 255)));
        assert_eq!(Color::parse("rgba(1,2)"), None);
        assert_eq!(Color::parse("rgb(1,2,3,0.5)"), None);
        assert_eq!(Color::parse("blue"), None);
        assert!("blue".parse::<Color>().is_err());
    }

    #[test]
    fn serde_uses_hex_strings() {
        let json = serde_json::to_string(&Color::HIGHLIGHT).unwrap();
        assert_eq!(json, "\"#FFFF00FF\"");
        let color: Color = serde_json::from_str("\"rgb(0, 128, 255)\"").unwrap();
        assert_eq!(color, Color::MEASURE);
        let color: Color = serde_json::from_str("\"nonsense\"").unwrap();
        assert_eq!(color, Color::BLACK);
    }

    #[test]
    fn opacity_scales_alpha() {
        assert_eq!(Color::rgba(0, 0, 0, 200).with_opacity(0.5).a(), 100);
        assert_eq!(Color::WHITE.with_opacity(2.0).a(), 255);
        assert_eq!(Color::WHITE.with_opacity(f64::NAN).a(), 255);
    }
}
