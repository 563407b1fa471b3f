//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! vocabulary shared by the [`operations`](super::operations) recipes, the
//! [`calculations`](super::calculations) math and the
//! [`backend`](super::backend) codec that does the pixel work.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`AspectMode`]: Whether a resize keeps the source proportions.
//! - [`Background`]: Fill for canvas area the image does not cover.
//! - [`OutputFormat`]: Encoded format, chosen from the source extension.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// How a resize treats the source proportions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectMode {
    /// Scale uniformly so the result fits inside the target box.
    Preserve,
    /// Stretch to exactly the target box.
    Exact,
}

/// Canvas fill color.
///
/// Parsed from `"transparent"` or a CSS-style hex color (`#rgb`, `#rrggbb`,
/// `#rrggbbaa`, leading `#` optional). The canonical string form is what
/// enters cache keys, so `#fff` and `#ffffff` share a derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Background {
    #[default]
    Transparent,
    Rgba([u8; 4]),
}

impl Background {
    pub fn white() -> Self {
        Self::Rgba([255, 255, 255, 255])
    }

    /// RGBA channels of the fill.
    pub fn rgba(self) -> [u8; 4] {
        match self {
            Background::Transparent => [0, 0, 0, 0],
            Background::Rgba(c) => c,
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Background::Transparent => write!(f, "transparent"),
            Background::Rgba([r, g, b, 255]) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Background::Rgba([r, g, b, a]) => write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}"),
        }
    }
}

impl FromStr for Background {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("transparent") || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Background::Transparent);
        }

        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid background color: {s}"));
        }
        let channel = |pair: &str| u8::from_str_radix(pair, 16).map_err(|e| e.to_string());

        match hex.len() {
            3 => {
                let mut rgba = [255u8; 4];
                for (i, c) in hex.chars().enumerate() {
                    rgba[i] = channel(&format!("{c}{c}"))?;
                }
                Ok(Background::Rgba(rgba))
            }
            6 | 8 => {
                let mut rgba = [255u8; 4];
                for i in 0..hex.len() / 2 {
                    rgba[i] = channel(&hex[i * 2..i * 2 + 2])?;
                }
                Ok(Background::Rgba(rgba))
            }
            _ => Err(format!("invalid background color: {s}")),
        }
    }
}

impl TryFrom<String> for Background {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Background> for String {
    fn from(value: Background) -> Self {
        value.to_string()
    }
}

/// Encoded output format of a derivative.
///
/// Derivatives keep the format of their source; the extension of the source
/// reference selects the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Gif,
    Tiff,
    WebP,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "gif" => Some(OutputFormat::Gif),
            "tif" | "tiff" => Some(OutputFormat::Tiff),
            "webp" => Some(OutputFormat::WebP),
            _ => None,
        }
    }

    /// Whether the format can store an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn background_parses_short_and_long_hex() {
        assert_eq!("#fff".parse::<Background>().unwrap(), Background::white());
        assert_eq!("ffffff".parse::<Background>().unwrap(), Background::white());
        assert_eq!(
            "#10203040".parse::<Background>().unwrap(),
            Background::Rgba([0x10, 0x20, 0x30, 0x40])
        );
    }

    #[test]
    fn background_parses_transparent() {
        assert_eq!(
            "transparent".parse::<Background>().unwrap(),
            Background::Transparent
        );
        assert_eq!("None".parse::<Background>().unwrap(), Background::Transparent);
    }

    #[test]
    fn background_rejects_garbage() {
        assert!("#12345".parse::<Background>().is_err());
        assert!("white-ish".parse::<Background>().is_err());
        assert!("#gggggg".parse::<Background>().is_err());
    }

    #[test]
    fn background_display_is_canonical() {
        assert_eq!(Background::white().to_string(), "#ffffff");
        assert_eq!(Background::Rgba([1, 2, 3, 4]).to_string(), "#01020304");
        assert_eq!(Background::Transparent.to_string(), "transparent");
    }

    #[test]
    fn background_serde_uses_string_form() {
        let json = serde_json::to_string(&Background::white()).unwrap();
        assert_eq!(json, "\"#ffffff\"");
        let back: Background = serde_json::from_str("\"#000\"").unwrap();
        assert_eq!(back, Background::Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(OutputFormat::from_extension("JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_extension("jpeg"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_extension("tif"), Some(OutputFormat::Tiff));
        assert_eq!(OutputFormat::from_extension("webp"), Some(OutputFormat::WebP));
        assert_eq!(OutputFormat::from_extension("bmp"), None);
        assert_eq!(OutputFormat::from_extension(""), None);
    }
}
