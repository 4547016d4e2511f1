use crate::error::{Result, StudioError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_SEED: u64 = 4_294_967_294;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            other => other.as_str(),
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.split(';').next().unwrap_or("").trim() {
            "image/png" => Some(OutputFormat::Png),
            "image/jpeg" | "image/jpg" => Some(OutputFormat::Jpeg),
            "image/webp" => Some(OutputFormat::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(StudioError::validation(format!(
                "unsupported output format '{}' (expected png, jpeg or webp)",
                other
            ))),
        }
    }
}

/// Style presets understood by the generate endpoints.
///
/// `Enhance` is the "auto" choice: no `style_preset` field is sent at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StylePreset {
    #[default]
    Enhance,
    #[serde(rename = "3d-model")]
    ThreeDModel,
    AnalogFilm,
    Anime,
    Cinematic,
    ComicBook,
    DigitalArt,
    FantasyArt,
    Isometric,
    LineArt,
    LowPoly,
    ModelingCompound,
    NeonPunk,
    Origami,
    Photographic,
    PixelArt,
    TileTexture,
}

impl StylePreset {
    pub const ALL: [StylePreset; 17] = [
        StylePreset::Enhance,
        StylePreset::ThreeDModel,
        StylePreset::AnalogFilm,
        StylePreset::Anime,
        StylePreset::Cinematic,
        StylePreset::ComicBook,
        StylePreset::DigitalArt,
        StylePreset::FantasyArt,
        StylePreset::Isometric,
        StylePreset::LineArt,
        StylePreset::LowPoly,
        StylePreset::ModelingCompound,
        StylePreset::NeonPunk,
        StylePreset::Origami,
        StylePreset::Photographic,
        StylePreset::PixelArt,
        StylePreset::TileTexture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StylePreset::Enhance => "enhance",
            StylePreset::ThreeDModel => "3d-model",
            StylePreset::AnalogFilm => "analog-film",
            StylePreset::Anime => "anime",
            StylePreset::Cinematic => "cinematic",
            StylePreset::ComicBook => "comic-book",
            StylePreset::DigitalArt => "digital-art",
            StylePreset::FantasyArt => "fantasy-art",
            StylePreset::Isometric => "isometric",
            StylePreset::LineArt => "line-art",
            StylePreset::LowPoly => "low-poly",
            StylePreset::ModelingCompound => "modeling-compound",
            StylePreset::NeonPunk => "neon-punk",
            StylePreset::Origami => "origami",
            StylePreset::Photographic => "photographic",
            StylePreset::PixelArt => "pixel-art",
            StylePreset::TileTexture => "tile-texture",
        }
    }

    /// Value for the `style_preset` form field, `None` for auto.
    pub fn form_value(&self) -> Option<&'static str> {
        match self {
            StylePreset::Enhance => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for StylePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StylePreset {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        StylePreset::ALL
            .iter()
            .copied()
            .find(|preset| preset.as_str() == wanted)
            .ok_or_else(|| StudioError::validation(format!("unknown style preset '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "21:9")]
    Wide21x9,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "9:21")]
    Tall9x21,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 9] = [
        AspectRatio::Landscape16x9,
        AspectRatio::Square,
        AspectRatio::Wide21x9,
        AspectRatio::Portrait2x3,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait4x5,
        AspectRatio::Landscape5x4,
        AspectRatio::Portrait9x16,
        AspectRatio::Tall9x21,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Square => "1:1",
            AspectRatio::Wide21x9 => "21:9",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Tall9x21 => "9:21",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        AspectRatio::ALL
            .iter()
            .copied()
            .find(|ratio| ratio.as_str() == wanted)
            .ok_or_else(|| StudioError::validation(format!("unsupported aspect ratio '{}'", s)))
    }
}

/// An uploaded image, already checked to be decodable.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl ImageInput {
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.format.extension())
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A decoded image returned by the API.
#[derive(Debug, Clone)]
pub struct ImageResult {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
    pub finish_reason: Option<String>,
}

impl ImageResult {
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

pub fn require_prompt(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StudioError::validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

pub fn check_seed(seed: Option<u64>) -> Result<()> {
    match seed {
        Some(seed) if seed > MAX_SEED => Err(StudioError::validation(format!(
            "seed must be between 0 and {}, got {}",
            MAX_SEED, seed
        ))),
        _ => Ok(()),
    }
}

pub fn check_range(field: &str, value: Option<f32>, min: f32, max: f32) -> Result<()> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(StudioError::validation(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, v
        ))),
        _ => Ok(()),
    }
}

/// Blank optional prompts are treated as absent.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhance_style_is_not_sent() {
        assert_eq!(StylePreset::Enhance.form_value(), None);
        assert_eq!(StylePreset::NeonPunk.form_value(), Some("neon-punk"));
    }

    #[test]
    fn style_and_ratio_parse_from_api_names() {
        assert_eq!("3d-model".parse::<StylePreset>().unwrap(), StylePreset::ThreeDModel);
        assert_eq!("9:21".parse::<AspectRatio>().unwrap(), AspectRatio::Tall9x21);
        assert!("4:3".parse::<AspectRatio>().is_err());
        assert!("watercolor".parse::<StylePreset>().is_err());
    }

    #[test]
    fn output_format_from_mime_ignores_parameters() {
        assert_eq!(
            OutputFormat::from_mime("image/png; charset=binary"),
            Some(OutputFormat::Png)
        );
        assert_eq!(OutputFormat::from_mime("application/json"), None);
    }

    #[test]
    fn whitespace_prompt_is_rejected() {
        assert!(require_prompt("prompt", "   \n").is_err());
        assert!(require_prompt("prompt", "a red fox").is_ok());
    }

    #[test]
    fn seed_upper_bound() {
        assert!(check_seed(Some(MAX_SEED)).is_ok());
        assert!(check_seed(Some(MAX_SEED + 1)).is_err());
        assert!(check_seed(None).is_ok());
    }

    #[test]
    fn blank_optional_prompt_is_absent() {
        assert_eq!(non_blank(&Some("  ".to_string())), None);
        assert_eq!(non_blank(&Some(" blurry ".to_string())), Some("blurry"));
    }
}
