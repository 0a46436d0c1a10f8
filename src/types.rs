use std::str::FromStr;

use image::Rgb;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

pub const DEFAULT_SOURCE: &str = "user_upload";
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Manifest family, picked by the caller at encode time and sniffed from the
/// header line at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Lossless,
    LossyAlgo,
    Description,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Lossless, Tier::LossyAlgo, Tier::Description];

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Lossless => "lossless",
            Self::LossyAlgo => "lossy-algo",
            Self::Description => "lossy-nlp",
        }
    }

    #[must_use]
    pub const fn header(&self) -> &'static str {
        match self {
            Self::Lossless => "LOSSLESS MANIFEST v2",
            Self::LossyAlgo => "LOSSY-ALGO MANIFEST v2",
            Self::Description => "LOSSY-NLP DESCRIPTION v2",
        }
    }

    #[must_use]
    pub const fn manifest_suffix(&self) -> &'static str {
        match self {
            Self::Lossless => "lossless_manifest_v3.txt",
            Self::LossyAlgo => "lossy_algo_manifest_v3.txt",
            Self::Description => "lossy_nlp_description_v3.txt",
        }
    }
}

impl FromStr for Tier {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lossless" => Ok(Self::Lossless),
            "lossy-algo" | "lossy_algo" => Ok(Self::LossyAlgo),
            "lossy-nlp" | "lossy_nlp" | "lossy-description" => Ok(Self::Description),
            _ => Err(CodecError::UnknownTier(s.to_string())),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Pixel layout of the source container, labelled the way the manifests
/// have always spelled it (`1`, `L`, `P`, `RGB`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Binary,
    Grayscale,
    GrayscaleAlpha,
    Palette,
    Rgb,
    Rgba,
    Cmyk,
    Gray16,
    Float32,
    Unknown,
}

impl ColorMode {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Binary => "1",
            Self::Grayscale => "L",
            Self::GrayscaleAlpha => "LA",
            Self::Palette => "P",
            Self::Rgb => "RGB",
            Self::Rgba => "RGBA",
            Self::Cmyk => "CMYK",
            Self::Gray16 => "I;16",
            Self::Float32 => "F",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub const fn bit_depth(&self) -> u8 {
        match self {
            Self::Binary => 1,
            Self::Gray16 => 16,
            Self::Float32 => 32,
            _ => 8,
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "1" => Self::Binary,
            "L" => Self::Grayscale,
            "LA" => Self::GrayscaleAlpha,
            "P" => Self::Palette,
            "RGB" => Self::Rgb,
            "RGBA" => Self::Rgba,
            "CMYK" => Self::Cmyk,
            "I;16" | "I;16B" => Self::Gray16,
            "F" | "I" => Self::Float32,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Container-level properties of a source image. Read-only once extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata {
    pub filename: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub color_mode: ColorMode,
    pub bit_depth: u8,
    pub dpi_x: Option<f64>,
    pub dpi_y: Option<f64>,
    pub has_alpha: bool,
    pub exif_orientation: Option<u16>,
    pub software: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos,
}

impl ResampleFilter {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Bicubic => "bicubic",
            Self::Lanczos => "lanczos",
        }
    }

    #[must_use]
    pub const fn filter_type(&self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::Bicubic => FilterType::CatmullRom,
            Self::Lanczos => FilterType::Lanczos3,
        }
    }
}

impl FromStr for ResampleFilter {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "bilinear" => Ok(Self::Bilinear),
            "bicubic" => Ok(Self::Bicubic),
            "lanczos" => Ok(Self::Lanczos),
            other => Err(CodecError::invalid(format!(
                "Unknown resample method {other:?}. Use: nearest|bilinear|bicubic|lanczos"
            ))),
        }
    }
}

impl std::fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub const LOW_CONTRAST_STD: f64 = 30.0;
pub const MEDIUM_CONTRAST_STD: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContrastLevel {
    Low,
    Medium,
    High,
}

impl ContrastLevel {
    /// Buckets a luma standard deviation on the 0-255 scale.
    #[must_use]
    pub fn classify(std_dev: f64) -> Self {
        if std_dev < LOW_CONTRAST_STD {
            Self::Low
        } else if std_dev < MEDIUM_CONTRAST_STD {
            Self::Medium
        } else {
            Self::High
        }
    }
}

#[must_use]
pub fn rgb_to_hex(color: Rgb<u8>) -> String {
    format!("#{}", hex::encode_upper(color.0))
}

pub fn hex_to_rgb(value: &str) -> Result<Rgb<u8>> {
    let digits = value.trim().trim_start_matches('#');
    let mut rgb = [0u8; 3];
    hex::decode_to_slice(digits, &mut rgb)
        .map_err(|e| CodecError::invalid(format!("bad hex color {value:?}: {e}")))?;
    Ok(Rgb(rgb))
}

/// Rounds half to even, matching how the manifest dimensions have always
/// been computed.
#[must_use]
pub fn round_dimension(value: f64) -> u32 {
    (value.round_ties_even().max(1.0)).min(u32::MAX as f64) as u32
}
