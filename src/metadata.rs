//! Metadata extraction: combines what the decoder reports with what the
//! container scanners find in the raw bytes.

use std::path::Path;

use image::ExtendedColorType;
use tracing::debug;

use crate::config::InputLimits;
use crate::error::Result;
use crate::formats::{self, exif};
use crate::imaging::{self, DecodedSource};
use crate::types::{ColorMode, FALLBACK_MIME, ImageMetadata};

const DEFAULT_FILENAME: &str = "image";

/// Metadata plus the side data a bit-exact manifest carries along.
#[derive(Debug, Clone)]
pub struct ExtractedMetadata {
    pub metadata: ImageMetadata,
    pub icc_profile: Option<Vec<u8>>,
    pub exif: Option<Vec<u8>>,
}

/// Decodes `bytes` (which must be a supported, decodable image) and reports
/// its metadata. Pure read.
pub fn extract_metadata(
    bytes: &[u8],
    filename: &str,
    limits: &InputLimits,
) -> Result<ExtractedMetadata> {
    let source = imaging::decode_image(bytes, limits)?;
    Ok(describe(&source, bytes, filename))
}

/// Builds metadata for an already decoded source.
pub fn describe(source: &DecodedSource, bytes: &[u8], filename: &str) -> ExtractedMetadata {
    let hints = formats::scan_container(bytes);
    let exif_summary = source.exif.as_deref().and_then(exif::parse_exif);

    let color_mode = if hints.palette {
        ColorMode::Palette
    } else {
        color_mode_of(source.stored_color)
    };
    let (width, height) = source.dimensions();
    let software = hints
        .software
        .or_else(|| exif_summary.as_ref().and_then(|e| e.software.clone()));

    let metadata = ImageMetadata {
        filename: base_name(filename),
        mime_type: guess_mime(filename, bytes),
        width,
        height,
        color_mode,
        bit_depth: color_mode.bit_depth(),
        dpi_x: hints.dpi.map(|(x, _)| x),
        dpi_y: hints.dpi.map(|(_, y)| y),
        has_alpha: source.has_alpha,
        exif_orientation: exif_summary.and_then(|e| e.orientation),
        software,
    };

    debug!(
        filename = %metadata.filename,
        mime = %metadata.mime_type,
        mode = %metadata.color_mode,
        "extracted metadata"
    );

    ExtractedMetadata {
        metadata,
        icc_profile: source.icc_profile.clone(),
        exif: source.exif.clone(),
    }
}

/// Maps the stored color type onto the manifest's mode labels.
pub fn color_mode_of(color: ExtendedColorType) -> ColorMode {
    use ExtendedColorType as E;
    match color {
        E::L1 => ColorMode::Binary,
        E::L2 | E::L4 | E::L8 => ColorMode::Grayscale,
        E::La1 | E::La2 | E::La4 | E::La8 | E::La16 => ColorMode::GrayscaleAlpha,
        E::L16 => ColorMode::Gray16,
        E::Rgb1 | E::Rgb2 | E::Rgb4 | E::Rgb8 | E::Rgb16 | E::Bgr8 => ColorMode::Rgb,
        E::Rgba1 | E::Rgba2 | E::Rgba4 | E::Rgba8 | E::Rgba16 | E::Bgra8 => ColorMode::Rgba,
        E::Rgb32F | E::Rgba32F => ColorMode::Float32,
        // four channels without alpha: CMYK
        other if other.channel_count() == 4 => ColorMode::Cmyk,
        _ => ColorMode::Unknown,
    }
}

/// Final path component of `filename`, or a generic name when there is none.
pub fn base_name(filename: &str) -> String {
    Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_FILENAME)
        .to_string()
}

/// MIME type from the filename extension, then from the content, then the
/// generic binary type.
pub fn guess_mime(filename: &str, bytes: &[u8]) -> String {
    let by_extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(|e| mime_for_extension(&e.to_ascii_lowercase()));

    by_extension
        .or_else(|| image::guess_format(bytes).ok().map(|f| f.to_mime_type()))
        .unwrap_or(FALLBACK_MIME)
        .to_string()
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/vnd.microsoft.icon",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => return None,
    })
}
