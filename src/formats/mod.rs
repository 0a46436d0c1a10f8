//! Byte-level container scanners for the properties `image` does not expose:
//! resolution, palette storage and the embedded software tag.

pub mod exif;
pub mod jpeg;
pub mod png;

const GIF87A: &[u8; 6] = b"GIF87a";
const GIF89A: &[u8; 6] = b"GIF89a";

/// Properties recovered from the raw container, independent of pixel decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerHints {
    /// Pixels are stored as indices into a color table
    pub palette: bool,
    /// Horizontal and vertical resolution in dots per inch
    pub dpi: Option<(f64, f64)>,
    pub software: Option<String>,
}

#[inline]
pub fn is_gif(data: &[u8]) -> bool {
    data.starts_with(GIF87A) || data.starts_with(GIF89A)
}

/// Dispatches on the magic bytes. Unknown containers yield empty hints.
pub fn scan_container(data: &[u8]) -> ContainerHints {
    if png::is_png(data) {
        return png::scan_png(data).unwrap_or_default();
    }
    if jpeg::is_jpeg(data) {
        return jpeg::scan_jpeg(data).unwrap_or_default();
    }
    if is_gif(data) {
        return ContainerHints {
            palette: true,
            ..ContainerHints::default()
        };
    }
    ContainerHints::default()
}
