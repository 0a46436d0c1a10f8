//! Thin adapters over the `image` crate: guarded decoding, PNG output,
//! resizing and rectangle fills on an RGB canvas.

use std::io::Cursor;

use image::imageops;
use image::{
    DynamicImage, ExtendedColorType, GrayImage, ImageDecoder, ImageFormat, ImageReader, Rgb,
    RgbImage,
};
use tracing::debug;

use crate::config::InputLimits;
use crate::error::{CodecError, Result};
use crate::types::{ResampleFilter, round_dimension};

/// Containers accepted as encoder input.
pub const ACCEPTED_FORMATS: [ImageFormat; 6] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

/// A decoded first frame together with what the decoder knew about the
/// container before converting pixels.
#[derive(Debug)]
pub struct DecodedSource {
    pub image: DynamicImage,
    pub format: ImageFormat,
    /// Color type as stored in the file, before any widening to 8-bit
    pub stored_color: ExtendedColorType,
    pub has_alpha: bool,
    pub icc_profile: Option<Vec<u8>>,
    pub exif: Option<Vec<u8>>,
}

impl DecodedSource {
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Decodes image bytes after checking size limits and the container type.
///
/// Side data (ICC, EXIF) that a decoder fails to read is treated as absent;
/// pixel decoding failures are errors.
pub fn decode_image(bytes: &[u8], limits: &InputLimits) -> Result<DecodedSource> {
    if bytes.is_empty() {
        return Err(CodecError::invalid("empty image payload"));
    }
    limits.check_bytes(bytes.len())?;

    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| CodecError::UnsupportedContainer("unrecognized image data".into()))?;
    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(CodecError::UnsupportedContainer(format!("{format:?}")));
    }

    let mut decoder = reader.into_decoder()?;
    let (width, height) = decoder.dimensions();
    limits.check_pixels(width, height)?;

    let stored_color = decoder.original_color_type();
    let has_alpha = decoder.color_type().has_alpha();
    let icc_profile = decoder.icc_profile().ok().flatten().filter(|p| !p.is_empty());
    let exif = decoder.exif_metadata().ok().flatten().filter(|e| !e.is_empty());

    let image = DynamicImage::from_decoder(decoder)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(CodecError::invalid("image has zero width or height"));
    }

    debug!(
        ?format,
        width,
        height,
        has_alpha,
        icc = icc_profile.is_some(),
        exif = exif.is_some(),
        "decoded source image"
    );

    Ok(DecodedSource {
        image,
        format,
        stored_color,
        has_alpha,
        icc_profile,
        exif,
    })
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Alpha plane of an image in row-major order.
pub fn alpha_channel(image: &DynamicImage) -> GrayImage {
    let rgba = image.to_rgba8();
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        image::Luma([rgba.get_pixel(x, y).0[3]])
    })
}

/// Target size when the longer side must not exceed `max_side`. Images that
/// already fit keep their size.
pub fn fit_within(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side {
        return (width, height);
    }
    let scale = f64::from(max_side) / f64::from(longest);
    (
        round_dimension(f64::from(width) * scale),
        round_dimension(f64::from(height) * scale),
    )
}

pub fn resize_rgb(image: &RgbImage, width: u32, height: u32, filter: ResampleFilter) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, filter.filter_type())
}

pub fn resize_gray(image: &GrayImage, width: u32, height: u32, filter: ResampleFilter) -> GrayImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, filter.filter_type())
}

/// Fills the half-open box `[x0, x1) x [y0, y1)`, clipped to the canvas.
pub fn fill_rect(canvas: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let x1 = x1.min(canvas.width());
    let y1 = y1.min(canvas.height());
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Copies the half-open box `[x0, x1) x [y0, y1)` out of `image`.
pub fn crop_box(image: &RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) -> RgbImage {
    let width = x1.saturating_sub(x0);
    let height = y1.saturating_sub(y0);
    imageops::crop_imm(image, x0, y0, width, height).to_image()
}
