//! Palette-quantized tier. The image is projected onto at most 256 colors
//! once at encode time; from then on manifest and pixels convert into each
//! other exactly.

use image::{DynamicImage, GrayImage, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{InputLimits, LossyAlgoOptions};
use crate::error::{CodecError, Result};
use crate::imaging;
use crate::manifest;
use crate::metadata;
use crate::quantize;
use crate::rle::{self, Run};
use crate::types::{ResampleFilter, Tier, hex_to_rgb, rgb_to_hex};

pub const SCHEMA: &str = "IMG-ALGO-LOSSY v2";
pub const ACCEPTED_SCHEMAS: [&str; 2] = [SCHEMA, "IMG-ALGO-LOSSY v1"];
pub const NOTE: &str = "note: deterministic; rebuild matches this lossy image exactly (size + alpha).";
pub const DEFAULT_OUTPUT_NAME: &str = "rebuilt_lossy_algo_v3.png";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlgoPayload {
    pub schema: String,
    pub source: String,
    pub original: OriginalInfo,
    pub params: AlgoParams,
    pub result_size: ResultSize,
    pub palette_rgb_hex: Vec<String>,
    pub palette_size_actual: usize,
    pub index_bit_depth: u32,
    pub pixels_rle: Vec<Run<u32>>,
    /// Present as `null` when the source had no alpha channel
    #[serde(deserialize_with = "Option::deserialize")]
    pub alpha_rle: Option<Vec<Run<u8>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OriginalInfo {
    pub width: u32,
    pub height: u32,
    pub mode: String,
    pub has_alpha: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlgoParams {
    pub lock_dims: bool,
    pub max_side: u32,
    pub palette_size: u16,
    pub resample: ResampleFilter,
    pub dither: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultSize {
    pub width: u32,
    pub height: u32,
}

/// A rebuilt lossy-algo image, PNG encoded.
#[derive(Debug, Clone)]
pub struct LossyAlgoImage {
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
    pub palette_entries: usize,
    pub png: Vec<u8>,
}

/// Bits needed to address `entries` palette slots, never less than one.
pub fn index_bit_depth(entries: usize) -> u32 {
    let max_index = entries.saturating_sub(1);
    (usize::BITS - max_index.leading_zeros()).max(1)
}

pub fn encode(
    bytes: &[u8],
    filename: &str,
    options: &LossyAlgoOptions,
    limits: &InputLimits,
) -> Result<String> {
    options.validate()?;
    let source = imaging::decode_image(bytes, limits)?;
    let meta = metadata::describe(&source, bytes, filename).metadata;
    let (width, height) = source.dimensions();

    let alpha = meta.has_alpha.then(|| imaging::alpha_channel(&source.image));
    let rgb = source.image.to_rgb8();

    let (new_width, new_height) = if options.lock_dims {
        (width, height)
    } else {
        imaging::fit_within(width, height, options.max_side)
    };
    let rgb = imaging::resize_rgb(&rgb, new_width, new_height, options.resample);
    let alpha = alpha.map(|a| imaging::resize_gray(&a, new_width, new_height, options.resample));

    let quantized = quantize::quantize(&rgb, options.palette_size, options.dither);
    let palette_rgb_hex: Vec<String> = quantized
        .palette
        .colors()
        .iter()
        .map(|&c| rgb_to_hex(c))
        .collect();
    let indices: Vec<u32> = quantized.indices.iter().map(|&i| u32::from(i)).collect();

    let payload = AlgoPayload {
        schema: SCHEMA.to_string(),
        source: options.source.clone(),
        original: OriginalInfo {
            width,
            height,
            mode: meta.color_mode.label().to_string(),
            has_alpha: meta.has_alpha,
        },
        params: AlgoParams {
            lock_dims: options.lock_dims,
            max_side: options.max_side,
            palette_size: options.palette_size,
            resample: options.resample,
            dither: options.dither,
        },
        result_size: ResultSize {
            width: new_width,
            height: new_height,
        },
        palette_size_actual: palette_rgb_hex.len(),
        index_bit_depth: index_bit_depth(palette_rgb_hex.len()),
        palette_rgb_hex,
        pixels_rle: rle::encode(&indices),
        alpha_rle: alpha.map(|a| rle::encode(a.as_raw())),
    };

    info!(
        filename = %meta.filename,
        width = new_width,
        height = new_height,
        palette = payload.palette_size_actual,
        runs = payload.pixels_rle.len(),
        "encoded lossy-algo manifest"
    );

    let json = serde_json::to_string_pretty(&payload)?;
    Ok(manifest::json_manifest(
        Tier::LossyAlgo,
        NOTE,
        &meta.filename,
        &json,
    ))
}

/// Parses the embedded payload, checking the schema tag before the shape.
pub fn parse_payload(text: &str) -> Result<AlgoPayload> {
    let json = manifest::extract_json_block(text)?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    let schema = value.get("schema").and_then(|s| s.as_str()).unwrap_or_default();
    if !ACCEPTED_SCHEMAS.contains(&schema) {
        return Err(CodecError::UnsupportedSchema {
            tier: Tier::LossyAlgo.name(),
            found: schema.to_string(),
        });
    }
    Ok(serde_json::from_value(value)?)
}

pub fn decode(text: &str, limits: &InputLimits) -> Result<LossyAlgoImage> {
    limits.check_manifest_bytes(text.len())?;
    let payload = parse_payload(text)?;
    let ResultSize { width, height } = payload.result_size;
    if width == 0 || height == 0 {
        return Err(CodecError::invalid(format!(
            "result_size must be non-zero, got {width}x{height}"
        )));
    }
    limits.check_pixels(width, height)?;
    let expected = u64::from(width) * u64::from(height);

    let palette = payload
        .palette_rgb_hex
        .iter()
        .map(|h| hex_to_rgb(h))
        .collect::<Result<Vec<Rgb<u8>>>>()?;
    if payload.palette_size_actual != palette.len() {
        return Err(CodecError::integrity(format!(
            "palette_size_actual is {} but the palette has {} entries",
            payload.palette_size_actual,
            palette.len()
        )));
    }
    let bits = index_bit_depth(palette.len());
    if payload.index_bit_depth != bits {
        return Err(CodecError::integrity(format!(
            "index_bit_depth is {} but {} entries need {bits}",
            payload.index_bit_depth,
            palette.len()
        )));
    }

    let covered = rle::total_len(&payload.pixels_rle);
    if covered != expected {
        return Err(CodecError::integrity(format!(
            "pixel runs cover {covered} pixels, expected {expected}"
        )));
    }
    if let Some(run) = payload
        .pixels_rle
        .iter()
        .find(|r| r.value as usize >= palette.len())
    {
        return Err(CodecError::integrity(format!(
            "palette index {} out of range for {} entries",
            run.value,
            palette.len()
        )));
    }

    let mut raw = Vec::with_capacity(expected as usize * 3);
    for run in &payload.pixels_rle {
        let color = palette[run.value as usize];
        for _ in 0..run.count {
            raw.extend_from_slice(&color.0);
        }
    }
    let rgb = RgbImage::from_raw(width, height, raw)
        .ok_or_else(|| CodecError::integrity("pixel buffer does not match result_size"))?;

    let alpha_runs = payload.alpha_rle.as_deref().filter(|runs| !runs.is_empty());
    let image = match alpha_runs {
        Some(runs) => {
            let covered = rle::total_len(runs);
            if covered != expected {
                return Err(CodecError::integrity(format!(
                    "alpha runs cover {covered} pixels, expected {expected}"
                )));
            }
            let alpha = GrayImage::from_raw(width, height, rle::decode(runs))
                .ok_or_else(|| CodecError::integrity("alpha buffer does not match result_size"))?;
            DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
                let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
                image::Rgba([r, g, b, alpha.get_pixel(x, y).0[0]])
            }))
        }
        None => DynamicImage::ImageRgb8(rgb),
    };

    debug!(width, height, alpha = alpha_runs.is_some(), "rebuilt lossy-algo image");

    Ok(LossyAlgoImage {
        width,
        height,
        has_alpha: alpha_runs.is_some(),
        palette_entries: palette.len(),
        png: imaging::encode_png(&image)?,
    })
}
