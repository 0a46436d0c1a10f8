//! Structured-description tier: a handful of colors and brightness figures
//! that render back into a coarse proxy image.

use image::{DynamicImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DescriptionOptions, InputLimits};
use crate::error::{CodecError, Result};
use crate::imaging;
use crate::manifest;
use crate::metadata;
use crate::quantize;
use crate::statistics;
use crate::types::{ContrastLevel, Tier, hex_to_rgb, rgb_to_hex, round_dimension};

pub const SCHEMA: &str = "LOSSY-IMAGE-DESCRIPTION v2";
pub const ACCEPTED_SCHEMAS: [&str; 2] = [SCHEMA, "LOSSY-IMAGE-DESCRIPTION v1"];
pub const NOTE: &str =
    "note: deterministic textual description; proxy renderer uses render_target dims.";
pub const DEFAULT_OUTPUT_NAME: &str = "rebuilt_lossy_nlp_proxy_v3.png";
pub const EMPTY_QUADRANT_HEX: &str = "#CCCCCC";
pub const MAX_SWATCHES: usize = 8;
pub const MIN_SWATCH_WIDTH: u32 = 10;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const COMPOSITION_HINTS: [&str; 3] = [
    "Maintain aspect ratio and orientation.",
    "Preserve rough quadrant color placement.",
    "Use the dominant palette listed above.",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptionPayload {
    pub schema: String,
    pub source: String,
    pub dimensions: Dimensions,
    pub render_target: RenderTarget,
    pub colors: Colors,
    pub appearance: Appearance,
    pub composition_hints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dimensions {
    pub width_px: u32,
    pub height_px: u32,
    pub aspect_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderTarget {
    pub width_px: u32,
    pub height_px: u32,
    pub preserve_original_dims: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Colors {
    pub dominant_hex: Vec<String>,
    pub quadrants_hex: QuadrantColors,
}

/// Hex color per quadrant. A quadrant left out of a manifest renders as
/// neutral gray.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuadrantColors {
    #[serde(default = "empty_quadrant")]
    pub top_left: String,
    #[serde(default = "empty_quadrant")]
    pub top_right: String,
    #[serde(default = "empty_quadrant")]
    pub bottom_left: String,
    #[serde(default = "empty_quadrant")]
    pub bottom_right: String,
}

fn empty_quadrant() -> String {
    EMPTY_QUADRANT_HEX.to_string()
}

impl QuadrantColors {
    pub fn get(&self, quadrant: Quadrant) -> &str {
        match quadrant {
            Quadrant::TopLeft => &self.top_left,
            Quadrant::TopRight => &self.top_right,
            Quadrant::BottomLeft => &self.bottom_left,
            Quadrant::BottomRight => &self.bottom_right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Appearance {
    pub brightness_mean_0_255: f64,
    pub contrast_level: ContrastLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    /// Half-open box `(x0, y0, x1, y1)`. The midlines use floor division, so
    /// the right and bottom quadrants take the odd column and row.
    #[must_use]
    pub const fn bounds(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let (mx, my) = (width / 2, height / 2);
        match self {
            Self::TopLeft => (0, 0, mx, my),
            Self::TopRight => (mx, 0, width, my),
            Self::BottomLeft => (0, my, mx, height),
            Self::BottomRight => (mx, my, width, height),
        }
    }
}

/// A rendered proxy image, PNG encoded.
#[derive(Debug, Clone)]
pub struct DescriptionImage {
    pub width: u32,
    pub height: u32,
    pub dominant_swatches: usize,
    pub png: Vec<u8>,
}

/// Output size for the proxy. Without `preserve`, the shorter side becomes
/// `short_side` and the longer side keeps the aspect ratio.
pub fn render_target(width: u32, height: u32, preserve: bool, short_side: u32) -> (u32, u32) {
    if preserve {
        return (width, height);
    }
    let (w, h) = (f64::from(width), f64::from(height));
    if width >= height {
        (round_dimension(f64::from(short_side) * (w / h)), short_side)
    } else {
        (short_side, round_dimension(f64::from(short_side) * (h / w)))
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

pub fn encode(
    bytes: &[u8],
    filename: &str,
    options: &DescriptionOptions,
    limits: &InputLimits,
) -> Result<String> {
    options.validate()?;
    let source = imaging::decode_image(bytes, limits)?;
    let meta = metadata::describe(&source, bytes, filename).metadata;
    let rgb = source.image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let dominant_hex: Vec<String> = quantize::ranked_colors(&rgb, options.palette_probe)
        .into_iter()
        .map(rgb_to_hex)
        .collect();
    let (render_w, render_h) = render_target(
        width,
        height,
        options.preserve_dims,
        options.target_short_side,
    );
    limits.check_pixels(render_w, render_h)?;
    let stats = statistics::luma_statistics(&rgb);

    let quadrant_hex = |q: Quadrant| {
        let (x0, y0, x1, y1) = q.bounds(width, height);
        let crop = imaging::crop_box(&rgb, x0, y0, x1, y1);
        quantize::ranked_colors(&crop, 1)
            .first()
            .map_or_else(empty_quadrant, |&c| rgb_to_hex(c))
    };

    let payload = DescriptionPayload {
        schema: SCHEMA.to_string(),
        source: options.source.clone(),
        dimensions: Dimensions {
            width_px: width,
            height_px: height,
            aspect_ratio: round_to(f64::from(width) / f64::from(height), 6),
        },
        render_target: RenderTarget {
            width_px: render_w,
            height_px: render_h,
            preserve_original_dims: options.preserve_dims,
        },
        colors: Colors {
            dominant_hex,
            quadrants_hex: QuadrantColors {
                top_left: quadrant_hex(Quadrant::TopLeft),
                top_right: quadrant_hex(Quadrant::TopRight),
                bottom_left: quadrant_hex(Quadrant::BottomLeft),
                bottom_right: quadrant_hex(Quadrant::BottomRight),
            },
        },
        appearance: Appearance {
            brightness_mean_0_255: round_to(stats.mean, 2),
            contrast_level: stats.contrast(),
        },
        composition_hints: COMPOSITION_HINTS.iter().map(|s| s.to_string()).collect(),
    };

    info!(
        filename = %meta.filename,
        width,
        height,
        dominant = payload.colors.dominant_hex.len(),
        contrast = ?payload.appearance.contrast_level,
        "encoded description manifest"
    );

    let json = serde_json::to_string_pretty(&payload)?;
    Ok(manifest::json_manifest(
        Tier::Description,
        NOTE,
        &meta.filename,
        &json,
    ))
}

pub fn parse_payload(text: &str) -> Result<DescriptionPayload> {
    let json = manifest::extract_json_block(text)?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    let schema = value.get("schema").and_then(|s| s.as_str()).unwrap_or_default();
    if !ACCEPTED_SCHEMAS.contains(&schema) {
        return Err(CodecError::UnsupportedSchema {
            tier: Tier::Description.name(),
            found: schema.to_string(),
        });
    }
    Ok(serde_json::from_value(value)?)
}

/// Renders the proxy: quadrant fills on white, then a strip of dominant
/// swatches along the bottom edge.
pub fn render_proxy(payload: &DescriptionPayload) -> Result<RgbImage> {
    let RenderTarget {
        width_px: width,
        height_px: height,
        ..
    } = payload.render_target;

    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
    for quadrant in Quadrant::ALL {
        let color = hex_to_rgb(payload.colors.quadrants_hex.get(quadrant))?;
        let (x0, y0, x1, y1) = quadrant.bounds(width, height);
        imaging::fill_rect(&mut canvas, x0, y0, x1, y1, color);
    }

    let swatches = payload
        .colors
        .dominant_hex
        .iter()
        .take(MAX_SWATCHES)
        .map(|h| hex_to_rgb(h))
        .collect::<Result<Vec<_>>>()?;
    if !swatches.is_empty() {
        let swatch_width = (width / swatches.len() as u32).max(MIN_SWATCH_WIDTH);
        let y0 = height.saturating_sub(swatch_width);
        let mut x = 0u32;
        for color in swatches {
            // each swatch spans one column past its width; the next one
            // overwrites that column
            let x1 = x.saturating_add(swatch_width).saturating_add(1);
            imaging::fill_rect(&mut canvas, x, y0, x1, height, color);
            x = x.saturating_add(swatch_width);
        }
    }

    Ok(canvas)
}

pub fn decode(text: &str, limits: &InputLimits) -> Result<DescriptionImage> {
    limits.check_manifest_bytes(text.len())?;
    let payload = parse_payload(text)?;
    let RenderTarget {
        width_px: width,
        height_px: height,
        ..
    } = payload.render_target;
    if width == 0 || height == 0 {
        return Err(CodecError::invalid(format!(
            "render_target must be non-zero, got {width}x{height}"
        )));
    }
    limits.check_pixels(width, height)?;

    let canvas = render_proxy(&payload)?;
    let dominant_swatches = payload.colors.dominant_hex.len().min(MAX_SWATCHES);
    debug!(width, height, dominant_swatches, "rendered description proxy");

    Ok(DescriptionImage {
        width,
        height,
        dominant_swatches,
        png: imaging::encode_png(&DynamicImage::ImageRgb8(canvas))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn png_of(image: RgbImage) -> Vec<u8> {
        imaging::encode_png(&DynamicImage::ImageRgb8(image)).unwrap()
    }

    fn encode_default(image: RgbImage) -> DescriptionPayload {
        let text = encode(
            &png_of(image),
            "d.png",
            &DescriptionOptions::default(),
            &InputLimits::default(),
        )
        .unwrap();
        parse_payload(&text).unwrap()
    }

    #[test]
    fn test_quadrant_bounds_odd_size() {
        assert_eq!(Quadrant::TopLeft.bounds(5, 5), (0, 0, 2, 2));
        assert_eq!(Quadrant::TopRight.bounds(5, 5), (2, 0, 5, 2));
        assert_eq!(Quadrant::BottomLeft.bounds(5, 5), (0, 2, 2, 5));
        assert_eq!(Quadrant::BottomRight.bounds(5, 5), (2, 2, 5, 5));
    }

    #[test]
    fn test_render_target() {
        assert_eq!(render_target(640, 480, true, 512), (640, 480));
        assert_eq!(render_target(200, 100, false, 512), (1024, 512));
        assert_eq!(render_target(100, 300, false, 64), (64, 192));
        assert_eq!(render_target(3, 2, false, 1), (2, 1));
    }

    #[test]
    fn test_flat_image_payload() {
        let payload = encode_default(RgbImage::from_pixel(10, 4, Rgb([128, 128, 128])));
        assert_eq!(payload.schema, SCHEMA);
        assert_eq!(payload.dimensions.aspect_ratio, 2.5);
        assert_eq!(payload.colors.dominant_hex, vec!["#808080".to_string()]);
        assert_eq!(payload.colors.quadrants_hex.bottom_right, "#808080");
        assert_eq!(payload.appearance.brightness_mean_0_255, 128.0);
        assert_eq!(payload.appearance.contrast_level, ContrastLevel::Low);
        assert_eq!(payload.composition_hints.len(), 3);
    }

    #[test]
    fn test_quadrant_colors() {
        let img = RgbImage::from_fn(4, 4, |x, y| match (x < 2, y < 2) {
            (true, true) => Rgb([255, 0, 0]),
            (false, true) => Rgb([0, 255, 0]),
            (true, false) => Rgb([0, 0, 255]),
            (false, false) => Rgb([0, 0, 0]),
        });
        let quads = encode_default(img).colors.quadrants_hex;
        assert_eq!(quads.top_left, "#FF0000");
        assert_eq!(quads.top_right, "#00FF00");
        assert_eq!(quads.bottom_left, "#0000FF");
        assert_eq!(quads.bottom_right, "#000000");
    }

    #[test]
    fn test_single_pixel_empty_quadrants() {
        let quads = encode_default(RgbImage::from_pixel(1, 1, Rgb([1, 2, 3])))
            .colors
            .quadrants_hex;
        assert_eq!(quads.top_left, EMPTY_QUADRANT_HEX);
        assert_eq!(quads.top_right, EMPTY_QUADRANT_HEX);
        assert_eq!(quads.bottom_left, EMPTY_QUADRANT_HEX);
        assert_eq!(quads.bottom_right, "#010203");
    }

    fn proxy_manifest(width: u32, height: u32, dominant: &[&str]) -> String {
        let payload = DescriptionPayload {
            schema: SCHEMA.to_string(),
            source: "t".into(),
            dimensions: Dimensions {
                width_px: width,
                height_px: height,
                aspect_ratio: 1.0,
            },
            render_target: RenderTarget {
                width_px: width,
                height_px: height,
                preserve_original_dims: true,
            },
            colors: Colors {
                dominant_hex: dominant.iter().map(|s| s.to_string()).collect(),
                quadrants_hex: QuadrantColors {
                    top_left: "#110000".into(),
                    top_right: "#002200".into(),
                    bottom_left: "#000033".into(),
                    bottom_right: "#444444".into(),
                },
            },
            appearance: Appearance {
                brightness_mean_0_255: 10.0,
                contrast_level: ContrastLevel::Low,
            },
            composition_hints: Vec::new(),
        };
        let json = serde_json::to_string_pretty(&payload).unwrap();
        manifest::json_manifest(Tier::Description, NOTE, "p.png", &json)
    }

    #[test]
    fn test_proxy_swatch_overdraw() {
        let text = proxy_manifest(40, 40, &["#AA0000", "#00BB00"]);
        let rebuilt = decode(&text, &InputLimits::default()).unwrap();
        assert_eq!(rebuilt.dominant_swatches, 2);
        let img = image::load_from_memory(&rebuilt.png).unwrap().to_rgb8();
        assert_eq!(*img.get_pixel(0, 0), Rgb([0x11, 0, 0]));
        assert_eq!(*img.get_pixel(39, 0), Rgb([0, 0x22, 0]));
        assert_eq!(*img.get_pixel(19, 39), Rgb([0xAA, 0, 0]));
        assert_eq!(*img.get_pixel(20, 39), Rgb([0, 0xBB, 0]));
        assert_eq!(*img.get_pixel(20, 19), Rgb([0, 0x22, 0]));
        assert_eq!(*img.get_pixel(39, 19), Rgb([0, 0x22, 0]));
        assert_eq!(*img.get_pixel(20, 20), Rgb([0, 0xBB, 0]));
    }

    #[test]
    fn test_proxy_swatches_capped() {
        let colors = ["#000000"; 12];
        let text = proxy_manifest(100, 50, &colors);
        let rebuilt = decode(&text, &InputLimits::default()).unwrap();
        assert_eq!(rebuilt.dominant_swatches, MAX_SWATCHES);
    }

    #[test]
    fn test_missing_quadrant_defaults_gray() {
        let text = proxy_manifest(4, 4, &[]).replace("\"top_left\": \"#110000\",\n      ", "");
        let payload = parse_payload(&text).unwrap();
        assert_eq!(payload.colors.quadrants_hex.top_left, EMPTY_QUADRANT_HEX);
        let img = render_proxy(&payload).unwrap();
        assert_eq!(*img.get_pixel(0, 0), Rgb([0xCC, 0xCC, 0xCC]));
    }

    #[test]
    fn test_unknown_schema() {
        let text = proxy_manifest(4, 4, &[]).replace(SCHEMA, "LOSSY-IMAGE-DESCRIPTION v3");
        let err = decode(&text, &InputLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedSchema);
    }

    #[test]
    fn test_bad_swatch_color() {
        let text = proxy_manifest(4, 4, &["#XYZXYZ"]);
        let err = decode(&text, &InputLimits::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }
}
