//! Tier-dispatching entry points.

use tracing::info;

use crate::config::{DecodeOptions, EncodeOptions, TierOptions};
use crate::description;
use crate::error::Result;
use crate::lossless;
use crate::lossy_algo;
use crate::manifest;
use crate::types::Tier;

const PNG_MIME: &str = "image/png";

#[derive(Debug, Clone)]
pub struct EncodedManifest {
    pub text: String,
    /// Suggested name, `<stem>.<tier suffix>`
    pub filename: String,
    pub tier: Tier,
}

/// Per-tier summary of a decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeReport {
    Lossless {
        filename: String,
        mime_type: String,
        bytes: usize,
        sha256: String,
    },
    LossyAlgo {
        width: u32,
        height: u32,
        has_alpha: bool,
        palette_entries: usize,
    },
    Description {
        width: u32,
        height: u32,
        dominant_swatches: usize,
    },
}

impl DecodeReport {
    #[must_use]
    pub fn tier(&self) -> Tier {
        match self {
            Self::Lossless { .. } => Tier::Lossless,
            Self::LossyAlgo { .. } => Tier::LossyAlgo,
            Self::Description { .. } => Tier::Description,
        }
    }
}

impl std::fmt::Display for DecodeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lossless {
                filename,
                mime_type,
                bytes,
                sha256,
            } => write!(f, "{filename} ({mime_type}, {bytes} bytes, sha256 {sha256})"),
            Self::LossyAlgo {
                width,
                height,
                has_alpha,
                palette_entries,
            } => write!(
                f,
                "{width}x{height}, {palette_entries} palette entries, alpha: {has_alpha}"
            ),
            Self::Description {
                width,
                height,
                dominant_swatches,
            } => write!(f, "{width}x{height} proxy, {dominant_swatches} swatches"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub report: DecodeReport,
}

/// Encodes image bytes into a manifest of the tier selected by `options`.
pub fn encode(bytes: &[u8], filename: &str, options: &EncodeOptions) -> Result<EncodedManifest> {
    let limits = &options.limits;
    let text = match &options.tier {
        TierOptions::Lossless(o) => lossless::encode(bytes, filename, o, limits)?,
        TierOptions::LossyAlgo(o) => lossy_algo::encode(bytes, filename, o, limits)?,
        TierOptions::Description(o) => description::encode(bytes, filename, o, limits)?,
    };
    let tier = options.tier.tier();
    let manifest_name = manifest::manifest_filename(filename, tier);
    info!(%tier, manifest = %manifest_name, chars = text.len(), "encoded manifest");

    Ok(EncodedManifest {
        text,
        filename: manifest_name,
        tier,
    })
}

/// Sniffs the tier from the header and decodes accordingly.
pub fn decode(text: &str, options: &DecodeOptions) -> Result<DecodedImage> {
    let tier = manifest::sniff(text)?;
    decode_as(text, tier, options)
}

/// Decodes `text` as the given tier without sniffing.
pub fn decode_as(text: &str, tier: Tier, options: &DecodeOptions) -> Result<DecodedImage> {
    let limits = &options.limits;
    let decoded = match tier {
        Tier::Lossless => {
            let image = lossless::decode(text, limits)?;
            DecodedImage {
                report: DecodeReport::Lossless {
                    filename: image.filename.clone(),
                    mime_type: image.mime_type.clone(),
                    bytes: image.bytes.len(),
                    sha256: image.sha256,
                },
                filename: image.filename,
                mime_type: image.mime_type,
                bytes: image.bytes,
            }
        }
        Tier::LossyAlgo => {
            let image = lossy_algo::decode(text, limits)?;
            DecodedImage {
                filename: lossy_algo::DEFAULT_OUTPUT_NAME.to_string(),
                mime_type: PNG_MIME.to_string(),
                bytes: image.png,
                report: DecodeReport::LossyAlgo {
                    width: image.width,
                    height: image.height,
                    has_alpha: image.has_alpha,
                    palette_entries: image.palette_entries,
                },
            }
        }
        Tier::Description => {
            let image = description::decode(text, limits)?;
            DecodedImage {
                filename: description::DEFAULT_OUTPUT_NAME.to_string(),
                mime_type: PNG_MIME.to_string(),
                bytes: image.png,
                report: DecodeReport::Description {
                    width: image.width,
                    height: image.height,
                    dominant_swatches: image.dominant_swatches,
                },
            }
        }
    };

    info!(%tier, output = %decoded.filename, bytes = decoded.bytes.len(), "decoded manifest");
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LossyAlgoOptions;
    use crate::error::CodecError;
    use crate::imaging;
    use image::{DynamicImage, Rgb, RgbImage};

    fn sample_png() -> Vec<u8> {
        let img = RgbImage::from_fn(8, 6, |x, y| Rgb([(x * 30) as u8, (y * 40) as u8, 7]));
        imaging::encode_png(&DynamicImage::ImageRgb8(img)).unwrap()
    }

    #[test]
    fn test_every_tier_round_trips_through_dispatch() {
        let png = sample_png();
        for tier in Tier::ALL {
            let encoded = encode(&png, "photos/sample.png", &EncodeOptions::new(tier)).unwrap();
            assert_eq!(encoded.tier, tier);
            assert_eq!(
                encoded.filename,
                format!("sample.{}", tier.manifest_suffix())
            );
            let decoded = decode(&encoded.text, &DecodeOptions::default()).unwrap();
            assert_eq!(decoded.report.tier(), tier);
            assert!(image::load_from_memory(&decoded.bytes).is_ok());
        }
    }

    #[test]
    fn test_lossless_report() {
        let png = sample_png();
        let encoded = encode(&png, "a.png", &EncodeOptions::new(Tier::Lossless)).unwrap();
        let decoded = decode(&encoded.text, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.bytes, png);
        assert_eq!(decoded.filename, "a.png");
        match decoded.report {
            DecodeReport::Lossless { bytes, .. } => assert_eq!(bytes, png.len()),
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[test]
    fn test_lossy_output_names() {
        let png = sample_png();
        let options = EncodeOptions::new(LossyAlgoOptions::default().with_palette_size(8));
        let encoded = encode(&png, "a.png", &options).unwrap();
        let decoded = decode(&encoded.text, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.filename, "rebuilt_lossy_algo_v3.png");
        assert_eq!(decoded.mime_type, "image/png");
    }

    #[test]
    fn test_unrecognized_text() {
        assert!(matches!(
            decode("", &DecodeOptions::default()),
            Err(CodecError::UnrecognizedManifest)
        ));
    }
}
