//! Tunables for every codec entry point.
//!
//! Each struct has production defaults and a few `with_*` builders; values
//! are checked by `validate` at the start of the operation that uses them.

use std::time::Duration;

use crate::error::{CodecError, Result};
use crate::types::{DEFAULT_SOURCE, ResampleFilter, Tier};

const KB: u64 = 1024;
const MB: u64 = KB * 1024;

pub const DEFAULT_CHUNK_SIZE: usize = 262_144;
pub const DEFAULT_LINE_WIDTH: usize = 76;
pub const MAX_PALETTE_SIZE: u16 = 256;
/// Header, footer and block markers of a manifest
pub const MANIFEST_OVERHEAD: u64 = 4 * KB;

/// Options for the bit-exact tier.
#[derive(Debug, Clone)]
pub struct LosslessOptions {
    /// Free-form provenance tag written to the manifest
    pub source: String,
    /// Base64 characters per CHUNK block
    pub chunk_size: usize,
    /// Column at which chunk text is wrapped
    pub line_width: usize,
}

impl Default for LosslessOptions {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

impl LosslessOptions {
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_line_width(mut self, width: usize) -> Self {
        self.line_width = width;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(CodecError::invalid("chunk_size must be at least 1"));
        }
        if self.line_width == 0 {
            return Err(CodecError::invalid("line_width must be at least 1"));
        }
        Ok(())
    }
}

/// Options for the palette-quantized tier.
#[derive(Debug, Clone)]
pub struct LossyAlgoOptions {
    pub source: String,
    /// Keep the original dimensions instead of downscaling to `max_side`
    pub lock_dims: bool,
    pub max_side: u32,
    /// Upper bound on palette entries (1..=256)
    pub palette_size: u16,
    pub resample: ResampleFilter,
    /// Floyd-Steinberg error diffusion during quantization; never touches alpha
    pub dither: bool,
}

impl Default for LossyAlgoOptions {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            lock_dims: true,
            max_side: 128,
            palette_size: 32,
            resample: ResampleFilter::Bicubic,
            dither: false,
        }
    }
}

impl LossyAlgoOptions {
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn with_lock_dims(mut self, lock: bool) -> Self {
        self.lock_dims = lock;
        self
    }

    pub fn with_max_side(mut self, max_side: u32) -> Self {
        self.max_side = max_side;
        self
    }

    pub fn with_palette_size(mut self, size: u16) -> Self {
        self.palette_size = size;
        self
    }

    pub fn with_resample(mut self, filter: ResampleFilter) -> Self {
        self.resample = filter;
        self
    }

    pub fn with_dither(mut self, dither: bool) -> Self {
        self.dither = dither;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_side == 0 {
            return Err(CodecError::invalid("max_side must be at least 1"));
        }
        if self.palette_size == 0 || self.palette_size > MAX_PALETTE_SIZE {
            return Err(CodecError::invalid(format!(
                "palette_size must be within 1..={MAX_PALETTE_SIZE}, got {}",
                self.palette_size
            )));
        }
        Ok(())
    }
}

/// Options for the structured-description tier.
#[derive(Debug, Clone)]
pub struct DescriptionOptions {
    pub source: String,
    pub preserve_dims: bool,
    pub target_short_side: u32,
    /// Number of dominant colors to probe and record
    pub palette_probe: u16,
}

impl Default for DescriptionOptions {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            preserve_dims: true,
            target_short_side: 512,
            palette_probe: 8,
        }
    }
}

impl DescriptionOptions {
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn with_preserve_dims(mut self, preserve: bool) -> Self {
        self.preserve_dims = preserve;
        self
    }

    pub fn with_target_short_side(mut self, side: u32) -> Self {
        self.target_short_side = side;
        self
    }

    pub fn with_palette_probe(mut self, probe: u16) -> Self {
        self.palette_probe = probe;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_short_side == 0 {
            return Err(CodecError::invalid("target_short_side must be at least 1"));
        }
        if self.palette_probe == 0 || self.palette_probe > MAX_PALETTE_SIZE {
            return Err(CodecError::invalid(format!(
                "palette_probe must be within 1..={MAX_PALETTE_SIZE}, got {}",
                self.palette_probe
            )));
        }
        Ok(())
    }
}

/// Size guards applied to every input before any decoding work.
#[derive(Debug, Clone, Copy)]
pub struct InputLimits {
    /// Maximum raw image size; manifest text gets `max_manifest_bytes`
    pub max_input_bytes: u64,
    /// Maximum `width * height` of a decoded or reconstructed image
    pub max_pixels: u64,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: 50 * MB,
            max_pixels: 40_000_000,
        }
    }
}

impl InputLimits {
    pub fn check_bytes(&self, len: usize) -> Result<()> {
        let actual = len as u64;
        if actual > self.max_input_bytes {
            return Err(CodecError::InputTooLarge {
                actual,
                max: self.max_input_bytes,
            });
        }
        Ok(())
    }

    /// Largest manifest text accepted for decoding. A lossless manifest
    /// carries the image as base64 (4/3 of the bytes) plus line breaks and
    /// optional ICC/EXIF copies, so the budget is twice the base64 length of
    /// `max_input_bytes` plus room for the header and footer.
    pub fn max_manifest_bytes(&self) -> u64 {
        let b64 = self.max_input_bytes.div_ceil(3).saturating_mul(4);
        b64.saturating_mul(2).saturating_add(MANIFEST_OVERHEAD)
    }

    pub fn check_manifest_bytes(&self, len: usize) -> Result<()> {
        let actual = len as u64;
        let max = self.max_manifest_bytes();
        if actual > max {
            return Err(CodecError::InputTooLarge { actual, max });
        }
        Ok(())
    }

    pub fn check_pixels(&self, width: u32, height: u32) -> Result<()> {
        if u64::from(width) * u64::from(height) > self.max_pixels {
            return Err(CodecError::TooManyPixels {
                width,
                height,
                max: self.max_pixels,
            });
        }
        Ok(())
    }
}

/// Per-tier encode settings.
#[derive(Debug, Clone)]
pub enum TierOptions {
    Lossless(LosslessOptions),
    LossyAlgo(LossyAlgoOptions),
    Description(DescriptionOptions),
}

impl TierOptions {
    #[must_use]
    pub fn tier(&self) -> Tier {
        match self {
            Self::Lossless(_) => Tier::Lossless,
            Self::LossyAlgo(_) => Tier::LossyAlgo,
            Self::Description(_) => Tier::Description,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Lossless(o) => o.validate(),
            Self::LossyAlgo(o) => o.validate(),
            Self::Description(o) => o.validate(),
        }
    }
}

impl From<Tier> for TierOptions {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Lossless => Self::Lossless(LosslessOptions::default()),
            Tier::LossyAlgo => Self::LossyAlgo(LossyAlgoOptions::default()),
            Tier::Description => Self::Description(DescriptionOptions::default()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub tier: TierOptions,
    pub limits: InputLimits,
}

impl EncodeOptions {
    pub fn new(tier: impl Into<TierOptions>) -> Self {
        Self {
            tier: tier.into(),
            limits: InputLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: InputLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl From<LosslessOptions> for TierOptions {
    fn from(options: LosslessOptions) -> Self {
        Self::Lossless(options)
    }
}

impl From<LossyAlgoOptions> for TierOptions {
    fn from(options: LossyAlgoOptions) -> Self {
        Self::LossyAlgo(options)
    }
}

impl From<DescriptionOptions> for TierOptions {
    fn from(options: DescriptionOptions) -> Self {
        Self::Description(options)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    pub limits: InputLimits,
}

impl DecodeOptions {
    pub fn with_limits(mut self, limits: InputLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Settings for pulling an image or manifest from a URL.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Whole-request timeout
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_redirects: usize,
    /// Responses larger than this are rejected. Image loads are further
    /// capped by `InputLimits::max_input_bytes`.
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(8),
            max_redirects: 5,
            max_bytes: InputLimits::default().max_manifest_bytes(),
            user_agent: format!("pixtext/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}
