use thiserror::Error;

/// Coarse classification of every [`CodecError`].
///
/// Callers use it to tell "bad input shape" apart from "content corrupted in
/// transit" without matching on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputValidation,
    Integrity,
    UnsupportedSchema,
}

impl ErrorKind {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InputValidation => "input validation",
            Self::Integrity => "integrity",
            Self::UnsupportedSchema => "unsupported schema",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Input too large: {actual} bytes (max: {max})")]
    InputTooLarge { actual: u64, max: u64 },

    #[error("Image too large: {width}x{height} exceeds {max} pixels")]
    TooManyPixels { width: u32, height: u32, max: u64 },

    #[error("Unsupported image container: {0}")]
    UnsupportedContainer(String),

    #[error("Malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("Unrecognized manifest: expected a v2 lossless, lossy-algo or lossy-nlp header")]
    UnrecognizedManifest,

    #[error("Unknown tier: {0} (expected lossless, lossy-algo or lossy-nlp)")]
    UnknownTier(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Found {found} CHUNK blocks but header says {declared}")]
    ChunkCountMismatch { declared: usize, found: usize },

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("SHA-256 mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Unsupported schema for {tier}: {found:?}")]
    UnsupportedSchema { tier: &'static str, found: String },
}

impl CodecError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_)
            | Self::Image(_)
            | Self::InvalidInput(_)
            | Self::InputTooLarge { .. }
            | Self::TooManyPixels { .. }
            | Self::UnsupportedContainer(_)
            | Self::MalformedManifest(_)
            | Self::UnrecognizedManifest
            | Self::UnknownTier(_)
            | Self::InvalidPayload(_)
            | Self::Fetch(_) => ErrorKind::InputValidation,
            Self::ChunkCountMismatch { .. } | Self::Integrity(_) | Self::DigestMismatch { .. } => {
                ErrorKind::Integrity
            }
            Self::UnsupportedSchema { .. } => ErrorKind::UnsupportedSchema,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedManifest(msg.into())
    }

    pub(crate) fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
