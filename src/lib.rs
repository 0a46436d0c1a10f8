pub mod codec;
pub mod config;
pub mod description;
pub mod error;
pub mod fetch;
pub mod formats;
pub mod imaging;
pub mod lossless;
pub mod lossy_algo;
pub mod manifest;
pub mod metadata;
pub mod quantize;
pub mod rle;
pub mod source;
pub mod statistics;
pub mod types;

pub use codec::{DecodeReport, DecodedImage, EncodedManifest, decode, decode_as, encode};
pub use config::{
    DecodeOptions, DescriptionOptions, EncodeOptions, FetchOptions, InputLimits, LosslessOptions,
    LossyAlgoOptions, TierOptions,
};
pub use error::{CodecError, ErrorKind, Result};
pub use manifest::sniff;
pub use metadata::{ExtractedMetadata, extract_metadata};
pub use source::InputSource;
pub use types::{ColorMode, ContrastLevel, ImageMetadata, ResampleFilter, Tier};
