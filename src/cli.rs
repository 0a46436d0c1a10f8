use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pixtext")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert images into text manifests and rebuild them", long_about = None)]
pub struct Cli {
    /// Enable debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode an image (path or URL) into a manifest
    Encode {
        /// Image path or http(s) URL
        input: String,

        /// lossless | lossy-algo | lossy-nlp
        #[arg(short, long, default_value = "lossless")]
        tier: String,

        /// Output file or directory (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        tuning: EncodeTuning,

        #[command(flatten)]
        net: NetArgs,
    },

    /// Rebuild an image from a manifest (path or URL)
    Decode {
        /// Manifest path or http(s) URL
        input: String,

        /// Skip header sniffing and decode as this tier
        #[arg(short, long)]
        tier: Option<String>,

        /// Output file or directory (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        net: NetArgs,
    },

    /// Report which tier a manifest belongs to
    Sniff {
        input: String,

        #[command(flatten)]
        net: NetArgs,
    },
}

/// Per-tier knobs; unset flags keep the library defaults.
#[derive(Args, Debug, Default)]
pub struct EncodeTuning {
    /// Free-form provenance tag stored in the manifest
    #[arg(long)]
    pub source: Option<String>,

    /// [lossless] base64 characters per CHUNK block
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// [lossless] wrap column
    #[arg(long)]
    pub line_width: Option<usize>,

    /// [lossy-algo] allow downscaling to --max-side
    #[arg(long)]
    pub unlock_dims: bool,

    /// [lossy-algo] longest side after downscaling
    #[arg(long)]
    pub max_side: Option<u32>,

    /// [lossy-algo] palette size, 1-256
    #[arg(long)]
    pub palette_size: Option<u16>,

    /// [lossy-algo] nearest | bilinear | bicubic | lanczos
    #[arg(long)]
    pub resample: Option<String>,

    /// [lossy-algo] Floyd-Steinberg dithering
    #[arg(long)]
    pub dither: bool,

    /// [lossy-nlp] render the proxy with this shorter side instead of the
    /// original size
    #[arg(long)]
    pub target_short_side: Option<u32>,

    /// [lossy-nlp] number of dominant colors to record
    #[arg(long)]
    pub palette_probe: Option<u16>,
}

#[derive(Args, Debug)]
pub struct NetArgs {
    /// Timeout in seconds for URL inputs
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Reject images larger than this many bytes; manifests get a
    /// proportionally larger budget
    #[arg(long)]
    pub max_bytes: Option<u64>,
}
