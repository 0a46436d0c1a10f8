use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tracing::Level;

use pixtext::{
    CodecError, DecodeOptions, DescriptionOptions, EncodeOptions, FetchOptions, InputLimits,
    InputSource, LosslessOptions, LossyAlgoOptions, ResampleFilter, Tier, TierOptions,
};

mod cli;

use cli::{Cli, Commands, EncodeTuning, NetArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Encode {
            input,
            tier,
            output,
            tuning,
            net,
        } => run_encode(&input, &tier, output, &tuning, &net),
        Commands::Decode {
            input,
            tier,
            output,
            net,
        } => run_decode(&input, tier.as_deref(), output, &net),
        Commands::Sniff { input, net } => run_sniff(&input, &net),
    }
}

/// Attaches the error kind so the exit message says what went wrong first.
fn codec<T>(result: pixtext::Result<T>) -> Result<T> {
    result.map_err(|e: CodecError| {
        let kind = e.kind();
        anyhow::Error::new(e).context(format!("{kind} error"))
    })
}

fn limits_and_fetch(net: &NetArgs) -> (InputLimits, FetchOptions) {
    let mut limits = InputLimits::default();
    if let Some(max) = net.max_bytes {
        limits.max_input_bytes = max;
    }
    let fetch = FetchOptions::default()
        .with_timeout(Duration::from_secs(net.timeout_secs))
        .with_max_bytes(limits.max_manifest_bytes());
    (limits, fetch)
}

fn tier_options(tier: Tier, tuning: &EncodeTuning) -> Result<TierOptions> {
    let options = match tier {
        Tier::Lossless => {
            let mut o = LosslessOptions::default();
            if let Some(source) = &tuning.source {
                o = o.with_source(source);
            }
            if let Some(size) = tuning.chunk_size {
                o = o.with_chunk_size(size);
            }
            if let Some(width) = tuning.line_width {
                o = o.with_line_width(width);
            }
            TierOptions::from(o)
        }
        Tier::LossyAlgo => {
            let mut o = LossyAlgoOptions::default()
                .with_lock_dims(!tuning.unlock_dims)
                .with_dither(tuning.dither);
            if let Some(source) = &tuning.source {
                o = o.with_source(source);
            }
            if let Some(side) = tuning.max_side {
                o = o.with_max_side(side);
            }
            if let Some(size) = tuning.palette_size {
                o = o.with_palette_size(size);
            }
            if let Some(name) = &tuning.resample {
                o = o.with_resample(codec(name.parse::<ResampleFilter>())?);
            }
            TierOptions::from(o)
        }
        Tier::Description => {
            let mut o = DescriptionOptions::default();
            if let Some(source) = &tuning.source {
                o = o.with_source(source);
            }
            if let Some(side) = tuning.target_short_side {
                o = o.with_preserve_dims(false).with_target_short_side(side);
            }
            if let Some(probe) = tuning.palette_probe {
                o = o.with_palette_probe(probe);
            }
            TierOptions::from(o)
        }
    };
    Ok(options)
}

/// `output` names a file unless it is an existing directory; no output
/// means the current directory.
fn resolve_output(output: Option<PathBuf>, default_name: &str) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(default_name),
        Some(path) => path,
        None => PathBuf::from(default_name),
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write: {}", path.display()))
}

fn run_encode(
    input: &str,
    tier: &str,
    output: Option<PathBuf>,
    tuning: &EncodeTuning,
    net: &NetArgs,
) -> Result<()> {
    let tier: Tier = codec(tier.parse())?;
    let (limits, fetch) = limits_and_fetch(net);
    let loaded = codec(InputSource::parse(input).load(&limits, &fetch))
        .with_context(|| format!("Failed to load image: {input}"))?;

    let options = EncodeOptions::new(tier_options(tier, tuning)?).with_limits(limits);
    let manifest = codec(pixtext::encode(&loaded.bytes, &loaded.name, &options))?;

    let path = resolve_output(output, &manifest.filename);
    write_output(&path, manifest.text.as_bytes())?;

    println!(
        "{} {} manifest -> {} ({} chars)",
        style("[+]").green().bold(),
        style(manifest.tier).cyan(),
        path.display(),
        manifest.text.len()
    );
    Ok(())
}

fn run_decode(input: &str, tier: Option<&str>, output: Option<PathBuf>, net: &NetArgs) -> Result<()> {
    let (limits, fetch) = limits_and_fetch(net);
    let text = codec(InputSource::parse(input).load_text(&limits, &fetch))
        .with_context(|| format!("Failed to load manifest: {input}"))?;

    let options = DecodeOptions::default().with_limits(limits);
    let decoded = match tier {
        Some(name) => codec(pixtext::decode_as(&text, codec(name.parse())?, &options))?,
        None => codec(pixtext::decode(&text, &options))?,
    };

    let path = resolve_output(output, &decoded.filename);
    write_output(&path, &decoded.bytes)?;

    println!(
        "{} {} -> {} [{}]",
        style("[+]").green().bold(),
        style(decoded.report.tier()).cyan(),
        path.display(),
        decoded.report
    );
    Ok(())
}

fn run_sniff(input: &str, net: &NetArgs) -> Result<()> {
    let (limits, fetch) = limits_and_fetch(net);
    let text = codec(InputSource::parse(input).load_text(&limits, &fetch))
        .with_context(|| format!("Failed to load manifest: {input}"))?;
    let tier = codec(pixtext::sniff(&text))?;
    println!("{tier}");
    Ok(())
}
