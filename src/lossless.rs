//! Bit-exact tier: the original container bytes travel as chunked base64
//! under a `key: value` header with SHA-256 and MD5 digests.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use md5::Md5;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::{InputLimits, LosslessOptions};
use crate::error::{CodecError, Result};
use crate::manifest::{
    self, HeaderFields, format_float, format_opt, parse_chunk_marker, single_line, wrap,
};
use crate::metadata::{self, ExtractedMetadata};
use crate::types::{FALLBACK_MIME, Tier};

pub const CHUNK_END: &str = "END CHUNK";
pub const ICC_START: &str = "ICC_PROFILE_START";
pub const ICC_END: &str = "ICC_PROFILE_END";
pub const EXIF_START: &str = "EXIF_START";
pub const EXIF_END: &str = "EXIF_END";

const FOOTER: [&str; 6] = [
    "RECONSTRUCT_INSTRUCTIONS:",
    "1) Concatenate CHUNKs in order.",
    "2) Base64-decode to bytes.",
    "3) Verify SHA-256 matches \"sha256\" (md5 provided for convenience).",
    "4) Save bytes as \"filename\" with \"mime_type\". (All metadata is preserved because bytes are original.)",
    "EOF",
];

/// Bytes recovered from a lossless manifest.
#[derive(Debug, Clone)]
pub struct LosslessImage {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    /// Lowercase hex digest of `bytes`
    pub sha256: String,
    pub icc_profile: Option<Vec<u8>>,
    pub exif: Option<Vec<u8>>,
}

#[derive(Debug)]
struct ChunkBlock<'a> {
    index: usize,
    total: usize,
    lines: Vec<&'a str>,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn md5_hex(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

pub fn encode(
    bytes: &[u8],
    filename: &str,
    options: &LosslessOptions,
    limits: &InputLimits,
) -> Result<String> {
    options.validate()?;
    let ExtractedMetadata {
        metadata: meta,
        icc_profile,
        exif,
    } = metadata::extract_metadata(bytes, filename, limits)?;

    let b64 = STANDARD.encode(bytes);
    let chunks = wrap(&b64, options.chunk_size);
    let icc_b64 = icc_profile.as_deref().map(|p| STANDARD.encode(p));
    let exif_b64 = exif.as_deref().map(|e| STANDARD.encode(e));

    let software = meta
        .software
        .as_deref()
        .map(single_line)
        .filter(|s| !s.trim().is_empty());

    let mut lines: Vec<String> = vec![
        Tier::Lossless.header().to_string(),
        format!("source: {}", single_line(&options.source)),
        format!("filename: {}", single_line(&meta.filename)),
        format!("mime_type: {}", meta.mime_type),
        format!("filesize_bytes: {}", bytes.len()),
        format!("width: {}", meta.width),
        format!("height: {}", meta.height),
        format!("color_mode: {}", meta.color_mode),
        format!("bit_depth: {}", meta.bit_depth),
        format!("dpi_x: {}", format_opt(meta.dpi_x.map(format_float))),
        format!("dpi_y: {}", format_opt(meta.dpi_y.map(format_float))),
        format!("has_alpha: {}", meta.has_alpha),
        format!("exif_orientation: {}", format_opt(meta.exif_orientation)),
        format!("software: {}", format_opt(software)),
        format!("sha256: {}", sha256_hex(bytes)),
        format!("md5: {}", md5_hex(bytes)),
        format!("icc_profile_b64_present: {}", icc_b64.is_some()),
        format!("exif_b64_present: {}", exif_b64.is_some()),
        String::new(),
        format!("chunk_count: {}", chunks.len()),
        "chunk_encoding: base64".to_string(),
        format!("chunk_line_width: {}", options.line_width),
        String::new(),
    ];

    let total = chunks.len();
    for (i, chunk) in chunks.iter().enumerate() {
        lines.push(format!("{} {}/{total}", manifest::CHUNK_MARKER, i + 1));
        lines.extend(wrap(chunk, options.line_width).into_iter().map(str::to_string));
        lines.push(CHUNK_END.to_string());
        lines.push(String::new());
    }

    for (start, body, end) in [
        (ICC_START, &icc_b64, ICC_END),
        (EXIF_START, &exif_b64, EXIF_END),
    ] {
        if let Some(body) = body {
            lines.push(start.to_string());
            lines.extend(wrap(body, options.line_width).into_iter().map(str::to_string));
            lines.push(end.to_string());
            lines.push(String::new());
        }
    }

    lines.extend(FOOTER.iter().map(|l| l.to_string()));

    info!(
        filename = %meta.filename,
        bytes = bytes.len(),
        chunks = total,
        "encoded lossless manifest"
    );
    Ok(lines.join("\n"))
}

pub fn decode(text: &str, limits: &InputLimits) -> Result<LosslessImage> {
    limits.check_manifest_bytes(text.len())?;
    let fields = HeaderFields::parse(text);

    let filename = metadata::base_name(fields.require("filename")?);
    let mime_type = fields.get("mime_type").unwrap_or(FALLBACK_MIME).to_string();
    let expected = fields.require("sha256")?.to_ascii_lowercase();
    let declared: usize = fields
        .parse_opt("chunk_count")?
        .ok_or_else(|| CodecError::malformed("missing header field \"chunk_count\""))?;
    let filesize: Option<u64> = fields.parse_opt("filesize_bytes")?;

    let blocks = collect_chunks(text);
    if blocks.len() != declared {
        return Err(CodecError::ChunkCountMismatch {
            declared,
            found: blocks.len(),
        });
    }

    let mut b64 = String::new();
    for (pos, block) in blocks.iter().enumerate() {
        if block.index != pos + 1 || block.total != declared {
            return Err(CodecError::integrity(format!(
                "CHUNK {}/{} found at position {} of {declared}",
                block.index,
                block.total,
                pos + 1
            )));
        }
        for line in &block.lines {
            b64.extend(line.split_whitespace());
        }
    }

    let bytes = STANDARD
        .decode(b64.as_bytes())
        .map_err(|e| CodecError::integrity(format!("chunk payload is not valid base64: {e}")))?;

    let actual = sha256_hex(&bytes);
    if actual != expected {
        return Err(CodecError::DigestMismatch { expected, actual });
    }
    if let Some(size) = filesize {
        if size != bytes.len() as u64 {
            return Err(CodecError::integrity(format!(
                "decoded {} bytes but filesize_bytes says {size}",
                bytes.len()
            )));
        }
    }

    let icc_profile = side_block(text, ICC_START, ICC_END)?;
    let exif = side_block(text, EXIF_START, EXIF_END)?;

    debug!(%filename, bytes = bytes.len(), chunks = declared, "decoded lossless manifest");

    Ok(LosslessImage {
        filename,
        mime_type,
        bytes,
        sha256: actual,
        icc_profile,
        exif,
    })
}

/// Complete `CHUNK i/n ... END CHUNK` blocks in document order. A marker
/// that is never closed does not count, and a new marker abandons an open
/// block.
fn collect_chunks(text: &str) -> Vec<ChunkBlock<'_>> {
    let mut blocks = Vec::new();
    let mut open: Option<ChunkBlock<'_>> = None;

    for line in text.lines() {
        if let Some((index, total)) = parse_chunk_marker(line) {
            open = Some(ChunkBlock {
                index,
                total,
                lines: Vec::new(),
            });
        } else if line.trim() == CHUNK_END {
            if let Some(block) = open.take() {
                blocks.push(block);
            }
        } else if let Some(block) = open.as_mut() {
            block.lines.push(line);
        }
    }
    blocks
}

fn side_block(text: &str, start: &str, end: &str) -> Result<Option<Vec<u8>>> {
    let Some(lines) = manifest::block_between(text, start, end) else {
        return Ok(None);
    };
    let b64: String = lines.iter().flat_map(|l| l.split_whitespace()).collect();
    STANDARD
        .decode(b64.as_bytes())
        .map(Some)
        .map_err(|e| CodecError::invalid(format!("{start} block is not valid base64: {e}")))
}
