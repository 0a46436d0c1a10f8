//! Text-level helpers shared by every manifest tier: line tokenizing,
//! wrapping, `key: value` header fields, JSON block extraction and tier
//! sniffing.

use std::path::Path;

use tracing::debug;

use crate::error::{CodecError, Result};
use crate::types::Tier;

pub const JSON_START: &str = "JSON_START";
pub const JSON_END: &str = "JSON_END";
pub const CHUNK_MARKER: &str = "CHUNK";
pub const NULL: &str = "null";

/// Number of leading non-empty lines searched for a header literal.
const SNIFF_LINES: usize = 4;
const DESCRIPTION_SCHEMAS: [&str; 2] = ["LOSSY-IMAGE-DESCRIPTION v2", "LOSSY-IMAGE-DESCRIPTION v1"];
const FALLBACK_STEM: &str = "image";

/// Splits `text` into pieces of at most `width` characters. Empty text
/// yields no pieces.
pub fn wrap(text: &str, width: usize) -> Vec<&str> {
    let width = width.max(1);
    let mut pieces = Vec::with_capacity(text.len() / width + 1);
    let mut start = 0;
    let mut count = 0;
    for (i, _) in text.char_indices() {
        if count == width {
            pieces.push(&text[start..i]);
            start = i;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Splits a `key: value` line. Keys are lowercase identifiers; the value
/// is trimmed and must be non-empty.
pub fn parse_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim_end();
    if key.is_empty()
        || !key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    {
        return None;
    }
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Ordered `key: value` fields appearing before the first CHUNK block.
#[derive(Debug, Default)]
pub struct HeaderFields<'a> {
    fields: Vec<(&'a str, &'a str)>,
}

impl<'a> HeaderFields<'a> {
    pub fn parse(text: &'a str) -> Self {
        let fields = text
            .lines()
            .take_while(|line| !is_chunk_marker(line))
            .filter_map(parse_field)
            .collect();
        Self { fields }
    }

    /// First occurrence of `key`, with the literal `null` read as absent.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .filter(|v| *v != NULL)
    }

    pub fn require(&self, key: &str) -> Result<&'a str> {
        self.get(key)
            .ok_or_else(|| CodecError::malformed(format!("missing header field {key:?}")))
    }

    /// Parses a present field; absent stays `None`, unparsable is an error.
    pub fn parse_opt<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|_| CodecError::malformed(format!("invalid value for {key}: {v:?}")))
            })
            .transpose()
    }
}

/// `CHUNK i/n` line, returning `(i, n)`.
pub fn parse_chunk_marker(line: &str) -> Option<(usize, usize)> {
    let rest = line.trim().strip_prefix(CHUNK_MARKER)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (index, total) = rest.trim().split_once('/')?;
    Some((index.trim().parse().ok()?, total.trim().parse().ok()?))
}

#[inline]
fn is_chunk_marker(line: &str) -> bool {
    parse_chunk_marker(line).is_some()
}

/// Lines strictly between the first `start` marker line and the next `end`
/// marker line. `None` when either marker is missing.
pub fn block_between<'a>(text: &'a str, start: &str, end: &str) -> Option<Vec<&'a str>> {
    let mut lines = text.lines().skip_while(|l| l.trim() != start);
    lines.next()?;
    let mut body = Vec::new();
    for line in lines {
        if line.trim() == end {
            return Some(body);
        }
        body.push(line);
    }
    None
}

/// The JSON object between `JSON_START` and `JSON_END`.
pub fn extract_json_block(text: &str) -> Result<String> {
    let body = block_between(text, JSON_START, JSON_END)
        .ok_or_else(|| CodecError::malformed("JSON payload not found"))?;
    let json = body.join("\n");
    let trimmed = json.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return Err(CodecError::malformed("JSON payload is not an object"));
    }
    Ok(trimmed.to_string())
}

/// Determines the tier from the header line. Falls back to a description
/// schema line anywhere in the text.
pub fn sniff(text: &str) -> Result<Tier> {
    let head: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(SNIFF_LINES)
        .collect();

    for tier in Tier::ALL {
        if head.iter().any(|line| line.contains(tier.header())) {
            debug!(%tier, "sniffed manifest header");
            return Ok(tier);
        }
    }

    if text.lines().any(is_description_schema_line) {
        debug!("sniffed description schema line");
        return Ok(Tier::Description);
    }

    Err(CodecError::UnrecognizedManifest)
}

fn is_description_schema_line(line: &str) -> bool {
    let Some((key, value)) = line.trim().trim_end_matches(',').split_once(':') else {
        return false;
    };
    key.trim() == "\"schema\""
        && DESCRIPTION_SCHEMAS
            .iter()
            .any(|s| value.trim().strip_prefix('"').and_then(|v| v.strip_suffix('"')) == Some(*s))
}

/// Replaces line breaks so a value cannot start a header line of its own.
pub fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Header, note, filename and a JSON payload framed by the block markers.
pub fn json_manifest(tier: Tier, note: &str, filename: &str, json: &str) -> String {
    let filename_line = format!("filename: {}", single_line(filename));
    [
        tier.header(),
        note,
        filename_line.as_str(),
        "",
        JSON_START,
        json,
        JSON_END,
    ]
    .join("\n")
}

/// `<stem>.<suffix>` for a manifest derived from `filename`.
pub fn manifest_filename(filename: &str, tier: Tier) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_STEM);
    format!("{}.{}", single_line(stem), tier.manifest_suffix())
}

/// Float rendering used in header fields: integral values keep one decimal
/// (`72.0`), others use the shortest exact representation.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

pub fn format_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| NULL.to_string(), |v| v.to_string())
}
