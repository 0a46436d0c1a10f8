//! Where an encode or decode input comes from: a local path, a URL or bytes
//! already in memory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{FetchOptions, InputLimits};
use crate::error::{CodecError, Result};
use crate::fetch;

const FALLBACK_NAME: &str = "image";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Url(String),
    Path(PathBuf),
    Bytes { name: String, data: Vec<u8> },
}

/// Raw input plus the name it should be reported under.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputSource {
    /// `http://` and `https://` arguments are URLs; anything else is a path.
    pub fn parse(arg: &str) -> Self {
        let lower = arg.trim().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(arg.trim().to_string())
        } else {
            Self::Path(PathBuf::from(arg))
        }
    }

    pub fn load(&self, limits: &InputLimits, fetch_options: &FetchOptions) -> Result<LoadedInput> {
        self.load_within(limits.max_input_bytes, fetch_options)
    }

    /// Loads a manifest, which must be UTF-8 text. Manifests are checked
    /// against the manifest budget, not the image byte limit.
    pub fn load_text(&self, limits: &InputLimits, fetch_options: &FetchOptions) -> Result<String> {
        let loaded = self.load_within(limits.max_manifest_bytes(), fetch_options)?;
        String::from_utf8(loaded.bytes).map_err(|_| CodecError::invalid("manifest must be UTF-8 text"))
    }

    fn load_within(&self, max_bytes: u64, fetch_options: &FetchOptions) -> Result<LoadedInput> {
        let loaded = match self {
            Self::Url(url) => {
                let options = FetchOptions {
                    max_bytes: fetch_options.max_bytes.min(max_bytes),
                    ..fetch_options.clone()
                };
                let body = fetch::fetch_url(url, &options)?;
                LoadedInput {
                    name: name_from_url(&body.url),
                    bytes: body.bytes,
                }
            }
            Self::Path(path) => {
                let len = fs::metadata(path)?.len();
                if len > max_bytes {
                    return Err(CodecError::InputTooLarge {
                        actual: len,
                        max: max_bytes,
                    });
                }
                LoadedInput {
                    name: name_from_path(path),
                    bytes: fs::read(path)?,
                }
            }
            Self::Bytes { name, data } => LoadedInput {
                name: name.clone(),
                bytes: data.clone(),
            },
        };

        if loaded.bytes.is_empty() {
            return Err(CodecError::invalid("empty input"));
        }
        let actual = loaded.bytes.len() as u64;
        if actual > max_bytes {
            return Err(CodecError::InputTooLarge {
                actual,
                max: max_bytes,
            });
        }
        debug!(name = %loaded.name, bytes = loaded.bytes.len(), "loaded input");
        Ok(loaded)
    }
}

fn name_from_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

/// Last path segment of a URL, ignoring query and fragment.
fn name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let path = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    path.split_once('/')
        .and_then(|(_, p)| p.rsplit('/').next())
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}
