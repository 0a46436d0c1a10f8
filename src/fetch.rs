//! Blocking HTTP retrieval of images and manifests.

use std::io::Read;

use tracing::{debug, warn};

use crate::config::FetchOptions;
use crate::error::{CodecError, Result};

#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    /// URL after redirects
    pub url: String,
}

/// Fetches `url`, failing on transport errors, timeouts, non-success status
/// codes and bodies larger than `options.max_bytes`.
pub fn fetch_url(url: &str, options: &FetchOptions) -> Result<FetchedBody> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(options.user_agent.as_str())
        .timeout(options.timeout)
        .connect_timeout(options.connect_timeout)
        .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
        .build()
        .map_err(|e| CodecError::Fetch(format!("HTTP client error: {e}")))?;

    let response = client.get(url).send().map_err(|e| request_error(url, &e))?;

    let status = response.status();
    if !status.is_success() {
        warn!(url, %status, "fetch returned non-success status");
        return Err(CodecError::Fetch(format!("{url} returned HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > options.max_bytes {
            return Err(CodecError::InputTooLarge {
                actual: len,
                max: options.max_bytes,
            });
        }
    }

    let final_url = response.url().to_string();

    let mut bytes = Vec::new();
    response
        .take(options.max_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| CodecError::Fetch(format!("body read error for {url}: {e}")))?;
    if bytes.len() as u64 > options.max_bytes {
        return Err(CodecError::InputTooLarge {
            actual: bytes.len() as u64,
            max: options.max_bytes,
        });
    }

    debug!(url = %final_url, bytes = bytes.len(), "fetched body");
    Ok(FetchedBody {
        bytes,
        url: final_url,
    })
}

fn request_error(url: &str, err: &reqwest::Error) -> CodecError {
    if err.is_timeout() {
        CodecError::Fetch(format!("timed out fetching {url}"))
    } else {
        CodecError::Fetch(format!("fetch error for {url}: {err}"))
    }
}
