//! Post-processing: turn the model's free-text reply into a typed value.
//!
//! Models are asked for a bare JSON object but routinely wrap it in
//! ```` ```json ```` fences anyway. The reply is cleaned by deleting every
//! ```` ```json ```` and ```` ``` ```` marker and trimming, then decoded
//! strictly: anything that is still not the expected JSON object is a
//! failure. There is no attempt to salvage JSON from surrounding prose.

use crate::draft::TransactionDraft;
use crate::error::ExtractionFailure;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

static RE_FENCE_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?").unwrap());

/// Longest reply excerpt kept in an [`ExtractionFailure::Undecodable`].
const SNIPPET_CHARS: usize = 200;

/// Remove every Markdown fence marker and surrounding whitespace.
///
/// Idempotent: the output contains no marker, so a second pass only trims.
pub fn strip_code_fences(reply: &str) -> String {
    RE_FENCE_MARKERS.replace_all(reply, "").trim().to_string()
}

/// Clean a reply and decode it as `T`.
pub fn decode_reply<T: DeserializeOwned>(reply: &str) -> Result<T, ExtractionFailure> {
    let cleaned = strip_code_fences(reply);
    if cleaned.is_empty() {
        return Err(ExtractionFailure::EmptyResponse);
    }
    serde_json::from_str(&cleaned).map_err(|e| ExtractionFailure::Undecodable {
        detail: e.to_string(),
        snippet: cleaned.chars().take(SNIPPET_CHARS).collect(),
    })
}

/// Clean a reply and decode it as a [`TransactionDraft`].
pub fn decode_draft(reply: &str) -> Result<TransactionDraft, ExtractionFailure> {
    decode_reply(reply)
}
