//! Input resolution: normalise an image input string to raw image bytes.
//!
//! Receipts arrive in three shapes: a data URI (`data:image/png;base64,...`),
//! a bare base64 string, or a filesystem path. The shape is guessed from the
//! string alone:
//!
//! * contains a comma, or is longer than [`INLINE_LENGTH_THRESHOLD`]
//!   characters → inline base64 (everything after the last comma);
//! * otherwise → a path to read.
//!
//! A short bare base64 string without a comma is therefore read as a path and
//! fails with [`InputResolutionError::Read`]. The resolved MIME type is always
//! [`RESOLVED_MIME_TYPE`], whatever the source format.

use crate::error::InputResolutionError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Inputs with more characters than this are treated as inline data.
pub const INLINE_LENGTH_THRESHOLD: usize = 500;

/// MIME type attached to every resolved payload.
pub const RESOLVED_MIME_TYPE: &str = "image/jpeg";

/// How an image input string will be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput<'a> {
    /// Base64 data with any data-URI prefix already removed.
    Base64Inline(&'a str),
    /// A filesystem path.
    FilePath(&'a Path),
}

/// Raw image bytes plus the MIME type to send them with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Decide whether `input` is inline base64 or a path.
pub fn classify_image_input(input: &str) -> ImageInput<'_> {
    if input.contains(',') || input.chars().count() > INLINE_LENGTH_THRESHOLD {
        let payload = match input.rfind(',') {
            Some(idx) => &input[idx + 1..],
            None => input,
        };
        ImageInput::Base64Inline(payload)
    } else {
        ImageInput::FilePath(Path::new(input))
    }
}

/// Resolve an image input string into an [`ImagePayload`].
pub async fn resolve_image_input(input: &str) -> Result<ImagePayload, InputResolutionError> {
    let data = match classify_image_input(input) {
        ImageInput::Base64Inline(b64) => {
            let data = decode_base64(b64)?;
            debug!("Resolved inline image: {} bytes", data.len());
            data
        }
        ImageInput::FilePath(path) => {
            let data = tokio::fs::read(path)
                .await
                .map_err(|source| InputResolutionError::Read {
                    path: PathBuf::from(path),
                    source,
                })?;
            debug!("Resolved image file {}: {} bytes", path.display(), data.len());
            data
        }
    };

    Ok(ImagePayload {
        mime_type: RESOLVED_MIME_TYPE.to_string(),
        data,
    })
}

/// Decode standard base64, ignoring embedded whitespace and line breaks.
fn decode_base64(b64: &str) -> Result<Vec<u8>, InputResolutionError> {
    let compact: String = b64.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|source| InputResolutionError::Decode { source })
}
