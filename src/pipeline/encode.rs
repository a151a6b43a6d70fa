//! Image encoding: raw bytes → base64 `ImageData` attachment.
//!
//! Multimodal chat APIs take images as base64 strings embedded in the JSON
//! request body. The bytes are sent as-is; no re-encoding or resizing happens
//! here, so the declared MIME type is whatever the caller supplied.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use tracing::debug;

/// Wrap raw image bytes as an attachment for a vision message.
pub fn encode_image(bytes: &[u8], mime_type: &str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime_type, b64.len());
    ImageData::new(b64, mime_type)
}
