//! The entry-processing contract an HTTP layer wraps.
//!
//! A client posts an entry type (`voice` or `image`) plus either a transcript
//! or an uploaded file. [`process_entry`] dispatches to the engine and maps the
//! three negative outcomes to distinct [`EntryError`]s:
//!
//! | outcome | error | status |
//! |---|---|---|
//! | unknown type / missing field | `InvalidEntry` | 400 |
//! | engine returned nothing | `ExtractionFailed` | 422 |
//! | draft has no `amount` | `AmountMissing` | 422 |

use crate::draft::TransactionDraft;
use crate::engine::ExtractionEngine;
use crate::error::EntryError;
use std::str::FromStr;
use tracing::{info, warn};

/// The kind of entry a client submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Voice,
    Image,
}

impl FromStr for EntryKind {
    type Err = EntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(EntryKind::Voice),
            "image" => Ok(EntryKind::Image),
            other => Err(EntryError::InvalidEntry {
                reason: format!("unknown entry type '{other}'"),
            }),
        }
    }
}

/// An uploaded file as received by the route layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    /// The content type declared by the client, passed through unchanged.
    pub content_type: String,
}

/// One submitted entry.
#[derive(Debug, Clone)]
pub struct ProcessEntryRequest {
    pub entry_type: String,
    pub text_content: Option<String>,
    pub file: Option<UploadedFile>,
}

impl ProcessEntryRequest {
    pub fn voice(text: impl Into<String>) -> Self {
        Self {
            entry_type: "voice".to_string(),
            text_content: Some(text.into()),
            file: None,
        }
    }

    pub fn image(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            entry_type: "image".to_string(),
            text_content: None,
            file: Some(UploadedFile {
                bytes,
                content_type: content_type.into(),
            }),
        }
    }
}

/// Run one entry through the engine and validate the result.
pub async fn process_entry(
    engine: &ExtractionEngine,
    request: ProcessEntryRequest,
) -> Result<TransactionDraft, EntryError> {
    let kind: EntryKind = request.entry_type.parse()?;

    let result = match (kind, request.text_content, request.file) {
        (EntryKind::Voice, Some(text), _) if !text.is_empty() => {
            engine.extract_from_text(&text).await
        }
        (EntryKind::Image, _, Some(file)) => {
            engine
                .extract_from_image(&file.bytes, &file.content_type)
                .await
        }
        (kind, _, _) => {
            return Err(EntryError::InvalidEntry {
                reason: format!("{kind:?} entry is missing its content"),
            })
        }
    };

    let draft = result.ok_or_else(|| {
        warn!("Entry rejected: no transaction extracted");
        EntryError::ExtractionFailed
    })?;
    validate_draft(&draft)?;

    info!(
        "Entry accepted: {:?} {} in '{}'",
        draft.kind,
        draft.amount.unwrap_or_default(),
        draft.category
    );
    Ok(draft)
}

/// Caller-side check: a draft must carry an amount.
pub fn validate_draft(draft: &TransactionDraft) -> Result<(), EntryError> {
    if draft.amount.is_none() {
        warn!("Entry rejected: transaction has no amount");
        return Err(EntryError::AmountMissing);
    }
    Ok(())
}
