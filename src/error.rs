//! Error types for the zenfin-scan library.
//!
//! The failure modes fall into three layers:
//!
//! * [`ScanError`] — **Fatal**: the engine cannot be built at all (missing
//!   API credential, provider not configured, invalid config). Returned as
//!   `Err(ScanError)` from constructors.
//!
//! * [`ExtractionFailure`] — **Non-fatal**: a single extraction failed
//!   (transport error, timeout, reply that is not JSON). The engine logs it
//!   and collapses it to `None`; the `try_*` methods return it as-is so the
//!   cause stays inspectable in tests and diagnostics.
//!
//! * [`EntryError`] — **Caller-side**: the route contract's rejections. A
//!   failed extraction and an extraction without `amount` are kept as two
//!   distinct variants so clients can tell them apart.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised while building an [`crate::ExtractionEngine`].
#[derive(Debug, Error)]
pub enum ScanError {
    /// The generative-model credential is absent from the environment.
    #[error("Missing API credential: set {var} (or {fallback}) before scanning.")]
    MissingCredential {
        var: &'static str,
        fallback: &'static str,
    },

    /// The configured provider could not be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Why an image input string could not be turned into an image payload.
#[derive(Debug, Error)]
pub enum InputResolutionError {
    /// The inline data was not valid base64.
    #[error("Image input could not be resolved: invalid base64 data: {source}")]
    Decode {
        #[source]
        source: base64::DecodeError,
    },

    /// The input was treated as a path and the file could not be read.
    #[error("Image input could not be resolved: cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Transport-level failure reported by a [`crate::pipeline::llm::GenerativeModel`].
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// Network blip, timeout, 429 or 5xx. Worth one more attempt.
    #[error("transient generation error: {0}")]
    Transient(String),

    /// Authentication, bad request, content filter. Retrying will not help.
    #[error("generation error: {0}")]
    Permanent(String),
}

impl GenerationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transient(_))
    }
}

/// The cause of a single failed extraction.
///
/// Never crosses the engine's `Option` API; see
/// [`crate::ExtractionEngine::try_extract_from_text`] for the typed variant.
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    /// Blank transcript; no call was made.
    #[error("empty input: nothing to extract")]
    EmptyInput,

    /// The generation call failed on every attempt.
    #[error("generation call failed after {attempts} attempt(s): {detail}")]
    Remote { attempts: u32, detail: String },

    /// The generation call exceeded the per-call timeout on the last attempt.
    #[error("generation call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The model replied with nothing but whitespace and fences.
    #[error("model reply was empty")]
    EmptyResponse,

    /// The cleaned reply was not the expected JSON object.
    #[error("model reply is not a valid transaction object: {detail} (reply: {snippet:?})")]
    Undecodable { detail: String, snippet: String },

    /// The image input could not be resolved into a payload.
    #[error(transparent)]
    Input(#[from] InputResolutionError),
}

/// Rejections returned by [`crate::entry::process_entry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    /// Unknown entry type, or the field that entry type needs is missing.
    #[error("invalid entry: {reason}")]
    InvalidEntry { reason: String },

    /// Extraction produced no record.
    #[error("no transaction could be extracted from the entry")]
    ExtractionFailed,

    /// Extraction produced a record without an amount.
    #[error("the extracted transaction has no amount")]
    AmountMissing,
}

impl EntryError {
    /// HTTP status the route layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            EntryError::InvalidEntry { .. } => 400,
            EntryError::ExtractionFailed | EntryError::AmountMissing => 422,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            EntryError::InvalidEntry { .. } => "invalid_entry",
            EntryError::ExtractionFailed => "extraction_failed",
            EntryError::AmountMissing => "amount_missing",
        }
    }

    /// Fixed user-facing message shown by the app.
    pub fn detail(&self) -> &'static str {
        match self {
            EntryError::InvalidEntry { .. } => "Entrada inválida",
            EntryError::ExtractionFailed => "Não foi possível extrair dados da entrada",
            EntryError::AmountMissing => "Valor da transação não identificado",
        }
    }
}
