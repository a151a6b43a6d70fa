//! Pipeline stages for transaction extraction.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ postprocess
//! (base64/path) (ImageData) (model) (fences → JSON → draft)
//! ```
//!
//! 1. [`input`]  — resolve an image input string (data URI, bare base64 or
//!    file path) into raw bytes
//! 2. [`encode`] — wrap raw bytes as a base64 `ImageData` attachment
//! 3. [`llm`]    — the generative-model seam, with per-call timeout and a
//!    single retry; the only stage with network I/O
//! 4. [`postprocess`] — strip Markdown fences from the reply and decode it
//!    into a [`crate::TransactionDraft`]

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
